//! Shape repair run on every migration pass, regardless of the stamp.

use serde_json::Value;

use crate::entities::{Document, DocumentUpdate};
use crate::schema::DocumentSchema;
use crate::value_objects::{FieldRef, KnownField, ValueModel};

fn is_threshold(field: &FieldRef) -> bool {
    KnownField::thresholds()
        .iter()
        .any(|known| known.path() == field.path.as_str())
}

/// Rebuild every schema-declared ValueModel field whose stored form is not
/// what a clean read would write back: missing keys, a non-list
/// `modifiers`, a stale `value` or blank ids. Loosely typed modifier entries
/// are kept with coerced fields and reported. Unreadable fields are reset to
/// the schema default. Absent thresholds are synthesized; other absent
/// fields are left alone.
pub fn scan(document: &Document, diagnostics: &mut Vec<String>) -> DocumentUpdate {
    let schema = DocumentSchema::for_document(document);
    let default_of = |field: &FieldRef| {
        schema
            .default_of(field.path.as_str())
            .map(|default| default.to_value())
            .unwrap_or_else(|| ValueModel::empty(field.kind).to_json())
    };

    let mut update = DocumentUpdate::new();
    for field in schema.value_model_fields() {
        let raw = match document.get_field(&field.path) {
            None | Some(Value::Null) if is_threshold(&field) => {
                update.set(field.path.as_str(), default_of(&field));
                continue;
            }
            None | Some(Value::Null) => continue,
            Some(raw) => raw,
        };
        match ValueModel::load(field.kind, Some(raw)) {
            Ok(model) => {
                for note in ValueModel::coercion_notes(raw) {
                    diagnostics.push(format!("{}: {} {}", document.target(), field.path, note));
                }
                let rebuilt = model.to_json();
                if &rebuilt != raw {
                    update.set(field.path.as_str(), rebuilt);
                }
            }
            Err(err) => {
                diagnostics.push(format!(
                    "{}: {} reset to default ({})",
                    document.target(),
                    field.path,
                    err
                ));
                update.set(field.path.as_str(), default_of(&field));
            }
        }
    }
    update
}
