//! Version-gated document transforms
//!
//! Every step is idempotent: it inspects the document as left by the
//! previous steps and returns `Ok(None)` when there is nothing to do.

use serde_json::{json, Value};

use crate::entities::{Document, DocumentKind, DocumentUpdate};
use crate::error::DomainError;
use crate::schema::{
    default_item_location, DocumentSchema, DEFAULT_ITEM_LOCATION, DEFAULT_MAJOR_THRESHOLD,
    DEFAULT_SEVERE_THRESHOLD,
};
use crate::value_objects::{KnownField, ModifiedValue, ValueModel, Version};

use super::MigrationStep;

pub const ITEM_LOCATION: &str = "item-location";
pub const WEAPON_EQUIPPED: &str = "weapon-equipped";
pub const DAMAGE_TO_VALUE_MODEL: &str = "damage-to-value-model";
pub const THRESHOLD_VALUE_MODELS: &str = "threshold-value-models";
pub const MODIFIER_IDS: &str = "modifier-ids";
pub const DEFENSE_VALUE_MODELS: &str = "defense-value-models";

/// The shipped steps in ascending gate order.
pub fn standard_steps() -> Vec<MigrationStep> {
    vec![
        MigrationStep::new(Version::new(1, 1, 0), ITEM_LOCATION, item_location),
        MigrationStep::new(Version::new(1, 1, 0), WEAPON_EQUIPPED, weapon_equipped),
        MigrationStep::new(Version::new(1, 2, 0), DAMAGE_TO_VALUE_MODEL, damage_to_value_model),
        MigrationStep::new(Version::new(1, 2, 0), THRESHOLD_VALUE_MODELS, threshold_value_models),
        MigrationStep::new(Version::new(1, 2, 5), MODIFIER_IDS, modifier_ids),
        MigrationStep::new(Version::new(1, 3, 0), DEFENSE_VALUE_MODELS, defense_value_models),
    ]
}

fn non_empty(update: DocumentUpdate) -> Option<DocumentUpdate> {
    (!update.is_empty()).then_some(update)
}

fn is_actor_of(document: &Document, types: &[&str]) -> bool {
    document.kind() == DocumentKind::Actor && types.contains(&document.document_type())
}

fn is_item_of(document: &Document, types: &[&str]) -> bool {
    document.kind() == DocumentKind::Item && types.contains(&document.document_type())
}

/// Upcast a bare primitive at a known field into a ValueModel.
///
/// Absent fields and fields already holding an object are left alone; a
/// null is replaced by the schema default. Values that cannot be coerced
/// fail the step.
fn upcast_field(
    document: &Document,
    field: KnownField,
    step: &'static str,
) -> Result<Option<Value>, DomainError> {
    match document.get(field.path()) {
        None | Some(Value::Object(_)) => Ok(None),
        Some(Value::Null) => Ok(DocumentSchema::for_document(document)
            .default_of(field.path())
            .map(|default| default.to_value())),
        Some(raw) => ValueModel::load(field.kind(), Some(raw))
            .map(|model| Some(model.to_json()))
            .map_err(|err| DomainError::step_failed(step, format!("{}: {}", field.path(), err))),
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// 1.1.0
// ──────────────────────────────────────────────────────────────────────────────

pub fn item_location(
    document: &Document,
    diagnostics: &mut Vec<String>,
) -> Result<Option<DocumentUpdate>, DomainError> {
    if document.kind() != DocumentKind::Item {
        return Ok(None);
    }
    let has_location = document
        .get("system.location")
        .and_then(Value::as_str)
        .is_some_and(|location| !location.is_empty());
    if has_location {
        return Ok(None);
    }
    let location = default_item_location(document.document_type()).unwrap_or_else(|| {
        diagnostics.push(format!(
            "{}: unknown item type '{}', using '{}'",
            document.target(),
            document.document_type(),
            DEFAULT_ITEM_LOCATION
        ));
        DEFAULT_ITEM_LOCATION
    });
    Ok(Some(
        DocumentUpdate::new().with("system.location", json!(location)),
    ))
}

pub fn weapon_equipped(
    document: &Document,
    _diagnostics: &mut Vec<String>,
) -> Result<Option<DocumentUpdate>, DomainError> {
    if !is_item_of(document, &["weapon"]) || document.get("system.equipped").is_some() {
        return Ok(None);
    }
    Ok(Some(
        DocumentUpdate::new().with("system.equipped", json!(false)),
    ))
}

// ──────────────────────────────────────────────────────────────────────────────
// 1.2.0
// ──────────────────────────────────────────────────────────────────────────────

pub fn damage_to_value_model(
    document: &Document,
    _diagnostics: &mut Vec<String>,
) -> Result<Option<DocumentUpdate>, DomainError> {
    if !is_item_of(document, &["weapon"]) && !is_actor_of(document, &["adversary"]) {
        return Ok(None);
    }
    let mut update = DocumentUpdate::new();
    for field in [KnownField::AttackModifier, KnownField::Damage] {
        if let Some(value) = upcast_field(document, field, DAMAGE_TO_VALUE_MODEL)? {
            update.set(field.path(), value);
        }
    }
    Ok(non_empty(update))
}

pub fn threshold_value_models(
    document: &Document,
    diagnostics: &mut Vec<String>,
) -> Result<Option<DocumentUpdate>, DomainError> {
    if !is_actor_of(document, &["character"]) {
        return Ok(None);
    }
    let mut update = DocumentUpdate::new();
    for (field, default) in [
        (KnownField::ThresholdMajor, DEFAULT_MAJOR_THRESHOLD),
        (KnownField::ThresholdSevere, DEFAULT_SEVERE_THRESHOLD),
    ] {
        let path = field.path();
        let model = match document.get(path) {
            None | Some(Value::Null) => ModifiedValue::new(default),
            Some(Value::Object(map)) => {
                let degenerate = map.get("baseValue").and_then(Value::as_i64) == Some(0)
                    && map.get("value").and_then(Value::as_i64) == Some(0);
                if !degenerate {
                    continue;
                }
                diagnostics.push(format!(
                    "{}: {} was zeroed, reset base to {}",
                    document.target(),
                    path,
                    default
                ));
                let mut model = ModifiedValue::<i64>::load(document.get(path))
                    .map_err(|err| DomainError::step_failed(THRESHOLD_VALUE_MODELS, err))?;
                model.set_base_value(default);
                model
            }
            Some(raw) => ModifiedValue::<i64>::load(Some(raw)).map_err(|err| {
                DomainError::step_failed(THRESHOLD_VALUE_MODELS, format!("{}: {}", path, err))
            })?,
        };
        update.set(path, model.to_json());
    }
    Ok(non_empty(update))
}

// ──────────────────────────────────────────────────────────────────────────────
// 1.2.5
// ──────────────────────────────────────────────────────────────────────────────

pub fn modifier_ids(
    document: &Document,
    _diagnostics: &mut Vec<String>,
) -> Result<Option<DocumentUpdate>, DomainError> {
    let mut update = DocumentUpdate::new();
    for field in DocumentSchema::for_document(document).value_model_fields() {
        let Some(raw) = document.get_field(&field.path).filter(|raw| raw.is_object()) else {
            continue;
        };
        let mut model = ValueModel::from_stored(field.kind, Some(raw))
            .map_err(|err| DomainError::step_failed(MODIFIER_IDS, err))?;
        let reassigned = model.ensure_ids();
        let tracked = model.backfill_permanent_entries();
        if reassigned + tracked > 0 {
            update.set(field.path.as_str(), model.to_json());
        }
    }
    Ok(non_empty(update))
}

// ──────────────────────────────────────────────────────────────────────────────
// 1.3.0
// ──────────────────────────────────────────────────────────────────────────────

pub fn defense_value_models(
    document: &Document,
    _diagnostics: &mut Vec<String>,
) -> Result<Option<DocumentUpdate>, DomainError> {
    let field = if is_actor_of(document, &["adversary", "environment"]) {
        KnownField::Difficulty
    } else if is_actor_of(document, &["character", "companion"]) {
        KnownField::Evasion
    } else {
        return Ok(None);
    };
    Ok(upcast_field(document, field, DEFENSE_VALUE_MODELS)?
        .map(|value| DocumentUpdate::new().with(field.path(), value)))
}
