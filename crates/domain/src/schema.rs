//! Document schemas composed from templates
//!
//! Each template is a plain function returning a partial field map. A
//! [`SchemaBuilder`] merges templates left to right (later templates win on
//! the same path) into the [`DocumentSchema`] for one document type.

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use crate::entities::{set_path, Document, DocumentKind, RESOURCES_PATH};
use crate::value_objects::{FieldKind, FieldPath, FieldRef, KnownField, ValueModel};
use crate::DocumentId;

pub const DEFAULT_MAJOR_THRESHOLD: i64 = 6;
pub const DEFAULT_SEVERE_THRESHOLD: i64 = 12;
pub const DEFAULT_EVASION: i64 = 10;
pub const DEFAULT_DIFFICULTY: i64 = 10;
pub const DEFAULT_ITEM_LOCATION: &str = "backpack";

/// Default of one schema field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDefault {
    Plain(Value),
    /// A ValueModel field; `base` is upcast into `{baseValue, modifiers, value}`.
    ValueModel { kind: FieldKind, base: Value },
}

impl FieldDefault {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Plain(value) => value.clone(),
            Self::ValueModel { kind, base } => ValueModel::load(*kind, Some(base))
                .unwrap_or_else(|_| ValueModel::empty(*kind))
                .to_json(),
        }
    }
}

/// Partial schema: dotted path -> default.
pub type FieldMap = BTreeMap<&'static str, FieldDefault>;

fn value_model(field: KnownField, base: Value) -> (&'static str, FieldDefault) {
    (
        field.path(),
        FieldDefault::ValueModel {
            kind: field.kind(),
            base,
        },
    )
}

// ──────────────────────────────────────────────────────────────────────────────
// Templates
// ──────────────────────────────────────────────────────────────────────────────

pub fn description_template() -> FieldMap {
    FieldMap::from([("system.description", FieldDefault::Plain(json!("")))])
}

pub fn resources_template() -> FieldMap {
    FieldMap::from([(RESOURCES_PATH, FieldDefault::Plain(json!([])))])
}

pub fn level_template() -> FieldMap {
    FieldMap::from([("system.level", FieldDefault::Plain(json!(1)))])
}

pub fn threshold_template() -> FieldMap {
    FieldMap::from([
        value_model(KnownField::ThresholdMajor, json!(DEFAULT_MAJOR_THRESHOLD)),
        value_model(KnownField::ThresholdSevere, json!(DEFAULT_SEVERE_THRESHOLD)),
    ])
}

pub fn evasion_template() -> FieldMap {
    FieldMap::from([value_model(KnownField::Evasion, json!(DEFAULT_EVASION))])
}

pub fn difficulty_template() -> FieldMap {
    FieldMap::from([value_model(KnownField::Difficulty, json!(DEFAULT_DIFFICULTY))])
}

pub fn attack_template() -> FieldMap {
    FieldMap::from([
        value_model(KnownField::AttackModifier, json!(0)),
        value_model(KnownField::Damage, json!("")),
    ])
}

pub fn inventory_template(item_type: &str) -> FieldMap {
    let location = default_item_location(item_type).unwrap_or(DEFAULT_ITEM_LOCATION);
    FieldMap::from([("system.location", FieldDefault::Plain(json!(location)))])
}

pub fn equipment_template() -> FieldMap {
    FieldMap::from([("system.equipped", FieldDefault::Plain(json!(false)))])
}

/// Inventory location per item type. `None` for unknown types.
pub fn default_item_location(item_type: &str) -> Option<&'static str> {
    match item_type {
        "weapon" | "armor" | "consumable" | "miscellaneous" => Some("backpack"),
        "domainCard" => Some("vault"),
        "ancestry" | "community" | "class" | "subclass" | "feature" => Some("abilities"),
        _ => None,
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Builder
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    fields: FieldMap,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a template; its fields replace earlier ones on the same path.
    pub fn with(mut self, template: FieldMap) -> Self {
        self.fields.extend(template);
        self
    }

    pub fn build(self, kind: DocumentKind, document_type: impl Into<String>) -> DocumentSchema {
        DocumentSchema {
            kind,
            document_type: document_type.into(),
            fields: self.fields,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DocumentSchema {
    kind: DocumentKind,
    document_type: String,
    fields: FieldMap,
}

impl DocumentSchema {
    /// Schema of a document type. Unknown types get only the base template.
    pub fn for_type(kind: DocumentKind, document_type: &str) -> Self {
        let builder = SchemaBuilder::new().with(description_template());
        let builder = match (kind, document_type) {
            (DocumentKind::Actor, "character") => builder
                .with(resources_template())
                .with(level_template())
                .with(threshold_template())
                .with(evasion_template()),
            (DocumentKind::Actor, "companion") => builder
                .with(resources_template())
                .with(level_template())
                .with(evasion_template()),
            (DocumentKind::Actor, "adversary") => builder
                .with(resources_template())
                .with(difficulty_template())
                .with(attack_template()),
            (DocumentKind::Actor, "environment") => builder.with(difficulty_template()),
            (DocumentKind::Actor, _) => builder.with(resources_template()),
            (DocumentKind::Item, "weapon") => builder
                .with(inventory_template(document_type))
                .with(equipment_template())
                .with(attack_template()),
            (DocumentKind::Item, item_type) => builder.with(inventory_template(item_type)),
        };
        builder.build(kind, document_type)
    }

    pub fn for_document(document: &Document) -> Self {
        Self::for_type(document.kind(), document.document_type())
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn document_type(&self) -> &str {
        &self.document_type
    }

    pub fn default_of(&self, path: &str) -> Option<&FieldDefault> {
        self.fields.get(path)
    }

    /// Every ValueModel field declared for this type, in path order.
    pub fn value_model_fields(&self) -> Vec<FieldRef> {
        self.fields
            .iter()
            .filter_map(|(path, default)| match default {
                FieldDefault::ValueModel { kind, .. } => {
                    FieldPath::new(*path).ok().map(|p| FieldRef::new(p, *kind))
                }
                FieldDefault::Plain(_) => None,
            })
            .collect()
    }

    pub fn has_thresholds(&self) -> bool {
        KnownField::thresholds()
            .iter()
            .all(|f| self.fields.contains_key(f.path()))
    }

    /// Default `data` for a freshly created document of this type.
    pub fn default_data(&self) -> Map<String, Value> {
        let mut data = Map::new();
        for (path, default) in &self.fields {
            set_path(&mut data, path, default.to_value());
        }
        data
    }

    /// A new document of this type populated with schema defaults.
    pub fn instantiate(&self, id: DocumentId, name: impl Into<String>) -> Document {
        self.default_data().into_iter().fold(
            Document::new(id, self.kind, self.document_type.clone(), name),
            |document, (key, value)| document.with_data(&key, value),
        )
    }
}
