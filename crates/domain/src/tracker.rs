//! Permanent modifier tracking
//!
//! Each ValueModel field keeps a `permanentModifiers` ledger beside its
//! `modifiers`. The ledger is the source of truth for system-managed
//! modifiers: `restore` re-inserts any tracked modifier that went missing,
//! and Character Level is kept in sync on both damage thresholds.

use serde_json::json;

use crate::entities::{Document, DocumentUpdate};
use crate::error::DomainError;
use crate::schema::DocumentSchema;
use crate::value_objects::{
    FieldPath, KnownField, ModifiedValue, Modifier, ModifierValue, Resolve, ValueModel,
};
use crate::ModifierId;

pub const CHARACTER_LEVEL_NAME: &str = "Character Level";

/// Path of the character level on actor documents.
pub const LEVEL_PATH: &str = "system.level";

/// What one `restore` pass did to a field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestoreReport {
    pub restored: Vec<ModifierId>,
    /// Names of ledger entries skipped because a permanent modifier with the
    /// same name (but another id) is already present.
    pub name_collisions: Vec<String>,
}

impl RestoreReport {
    pub fn changed(&self) -> bool {
        !self.restored.is_empty()
    }
}

impl<T: Resolve> ModifiedValue<T> {
    /// Re-insert tracked permanent modifiers missing from `modifiers`.
    ///
    /// Idempotent: a second pass finds every entry present by id.
    pub fn restore_permanent(&mut self) -> RestoreReport {
        let mut report = RestoreReport::default();
        for entry in &self.permanent_modifiers {
            if self.modifiers.iter().any(|m| m.id() == &entry.id) {
                continue;
            }
            if self
                .modifiers
                .iter()
                .any(|m| m.is_permanent() && m.name() == entry.name)
            {
                report.name_collisions.push(entry.name.clone());
                continue;
            }
            self.modifiers.push(Modifier::from_entry(entry));
            report.restored.push(entry.id.clone());
        }
        if report.changed() {
            self.recompute();
        }
        report
    }

    /// Track permanent modifiers that have no ledger entry yet.
    pub fn backfill_permanent_entries(&mut self) -> usize {
        let missing: Vec<_> = self
            .modifiers
            .iter()
            .filter(|m| m.is_permanent())
            .filter(|m| !self.permanent_modifiers.iter().any(|e| &e.id == m.id()))
            .map(Modifier::to_entry)
            .collect();
        let count = missing.len();
        self.permanent_modifiers.extend(missing);
        count
    }

    /// Update the permanent modifier matching `id` (or, failing that, a
    /// permanent modifier named `name`) in place; insert it when absent.
    ///
    /// Extra permanent modifiers with the same name are dropped so the field
    /// never carries duplicates. Returns whether anything changed.
    pub fn upsert_permanent(&mut self, id: &ModifierId, name: &str, value: ModifierValue) -> bool {
        let before = self.clone();

        let matched = self
            .position(id)
            .or_else(|| {
                self.modifiers
                    .iter()
                    .position(|m| m.is_permanent() && m.name() == name)
            });
        let kept_id = match matched {
            Some(index) => {
                let modifier = &mut self.modifiers[index];
                modifier.set_value(value.clone());
                modifier.set_enabled(true);
                modifier.id().clone()
            }
            None => {
                self.modifiers
                    .push(Modifier::permanent(id.clone(), name, value.clone()));
                id.clone()
            }
        };
        self.modifiers
            .retain(|m| m.id() == &kept_id || !(m.is_permanent() && m.name() == name));

        let entry_index = self
            .permanent_modifiers
            .iter()
            .position(|e| e.id == kept_id)
            .or_else(|| self.permanent_modifiers.iter().position(|e| e.name == name));
        match entry_index {
            Some(index) => {
                let entry = &mut self.permanent_modifiers[index];
                entry.id = kept_id.clone();
                entry.value = value;
                entry.enabled = true;
            }
            None => {
                if let Some(modifier) = self.find(&kept_id) {
                    let entry = modifier.to_entry();
                    self.permanent_modifiers.push(entry);
                }
            }
        }
        self.permanent_modifiers
            .retain(|e| e.id == kept_id || e.name != name);

        self.recompute();
        *self != before
    }
}

/// Deterministic Character Level modifier id for a field path.
pub fn character_level_modifier_id(path: &FieldPath) -> ModifierId {
    ModifierId::from(format!(
        "character-level-{}",
        path.as_str().replace('.', "-")
    ))
}

/// Result of restoring every field of a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentRestore {
    pub update: DocumentUpdate,
    pub restored: usize,
    pub warnings: Vec<String>,
}

/// Run `restore` over every ValueModel field the document's schema declares.
///
/// Absent fields are skipped; fields that cannot be read produce a warning
/// and are left for the migration safety scan.
pub fn restore_document(document: &Document) -> DocumentRestore {
    let mut result = DocumentRestore::default();
    for field in DocumentSchema::for_document(document).value_model_fields() {
        let Some(raw) = document.get_field(&field.path) else {
            continue;
        };
        let mut model = match ValueModel::load(field.kind, Some(raw)) {
            Ok(model) => model,
            Err(err) => {
                result
                    .warnings
                    .push(format!("{}: skipped restore ({})", field.path, err));
                continue;
            }
        };
        let report = model.restore_permanent();
        for name in &report.name_collisions {
            result.warnings.push(format!(
                "{}: permanent modifier '{}' already present under another id",
                field.path, name
            ));
        }
        if report.changed() {
            result.restored += report.restored.len();
            result.update.set(field.path.as_str(), model.to_json());
        }
    }
    result
}

/// Stage the Character Level modifier (value = `level`) on both thresholds.
///
/// Missing thresholds are created from schema defaults. The returned update
/// also records the new level.
pub fn sync_character_level(document: &Document, level: i64) -> Result<DocumentUpdate, DomainError> {
    let schema = DocumentSchema::for_document(document);
    if !schema.has_thresholds() {
        return Err(DomainError::not_found(
            "Threshold field",
            format!("{} ({})", document.id(), document.document_type()),
        ));
    }

    let mut update = DocumentUpdate::new();
    if document.get_i64(LEVEL_PATH) != Some(level) {
        update.set(LEVEL_PATH, json!(level));
    }
    for field in KnownField::thresholds() {
        let field = field.field_ref();
        let mut model = match document.get_field(&field.path) {
            Some(raw) => ModifiedValue::<i64>::load(Some(raw))?,
            None => {
                let default = schema
                    .default_of(field.path.as_str())
                    .map(|d| d.to_value())
                    .unwrap_or_default();
                ModifiedValue::<i64>::load(Some(&default))?
            }
        };
        let id = character_level_modifier_id(&field.path);
        let changed = model.upsert_permanent(&id, CHARACTER_LEVEL_NAME, ModifierValue::from(level));
        if changed || document.get_field(&field.path).is_none() {
            update.set(field.path.as_str(), model.to_json());
        }
    }
    Ok(update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::ModifierDraft;
    use serde_json::json;

    fn character(system: serde_json::Value) -> Document {
        Document::from_json(json!({
            "_id": "pc1",
            "kind": "actor",
            "type": "character",
            "name": "Rook",
            "system": system
        }))
        .unwrap()
    }

    #[test]
    fn test_restore_reinserts_missing_permanent() {
        let raw = json!({
            "baseValue": 6,
            "modifiers": [],
            "value": 6,
            "permanentModifiers": [
                { "id": "lvl", "name": "Character Level", "value": 2, "enabled": true }
            ]
        });
        let mut model = ModifiedValue::<i64>::load(Some(&raw)).unwrap();
        let report = model.restore_permanent();
        assert_eq!(report.restored, vec![ModifierId::from("lvl")]);
        assert_eq!(*model.value(), 8);
        assert!(model.modifiers()[0].is_permanent());
    }

    #[test]
    fn test_restore_skips_name_collision() {
        let raw = json!({
            "baseValue": 6,
            "modifiers": [
                { "id": "new-scheme", "name": "Character Level", "value": 2, "permanent": true }
            ],
            "value": 8,
            "permanentModifiers": [
                { "id": "old-scheme", "name": "Character Level", "value": 2 }
            ]
        });
        let mut model = ModifiedValue::<i64>::load(Some(&raw)).unwrap();
        let report = model.restore_permanent();
        assert!(!report.changed());
        assert_eq!(report.name_collisions, vec!["Character Level".to_string()]);
        assert_eq!(model.modifiers().len(), 1);
    }

    #[test]
    fn test_restore_is_idempotent() {
        let doc = character(json!({
            "threshold": {
                "major": {
                    "baseValue": 6,
                    "modifiers": [{ "id": "u1", "name": "Ring", "value": 1 }],
                    "value": 7,
                    "permanentModifiers": [
                        { "id": "lvl", "name": "Character Level", "value": 3, "enabled": true }
                    ]
                }
            }
        }));
        let first = restore_document(&doc);
        assert_eq!(first.restored, 1);
        let mut once = doc.clone();
        once.apply(&first.update);
        assert_eq!(once.get("system.threshold.major.value"), Some(&json!(10)));

        let second = restore_document(&once);
        assert!(second.update.is_empty());
        let mut twice = once.clone();
        twice.apply(&second.update);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_backfill_tracks_untracked_permanent() {
        let raw = json!({
            "baseValue": 1,
            "modifiers": [
                { "id": "p", "name": "Armor", "value": 1, "permanent": true },
                { "id": "u", "name": "Ring", "value": 1 }
            ],
            "value": 3
        });
        let mut model = ModifiedValue::<i64>::load(Some(&raw)).unwrap();
        assert_eq!(model.backfill_permanent_entries(), 1);
        assert_eq!(model.backfill_permanent_entries(), 0);
        assert_eq!(model.permanent_modifiers()[0].id, ModifierId::from("p"));
    }

    #[test]
    fn test_level_id_is_derived_from_path() {
        let path = KnownField::ThresholdMajor.field_ref().path;
        assert_eq!(
            character_level_modifier_id(&path).as_str(),
            "character-level-system-threshold-major"
        );
    }

    #[test]
    fn test_scenario_level_change_updates_both_thresholds() {
        let mut doc = character(json!({
            "level": 2,
            "threshold": { "major": 6, "severe": 12 }
        }));
        let update = sync_character_level(&doc, 2).unwrap();
        doc.apply(&update);
        assert_eq!(doc.get("system.threshold.major.value"), Some(&json!(8)));

        let update = sync_character_level(&doc, 3).unwrap();
        doc.apply(&update);
        assert_eq!(doc.get("system.level"), Some(&json!(3)));
        for field in KnownField::thresholds() {
            let raw = doc.get(field.path()).unwrap();
            let model = ModifiedValue::<i64>::load(Some(raw)).unwrap();
            let levels: Vec<_> = model
                .modifiers()
                .iter()
                .filter(|m| m.name() == CHARACTER_LEVEL_NAME)
                .collect();
            assert_eq!(levels.len(), 1);
            assert_eq!(levels[0].value().as_integer(), 3);
            assert_eq!(model.permanent_modifiers().len(), 1);
            assert_eq!(model.permanent_modifiers()[0].value.as_integer(), 3);
        }
        assert_eq!(doc.get("system.threshold.major.value"), Some(&json!(9)));
        assert_eq!(doc.get("system.threshold.severe.value"), Some(&json!(15)));
    }

    #[test]
    fn test_level_sync_matches_by_name_when_id_differs() {
        let mut model = ModifiedValue::new(6i64);
        model
            .add_modifier(
                ModifierDraft::new(CHARACTER_LEVEL_NAME, 1)
                    .with_id(ModifierId::from("legacy"))
                    .permanent(),
            )
            .unwrap();
        let id = ModifierId::from("character-level-system-threshold-major");
        assert!(model.upsert_permanent(&id, CHARACTER_LEVEL_NAME, ModifierValue::from(4)));
        assert_eq!(model.modifiers().len(), 1);
        assert_eq!(model.modifiers()[0].id().as_str(), "legacy");
        assert_eq!(*model.value(), 10);
        assert!(!model.upsert_permanent(&id, CHARACTER_LEVEL_NAME, ModifierValue::from(4)));
    }

    #[test]
    fn test_level_sync_requires_thresholds() {
        let doc = Document::from_json(json!({
            "_id": "env1", "kind": "actor", "type": "environment", "system": {}
        }))
        .unwrap();
        assert!(sync_character_level(&doc, 2).unwrap_err().is_not_found());
    }

    #[test]
    fn test_restore_document_warns_on_unreadable_field() {
        let doc = character(json!({ "threshold": { "major": [1, 2] } }));
        let restore = restore_document(&doc);
        assert!(restore.update.is_empty());
        assert_eq!(restore.warnings.len(), 1);
        assert!(restore.warnings[0].contains("system.threshold.major"));
    }
}
