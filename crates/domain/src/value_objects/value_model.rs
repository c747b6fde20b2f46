//! ValueModel - base value, ordered modifiers and derived total
//!
//! The numeric and formula variants share one generic container,
//! [`ModifiedValue`], parameterized by how the total is resolved.
//! Stored shapes are read leniently: a bare primitive is upcast into a
//! ValueModel, missing keys fall back to defaults, and the stored `value`
//! is never trusted (it is always recomputed).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

use crate::error::DomainError;
use crate::resolver::{compute_formula_total, compute_numeric_total};
use crate::value_objects::{
    coerced_keys, parse_integer_prefix, FieldKind, Modifier, ModifierDraft, ModifierValue,
    PermanentModifierEntry,
};
use crate::ModifierId;

/// A dice/arithmetic formula string (`"1d8 +2"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Formula(String);

impl Formula {
    pub fn new(formula: impl Into<String>) -> Self {
        Self(formula.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Formula {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// The combination rule of a ValueModel variant.
pub trait Resolve: Clone + PartialEq + fmt::Debug + Serialize {
    const KIND: FieldKind;

    /// Derived total from a base and the ordered modifier list.
    fn resolve(base: &Self, modifiers: &[Modifier]) -> Self;

    /// Coerce a stored primitive. `None` when the value cannot be a base.
    fn coerce(raw: &Value) -> Option<Self>;

    fn default_base() -> Self;
}

impl Resolve for i64 {
    const KIND: FieldKind = FieldKind::Numeric;

    fn resolve(base: &Self, modifiers: &[Modifier]) -> Self {
        compute_numeric_total(*base, modifiers)
    }

    fn coerce(raw: &Value) -> Option<Self> {
        match raw {
            Value::Number(_) => Some(ModifierValue::from_json(raw).as_integer()),
            Value::String(s) => Some(parse_integer_prefix(s)),
            Value::Null => Some(0),
            _ => None,
        }
    }

    fn default_base() -> Self {
        0
    }
}

impl Resolve for Formula {
    const KIND: FieldKind = FieldKind::Formula;

    fn resolve(base: &Self, modifiers: &[Modifier]) -> Self {
        Formula(compute_formula_total(&base.0, modifiers))
    }

    fn coerce(raw: &Value) -> Option<Self> {
        match raw {
            Value::String(s) => Some(Formula(s.trim().to_string())),
            Value::Number(n) => Some(Formula(n.to_string())),
            Value::Null => Some(Formula::default()),
            _ => None,
        }
    }

    fn default_base() -> Self {
        Formula::default()
    }
}

/// `{baseValue, modifiers, value}` plus the field's permanent-modifier ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifiedValue<T> {
    pub(crate) base_value: T,
    #[serde(default)]
    pub(crate) modifiers: Vec<Modifier>,
    pub(crate) value: T,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) permanent_modifiers: Vec<PermanentModifierEntry>,
}

impl<T: Resolve> ModifiedValue<T> {
    /// A fresh ValueModel with no modifiers.
    pub fn new(base_value: T) -> Self {
        let value = base_value.clone();
        let mut model = Self {
            base_value,
            modifiers: Vec::new(),
            value,
            permanent_modifiers: Vec::new(),
        };
        model.recompute();
        model
    }

    /// Lenient read of a stored field without touching modifier ids.
    ///
    /// - absent or null: `TargetNotFound`
    /// - bare primitive: upcast to `baseValue`
    /// - object: missing `baseValue` falls back to `value`, then the default;
    ///   a non-list `modifiers` becomes empty; entries that are not objects
    ///   are dropped
    /// - anything else: `CorruptedShape`
    pub fn from_stored(raw: Option<&Value>) -> Result<Self, DomainError> {
        let raw = match raw {
            None | Some(Value::Null) => {
                return Err(DomainError::not_found("Field", "value model"));
            }
            Some(raw) => raw,
        };
        match raw {
            Value::Object(map) => Ok(Self::from_object(map)),
            primitive => T::coerce(primitive).map(Self::new).ok_or_else(|| {
                DomainError::corrupted(format!(
                    "cannot use {} as a {} value",
                    primitive,
                    T::KIND
                ))
            }),
        }
    }

    /// Read a stored field and repair blank or duplicate modifier ids.
    pub fn load(raw: Option<&Value>) -> Result<Self, DomainError> {
        let mut model = Self::from_stored(raw)?;
        model.ensure_ids();
        Ok(model)
    }

    fn from_object(map: &Map<String, Value>) -> Self {
        let base_value = map
            .get("baseValue")
            .filter(|v| !v.is_null())
            .and_then(T::coerce)
            .or_else(|| map.get("value").filter(|v| !v.is_null()).and_then(T::coerce))
            .unwrap_or_else(T::default_base);
        let modifiers = list_of::<Modifier>(map.get("modifiers"));
        let permanent_modifiers = list_of::<PermanentModifierEntry>(map.get("permanentModifiers"));
        let mut model = Self {
            value: base_value.clone(),
            base_value,
            modifiers,
            permanent_modifiers,
        };
        model.recompute();
        model
    }

    pub fn base_value(&self) -> &T {
        &self.base_value
    }

    /// The derived total.
    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    pub fn permanent_modifiers(&self) -> &[PermanentModifierEntry] {
        &self.permanent_modifiers
    }

    pub fn find(&self, id: &ModifierId) -> Option<&Modifier> {
        self.modifiers.iter().find(|m| m.id() == id)
    }

    pub(crate) fn find_mut(&mut self, id: &ModifierId) -> Option<&mut Modifier> {
        self.modifiers.iter_mut().find(|m| m.id() == id)
    }

    pub(crate) fn position(&self, id: &ModifierId) -> Option<usize> {
        self.modifiers.iter().position(|m| m.id() == id)
    }

    /// Recompute `value` from `baseValue` and the enabled modifiers.
    pub fn recompute(&mut self) {
        self.value = T::resolve(&self.base_value, &self.modifiers);
    }

    /// Whether the stored total agrees with the resolver.
    pub fn is_consistent(&self) -> bool {
        self.value == T::resolve(&self.base_value, &self.modifiers)
    }

    /// Replace the base value. Never touches the modifiers.
    pub fn set_base_value(&mut self, base_value: T) {
        self.base_value = base_value;
        self.recompute();
    }

    /// Assign fresh ids to blank or duplicated modifier ids.
    ///
    /// Returns how many ids were reassigned. A reassigned permanent modifier
    /// keeps a matching ledger entry only when the entry is re-tracked.
    pub fn ensure_ids(&mut self) -> usize {
        let mut seen = HashSet::new();
        let mut reassigned = 0;
        for modifier in &mut self.modifiers {
            if modifier.id().is_blank() || !seen.insert(modifier.id().clone()) {
                let id = ModifierId::new();
                seen.insert(id.clone());
                modifier.set_id(id);
                reassigned += 1;
            }
        }
        reassigned
    }

    pub fn to_json(&self) -> Value {
        // Serializing plain data with string keys cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn list_of<E: DeserializeOwned>(raw: Option<&Value>) -> Vec<E> {
    match raw {
        Some(Value::Array(items)) => items
            .iter()
            .filter(|item| item.is_object())
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
        _ => Vec::new(),
    }
}

/// Tagged union over the two ValueModel variants.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ValueModel {
    Numeric(ModifiedValue<i64>),
    Formula(ModifiedValue<Formula>),
}

macro_rules! dispatch {
    ($self:expr, $model:ident => $body:expr) => {
        match $self {
            ValueModel::Numeric($model) => $body,
            ValueModel::Formula($model) => $body,
        }
    };
}

impl ValueModel {
    /// Read a stored field of the given kind, upcasting bare primitives.
    pub fn load(kind: FieldKind, raw: Option<&Value>) -> Result<Self, DomainError> {
        Ok(match kind {
            FieldKind::Numeric => Self::Numeric(ModifiedValue::load(raw)?),
            FieldKind::Formula => Self::Formula(ModifiedValue::load(raw)?),
        })
    }

    /// Like [`ValueModel::load`] but leaves blank or duplicate ids alone.
    pub fn from_stored(kind: FieldKind, raw: Option<&Value>) -> Result<Self, DomainError> {
        Ok(match kind {
            FieldKind::Numeric => Self::Numeric(ModifiedValue::from_stored(raw)?),
            FieldKind::Formula => Self::Formula(ModifiedValue::from_stored(raw)?),
        })
    }

    /// What a read of `raw` has to coerce or drop, one note per entry.
    pub fn coercion_notes(raw: &Value) -> Vec<String> {
        let mut notes = Vec::new();
        for list in ["modifiers", "permanentModifiers"] {
            let entries = match raw.get(list) {
                None | Some(Value::Null) => continue,
                Some(Value::Array(entries)) => entries,
                Some(_) => {
                    notes.push(format!("{} is not a list, reset to empty", list));
                    continue;
                }
            };
            for (index, entry) in entries.iter().enumerate() {
                if !entry.is_object() {
                    notes.push(format!("{}[{}] dropped (not an object)", list, index));
                    continue;
                }
                let keys = coerced_keys(entry);
                if !keys.is_empty() {
                    notes.push(format!("{}[{}] coerced {}", list, index, keys.join(", ")));
                }
            }
        }
        notes
    }

    pub fn empty(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Numeric => Self::Numeric(ModifiedValue::new(0)),
            FieldKind::Formula => Self::Formula(ModifiedValue::new(Formula::default())),
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Numeric(_) => FieldKind::Numeric,
            Self::Formula(_) => FieldKind::Formula,
        }
    }

    pub fn modifiers(&self) -> &[Modifier] {
        dispatch!(self, model => model.modifiers())
    }

    pub fn permanent_modifiers(&self) -> &[PermanentModifierEntry] {
        dispatch!(self, model => model.permanent_modifiers())
    }

    pub fn find(&self, id: &ModifierId) -> Option<&Modifier> {
        dispatch!(self, model => model.find(id))
    }

    /// Total rendered for display (`"5"`, `"1d8 +2"`).
    pub fn total_display(&self) -> String {
        match self {
            Self::Numeric(model) => model.value().to_string(),
            Self::Formula(model) => model.value().to_string(),
        }
    }

    pub fn is_consistent(&self) -> bool {
        dispatch!(self, model => model.is_consistent())
    }

    pub fn add_modifier(&mut self, draft: ModifierDraft) -> Result<ModifierId, DomainError> {
        dispatch!(self, model => model.add_modifier(draft))
    }

    pub fn remove_modifier(
        &mut self,
        id: &ModifierId,
        force: bool,
    ) -> Result<Modifier, DomainError> {
        dispatch!(self, model => model.remove_modifier(id, force))
    }

    pub fn toggle_modifier(&mut self, id: &ModifierId, enabled: bool) -> Result<(), DomainError> {
        dispatch!(self, model => model.toggle_modifier(id, enabled))
    }

    pub fn rename_modifier(&mut self, id: &ModifierId, name: &str) -> Result<(), DomainError> {
        dispatch!(self, model => model.rename_modifier(id, name))
    }

    pub fn set_modifier_value(
        &mut self,
        id: &ModifierId,
        value: ModifierValue,
    ) -> Result<(), DomainError> {
        dispatch!(self, model => model.set_modifier_value(id, value))
    }

    /// Replace the base from a raw input value, coerced by kind.
    pub fn set_base_json(&mut self, raw: &Value) -> Result<(), DomainError> {
        match self {
            Self::Numeric(model) => {
                let base = i64::coerce(raw).ok_or_else(|| {
                    DomainError::corrupted(format!("cannot use {} as a numeric base", raw))
                })?;
                model.set_base_value(base);
            }
            Self::Formula(model) => {
                let base = Formula::coerce(raw).ok_or_else(|| {
                    DomainError::corrupted(format!("cannot use {} as a formula base", raw))
                })?;
                model.set_base_value(base);
            }
        }
        Ok(())
    }

    pub fn ensure_ids(&mut self) -> usize {
        dispatch!(self, model => model.ensure_ids())
    }

    pub fn backfill_permanent_entries(&mut self) -> usize {
        dispatch!(self, model => model.backfill_permanent_entries())
    }

    pub fn restore_permanent(&mut self) -> crate::tracker::RestoreReport {
        dispatch!(self, model => model.restore_permanent())
    }

    pub fn to_json(&self) -> Value {
        dispatch!(self, model => model.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_number_upcasts() {
        let model = ModifiedValue::<i64>::load(Some(&json!(8))).unwrap();
        assert_eq!(model.to_json(), json!({ "baseValue": 8, "modifiers": [], "value": 8 }));
    }

    #[test]
    fn test_upcast_is_idempotent() {
        let once = ModifiedValue::<i64>::load(Some(&json!(8))).unwrap().to_json();
        let twice = ModifiedValue::<i64>::load(Some(&once)).unwrap().to_json();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_bare_string_upcasts_to_formula() {
        let model = ModifiedValue::<Formula>::load(Some(&json!("2d6"))).unwrap();
        assert_eq!(model.base_value().as_str(), "2d6");
        assert_eq!(model.value().as_str(), "2d6");
    }

    #[test]
    fn test_stored_value_is_not_trusted() {
        let raw = json!({
            "baseValue": 2,
            "modifiers": [{ "id": "a", "value": 3, "enabled": true }],
            "value": 99
        });
        let model = ModifiedValue::<i64>::load(Some(&raw)).unwrap();
        assert_eq!(*model.value(), 5);
    }

    #[test]
    fn test_missing_base_falls_back_to_value() {
        let model = ModifiedValue::<i64>::load(Some(&json!({ "value": 7 }))).unwrap();
        assert_eq!(*model.base_value(), 7);
        assert!(model.modifiers().is_empty());
    }

    #[test]
    fn test_non_list_modifiers_reset() {
        let raw = json!({ "baseValue": 4, "modifiers": { "oops": true }, "value": 4 });
        let model = ModifiedValue::<i64>::load(Some(&raw)).unwrap();
        assert!(model.modifiers().is_empty());
        assert_eq!(*model.value(), 4);
    }

    #[test]
    fn test_absent_field_is_not_found() {
        let err = ModifiedValue::<i64>::load(None).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_array_is_corrupted() {
        let err = ModifiedValue::<i64>::load(Some(&json!([1, 2]))).unwrap_err();
        assert!(matches!(err, DomainError::CorruptedShape(_)));
    }

    #[test]
    fn test_load_repairs_blank_and_duplicate_ids() {
        let raw = json!({
            "baseValue": 0,
            "modifiers": [
                { "id": "a", "value": 1 },
                { "id": "a", "value": 2 },
                { "value": 3 }
            ],
            "value": 6
        });
        let model = ModifiedValue::<i64>::load(Some(&raw)).unwrap();
        let ids: HashSet<_> = model.modifiers().iter().map(|m| m.id().clone()).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(model.modifiers()[0].id().as_str(), "a");
    }

    #[test]
    fn test_serde_roundtrip_preserves_total() {
        let mut model = ModifiedValue::new(Formula::from("1d8"));
        model.add_modifier(ModifierDraft::new("Bonus", "2")).unwrap();
        let json = serde_json::to_string(&model).unwrap();
        let parsed: ModifiedValue<Formula> = serde_json::from_str(&json).unwrap();
        let mut recomputed = parsed.clone();
        recomputed.recompute();
        assert_eq!(recomputed.value(), model.value());
        assert_eq!(parsed, model);
    }

    #[test]
    fn test_value_model_dispatch() {
        let mut model = ValueModel::load(FieldKind::Numeric, Some(&json!(3))).unwrap();
        model.add_modifier(ModifierDraft::new("Ring", 2)).unwrap();
        assert_eq!(model.total_display(), "5");
        assert_eq!(model.kind(), FieldKind::Numeric);
        model.set_base_json(&json!("10")).unwrap();
        assert_eq!(model.total_display(), "12");
        assert!(model.set_base_json(&json!([1])).is_err());
    }

    #[test]
    fn test_loosely_typed_modifiers_survive_load() {
        let raw = json!({
            "baseValue": 6,
            "modifiers": [
                { "id": "lvl", "name": "Character Level", "value": 2, "enabled": null, "permanent": true },
                { "id": "ring", "value": true },
                "stray"
            ],
            "value": 6
        });
        let model = ModifiedValue::<i64>::load(Some(&raw)).unwrap();
        assert_eq!(model.modifiers().len(), 2);
        assert!(model.modifiers()[0].is_permanent());
        assert!(model.modifiers()[0].is_enabled());
        assert_eq!(*model.value(), 8);

        let notes = ValueModel::coercion_notes(&raw);
        assert_eq!(
            notes,
            vec![
                "modifiers[0] coerced enabled".to_string(),
                "modifiers[1] coerced value".to_string(),
                "modifiers[2] dropped (not an object)".to_string(),
            ]
        );
    }
}
