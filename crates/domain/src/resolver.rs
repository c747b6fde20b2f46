//! Modifier resolution - totals and list management for ValueModels
//!
//! Totals are pure functions of the base value and the ordered modifier
//! list. Every mutating operation recomputes the total before returning,
//! so `value` always agrees with the resolver.

use crate::error::DomainError;
use crate::value_objects::{ModifiedValue, Modifier, ModifierDraft, ModifierValue, Resolve};
use crate::ModifierId;

/// Base formula used when a formula field has an empty base.
pub const DEFAULT_FORMULA: &str = "1d8";

/// `base` plus every enabled modifier's integer value.
///
/// Malformed or missing modifier values count as 0.
pub fn compute_numeric_total(base: i64, modifiers: &[Modifier]) -> i64 {
    modifiers
        .iter()
        .filter(|m| m.is_enabled())
        .map(|m| m.value().as_integer())
        .fold(base, i64::saturating_add)
}

/// `base` followed by each enabled, non-empty modifier term in list order.
pub fn compute_formula_total(base: &str, modifiers: &[Modifier]) -> String {
    let base = base.trim();
    let mut total = if base.is_empty() {
        DEFAULT_FORMULA.to_string()
    } else {
        base.to_string()
    };
    for term in modifiers
        .iter()
        .filter(|m| m.is_enabled())
        .filter_map(|m| m.value().as_term())
    {
        total.push(' ');
        total.push_str(&term);
    }
    total
}

impl<T: Resolve> ModifiedValue<T> {
    /// Append a modifier, generating an id when the draft has none.
    ///
    /// Permanent drafts are also recorded in the field's ledger. Rejects a
    /// duplicate id, and for permanent drafts a permanent modifier that
    /// already carries the same name.
    pub fn add_modifier(&mut self, draft: ModifierDraft) -> Result<ModifierId, DomainError> {
        let id = match draft.id.clone() {
            Some(id) if !id.is_blank() => id,
            _ => ModifierId::new(),
        };

        if self.find(&id).is_some() {
            return Err(DomainError::duplicate(format!("id {}", id)));
        }
        if draft.permanent {
            if self.permanent_modifiers.iter().any(|e| e.id == id) {
                return Err(DomainError::duplicate(format!("tracked id {}", id)));
            }
            if self
                .modifiers
                .iter()
                .any(|m| m.is_permanent() && m.name() == draft.name)
            {
                return Err(DomainError::duplicate(format!(
                    "permanent modifier '{}'",
                    draft.name
                )));
            }
        }

        let modifier = Modifier::from_draft(id.clone(), draft);
        if modifier.is_permanent() {
            self.permanent_modifiers.push(modifier.to_entry());
        }
        self.modifiers.push(modifier);
        self.recompute();
        Ok(id)
    }

    /// Remove a modifier. Permanent modifiers need `force`.
    pub fn remove_modifier(&mut self, id: &ModifierId, force: bool) -> Result<Modifier, DomainError> {
        let index = self
            .position(id)
            .ok_or_else(|| DomainError::not_found("Modifier", id))?;
        if self.modifiers[index].is_permanent() && !force {
            return Err(DomainError::protected(id));
        }
        let removed = self.modifiers.remove(index);
        if removed.is_permanent() {
            self.permanent_modifiers.retain(|entry| &entry.id != id);
        }
        self.recompute();
        Ok(removed)
    }

    /// Enable or disable a modifier. Permanent modifiers are always rejected.
    pub fn toggle_modifier(&mut self, id: &ModifierId, enabled: bool) -> Result<(), DomainError> {
        let modifier = self
            .find_mut(id)
            .ok_or_else(|| DomainError::not_found("Modifier", id))?;
        if modifier.is_permanent() {
            return Err(DomainError::protected(id));
        }
        modifier.set_enabled(enabled);
        self.recompute();
        Ok(())
    }

    pub fn rename_modifier(&mut self, id: &ModifierId, name: &str) -> Result<(), DomainError> {
        let modifier = self
            .find_mut(id)
            .ok_or_else(|| DomainError::not_found("Modifier", id))?;
        modifier.set_name(name);
        if let Some(entry) = self.permanent_modifiers.iter_mut().find(|e| &e.id == id) {
            entry.name = name.to_string();
        }
        Ok(())
    }

    pub fn set_modifier_value(
        &mut self,
        id: &ModifierId,
        value: ModifierValue,
    ) -> Result<(), DomainError> {
        let modifier = self
            .find_mut(id)
            .ok_or_else(|| DomainError::not_found("Modifier", id))?;
        modifier.set_value(value.clone());
        if let Some(entry) = self.permanent_modifiers.iter_mut().find(|e| &e.id == id) {
            entry.value = value;
        }
        self.recompute();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::Formula;

    fn numeric(base: i64, modifiers: Vec<Modifier>) -> ModifiedValue<i64> {
        let mut model = ModifiedValue::new(base);
        for modifier in modifiers {
            model.modifiers.push(modifier);
        }
        model.recompute();
        model
    }

    #[test]
    fn test_scenario_disabled_modifier_excluded() {
        let model = numeric(
            2,
            vec![
                Modifier::new("Blessing", 3),
                Modifier::new("Curse", -1).with_enabled(false),
            ],
        );
        assert_eq!(*model.value(), 5);
    }

    #[test]
    fn test_scenario_formula_join() {
        let modifiers = vec![Modifier::new("Sharp", "2"), Modifier::new("Dull", "-1d4")];
        assert_eq!(compute_formula_total("1d8", &modifiers), "1d8 +2 -1d4");
    }

    #[test]
    fn test_formula_keeps_insertion_order() {
        let modifiers = vec![
            Modifier::new("b", "1d6"),
            Modifier::new("a", "+1"),
            Modifier::new("skip", ""),
        ];
        assert_eq!(compute_formula_total("2d10", &modifiers), "2d10 +1d6 +1");
    }

    #[test]
    fn test_formula_falls_back_when_base_empty() {
        assert_eq!(compute_formula_total("  ", &[]), DEFAULT_FORMULA);
        let modifiers = vec![Modifier::new("Bonus", 1)];
        assert_eq!(compute_formula_total("", &modifiers), "1d8 +1");
    }

    #[test]
    fn test_formula_skips_numeric_zero() {
        let modifiers = vec![Modifier::new("Nothing", 0), Modifier::new("Edge", 1)];
        assert_eq!(compute_formula_total("1d8", &modifiers), "1d8 +1");
    }

    #[test]
    fn test_numeric_total_treats_malformed_as_zero() {
        let modifiers = vec![
            Modifier::new("bad", "abc"),
            Modifier::new("empty", ModifierValue::Empty),
            Modifier::new("ok", "4"),
        ];
        assert_eq!(compute_numeric_total(1, &modifiers), 5);
    }

    #[test]
    fn test_add_assigns_id_and_recomputes() {
        let mut model = ModifiedValue::new(2i64);
        let id = model.add_modifier(ModifierDraft::new("Ring", 3)).unwrap();
        assert!(!id.is_blank());
        assert_eq!(*model.value(), 5);
        assert_eq!(*model.base_value(), 2);
        assert!(model.permanent_modifiers().is_empty());
    }

    #[test]
    fn test_add_rejects_duplicate_id() {
        let mut model = ModifiedValue::new(0i64);
        let id = ModifierId::from("dup");
        model
            .add_modifier(ModifierDraft::new("a", 1).with_id(id.clone()))
            .unwrap();
        let err = model
            .add_modifier(ModifierDraft::new("b", 1).with_id(id))
            .unwrap_err();
        assert!(matches!(err, DomainError::DuplicateModifier(_)));
        assert_eq!(model.modifiers().len(), 1);
    }

    #[test]
    fn test_add_permanent_tracks_entry() {
        let mut model = ModifiedValue::new(6i64);
        let id = model
            .add_modifier(ModifierDraft::new("Armor", 1).permanent())
            .unwrap();
        assert_eq!(model.permanent_modifiers().len(), 1);
        assert_eq!(model.permanent_modifiers()[0].id, id);
        let err = model
            .add_modifier(ModifierDraft::new("Armor", 2).permanent())
            .unwrap_err();
        assert!(matches!(err, DomainError::DuplicateModifier(_)));
    }

    #[test]
    fn test_scenario_remove_permanent_without_force_is_protected() {
        let mut model = ModifiedValue::new(6i64);
        let id = model
            .add_modifier(ModifierDraft::new("Character Level", 2).permanent())
            .unwrap();
        let before = model.clone();
        let err = model.remove_modifier(&id, false).unwrap_err();
        assert!(err.is_protected());
        assert_eq!(model, before);
    }

    #[test]
    fn test_forced_remove_drops_ledger_entry() {
        let mut model = ModifiedValue::new(6i64);
        let id = model
            .add_modifier(ModifierDraft::new("Character Level", 2).permanent())
            .unwrap();
        model.remove_modifier(&id, true).unwrap();
        assert!(model.modifiers().is_empty());
        assert!(model.permanent_modifiers().is_empty());
        assert_eq!(*model.value(), 6);
    }

    #[test]
    fn test_remove_unknown_is_not_found() {
        let mut model = ModifiedValue::new(0i64);
        let err = model.remove_modifier(&ModifierId::from("x"), true).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_toggle_recomputes_and_rejects_permanent() {
        let mut model = ModifiedValue::new(Formula::from("1d8"));
        let user = model.add_modifier(ModifierDraft::new("Sharp", "2")).unwrap();
        let fixed = model
            .add_modifier(ModifierDraft::new("Proficiency", "1").permanent())
            .unwrap();
        model.toggle_modifier(&user, false).unwrap();
        assert_eq!(model.value().as_str(), "1d8 +1");
        assert!(model.toggle_modifier(&fixed, false).unwrap_err().is_protected());
        assert!(model.toggle_modifier(&fixed, true).unwrap_err().is_protected());
        assert!(model.is_consistent());
    }

    #[test]
    fn test_invariant_holds_after_every_operation() {
        let mut model = ModifiedValue::new(1i64);
        let a = model.add_modifier(ModifierDraft::new("a", 2)).unwrap();
        assert!(model.is_consistent());
        let b = model.add_modifier(ModifierDraft::new("b", "x")).unwrap();
        assert!(model.is_consistent());
        model.toggle_modifier(&a, false).unwrap();
        assert!(model.is_consistent());
        model.set_modifier_value(&b, ModifierValue::from(5)).unwrap();
        assert!(model.is_consistent());
        model.remove_modifier(&a, false).unwrap();
        assert!(model.is_consistent());
        assert_eq!(*model.value(), 6);
    }

    #[test]
    fn test_edits_on_permanent_keep_ledger_in_sync() {
        let mut model = ModifiedValue::new(0i64);
        let id = model
            .add_modifier(ModifierDraft::new("Level", 1).permanent())
            .unwrap();
        model.rename_modifier(&id, "Character Level").unwrap();
        model.set_modifier_value(&id, ModifierValue::from(3)).unwrap();
        let entry = &model.permanent_modifiers()[0];
        assert_eq!(entry.name, "Character Level");
        assert_eq!(entry.value.as_integer(), 3);
    }
}
