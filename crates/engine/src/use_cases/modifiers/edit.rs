//! Add, remove and toggle modifiers on a stored field.

use std::sync::Arc;

use dhsheet_domain::{DocumentRef, FieldRef, Modifier, ModifierDraft, ModifierId};

use crate::infrastructure::ports::DocumentRepo;

use super::error::ModifierError;
use super::modify_field;

pub struct AddModifier {
    repo: Arc<dyn DocumentRepo>,
}

impl AddModifier {
    pub fn new(repo: Arc<dyn DocumentRepo>) -> Self {
        Self { repo }
    }

    /// Append a modifier; a draft without id gets a generated one.
    pub async fn execute(
        &self,
        target: &DocumentRef,
        field: &FieldRef,
        draft: ModifierDraft,
    ) -> Result<ModifierId, ModifierError> {
        let id = modify_field(self.repo.as_ref(), target, field, |model| {
            model.add_modifier(draft)
        })
        .await?;
        tracing::info!(document_id = %target, field = %field, modifier_id = %id, "Added modifier");
        Ok(id)
    }
}

pub struct RemoveModifier {
    repo: Arc<dyn DocumentRepo>,
}

impl RemoveModifier {
    pub fn new(repo: Arc<dyn DocumentRepo>) -> Self {
        Self { repo }
    }

    /// Remove a modifier. Permanent modifiers need `force`.
    pub async fn execute(
        &self,
        target: &DocumentRef,
        field: &FieldRef,
        id: &ModifierId,
        force: bool,
    ) -> Result<Modifier, ModifierError> {
        let removed = modify_field(self.repo.as_ref(), target, field, |model| {
            model.remove_modifier(id, force)
        })
        .await?;
        tracing::info!(
            document_id = %target,
            field = %field,
            modifier_id = %id,
            forced = force && removed.is_permanent(),
            "Removed modifier"
        );
        Ok(removed)
    }
}

pub struct ToggleModifier {
    repo: Arc<dyn DocumentRepo>,
}

impl ToggleModifier {
    pub fn new(repo: Arc<dyn DocumentRepo>) -> Self {
        Self { repo }
    }

    pub async fn execute(
        &self,
        target: &DocumentRef,
        field: &FieldRef,
        id: &ModifierId,
        enabled: bool,
    ) -> Result<(), ModifierError> {
        modify_field(self.repo.as_ref(), target, field, |model| {
            model.toggle_modifier(id, enabled)
        })
        .await?;
        tracing::debug!(document_id = %target, field = %field, modifier_id = %id, enabled, "Toggled modifier");
        Ok(())
    }
}
