//! Modifier editor state machine
//!
//! `Idle -> Loaded(field, snapshot) -> Idle`. Only one field can be staged
//! at a time; row edits touch the in-memory snapshot only, and `commit`
//! hands back the final ValueModel for a single persistence write.

use serde_json::Value;

use crate::error::DomainError;
use crate::value_objects::{FieldRef, ModifierDraft, ModifierValue, ValueModel};
use crate::ModifierId;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum EditorState {
    #[default]
    Idle,
    Loaded {
        field: FieldRef,
        snapshot: ValueModel,
    },
}

#[derive(Debug, Clone, Default)]
pub struct ModifierEditor {
    state: EditorState,
}

impl ModifierEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, EditorState::Idle)
    }

    pub fn loaded_field(&self) -> Option<&FieldRef> {
        match &self.state {
            EditorState::Loaded { field, .. } => Some(field),
            EditorState::Idle => None,
        }
    }

    pub fn snapshot(&self) -> Option<&ValueModel> {
        match &self.state {
            EditorState::Loaded { snapshot, .. } => Some(snapshot),
            EditorState::Idle => None,
        }
    }

    /// Stage `field` from its stored value.
    ///
    /// Loading the field that is already staged keeps the current snapshot.
    /// Loading a different field while one is staged fails with `EditorBusy`.
    pub fn load(&mut self, field: FieldRef, stored: Option<&Value>) -> Result<&ValueModel, DomainError> {
        if let EditorState::Loaded { field: loaded, .. } = &self.state {
            if loaded != &field {
                return Err(DomainError::EditorBusy {
                    loaded: loaded.path.to_string(),
                    requested: field.path.to_string(),
                });
            }
        } else {
            let snapshot = ValueModel::load(field.kind, stored)?;
            self.state = EditorState::Loaded { field, snapshot };
        }
        self.snapshot().ok_or(DomainError::EditorIdle)
    }

    fn snapshot_mut(&mut self) -> Result<&mut ValueModel, DomainError> {
        match &mut self.state {
            EditorState::Loaded { snapshot, .. } => Ok(snapshot),
            EditorState::Idle => Err(DomainError::EditorIdle),
        }
    }

    pub fn set_base_value(&mut self, base: &Value) -> Result<(), DomainError> {
        self.snapshot_mut()?.set_base_json(base)
    }

    pub fn add_row(&mut self, draft: ModifierDraft) -> Result<ModifierId, DomainError> {
        self.snapshot_mut()?.add_modifier(draft)
    }

    pub fn remove_row(&mut self, id: &ModifierId, force: bool) -> Result<(), DomainError> {
        self.snapshot_mut()?.remove_modifier(id, force).map(|_| ())
    }

    pub fn set_row_name(&mut self, id: &ModifierId, name: &str) -> Result<(), DomainError> {
        self.snapshot_mut()?.rename_modifier(id, name)
    }

    pub fn set_row_value(&mut self, id: &ModifierId, value: ModifierValue) -> Result<(), DomainError> {
        self.snapshot_mut()?.set_modifier_value(id, value)
    }

    pub fn set_row_enabled(&mut self, id: &ModifierId, enabled: bool) -> Result<(), DomainError> {
        self.snapshot_mut()?.toggle_modifier(id, enabled)
    }

    /// Discard the snapshot. Returns the field that was staged, if any.
    pub fn cancel(&mut self) -> Option<FieldRef> {
        match std::mem::take(&mut self.state) {
            EditorState::Loaded { field, .. } => Some(field),
            EditorState::Idle => None,
        }
    }

    /// Finish editing and hand back the field with its final ValueModel.
    pub fn commit(&mut self) -> Result<(FieldRef, ValueModel), DomainError> {
        match std::mem::take(&mut self.state) {
            EditorState::Loaded { field, snapshot } => Ok((field, snapshot)),
            EditorState::Idle => Err(DomainError::EditorIdle),
        }
    }
}
