//! Modifier use cases.
//!
//! Every operation reads the document once, mutates one ValueModel (or the
//! thresholds for Character Level) in memory and persists with a single
//! update.

mod character_level;
mod edit;
mod error;
mod restore;

use std::sync::Arc;

use dhsheet_domain::{Document, DocumentRef, DocumentUpdate, DomainError, FieldRef, ValueModel};

use crate::infrastructure::ports::DocumentRepo;

pub use character_level::SetCharacterLevel;
pub use edit::{AddModifier, RemoveModifier, ToggleModifier};
pub use error::ModifierError;
pub use restore::RestorePermanentModifiers;

/// Container for modifier use cases.
pub struct ModifierUseCases {
    pub add: Arc<AddModifier>,
    pub remove: Arc<RemoveModifier>,
    pub toggle: Arc<ToggleModifier>,
    pub restore: Arc<RestorePermanentModifiers>,
    pub character_level: Arc<SetCharacterLevel>,
}

impl ModifierUseCases {
    pub fn new(repo: Arc<dyn DocumentRepo>) -> Self {
        Self {
            add: Arc::new(AddModifier::new(repo.clone())),
            remove: Arc::new(RemoveModifier::new(repo.clone())),
            toggle: Arc::new(ToggleModifier::new(repo.clone())),
            restore: Arc::new(RestorePermanentModifiers::new(repo.clone())),
            character_level: Arc::new(SetCharacterLevel::new(repo)),
        }
    }
}

async fn load_document(
    repo: &dyn DocumentRepo,
    target: &DocumentRef,
) -> Result<Document, ModifierError> {
    match repo.get(target).await? {
        Some(document) => Ok(document),
        None => {
            tracing::error!(document_id = %target, "Document not found");
            Err(ModifierError::DocumentNotFound(target.clone()))
        }
    }
}

/// Load one field, run `op` on it and write the whole field back.
///
/// Nothing is written when `op` fails.
async fn modify_field<R>(
    repo: &dyn DocumentRepo,
    target: &DocumentRef,
    field: &FieldRef,
    op: impl FnOnce(&mut ValueModel) -> Result<R, DomainError>,
) -> Result<R, ModifierError> {
    let document = load_document(repo, target).await?;
    let mut model = ValueModel::load(field.kind, document.get_field(&field.path)).map_err(|e| {
        tracing::error!(document_id = %target, field = %field, error = %e, "Cannot load modifier field");
        e
    })?;

    let result = match op(&mut model) {
        Ok(result) => result,
        Err(e) => {
            if e.is_protected() {
                tracing::warn!(document_id = %target, field = %field, error = %e, "Permanent modifier change refused");
            } else {
                tracing::error!(document_id = %target, field = %field, error = %e, "Modifier operation failed");
            }
            return Err(e.into());
        }
    };

    let update = DocumentUpdate::new().with(field.path.as_str(), model.to_json());
    repo.update(target, &update).await?;
    Ok(result)
}
