//! Restore tracked permanent modifiers that went missing from their fields.

use std::sync::Arc;

use dhsheet_domain::{restore_document, DocumentRef};

use crate::infrastructure::ports::DocumentRepo;

use super::error::ModifierError;
use super::load_document;

pub struct RestorePermanentModifiers {
    repo: Arc<dyn DocumentRepo>,
}

impl RestorePermanentModifiers {
    pub fn new(repo: Arc<dyn DocumentRepo>) -> Self {
        Self { repo }
    }

    /// Returns how many modifiers were re-inserted. Idempotent: a second
    /// call restores nothing and writes nothing.
    pub async fn execute(&self, target: &DocumentRef) -> Result<usize, ModifierError> {
        let document = load_document(self.repo.as_ref(), target).await?;
        let restore = restore_document(&document);

        for warning in &restore.warnings {
            tracing::warn!(document_id = %target, "{}", warning);
        }
        if restore.update.is_empty() {
            return Ok(0);
        }

        self.repo.update(target, &restore.update).await?;
        tracing::info!(document_id = %target, restored = restore.restored, "Restored permanent modifiers");
        Ok(restore.restored)
    }
}
