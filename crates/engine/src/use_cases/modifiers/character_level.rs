//! Keep the Character Level modifier in step with the character's level.

use std::sync::Arc;

use dhsheet_domain::{sync_character_level, DocumentRef};

use crate::infrastructure::ports::DocumentRepo;

use super::error::ModifierError;
use super::load_document;

pub struct SetCharacterLevel {
    repo: Arc<dyn DocumentRepo>,
}

impl SetCharacterLevel {
    pub fn new(repo: Arc<dyn DocumentRepo>) -> Self {
        Self { repo }
    }

    /// Set `system.level` and upsert the permanent Character Level modifier
    /// on both damage thresholds with one write.
    pub async fn execute(&self, target: &DocumentRef, level: i64) -> Result<(), ModifierError> {
        let document = load_document(self.repo.as_ref(), target).await?;
        let update = sync_character_level(&document, level).map_err(|e| {
            tracing::error!(document_id = %target, level, error = %e, "Cannot sync character level");
            e
        })?;

        if update.is_empty() {
            tracing::debug!(document_id = %target, level, "Character level already in sync");
            return Ok(());
        }
        self.repo.update(target, &update).await?;
        tracing::info!(document_id = %target, level, "Character level updated");
        Ok(())
    }
}
