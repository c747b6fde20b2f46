//! Migrate document use case.
//!
//! Runs the migration plan over one document and persists the result with a
//! single update.

use std::sync::Arc;

use dhsheet_domain::{Document, DocumentRef, MigrationOutcome, MigrationPlan};

use crate::infrastructure::ports::DocumentRepo;

use super::error::MigrationError;

pub struct MigrateDocument {
    repo: Arc<dyn DocumentRepo>,
    plan: MigrationPlan,
}

impl MigrateDocument {
    pub fn new(repo: Arc<dyn DocumentRepo>) -> Self {
        Self::with_plan(repo, MigrationPlan::standard())
    }

    pub fn with_plan(repo: Arc<dyn DocumentRepo>, plan: MigrationPlan) -> Self {
        Self { repo, plan }
    }

    pub fn plan(&self) -> &MigrationPlan {
        &self.plan
    }

    /// Load `target` and migrate it.
    pub async fn execute(&self, target: &DocumentRef) -> Result<MigrationOutcome, MigrationError> {
        let document = self
            .repo
            .get(target)
            .await?
            .ok_or_else(|| MigrationError::DocumentNotFound(target.clone()))?;
        self.migrate(&document).await
    }

    /// Migrate an already loaded document.
    ///
    /// Step failures are not errors here: they are logged and reported in
    /// the outcome, and whatever the plan kept (safety repairs) is still
    /// written. Only a failed write is an error.
    pub async fn migrate(&self, document: &Document) -> Result<MigrationOutcome, MigrationError> {
        let outcome = self.plan.run(document);
        let document_id = &outcome.document;

        for diagnostic in &outcome.diagnostics {
            tracing::warn!(document_id = %document_id, "{}", diagnostic);
        }
        for failure in &outcome.failures {
            tracing::error!(
                document_id = %document_id,
                step = failure.step,
                error = %failure.error,
                "Migration step failed, gated changes discarded"
            );
        }

        if !outcome.needs_write() {
            tracing::debug!(document_id = %document_id, version = %outcome.from, "Document already current");
            return Ok(outcome);
        }

        if let Err(e) = self.repo.update(document_id, &outcome.update).await {
            tracing::error!(
                document_id = %document_id,
                error = %e,
                "Failed to write migrated document"
            );
            return Err(e.into());
        }

        tracing::info!(
            document_id = %document_id,
            from = %outcome.from,
            to = %outcome.to,
            steps = ?outcome.applied_steps,
            data_changed = outcome.data_changed,
            "Migrated document"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::{MockDocumentRepo, RepoError};
    use dhsheet_domain::{DocumentId, Version, CURRENT_VERSION, VERSION_FLAG_PATH};
    use serde_json::json;

    fn legacy_adversary() -> Document {
        Document::from_json(json!({
            "_id": "adv1", "kind": "actor", "type": "adversary", "name": "Bandit",
            "system": { "difficulty": 13, "attackModifier": 1, "damage": "1d6+1" }
        }))
        .unwrap()
    }

    fn target() -> DocumentRef {
        DocumentRef::top_level(DocumentId::from("adv1"))
    }

    #[tokio::test]
    async fn writes_outdated_document_once() {
        let mut repo = MockDocumentRepo::new();
        repo.expect_get()
            .returning(|_| Ok(Some(legacy_adversary())));
        repo.expect_update()
            .withf(|target, update| {
                target.id.as_str() == "adv1"
                    && update.get(VERSION_FLAG_PATH) == Some(&json!("1.3.0"))
                    && update.get("system.difficulty.baseValue").is_none()
                    && update.get("system.difficulty").is_some()
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let use_case = MigrateDocument::new(Arc::new(repo));
        let outcome = use_case.execute(&target()).await.unwrap();

        assert_eq!(outcome.to, CURRENT_VERSION);
        assert!(outcome.data_changed);
    }

    #[tokio::test]
    async fn current_document_is_not_written() {
        let migrated = {
            let mut doc = legacy_adversary();
            let outcome = MigrationPlan::standard().run(&doc);
            doc.apply(&outcome.update);
            doc
        };
        let mut repo = MockDocumentRepo::new();
        repo.expect_get()
            .returning(move |_| Ok(Some(migrated.clone())));
        repo.expect_update().never();

        let use_case = MigrateDocument::new(Arc::new(repo));
        let outcome = use_case.execute(&target()).await.unwrap();

        assert_eq!(outcome.from, Version::new(1, 3, 0));
        assert!(outcome.applied_steps.is_empty());
    }

    #[tokio::test]
    async fn missing_document_is_reported() {
        let mut repo = MockDocumentRepo::new();
        repo.expect_get().returning(|_| Ok(None));

        let use_case = MigrateDocument::new(Arc::new(repo));
        let err = use_case.execute(&target()).await.unwrap_err();

        assert!(matches!(err, MigrationError::DocumentNotFound(_)));
    }

    #[tokio::test]
    async fn write_failure_propagates() {
        let mut repo = MockDocumentRepo::new();
        repo.expect_get()
            .returning(|_| Ok(Some(legacy_adversary())));
        repo.expect_update()
            .returning(|_, _| Err(RepoError::storage("update", "disk full")));

        let use_case = MigrateDocument::new(Arc::new(repo));
        let err = use_case.execute(&target()).await.unwrap_err();

        assert!(matches!(err, MigrationError::Repo(RepoError::Storage { .. })));
    }

    #[tokio::test]
    async fn step_failure_keeps_stamp_and_writes_repairs_only() {
        let broken = Document::from_json(json!({
            "_id": "adv1", "kind": "actor", "type": "adversary",
            "system": { "damage": false }
        }))
        .unwrap();
        let mut repo = MockDocumentRepo::new();
        repo.expect_update()
            .withf(|_, update| !update.contains(VERSION_FLAG_PATH) && update.contains("system.damage"))
            .times(1)
            .returning(|_, _| Ok(()));

        let use_case = MigrateDocument::new(Arc::new(repo));
        let outcome = use_case.migrate(&broken).await.unwrap();

        assert_eq!(outcome.failures.len(), 1);
        assert!(!outcome.stamped());
    }
}
