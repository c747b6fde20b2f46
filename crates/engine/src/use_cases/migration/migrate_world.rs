//! Migrate world use case.
//!
//! Migrates every top-level document and every embedded item concurrently.
//! A failing document is logged and reported; it never stops the others.

use std::sync::Arc;

use dhsheet_domain::{Document, DocumentRef};
use futures_util::future::join_all;

use crate::infrastructure::ports::DocumentRepo;

use super::error::MigrationError;
use super::migrate_document::MigrateDocument;

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentFailure {
    pub document: DocumentRef,
    pub reason: String,
}

/// Summary of one world migration pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldMigrationReport {
    /// Documents examined, embedded items included.
    pub documents: usize,
    /// Documents whose data changed (stamp-only writes excluded).
    pub changed: usize,
    /// Documents whose version stamp advanced.
    pub stamped: usize,
    pub failures: Vec<DocumentFailure>,
}

impl WorldMigrationReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct MigrateWorld {
    repo: Arc<dyn DocumentRepo>,
    migrate_document: Arc<MigrateDocument>,
}

impl MigrateWorld {
    pub fn new(repo: Arc<dyn DocumentRepo>, migrate_document: Arc<MigrateDocument>) -> Self {
        Self {
            repo,
            migrate_document,
        }
    }

    pub async fn execute(&self) -> Result<WorldMigrationReport, MigrationError> {
        let top_level = self.repo.list_top_level().await?;
        let documents: Vec<Document> = top_level
            .into_iter()
            .flat_map(|document| {
                let items = document.items().to_vec();
                std::iter::once(document).chain(items)
            })
            .collect();

        tracing::info!(documents = documents.len(), "Starting world migration");

        let results = join_all(documents.iter().map(|document| async move {
            (document.target(), self.migrate_document.migrate(document).await)
        }))
        .await;

        let mut report = WorldMigrationReport {
            documents: results.len(),
            ..Default::default()
        };
        for (target, result) in results {
            match result {
                Ok(outcome) => {
                    if outcome.data_changed {
                        report.changed += 1;
                    }
                    if outcome.stamped() {
                        report.stamped += 1;
                    }
                    for failure in outcome.failures {
                        report.failures.push(DocumentFailure {
                            document: target.clone(),
                            reason: format!("step '{}': {}", failure.step, failure.error),
                        });
                    }
                }
                Err(e) => report.failures.push(DocumentFailure {
                    document: target,
                    reason: e.to_string(),
                }),
            }
        }

        tracing::info!(
            documents = report.documents,
            changed = report.changed,
            stamped = report.stamped,
            failed = report.failures.len(),
            "World migration complete"
        );
        Ok(report)
    }
}
