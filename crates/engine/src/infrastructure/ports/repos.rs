//! Repository port traits for document access.

use async_trait::async_trait;
use dhsheet_domain::{Document, DocumentRef, DocumentUpdate};

use super::error::RepoError;

// =============================================================================
// Document Storage
// =============================================================================

/// The host document store.
///
/// `update` applies every assignment of a `DocumentUpdate` atomically; an
/// embedded item is addressed through its parent actor.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentRepo: Send + Sync {
    async fn get(&self, target: &DocumentRef) -> Result<Option<Document>, RepoError>;

    /// Every top-level document (actors and world items) with its embedded items.
    async fn list_top_level(&self) -> Result<Vec<Document>, RepoError>;

    async fn update(&self, target: &DocumentRef, update: &DocumentUpdate) -> Result<(), RepoError>;
}
