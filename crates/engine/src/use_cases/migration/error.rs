//! Migration errors.

use crate::infrastructure::ports::RepoError;
use dhsheet_domain::DocumentRef;

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentRef),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}
