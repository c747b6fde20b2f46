//! Resource tracker errors.

use crate::infrastructure::ports::RepoError;
use dhsheet_domain::{DocumentRef, DomainError};

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentRef),
    #[error("Resources only exist on actors: {0}")]
    NotAnActor(DocumentRef),
    #[error("Validation error: {0}")]
    Domain(#[from] DomainError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}
