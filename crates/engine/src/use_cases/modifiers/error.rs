//! Modifier operation errors.

use crate::infrastructure::ports::RepoError;
use dhsheet_domain::{DocumentRef, DomainError};

#[derive(Debug, thiserror::Error)]
pub enum ModifierError {
    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentRef),
    #[error("Validation error: {0}")]
    Domain(#[from] DomainError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl ModifierError {
    /// A permanent modifier refused the change (shown to the user as a notice).
    pub fn is_protected(&self) -> bool {
        matches!(self, Self::Domain(e) if e.is_protected())
    }
}
