//! Unified error types for the domain layer
//!
//! Every fallible domain operation returns [`DomainError`]. Only the
//! variants that cannot be repaired automatically reach the engine; shape
//! corruption found during migration is repaired by the safety scan instead.

use thiserror::Error;

/// Unified error type for domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Removal or disable of a permanent modifier without `force`
    #[error("Modifier {modifier_id} is permanent and cannot be changed without force")]
    PermanentModifierProtected { modifier_id: String },

    /// Field, document, modifier or resource does not exist
    #[error("{target} not found: {id}")]
    TargetNotFound { target: &'static str, id: String },

    /// A ValueModel-shaped field is missing keys or has the wrong types
    #[error("Corrupted shape: {0}")]
    CorruptedShape(String),

    /// A gated migration step failed
    #[error("Migration step '{step}' failed: {reason}")]
    MigrationStepFailed { step: &'static str, reason: String },

    /// A modifier with the same id (or permanent name) already exists
    #[error("Duplicate modifier: {0}")]
    DuplicateModifier(String),

    /// Editor already holds a different field
    #[error("Editor busy with {loaded}, cannot load {requested}")]
    EditorBusy { loaded: String, requested: String },

    /// Editor operation needs a loaded field
    #[error("No field loaded in editor")]
    EditorIdle,

    /// Malformed dotted field path
    #[error("Invalid field path: {0}")]
    InvalidFieldPath(String),

    /// Parse error (for value objects)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl DomainError {
    /// Create a permanent-modifier protection error
    pub fn protected(modifier_id: impl ToString) -> Self {
        Self::PermanentModifierProtected {
            modifier_id: modifier_id.to_string(),
        }
    }

    /// Create a not found error
    pub fn not_found(target: &'static str, id: impl ToString) -> Self {
        Self::TargetNotFound {
            target,
            id: id.to_string(),
        }
    }

    pub fn corrupted(msg: impl Into<String>) -> Self {
        Self::CorruptedShape(msg.into())
    }

    pub fn step_failed(step: &'static str, reason: impl ToString) -> Self {
        Self::MigrationStepFailed {
            step,
            reason: reason.to_string(),
        }
    }

    pub fn duplicate(msg: impl Into<String>) -> Self {
        Self::DuplicateModifier(msg.into())
    }

    /// Creates a parse error for string-to-type conversion failures.
    ///
    /// Use this in `FromStr` implementations when the input string
    /// doesn't match the expected format (version stamps, field paths).
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Check if this is a TargetNotFound error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::TargetNotFound { .. })
    }

    /// Check if this is a PermanentModifierProtected error.
    pub fn is_protected(&self) -> bool {
        matches!(self, Self::PermanentModifierProtected { .. })
    }
}
