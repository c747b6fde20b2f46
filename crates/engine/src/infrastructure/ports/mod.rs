//! Port traits for infrastructure boundaries.
//!
//! The document store is the only abstraction in the engine. Everything
//! else is concrete types operating on the pure domain.

mod error;
mod repos;

pub use error::RepoError;
pub use repos::DocumentRepo;

#[cfg(test)]
pub use repos::MockDocumentRepo;
