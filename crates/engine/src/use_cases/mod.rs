//! Use cases - sheet and world orchestration.
//!
//! Each module groups the operations for one area. Use cases read through
//! the `DocumentRepo` port, run the pure domain logic and persist with a
//! single update per document.

pub mod migration;
pub mod modifiers;
pub mod resources;

pub use migration::MigrationUseCases;
pub use modifiers::ModifierUseCases;
pub use resources::ResourceOps;
