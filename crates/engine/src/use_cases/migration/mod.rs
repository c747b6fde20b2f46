//! Migration use cases.
//!
//! Bring stored documents up to the current schema: one document at a time
//! on load, or the whole world in one concurrent batch.

mod error;
mod migrate_document;
mod migrate_world;

use std::sync::Arc;

pub use error::MigrationError;
pub use migrate_document::MigrateDocument;
pub use migrate_world::{DocumentFailure, MigrateWorld, WorldMigrationReport};

/// Container for migration use cases.
pub struct MigrationUseCases {
    pub document: Arc<MigrateDocument>,
    pub world: Arc<MigrateWorld>,
}

impl MigrationUseCases {
    pub fn new(document: Arc<MigrateDocument>, world: Arc<MigrateWorld>) -> Self {
        Self { document, world }
    }
}
