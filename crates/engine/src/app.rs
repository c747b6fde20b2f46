//! Application state and composition.

use std::sync::Arc;

use crate::infrastructure::config::EngineConfig;
use crate::infrastructure::ports::DocumentRepo;
use crate::stores::{EditorRegistry, ResourceBatcher};
use crate::use_cases;
use crate::use_cases::migration::{MigrateDocument, MigrateWorld};
use crate::use_cases::ResourceOps;

/// Main application state.
///
/// Holds the document repository, the use cases and the runtime stores.
/// Nothing here is global; callers pass the `App` (or parts of it) around.
pub struct App {
    pub config: EngineConfig,
    pub repo: Arc<dyn DocumentRepo>,
    pub use_cases: UseCases,
    pub stores: Stores,
}

/// Container for all use cases.
pub struct UseCases {
    pub migration: use_cases::MigrationUseCases,
    pub modifiers: use_cases::ModifierUseCases,
    pub resources: Arc<ResourceOps>,
}

/// Container for runtime stores.
pub struct Stores {
    pub editors: Arc<EditorRegistry>,
    pub resource_batcher: ResourceBatcher,
}

impl App {
    /// Create a new App with all dependencies wired up.
    pub fn new(repo: Arc<dyn DocumentRepo>, config: EngineConfig) -> Self {
        let migrate_document = Arc::new(MigrateDocument::new(repo.clone()));
        let migrate_world = Arc::new(MigrateWorld::new(repo.clone(), migrate_document.clone()));
        let resources = Arc::new(ResourceOps::new(repo.clone()));

        let use_cases = UseCases {
            migration: use_cases::MigrationUseCases::new(migrate_document, migrate_world),
            modifiers: use_cases::ModifierUseCases::new(repo.clone()),
            resources: resources.clone(),
        };

        let stores = Stores {
            editors: Arc::new(EditorRegistry::new(repo.clone())),
            resource_batcher: ResourceBatcher::new(resources, config.debounce_window),
        };

        Self {
            config,
            repo,
            use_cases,
            stores,
        }
    }
}
