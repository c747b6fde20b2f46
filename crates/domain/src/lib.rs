//! Daggerheart sheet core
//!
//! Pure, synchronous model of modifier-carrying fields: the ValueModel and
//! its resolver, the permanent-modifier ledger, document schemas, resource
//! trackers, the single-field editor state machine and the versioned
//! migration plan. Nothing here performs I/O; the engine crate persists the
//! `DocumentUpdate`s this crate stages.

pub mod editor;
pub mod entities;
pub mod error;
pub mod ids;
pub mod migration;
pub mod resolver;
pub mod schema;
pub mod tracker;
pub mod value_objects;

pub use editor::{EditorState, ModifierEditor};
pub use entities::{
    get_path, set_path, Document, DocumentKind, DocumentRef, DocumentUpdate, Resource,
    ResourceList, RESOURCES_PATH,
};
pub use error::DomainError;
pub use ids::{DocumentId, ModifierId, ResourceId};
pub use migration::{
    MigrationOutcome, MigrationPlan, MigrationStep, StepFailure, CURRENT_VERSION,
    VERSION_FLAG_PATH,
};
pub use resolver::{compute_formula_total, compute_numeric_total, DEFAULT_FORMULA};
pub use schema::{DocumentSchema, FieldDefault, SchemaBuilder};
pub use tracker::{
    character_level_modifier_id, restore_document, sync_character_level, DocumentRestore,
    RestoreReport, CHARACTER_LEVEL_NAME, LEVEL_PATH,
};
pub use value_objects::{
    FieldKind, FieldPath, FieldRef, Formula, KnownField, ModifiedValue, Modifier, ModifierDraft,
    ModifierValue, PermanentModifierEntry, Resolve, ValueModel, Version,
};
