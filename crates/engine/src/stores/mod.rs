//! In-memory state storage modules.
//!
//! Stores hold runtime state that is not persisted on its own:
//! - `EditorRegistry` - staged field edits, one session per document sheet
//! - `ResourceBatcher` - debounced resource deltas awaiting a write

pub mod editor;
pub mod resource_batch;

pub use editor::{EditorError, EditorRegistry, EditorSession};
pub use resource_batch::{BatchFlushReport, ResourceBatcher};
