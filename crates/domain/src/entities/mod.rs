//! Entities - documents and the entries they own

mod document;
mod resource;

pub use document::{get_path, set_path, Document, DocumentKind, DocumentRef, DocumentUpdate};
pub use resource::{Resource, ResourceList, RESOURCES_PATH};
