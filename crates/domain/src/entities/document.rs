//! Document - a host actor or item as seen by the core
//!
//! The host owns persistence; the core only reads fields by dotted path and
//! stages `DocumentUpdate`s (sets of path assignments) that the host applies
//! atomically.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::DomainError;
use crate::value_objects::FieldPath;
use crate::DocumentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentKind {
    Actor,
    Item,
}

/// Address of a top-level document or an item embedded in an actor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    pub id: DocumentId,
    pub parent: Option<DocumentId>,
}

impl DocumentRef {
    pub fn top_level(id: DocumentId) -> Self {
        Self { id, parent: None }
    }

    pub fn embedded(parent: DocumentId, id: DocumentId) -> Self {
        Self {
            id,
            parent: Some(parent),
        }
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parent {
            Some(parent) => write!(f, "{}/{}", parent, self.id),
            None => write!(f, "{}", self.id),
        }
    }
}

/// A host document. Everything besides the identity keys (`system`,
/// `flags`, ...) lives in `data` and is addressed by dotted path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id")]
    id: DocumentId,
    #[serde(skip)]
    parent: Option<DocumentId>,
    kind: DocumentKind,
    #[serde(rename = "type")]
    document_type: String,
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    items: Vec<Document>,
    #[serde(flatten)]
    data: Map<String, Value>,
}

impl Document {
    pub fn new(
        id: DocumentId,
        kind: DocumentKind,
        document_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            parent: None,
            kind,
            document_type: document_type.into(),
            name: name.into(),
            items: Vec::new(),
            data: Map::new(),
        }
    }

    /// Deserialize a stored document and link embedded items to it.
    pub fn from_json(value: Value) -> Result<Self, DomainError> {
        let mut document: Document =
            serde_json::from_value(value).map_err(|e| DomainError::parse(e.to_string()))?;
        document.link_items();
        Ok(document)
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Set `parent` on every embedded item.
    pub fn link_items(&mut self) {
        let id = self.id.clone();
        for item in &mut self.items {
            item.parent = Some(id.clone());
        }
    }

    pub fn with_data(mut self, path: &str, value: Value) -> Self {
        set_path(&mut self.data, path, value);
        self
    }

    pub fn with_item(mut self, mut item: Document) -> Self {
        item.parent = Some(self.id.clone());
        self.items.push(item);
        self
    }

    // ──────────────────────────────────────────────────────────────────────────
    // Read accessors
    // ──────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn parent(&self) -> Option<&DocumentId> {
        self.parent.as_ref()
    }

    pub fn target(&self) -> DocumentRef {
        DocumentRef {
            id: self.id.clone(),
            parent: self.parent.clone(),
        }
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn document_type(&self) -> &str {
        &self.document_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn items(&self) -> &[Document] {
        &self.items
    }

    pub fn item(&self, id: &DocumentId) -> Option<&Document> {
        self.items.iter().find(|i| &i.id == id)
    }

    pub fn item_mut(&mut self, id: &DocumentId) -> Option<&mut Document> {
        self.items.iter_mut().find(|i| &i.id == id)
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Nested lookup; `None` when any segment is absent.
    pub fn get(&self, path: &str) -> Option<&Value> {
        get_path(&self.data, path)
    }

    pub fn get_field(&self, path: &FieldPath) -> Option<&Value> {
        self.get(path.as_str())
    }

    pub fn get_i64(&self, path: &str) -> Option<i64> {
        self.get(path).and_then(Value::as_i64)
    }

    /// Apply every assignment of `update` in path order.
    pub fn apply(&mut self, update: &DocumentUpdate) {
        for (path, value) in update.iter() {
            set_path(&mut self.data, path, value.clone());
        }
    }
}

/// A set of dotted-path assignments applied together.
///
/// Setting a path drops previously staged assignments below it, so a
/// whole-field write always wins over earlier partial writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentUpdate {
    assignments: BTreeMap<String, Value>,
}

impl DocumentUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, path: impl Into<String>, value: Value) {
        let path = path.into();
        let prefix = format!("{}.", path);
        self.assignments.retain(|existing, _| !existing.starts_with(&prefix));
        self.assignments.insert(path, value);
    }

    pub fn with(mut self, path: impl Into<String>, value: Value) -> Self {
        self.set(path, value);
        self
    }

    /// Merge `other` on top of `self`.
    pub fn merge(&mut self, other: DocumentUpdate) {
        for (path, value) in other.assignments {
            self.set(path, value);
        }
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.assignments.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.assignments.contains_key(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.assignments.iter()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

pub fn get_path<'a>(root: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = root.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Assign `value` at `path`, creating (or replacing non-object) parents.
pub fn set_path(root: &mut Map<String, Value>, path: &str, value: Value) {
    let segments: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    let mut current = root;
    for segment in parents {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = match entry {
            Value::Object(map) => map,
            _ => return,
        };
    }
    current.insert(last.to_string(), value);
}
