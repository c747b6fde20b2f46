//! In-memory document store.
//!
//! Backs the migration binary (documents loaded from a JSON export) and the
//! engine tests. Each top-level document sits in its own `DashMap` shard
//! entry, so an update holds the entry lock for the whole assignment set.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use dhsheet_domain::{Document, DocumentId, DocumentRef, DocumentUpdate};

use crate::infrastructure::ports::{DocumentRepo, RepoError};

struct StoredDocument {
    seq: usize,
    document: Document,
}

pub struct InMemoryDocumentRepo {
    documents: DashMap<DocumentId, StoredDocument>,
    next_seq: AtomicUsize,
    writes: AtomicUsize,
}

impl InMemoryDocumentRepo {
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
            next_seq: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn from_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        let repo = Self::new();
        for document in documents {
            repo.insert(document);
        }
        repo
    }

    /// Insert or replace a top-level document.
    pub fn insert(&self, mut document: Document) {
        document.link_items();
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.documents
            .insert(document.id().clone(), StoredDocument { seq, document });
    }

    /// All top-level documents in insertion order.
    pub fn snapshot(&self) -> Vec<Document> {
        let mut entries: Vec<(usize, Document)> = self
            .documents
            .iter()
            .map(|entry| (entry.seq, entry.document.clone()))
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, document)| document).collect()
    }

    /// Number of successful `update` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl Default for InMemoryDocumentRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentRepo for InMemoryDocumentRepo {
    async fn get(&self, target: &DocumentRef) -> Result<Option<Document>, RepoError> {
        let root = target.parent.as_ref().unwrap_or(&target.id);
        let Some(entry) = self.documents.get(root) else {
            return Ok(None);
        };
        Ok(match &target.parent {
            Some(_) => entry.document.item(&target.id).cloned(),
            None => Some(entry.document.clone()),
        })
    }

    async fn list_top_level(&self) -> Result<Vec<Document>, RepoError> {
        Ok(self.snapshot())
    }

    async fn update(&self, target: &DocumentRef, update: &DocumentUpdate) -> Result<(), RepoError> {
        let root = target.parent.as_ref().unwrap_or(&target.id);
        let mut entry = self
            .documents
            .get_mut(root)
            .ok_or_else(|| RepoError::not_found("Document", root))?;
        let document = match &target.parent {
            Some(_) => entry
                .document
                .item_mut(&target.id)
                .ok_or_else(|| RepoError::not_found("Embedded item", target))?,
            None => &mut entry.document,
        };
        document.apply(update);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
