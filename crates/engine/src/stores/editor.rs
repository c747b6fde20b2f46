//! Modifier editor sessions, one per open document sheet.
//!
//! Each sheet stages at most one field at a time. Edits only touch the
//! in-memory snapshot; `save` persists the committed ValueModel with a
//! single repository update.

use std::sync::Arc;

use dashmap::DashMap;
use dhsheet_domain::{
    DocumentRef, DocumentUpdate, DomainError, FieldRef, ModifierEditor, ValueModel,
};

use crate::infrastructure::ports::{DocumentRepo, RepoError};

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentRef),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Editor state for one document sheet.
#[derive(Debug, Clone)]
pub struct EditorSession {
    target: DocumentRef,
    editor: ModifierEditor,
}

impl EditorSession {
    pub fn new(target: DocumentRef) -> Self {
        Self {
            target,
            editor: ModifierEditor::new(),
        }
    }

    pub fn target(&self) -> &DocumentRef {
        &self.target
    }

    pub fn editor(&self) -> &ModifierEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut ModifierEditor {
        &mut self.editor
    }
}

/// Registry of editor sessions keyed by document.
///
/// DashMap guards are never held across a repository call.
pub struct EditorRegistry {
    repo: Arc<dyn DocumentRepo>,
    sessions: DashMap<DocumentRef, EditorSession>,
}

impl EditorRegistry {
    pub fn new(repo: Arc<dyn DocumentRepo>) -> Self {
        Self {
            repo,
            sessions: DashMap::new(),
        }
    }

    /// Stage `field` of `target` for editing and return its snapshot.
    ///
    /// Re-opening the staged field returns the pending snapshot unchanged.
    pub async fn open(
        &self,
        target: &DocumentRef,
        field: FieldRef,
    ) -> Result<ValueModel, EditorError> {
        if let Some(session) = self.sessions.get(target) {
            match session.editor().loaded_field() {
                Some(loaded) if loaded == &field => {
                    if let Some(snapshot) = session.editor().snapshot() {
                        return Ok(snapshot.clone());
                    }
                }
                Some(loaded) => {
                    return Err(DomainError::EditorBusy {
                        loaded: loaded.path.to_string(),
                        requested: field.path.to_string(),
                    }
                    .into());
                }
                None => {}
            }
        }

        let document = match self.repo.get(target).await? {
            Some(document) => document,
            None => {
                tracing::error!(document_id = %target, field = %field, "Cannot open field editor, document not found");
                return Err(EditorError::DocumentNotFound(target.clone()));
            }
        };

        let mut session = self
            .sessions
            .entry(target.clone())
            .or_insert_with(|| EditorSession::new(target.clone()));
        let snapshot = match session
            .editor_mut()
            .load(field.clone(), document.get_field(&field.path))
        {
            Ok(snapshot) => snapshot.clone(),
            Err(e) => {
                tracing::error!(document_id = %target, field = %field, error = %e, "Cannot open field editor");
                return Err(e.into());
            }
        };
        tracing::debug!(document_id = %target, field = %field, "Opened field editor");
        Ok(snapshot)
    }

    /// Run a row edit against the staged snapshot of `target`.
    pub fn edit<R>(
        &self,
        target: &DocumentRef,
        op: impl FnOnce(&mut ModifierEditor) -> Result<R, DomainError>,
    ) -> Result<R, EditorError> {
        let mut session = self
            .sessions
            .get_mut(target)
            .ok_or(DomainError::EditorIdle)?;
        Ok(op(session.editor_mut())?)
    }

    pub fn snapshot(&self, target: &DocumentRef) -> Option<ValueModel> {
        self.sessions
            .get(target)
            .and_then(|session| session.editor().snapshot().cloned())
    }

    pub fn is_open(&self, target: &DocumentRef) -> bool {
        self.sessions
            .get(target)
            .is_some_and(|session| !session.editor().is_idle())
    }

    /// Commit the staged field and write it with one update.
    ///
    /// The session stays staged while the write is in flight, so another
    /// field cannot be opened on the sheet in the meantime. A failed write
    /// leaves the edits staged for a retry or a cancel. Edits made while the
    /// write was pending stay staged after a successful save.
    pub async fn save(&self, target: &DocumentRef) -> Result<ValueModel, EditorError> {
        let (field, model) = {
            let session = self.sessions.get(target).ok_or(DomainError::EditorIdle)?;
            let mut editor = session.editor().clone();
            editor.commit()?
        };

        let update = DocumentUpdate::new().with(field.path.as_str(), model.to_json());
        if let Err(e) = self.repo.update(target, &update).await {
            tracing::error!(document_id = %target, field = %field, error = %e, "Failed to save field editor, edits kept");
            return Err(e.into());
        }

        let committed = self
            .sessions
            .remove_if(target, |_, session| session.editor().snapshot() == Some(&model));
        if committed.is_none() {
            tracing::debug!(document_id = %target, field = %field, "Field edited during save, keeping session");
        }
        tracing::info!(document_id = %target, field = %field, "Saved field editor");
        Ok(model)
    }

    /// Discard the staged snapshot. Returns the field that was open.
    pub fn cancel(&self, target: &DocumentRef) -> Option<FieldRef> {
        let (_, mut session) = self.sessions.remove(target)?;
        let field = session.editor_mut().cancel();
        if let Some(field) = &field {
            tracing::debug!(document_id = %target, field = %field, "Cancelled field editor");
        }
        field
    }

    pub fn open_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory::InMemoryDocumentRepo;
    use crate::infrastructure::ports::MockDocumentRepo;
    use crate::test_support::LogCapture;
    use async_trait::async_trait;
    use dhsheet_domain::{Document, DocumentId, KnownField, ModifierDraft, ModifierId};
    use serde_json::json;
    use tokio::sync::Notify;

    fn character() -> Document {
        Document::from_json(json!({
            "_id": "pc1", "kind": "actor", "type": "character",
            "system": {
                "evasion": {
                    "baseValue": 10,
                    "modifiers": [{ "id": "lvl", "name": "Character Level", "value": 1, "permanent": true }],
                    "value": 11
                },
                "threshold": { "major": 7, "severe": 14 }
            }
        }))
        .unwrap()
    }

    fn pc() -> DocumentRef {
        DocumentRef::top_level(DocumentId::from("pc1"))
    }

    #[tokio::test]
    async fn edits_are_written_once_on_save() {
        let repo = Arc::new(InMemoryDocumentRepo::from_documents([character()]));
        let registry = EditorRegistry::new(repo.clone());
        let evasion = KnownField::Evasion.field_ref();

        registry.open(&pc(), evasion.clone()).await.unwrap();
        registry
            .edit(&pc(), |editor| editor.add_row(ModifierDraft::new("Cloak", "+1")))
            .unwrap();
        registry
            .edit(&pc(), |editor| editor.set_base_value(&json!(12)))
            .unwrap();
        assert_eq!(repo.write_count(), 0);

        let saved = registry.save(&pc()).await.unwrap();

        assert_eq!(saved.to_json().get("value"), Some(&json!(14)));
        assert_eq!(repo.write_count(), 1);
        assert!(!registry.is_open(&pc()));
        let doc = repo.get(&pc()).await.unwrap().unwrap();
        assert_eq!(doc.get("system.evasion.value"), Some(&json!(14)));
    }

    #[tokio::test]
    async fn second_field_is_rejected_while_one_is_open() {
        let repo = Arc::new(InMemoryDocumentRepo::from_documents([character()]));
        let registry = EditorRegistry::new(repo);

        registry
            .open(&pc(), KnownField::Evasion.field_ref())
            .await
            .unwrap();
        let err = registry
            .open(&pc(), KnownField::ThresholdMajor.field_ref())
            .await
            .unwrap_err();

        assert!(matches!(err, EditorError::Domain(DomainError::EditorBusy { .. })));
        assert!(registry
            .open(&pc(), KnownField::Evasion.field_ref())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn cancel_discards_without_writing() {
        let repo = Arc::new(InMemoryDocumentRepo::from_documents([character()]));
        let registry = EditorRegistry::new(repo.clone());

        registry
            .open(&pc(), KnownField::Evasion.field_ref())
            .await
            .unwrap();
        registry
            .edit(&pc(), |editor| editor.remove_row(&ModifierId::from("lvl"), true))
            .unwrap();

        assert_eq!(registry.cancel(&pc()), Some(KnownField::Evasion.field_ref()));
        assert_eq!(repo.write_count(), 0);
        assert!(matches!(
            registry.edit(&pc(), |editor| editor.set_base_value(&json!(1))),
            Err(EditorError::Domain(DomainError::EditorIdle))
        ));
    }

    #[tokio::test]
    async fn permanent_rows_cannot_be_disabled() {
        let repo = Arc::new(InMemoryDocumentRepo::from_documents([character()]));
        let registry = EditorRegistry::new(repo);

        registry
            .open(&pc(), KnownField::Evasion.field_ref())
            .await
            .unwrap();
        let err = registry
            .edit(&pc(), |editor| editor.set_row_enabled(&ModifierId::from("lvl"), false))
            .unwrap_err();

        assert!(matches!(err, EditorError::Domain(ref e) if e.is_protected()));
    }

    #[tokio::test]
    async fn failed_save_keeps_snapshot_staged() {
        let character = character();
        let mut repo = MockDocumentRepo::new();
        repo.expect_get()
            .returning(move |_| Ok(Some(character.clone())));
        repo.expect_update()
            .times(1)
            .returning(|_, _| Err(RepoError::storage("update", "offline")));
        let registry = EditorRegistry::new(Arc::new(repo));

        registry
            .open(&pc(), KnownField::Evasion.field_ref())
            .await
            .unwrap();
        registry
            .edit(&pc(), |editor| editor.set_base_value(&json!(13)))
            .unwrap();
        let err = registry.save(&pc()).await.unwrap_err();

        assert!(matches!(err, EditorError::Repo(_)));
        assert!(registry.is_open(&pc()));
        assert_eq!(
            registry.snapshot(&pc()).and_then(|m| m.to_json().get("value").cloned()),
            Some(json!(14))
        );
    }

    #[tokio::test]
    async fn save_without_open_field_is_idle() {
        let registry = EditorRegistry::new(Arc::new(MockDocumentRepo::new()));

        let err = registry.save(&pc()).await.unwrap_err();

        assert!(matches!(err, EditorError::Domain(DomainError::EditorIdle)));
    }

    /// Holds every write until released, then fails it.
    struct HeldWriteRepo {
        inner: InMemoryDocumentRepo,
        release: Notify,
    }

    #[async_trait]
    impl DocumentRepo for HeldWriteRepo {
        async fn get(&self, target: &DocumentRef) -> Result<Option<Document>, RepoError> {
            self.inner.get(target).await
        }

        async fn list_top_level(&self) -> Result<Vec<Document>, RepoError> {
            self.inner.list_top_level().await
        }

        async fn update(&self, _target: &DocumentRef, _update: &DocumentUpdate) -> Result<(), RepoError> {
            self.release.notified().await;
            Err(RepoError::storage("update", "offline"))
        }
    }

    #[tokio::test]
    async fn sheet_stays_reserved_while_save_is_pending() {
        let repo = Arc::new(HeldWriteRepo {
            inner: InMemoryDocumentRepo::from_documents([character()]),
            release: Notify::new(),
        });
        let registry = EditorRegistry::new(repo.clone());
        registry
            .open(&pc(), KnownField::Evasion.field_ref())
            .await
            .unwrap();
        registry
            .edit(&pc(), |editor| editor.set_base_value(&json!(13)))
            .unwrap();

        let saved_ref = pc();
        let (saved, other_field) = tokio::join!(registry.save(&saved_ref), async {
            tokio::task::yield_now().await;
            let result = registry
                .open(&pc(), KnownField::ThresholdMajor.field_ref())
                .await;
            repo.release.notify_one();
            result
        });

        assert!(matches!(saved, Err(EditorError::Repo(_))));
        assert!(matches!(
            other_field,
            Err(EditorError::Domain(DomainError::EditorBusy { .. }))
        ));
        assert_eq!(
            registry.snapshot(&pc()).and_then(|m| m.to_json().get("value").cloned()),
            Some(json!(14))
        );
    }

    #[tokio::test]
    async fn unreadable_field_is_logged_on_open() {
        let (logs, _guard) = LogCapture::install();
        let broken = Document::from_json(json!({
            "_id": "pc1", "kind": "actor", "type": "character",
            "system": { "evasion": [1, 2] }
        }))
        .unwrap();
        let registry = EditorRegistry::new(Arc::new(InMemoryDocumentRepo::from_documents([broken])));

        let err = registry
            .open(&pc(), KnownField::Evasion.field_ref())
            .await
            .unwrap_err();

        assert!(matches!(err, EditorError::Domain(DomainError::CorruptedShape(_))));
        let logs = logs.contents();
        assert!(logs.contains("Cannot open field editor"));
        assert!(logs.contains("pc1"));
        assert!(logs.contains("system.evasion"));
    }
}
