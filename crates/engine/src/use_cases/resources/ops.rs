//! Resource tracker operations.
//!
//! The whole `system.resources` list is rewritten on every change so ids,
//! clamping and dense ordering always hold in storage.

use std::sync::Arc;

use dhsheet_domain::{
    DocumentKind, DocumentRef, DocumentUpdate, DomainError, ResourceId, ResourceList,
    RESOURCES_PATH,
};

use crate::infrastructure::ports::DocumentRepo;

use super::error::ResourceError;

pub struct ResourceOps {
    repo: Arc<dyn DocumentRepo>,
}

impl ResourceOps {
    pub fn new(repo: Arc<dyn DocumentRepo>) -> Self {
        Self { repo }
    }

    pub async fn list(&self, target: &DocumentRef) -> Result<ResourceList, ResourceError> {
        let document = self
            .repo
            .get(target)
            .await?
            .ok_or_else(|| ResourceError::DocumentNotFound(target.clone()))?;
        if document.kind() != DocumentKind::Actor {
            return Err(ResourceError::NotAnActor(target.clone()));
        }
        Ok(ResourceList::from_stored(document.get(RESOURCES_PATH)))
    }

    async fn modify<R>(
        &self,
        target: &DocumentRef,
        op: impl FnOnce(&mut ResourceList) -> Result<R, DomainError>,
    ) -> Result<R, ResourceError> {
        let mut resources = self.list(target).await?;
        let result = op(&mut resources).map_err(|e| {
            tracing::error!(document_id = %target, error = %e, "Resource operation failed");
            e
        })?;
        let update = DocumentUpdate::new().with(RESOURCES_PATH, resources.to_json());
        self.repo.update(target, &update).await?;
        Ok(result)
    }

    pub async fn add(
        &self,
        target: &DocumentRef,
        name: &str,
        color: &str,
        max: i64,
    ) -> Result<ResourceId, ResourceError> {
        let id = self
            .modify(target, |resources| Ok(resources.add(name, color, max)))
            .await?;
        tracing::info!(document_id = %target, resource_id = %id, name, "Added resource");
        Ok(id)
    }

    pub async fn remove(&self, target: &DocumentRef, id: &ResourceId) -> Result<(), ResourceError> {
        self.modify(target, |resources| resources.remove(id).map(|_| ()))
            .await
    }

    pub async fn rename(
        &self,
        target: &DocumentRef,
        id: &ResourceId,
        name: &str,
    ) -> Result<(), ResourceError> {
        self.modify(target, |resources| resources.rename(id, name))
            .await
    }

    pub async fn set_color(
        &self,
        target: &DocumentRef,
        id: &ResourceId,
        color: &str,
    ) -> Result<(), ResourceError> {
        self.modify(target, |resources| resources.set_color(id, color))
            .await
    }

    pub async fn set_max(
        &self,
        target: &DocumentRef,
        id: &ResourceId,
        max: i64,
    ) -> Result<(), ResourceError> {
        self.modify(target, |resources| resources.set_max(id, max))
            .await
    }

    pub async fn move_to(
        &self,
        target: &DocumentRef,
        id: &ResourceId,
        index: usize,
    ) -> Result<(), ResourceError> {
        self.modify(target, |resources| resources.move_to(id, index))
            .await
    }

    /// Apply several deltas to one actor with a single write.
    ///
    /// Unknown resources are skipped with a warning so one stale delta does
    /// not lose the rest. Returns the new value of every applied resource.
    pub async fn apply_deltas(
        &self,
        target: &DocumentRef,
        deltas: &[(ResourceId, i64)],
    ) -> Result<Vec<(ResourceId, i64)>, ResourceError> {
        let mut resources = self.list(target).await?;
        let mut applied = Vec::with_capacity(deltas.len());
        for (id, delta) in deltas {
            match resources.apply_delta(id, *delta) {
                Ok(value) => applied.push((id.clone(), value)),
                Err(e) => {
                    tracing::warn!(document_id = %target, resource_id = %id, error = %e, "Dropping delta for unknown resource");
                }
            }
        }
        if applied.is_empty() {
            return Ok(applied);
        }

        let update = DocumentUpdate::new().with(RESOURCES_PATH, resources.to_json());
        self.repo.update(target, &update).await?;
        tracing::debug!(document_id = %target, applied = applied.len(), "Applied resource deltas");
        Ok(applied)
    }
}
