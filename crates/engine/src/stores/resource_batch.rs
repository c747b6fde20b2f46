//! Debounced resource delta batching.
//!
//! Rapid clicks on a resource tracker queue deltas keyed by
//! (document, resource). Every queue call restarts a single-shot timer; when
//! the window elapses without new deltas, pending deltas are grouped by
//! document and written with one update per document.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dhsheet_domain::{DocumentRef, ResourceId};
use futures_util::future::join_all;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::use_cases::resources::ResourceOps;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchFlushReport {
    /// Documents written.
    pub documents: usize,
    /// Resource deltas applied across all documents.
    pub applied: usize,
    pub failures: Vec<(DocumentRef, String)>,
}

#[derive(Default)]
struct PendingDeltas {
    deltas: HashMap<(DocumentRef, ResourceId), i64>,
    timer: Option<CancellationToken>,
}

struct BatcherInner {
    ops: Arc<ResourceOps>,
    window: Duration,
    pending: Mutex<PendingDeltas>,
}

impl BatcherInner {
    async fn flush(&self) -> BatchFlushReport {
        let deltas = {
            let mut pending = self.pending.lock().await;
            if let Some(timer) = pending.timer.take() {
                timer.cancel();
            }
            std::mem::take(&mut pending.deltas)
        };

        let mut by_document: HashMap<DocumentRef, Vec<(ResourceId, i64)>> = HashMap::new();
        for ((target, resource), delta) in deltas {
            if delta != 0 {
                by_document.entry(target).or_default().push((resource, delta));
            }
        }
        if by_document.is_empty() {
            return BatchFlushReport::default();
        }

        let results = join_all(by_document.into_iter().map(|(target, deltas)| async move {
            let result = self.ops.apply_deltas(&target, &deltas).await;
            (target, result)
        }))
        .await;

        let mut report = BatchFlushReport::default();
        for (target, result) in results {
            match result {
                Ok(applied) => {
                    if !applied.is_empty() {
                        report.documents += 1;
                    }
                    report.applied += applied.len();
                }
                Err(e) => {
                    tracing::error!(document_id = %target, error = %e, "Failed to flush resource deltas");
                    report.failures.push((target, e.to_string()));
                }
            }
        }
        tracing::debug!(
            documents = report.documents,
            applied = report.applied,
            failed = report.failures.len(),
            "Flushed resource deltas"
        );
        report
    }
}

/// Coalesces resource deltas and writes them after a quiet period.
#[derive(Clone)]
pub struct ResourceBatcher {
    inner: Arc<BatcherInner>,
}

impl ResourceBatcher {
    pub fn new(ops: Arc<ResourceOps>, window: Duration) -> Self {
        Self {
            inner: Arc::new(BatcherInner {
                ops,
                window,
                pending: Mutex::new(PendingDeltas::default()),
            }),
        }
    }

    pub fn window(&self) -> Duration {
        self.inner.window
    }

    /// Add `delta` to the pending total for one resource and restart the timer.
    pub async fn queue(&self, target: &DocumentRef, resource: &ResourceId, delta: i64) {
        let token = CancellationToken::new();
        {
            let mut pending = self.inner.pending.lock().await;
            let total = pending
                .deltas
                .entry((target.clone(), resource.clone()))
                .or_insert(0);
            *total = total.saturating_add(delta);
            if let Some(previous) = pending.timer.replace(token.clone()) {
                previous.cancel();
            }
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(inner.window) => {
                    inner.flush().await;
                }
            }
        });
    }

    /// Write everything pending now.
    pub async fn flush(&self) -> BatchFlushReport {
        self.inner.flush().await
    }

    /// Drop pending deltas without writing. Returns how many were dropped.
    pub async fn cancel(&self) -> usize {
        let mut pending = self.inner.pending.lock().await;
        if let Some(timer) = pending.timer.take() {
            timer.cancel();
        }
        let dropped = pending.deltas.len();
        pending.deltas.clear();
        if dropped > 0 {
            tracing::debug!(dropped, "Cancelled pending resource deltas");
        }
        dropped
    }

    pub async fn pending_count(&self) -> usize {
        self.inner.pending.lock().await.deltas.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory::InMemoryDocumentRepo;
    use crate::infrastructure::ports::DocumentRepo;
    use dhsheet_domain::{Document, DocumentId};
    use serde_json::json;

    const WINDOW: Duration = Duration::from_millis(300);

    fn actor(id: &str) -> Document {
        Document::from_json(json!({
            "_id": id, "kind": "actor", "type": "character",
            "system": { "resources": [
                { "id": "hope", "name": "Hope", "value": 0, "max": 6, "order": 0 },
                { "id": "stress", "name": "Stress", "value": 0, "max": 0, "order": 1 }
            ] }
        }))
        .unwrap()
    }

    fn target(id: &str) -> DocumentRef {
        DocumentRef::top_level(DocumentId::from(id))
    }

    fn setup() -> (Arc<InMemoryDocumentRepo>, ResourceBatcher) {
        let repo = Arc::new(InMemoryDocumentRepo::from_documents([actor("pc1"), actor("pc2")]));
        let ops = Arc::new(ResourceOps::new(repo.clone()));
        (repo, ResourceBatcher::new(ops, WINDOW))
    }

    async fn resource_value(repo: &InMemoryDocumentRepo, id: &str, index: usize) -> Option<i64> {
        repo.get(&target(id))
            .await
            .unwrap()
            .and_then(|doc| doc.get("system.resources").cloned())
            .and_then(|list| list.get(index).and_then(|r| r.get("value")).and_then(|v| v.as_i64()))
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_deltas_coalesce_into_one_write() {
        let (repo, batcher) = setup();
        let hope = ResourceId::from("hope");

        for _ in 0..4 {
            batcher.queue(&target("pc1"), &hope, 1).await;
            tokio::time::sleep(WINDOW / 2).await;
        }
        assert_eq!(repo.write_count(), 0);
        assert_eq!(batcher.pending_count().await, 1);

        tokio::time::sleep(WINDOW * 2).await;

        assert_eq!(repo.write_count(), 1);
        assert_eq!(resource_value(&repo, "pc1", 0).await, Some(4));
        assert_eq!(batcher.pending_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn one_write_per_document() {
        let (repo, batcher) = setup();

        batcher.queue(&target("pc1"), &ResourceId::from("hope"), 9).await;
        batcher.queue(&target("pc1"), &ResourceId::from("stress"), 3).await;
        batcher.queue(&target("pc2"), &ResourceId::from("stress"), 2).await;

        let report = batcher.flush().await;

        assert_eq!(report.documents, 2);
        assert_eq!(report.applied, 3);
        assert_eq!(repo.write_count(), 2);
        assert_eq!(resource_value(&repo, "pc1", 0).await, Some(6));
        assert_eq!(resource_value(&repo, "pc1", 1).await, Some(3));

        // The timer was disarmed by the manual flush.
        tokio::time::sleep(WINDOW * 2).await;
        assert_eq!(repo.write_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_deltas() {
        let (repo, batcher) = setup();

        batcher.queue(&target("pc1"), &ResourceId::from("hope"), 1).await;
        batcher.queue(&target("pc2"), &ResourceId::from("hope"), 1).await;

        assert_eq!(batcher.cancel().await, 2);
        tokio::time::sleep(WINDOW * 2).await;

        assert_eq!(repo.write_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_document_does_not_block_others() {
        let (repo, batcher) = setup();

        batcher.queue(&target("ghost"), &ResourceId::from("hope"), 1).await;
        batcher.queue(&target("pc2"), &ResourceId::from("hope"), 2).await;

        let report = batcher.flush().await;

        assert_eq!(report.documents, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, target("ghost"));
        assert_eq!(resource_value(&repo, "pc2", 0).await, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn net_zero_delta_is_not_written() {
        let (repo, batcher) = setup();
        let hope = ResourceId::from("hope");

        batcher.queue(&target("pc1"), &hope, 2).await;
        batcher.queue(&target("pc1"), &hope, -2).await;
        tokio::time::sleep(WINDOW * 2).await;

        assert_eq!(repo.write_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn extreme_deltas_saturate() {
        let (repo, batcher) = setup();
        let stress = ResourceId::from("stress");

        batcher.queue(&target("pc1"), &stress, i64::MAX).await;
        batcher.queue(&target("pc1"), &stress, i64::MAX).await;
        let report = batcher.flush().await;

        assert_eq!(report.applied, 1);
        assert_eq!(resource_value(&repo, "pc1", 1).await, Some(i64::MAX));
    }
}
