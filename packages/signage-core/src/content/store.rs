//! Tenant-scoped content storage.
//!
//! [`ContentRepository`] is the persistence seam. Every method takes the
//! tenant explicitly and never touches another tenant's rows. Each tenant's
//! rows sit behind their own lock so tenants never contend with each other.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use thiserror::Error;

use super::{sort_for_playback, ContentId, ContentItem, ContentPatch, ReorderEntry};
use crate::tenant::TenantId;

/// Errors from a content store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing files failed.
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// A snapshot could not be encoded or decoded.
    #[error("Snapshot encoding failure: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An item with the same id already exists for the tenant.
    #[error("Duplicate content id: {0}")]
    DuplicateId(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for content items, scoped by tenant.
///
/// Mutations are acknowledged only once they are visible to subsequent
/// reads (and, for durable backends, written out).
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Stores a new item under `item.tenant_id`.
    async fn insert(&self, item: ContentItem) -> StoreResult<ContentItem>;

    /// Returns the tenant's items in playback order.
    async fn list(&self, tenant: &TenantId) -> StoreResult<Vec<ContentItem>>;

    /// Applies `patch` to the matching item. `None` if no item matches.
    async fn update(
        &self,
        tenant: &TenantId,
        id: &ContentId,
        patch: &ContentPatch,
        now: u64,
    ) -> StoreResult<Option<ContentItem>>;

    /// Applies all entries as one batch. Returns how many items matched.
    ///
    /// Readers observe either the whole batch or none of it.
    async fn reorder(
        &self,
        tenant: &TenantId,
        entries: &[ReorderEntry],
        now: u64,
    ) -> StoreResult<usize>;

    /// Removes the matching item. `None` if no item matches.
    async fn delete(&self, tenant: &TenantId, id: &ContentId) -> StoreResult<Option<ContentItem>>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Row Operations
// ─────────────────────────────────────────────────────────────────────────────

/// Mutations over one tenant's rows, shared by every backend.
///
/// Rows are kept in insertion order; playback order is applied on read.
pub(crate) mod rows {
    use super::*;

    pub fn insert(rows: &mut Vec<ContentItem>, item: ContentItem) -> StoreResult<ContentItem> {
        if rows.iter().any(|r| r.id == item.id) {
            return Err(StoreError::DuplicateId(item.id.to_string()));
        }
        rows.push(item.clone());
        Ok(item)
    }

    pub fn sorted(rows: &[ContentItem]) -> Vec<ContentItem> {
        let mut items = rows.to_vec();
        sort_for_playback(&mut items);
        items
    }

    pub fn update(
        rows: &mut [ContentItem],
        id: &ContentId,
        patch: &ContentPatch,
        now: u64,
    ) -> Option<ContentItem> {
        let item = rows.iter_mut().find(|r| &r.id == id)?;
        patch.apply_to(item, now);
        Some(item.clone())
    }

    pub fn reorder(rows: &mut [ContentItem], entries: &[ReorderEntry], now: u64) -> usize {
        let mut matched = 0;
        for entry in entries {
            if let Some(item) = rows.iter_mut().find(|r| r.id == entry.id) {
                item.playlist_order = entry.order;
                item.updated_at = now;
                matched += 1;
            }
        }
        matched
    }

    pub fn delete(rows: &mut Vec<ContentItem>, id: &ContentId) -> Option<ContentItem> {
        let index = rows.iter().position(|r| &r.id == id)?;
        Some(rows.remove(index))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-Memory Store
// ─────────────────────────────────────────────────────────────────────────────

type Shelf = Arc<RwLock<Vec<ContentItem>>>;

/// Process-memory content store.
///
/// # Concurrency design
///
/// - The outer `DashMap` is only touched to find or create a tenant's shelf;
///   the shelf `Arc` is cloned out so no map guard is held during work.
/// - Each shelf is an `RwLock<Vec<_>>`: reads clone under a read lock, and a
///   reorder batch is applied entirely under one write lock.
#[derive(Default)]
pub struct MemoryContentStore {
    tenants: DashMap<TenantId, Shelf>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn shelf(&self, tenant: &TenantId) -> Shelf {
        if let Some(shelf) = self.tenants.get(tenant) {
            return Arc::clone(shelf.value());
        }
        Arc::clone(
            self.tenants
                .entry(tenant.clone())
                .or_insert_with(|| Arc::new(RwLock::new(Vec::new())))
                .value(),
        )
    }

    fn existing_shelf(&self, tenant: &TenantId) -> Option<Shelf> {
        self.tenants.get(tenant).map(|s| Arc::clone(s.value()))
    }
}

#[async_trait]
impl ContentRepository for MemoryContentStore {
    async fn insert(&self, item: ContentItem) -> StoreResult<ContentItem> {
        let shelf = self.shelf(&item.tenant_id);
        let mut guard = shelf.write();
        rows::insert(&mut guard, item)
    }

    async fn list(&self, tenant: &TenantId) -> StoreResult<Vec<ContentItem>> {
        Ok(self
            .existing_shelf(tenant)
            .map(|shelf| rows::sorted(&shelf.read()))
            .unwrap_or_default())
    }

    async fn update(
        &self,
        tenant: &TenantId,
        id: &ContentId,
        patch: &ContentPatch,
        now: u64,
    ) -> StoreResult<Option<ContentItem>> {
        let Some(shelf) = self.existing_shelf(tenant) else {
            return Ok(None);
        };
        let mut guard = shelf.write();
        Ok(rows::update(&mut guard, id, patch, now))
    }

    async fn reorder(
        &self,
        tenant: &TenantId,
        entries: &[ReorderEntry],
        now: u64,
    ) -> StoreResult<usize> {
        let Some(shelf) = self.existing_shelf(tenant) else {
            return Ok(0);
        };
        let mut guard = shelf.write();
        Ok(rows::reorder(&mut guard, entries, now))
    }

    async fn delete(&self, tenant: &TenantId, id: &ContentId) -> StoreResult<Option<ContentItem>> {
        let Some(shelf) = self.existing_shelf(tenant) else {
            return Ok(None);
        };
        let mut guard = shelf.write();
        Ok(rows::delete(&mut guard, id))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::content::MediaKind;

    const BATCH_LEN: i64 = 8;

    pub fn item(tenant: &str, id: &str, order: i64) -> ContentItem {
        ContentItem {
            id: ContentId::from(id),
            tenant_id: TenantId::parse(tenant).unwrap(),
            title: format!("title-{id}"),
            kind: MediaKind::Image,
            url: format!("/uploads/{id}.png"),
            duration_seconds: 10,
            playlist_name: "default".into(),
            playlist_order: order,
            created_at: 1,
            updated_at: 1,
        }
    }

    fn batch_ids() -> Vec<String> {
        (0..BATCH_LEN).map(|k| format!("i{k}")).collect()
    }

    fn batch(reverse: bool) -> Vec<ReorderEntry> {
        (0..BATCH_LEN)
            .map(|k| ReorderEntry {
                id: ContentId::from(format!("i{k}").as_str()),
                order: if reverse { BATCH_LEN - 1 - k } else { k },
            })
            .collect()
    }

    /// Flips a tenant's whole playlist back and forth while another task
    /// lists it. Every listing must show one complete ordering.
    pub async fn assert_reorder_is_atomic(store: Arc<dyn ContentRepository>, rounds: usize) {
        let tenant = TenantId::parse("acme").unwrap();
        for (k, id) in batch_ids().iter().enumerate() {
            store.insert(item("acme", id, k as i64)).await.unwrap();
        }
        let forward = batch_ids();
        let reversed: Vec<String> = forward.iter().rev().cloned().collect();
        let done = Arc::new(AtomicBool::new(false));

        let writer = {
            let store = Arc::clone(&store);
            let tenant = tenant.clone();
            let done = Arc::clone(&done);
            tokio::spawn(async move {
                for round in 0..rounds {
                    let matched = store
                        .reorder(&tenant, &batch(round % 2 == 0), round as u64)
                        .await
                        .unwrap();
                    assert_eq!(matched, BATCH_LEN as usize);
                    tokio::task::yield_now().await;
                }
                done.store(true, Ordering::Release);
            })
        };

        let reader = tokio::spawn(async move {
            let mut reads = 0usize;
            loop {
                let finished = done.load(Ordering::Acquire);
                let ids: Vec<String> = store
                    .list(&tenant)
                    .await
                    .unwrap()
                    .into_iter()
                    .map(|i| i.id.to_string())
                    .collect();
                assert!(
                    ids == forward || ids == reversed,
                    "listed a partial reorder: {ids:?}"
                );
                reads += 1;
                if finished {
                    break;
                }
                tokio::task::yield_now().await;
            }
            reads
        });

        writer.await.unwrap();
        assert!(reader.await.unwrap() > 0);
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{assert_reorder_is_atomic, item};
    use super::*;

    fn tid(s: &str) -> TenantId {
        TenantId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn list_is_ordered_and_tenant_scoped() {
        let store = MemoryContentStore::new();
        store.insert(item("acme", "a", 2)).await.unwrap();
        store.insert(item("acme", "b", 1)).await.unwrap();
        store.insert(item("beta", "c", 0)).await.unwrap();

        let acme = store.list(&tid("acme")).await.unwrap();
        let ids: Vec<_> = acme.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(acme.iter().all(|i| i.tenant_id == tid("acme")));

        assert!(store.list(&tid("gamma")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = MemoryContentStore::new();
        store.insert(item("acme", "a", 0)).await.unwrap();
        let err = store.insert(item("acme", "a", 0)).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(_)));
    }

    #[tokio::test]
    async fn update_and_delete_respect_tenant() {
        let store = MemoryContentStore::new();
        store.insert(item("acme", "a", 0)).await.unwrap();

        let patch = ContentPatch {
            title: Some("renamed".into()),
            ..ContentPatch::default()
        };
        let id = ContentId::from("a");
        assert!(store
            .update(&tid("beta"), &id, &patch, 5)
            .await
            .unwrap()
            .is_none());
        assert!(store.delete(&tid("beta"), &id).await.unwrap().is_none());

        let updated = store
            .update(&tid("acme"), &id, &patch, 5)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "renamed");
        assert_eq!(updated.updated_at, 5);

        assert!(store.delete(&tid("acme"), &id).await.unwrap().is_some());
        assert!(store.list(&tid("acme")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reorder_counts_matched_items_only() {
        let store = MemoryContentStore::new();
        store.insert(item("acme", "a", 0)).await.unwrap();
        store.insert(item("acme", "b", 1)).await.unwrap();
        store.insert(item("beta", "c", 0)).await.unwrap();

        let entries = vec![
            ReorderEntry {
                id: ContentId::from("a"),
                order: 9,
            },
            ReorderEntry {
                id: ContentId::from("c"),
                order: 9,
            },
        ];
        let matched = store.reorder(&tid("acme"), &entries, 7).await.unwrap();
        assert_eq!(matched, 1);

        let ids: Vec<_> = store
            .list(&tid("acme"))
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id.to_string())
            .collect();
        assert_eq!(ids, vec!["b", "a"]);

        let beta = store.list(&tid("beta")).await.unwrap();
        assert_eq!(beta[0].playlist_order, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_never_see_a_partial_reorder() {
        assert_reorder_is_atomic(Arc::new(MemoryContentStore::new()), 500).await;
    }
}
