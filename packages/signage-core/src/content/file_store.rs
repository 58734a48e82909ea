//! Durable content store backed by per-tenant JSON snapshots.
//!
//! Each tenant's rows live in `<data_dir>/content/<hex(tenant)>.json`. Tenant
//! ids are case-sensitive, so the file name is hex-encoded to keep `Acme` and
//! `acme` apart on case-insensitive filesystems. A mutation
//! is applied to a copy of the rows, the copy is written to a temp file and
//! renamed over the snapshot, and only then does the copy replace the
//! in-memory rows. A failed write leaves both disk and memory untouched.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;

use super::store::{rows, ContentRepository, StoreResult};
use super::{ContentId, ContentItem, ContentPatch, ReorderEntry};
use crate::protocol_constants::TEMP_FILE_SUFFIX;
use crate::tenant::TenantId;

const CONTENT_DIR: &str = "content";

/// `None` until the tenant's snapshot has been loaded.
type Cell = Arc<RwLock<Option<Vec<ContentItem>>>>;

/// Content store that survives restarts.
///
/// Tenants are loaded lazily on first write. Reads of tenants that were
/// never written in this process go straight to the snapshot file.
pub struct FileContentStore {
    dir: PathBuf,
    tenants: DashMap<TenantId, Cell>,
}

impl FileContentStore {
    /// Opens (creating if needed) the store under `data_dir`.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        let dir = data_dir.join(CONTENT_DIR);
        std::fs::create_dir_all(&dir)?;
        log::info!("[Content] Durable store at {}", dir.display());
        Ok(Self {
            dir,
            tenants: DashMap::new(),
        })
    }

    fn snapshot_path(&self, tenant: &TenantId) -> PathBuf {
        self.dir.join(format!("{}.json", snapshot_stem(tenant)))
    }

    fn cell(&self, tenant: &TenantId) -> Cell {
        Arc::clone(
            self.tenants
                .entry(tenant.clone())
                .or_insert_with(|| Arc::new(RwLock::new(None)))
                .value(),
        )
    }

    async fn load(&self, tenant: &TenantId) -> StoreResult<Vec<ContentItem>> {
        let path = self.snapshot_path(tenant);
        let mut items: Vec<ContentItem> = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let before = items.len();
        items.retain(|item| &item.tenant_id == tenant);
        if items.len() != before {
            log::warn!(
                "[Content] Dropped {} foreign row(s) from snapshot {}",
                before - items.len(),
                path.display()
            );
        }
        Ok(items)
    }

    async fn persist(&self, tenant: &TenantId, items: &[ContentItem]) -> StoreResult<()> {
        let path = self.snapshot_path(tenant);
        let temp_path = self
            .dir
            .join(format!("{}.json{}", snapshot_stem(tenant), TEMP_FILE_SUFFIX));
        let contents = serde_json::to_vec_pretty(items)?;

        // Write to temp file first
        tokio::fs::write(&temp_path, contents).await?;
        // Atomic rename (on most filesystems)
        tokio::fs::rename(&temp_path, &path).await?;
        Ok(())
    }

    /// Runs `op` against a copy of the tenant's rows and commits the copy
    /// once it is on disk. `op` returns its result and whether it changed
    /// anything; unchanged rows skip the write.
    async fn mutate<T, F>(&self, tenant: &TenantId, op: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Vec<ContentItem>) -> StoreResult<(T, bool)> + Send,
        T: Send,
    {
        let cell = self.cell(tenant);
        let mut guard = cell.write().await;
        if guard.is_none() {
            let loaded = self.load(tenant).await?;
            *guard = Some(loaded);
        }

        let mut next = (*guard).clone().unwrap_or_default();
        let (result, changed) = op(&mut next)?;
        if changed {
            self.persist(tenant, &next).await?;
            *guard = Some(next);
        }
        Ok(result)
    }
}

fn snapshot_stem(tenant: &TenantId) -> String {
    hex::encode(tenant.as_str())
}

#[async_trait]
impl ContentRepository for FileContentStore {
    async fn insert(&self, item: ContentItem) -> StoreResult<ContentItem> {
        let tenant = item.tenant_id.clone();
        self.mutate(&tenant, move |items| Ok((rows::insert(items, item)?, true)))
            .await
    }

    async fn list(&self, tenant: &TenantId) -> StoreResult<Vec<ContentItem>> {
        let cell = self.tenants.get(tenant).map(|c| Arc::clone(c.value()));
        if let Some(cell) = cell {
            if let Some(items) = cell.read().await.as_deref() {
                return Ok(rows::sorted(items));
            }
        }
        Ok(rows::sorted(&self.load(tenant).await?))
    }

    async fn update(
        &self,
        tenant: &TenantId,
        id: &ContentId,
        patch: &ContentPatch,
        now: u64,
    ) -> StoreResult<Option<ContentItem>> {
        self.mutate(tenant, |items| {
            let updated = rows::update(items, id, patch, now);
            let changed = updated.is_some();
            Ok((updated, changed))
        })
        .await
    }

    async fn reorder(
        &self,
        tenant: &TenantId,
        entries: &[ReorderEntry],
        now: u64,
    ) -> StoreResult<usize> {
        self.mutate(tenant, |items| {
            let matched = rows::reorder(items, entries, now);
            Ok((matched, matched > 0))
        })
        .await
    }

    async fn delete(&self, tenant: &TenantId, id: &ContentId) -> StoreResult<Option<ContentItem>> {
        self.mutate(tenant, |items| {
            let removed = rows::delete(items, id);
            let changed = removed.is_some();
            Ok((removed, changed))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::store::test_support::{assert_reorder_is_atomic, item};

    fn tid(s: &str) -> TenantId {
        TenantId::parse(s).unwrap()
    }

    fn snapshot(dir: &tempfile::TempDir, tenant: &str) -> PathBuf {
        dir.path()
            .join(CONTENT_DIR)
            .join(format!("{}.json", hex::encode(tenant)))
    }

    #[tokio::test]
    async fn snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileContentStore::open(dir.path()).unwrap();
            store.insert(item("acme", "a", 3)).await.unwrap();
            store.insert(item("acme", "b", 1)).await.unwrap();
            store
                .reorder(
                    &tid("acme"),
                    &[ReorderEntry {
                        id: ContentId::from("a"),
                        order: 0,
                    }],
                    9,
                )
                .await
                .unwrap();
        }

        let reopened = FileContentStore::open(dir.path()).unwrap();
        let items = reopened.list(&tid("acme")).await.unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(snapshot(&dir, "acme").exists());
        assert!(!snapshot(&dir, "acme").with_extension("json.part").exists());
    }

    #[tokio::test]
    async fn unknown_tenant_lists_empty_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileContentStore::open(dir.path()).unwrap();
        assert!(store.list(&tid("ghost")).await.unwrap().is_empty());
        assert!(!snapshot(&dir, "ghost").exists());
    }

    #[tokio::test]
    async fn delete_of_foreign_item_leaves_snapshot_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileContentStore::open(dir.path()).unwrap();
        store.insert(item("acme", "a", 0)).await.unwrap();

        let removed = store
            .delete(&tid("beta"), &ContentId::from("a"))
            .await
            .unwrap();
        assert!(removed.is_none());
        assert!(!snapshot(&dir, "beta").exists());
        assert_eq!(store.list(&tid("acme")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_write_leaves_rows_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileContentStore::open(dir.path()).unwrap();
        store.insert(item("acme", "a", 0)).await.unwrap();

        // A directory squatting on the temp path makes the snapshot write fail.
        std::fs::create_dir(snapshot(&dir, "acme").with_extension("json.part")).unwrap();

        let result = store.insert(item("acme", "b", 1)).await;
        assert!(result.is_err());
        let ids: Vec<_> = store
            .list(&tid("acme"))
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id.to_string())
            .collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[tokio::test]
    async fn tenants_differing_in_case_keep_separate_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileContentStore::open(dir.path()).unwrap();
        store.insert(item("Acme", "upper", 0)).await.unwrap();
        store.insert(item("acme", "lower", 0)).await.unwrap();

        let upper = snapshot(&dir, "Acme");
        let lower = snapshot(&dir, "acme");
        assert_ne!(
            upper.file_name().unwrap().to_ascii_lowercase(),
            lower.file_name().unwrap().to_ascii_lowercase()
        );

        let reopened = FileContentStore::open(dir.path()).unwrap();
        let ids = |items: Vec<ContentItem>| -> Vec<String> {
            items.into_iter().map(|i| i.id.to_string()).collect()
        };
        assert_eq!(ids(reopened.list(&tid("Acme")).await.unwrap()), vec!["upper"]);
        assert_eq!(ids(reopened.list(&tid("acme")).await.unwrap()), vec!["lower"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_never_see_a_partial_reorder() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileContentStore::open(dir.path()).unwrap();
        assert_reorder_is_atomic(Arc::new(store), 100).await;
    }
}
