//! Content operations coupled to publish versioning.
//!
//! Every successful mutation bumps the tenant's publish version after the
//! store has acknowledged the write. Handlers reach the store only through
//! this service, so a write can never skip the bump.

use std::sync::Arc;

use serde::Serialize;

use crate::content::{
    ContentId, ContentItem, ContentPatch, ContentRepository, NewContent, RawReorderEntry,
    ReorderEntry,
};
use crate::error::{SignageError, SignageResult};
use crate::events::{ChangeCause, ContentEvent, EventEmitter};
use crate::protocol_constants::DEFAULT_PLAYLIST_ORDER;
use crate::publish::PublishTracker;
use crate::state::ContentDefaults;
use crate::tenant::TenantId;
use crate::utils::now_millis;

/// Result of a bulk reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderOutcome {
    /// Valid entries that matched an item of the tenant.
    pub updated: usize,
    /// Entries dropped by validation.
    pub skipped: usize,
}

/// Tenant-scoped content management.
pub struct ContentService {
    store: Arc<dyn ContentRepository>,
    publish: Arc<PublishTracker>,
    emitter: Arc<dyn EventEmitter>,
    defaults: ContentDefaults,
}

impl ContentService {
    pub fn new(
        store: Arc<dyn ContentRepository>,
        publish: Arc<PublishTracker>,
        emitter: Arc<dyn EventEmitter>,
        defaults: ContentDefaults,
    ) -> Self {
        Self {
            store,
            publish,
            emitter,
            defaults,
        }
    }

    /// Stores a new item for `tenant`, filling unset fields from defaults.
    pub async fn create(&self, tenant: &TenantId, new: NewContent) -> SignageResult<ContentItem> {
        if new.title.trim().is_empty() {
            return Err(SignageError::Validation("title is required".into()));
        }

        let now = now_millis();
        let item = ContentItem {
            id: ContentId::generate(),
            tenant_id: tenant.clone(),
            title: new.title,
            kind: new.kind,
            url: new.url,
            duration_seconds: new
                .duration_seconds
                .filter(|d| *d > 0)
                .unwrap_or(self.defaults.duration_seconds),
            playlist_name: new
                .playlist_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| self.defaults.playlist_name.clone()),
            playlist_order: new.playlist_order.unwrap_or(DEFAULT_PLAYLIST_ORDER),
            created_at: now,
            updated_at: now,
        };

        let item = self.store.insert(item).await?;
        log::info!("[Content] {} created {} ({:?})", tenant, item.id, item.kind);
        self.changed(tenant, ChangeCause::Created, 1);
        Ok(item)
    }

    /// Returns the tenant's items in playback order.
    pub async fn list(&self, tenant: &TenantId) -> SignageResult<Vec<ContentItem>> {
        Ok(self.store.list(tenant).await?)
    }

    /// Applies `patch` to the tenant's item `id`.
    ///
    /// # Errors
    ///
    /// [`SignageError::NotFound`] if the tenant has no item with that id,
    /// including when the id belongs to another tenant.
    pub async fn update(
        &self,
        tenant: &TenantId,
        id: &str,
        patch: ContentPatch,
    ) -> SignageResult<ContentItem> {
        let id = ContentId::from(id);
        let updated = self
            .store
            .update(tenant, &id, &patch, now_millis())
            .await?
            .ok_or_else(|| not_found(&id))?;
        log::info!("[Content] {} updated {}", tenant, id);
        self.changed(tenant, ChangeCause::Updated, 1);
        Ok(updated)
    }

    /// Applies the valid entries of a reorder request as one batch.
    ///
    /// Invalid entries are skipped. The publish version moves once for the
    /// whole batch, and not at all when no entry matched an item.
    ///
    /// # Errors
    ///
    /// [`SignageError::Validation`] if no entry is valid.
    pub async fn reorder(
        &self,
        tenant: &TenantId,
        raw: &[RawReorderEntry],
    ) -> SignageResult<ReorderOutcome> {
        let entries: Vec<ReorderEntry> = raw
            .iter()
            .filter_map(|entry| ReorderEntry::validate(entry, tenant))
            .collect();
        if entries.is_empty() {
            return Err(SignageError::Validation("No valid items to update".into()));
        }

        let updated = self.store.reorder(tenant, &entries, now_millis()).await?;
        let skipped = raw.len() - entries.len();
        if skipped > 0 {
            log::debug!("[Content] {} reorder skipped {} entries", tenant, skipped);
        }
        if updated == 0 {
            log::debug!("[Content] {} reorder matched no items", tenant);
            return Ok(ReorderOutcome { updated, skipped });
        }
        log::info!("[Content] {} reordered {} item(s)", tenant, updated);
        self.changed(tenant, ChangeCause::Reordered, updated);
        Ok(ReorderOutcome { updated, skipped })
    }

    /// Removes the tenant's item `id` and returns it.
    ///
    /// # Errors
    ///
    /// [`SignageError::NotFound`] if the tenant has no item with that id.
    pub async fn delete(&self, tenant: &TenantId, id: &str) -> SignageResult<ContentItem> {
        let id = ContentId::from(id);
        let removed = self
            .store
            .delete(tenant, &id)
            .await?
            .ok_or_else(|| not_found(&id))?;
        log::info!("[Content] {} deleted {}", tenant, id);
        self.changed(tenant, ChangeCause::Deleted, 1);
        Ok(removed)
    }

    /// Forces players of `tenant` to re-fetch. Returns the new version.
    pub fn publish(&self, tenant: &TenantId) -> u64 {
        self.changed(tenant, ChangeCause::Published, 0)
    }

    /// Current publish version of `tenant`, `0` if it never published.
    pub fn version(&self, tenant: &TenantId) -> u64 {
        self.publish.read(tenant)
    }

    fn changed(&self, tenant: &TenantId, cause: ChangeCause, affected: usize) -> u64 {
        let version = self.publish.bump(tenant);
        self.emitter.emit_content(ContentEvent {
            tenant_id: tenant.clone(),
            cause,
            version,
            affected,
        });
        version
    }
}

fn not_found(id: &ContentId) -> SignageError {
    SignageError::NotFound(format!("content {id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{MediaKind, MemoryContentStore};
    use crate::events::test_support::RecordingEventEmitter;
    use crate::events::NoopEventEmitter;
    use crate::publish::VersionClock;
    use serde_json::json;

    fn tid(s: &str) -> TenantId {
        TenantId::parse(s).unwrap()
    }

    fn service() -> ContentService {
        ContentService::new(
            Arc::new(MemoryContentStore::new()),
            Arc::new(PublishTracker::new(Arc::new(VersionClock::new()))),
            Arc::new(NoopEventEmitter),
            ContentDefaults::default(),
        )
    }

    fn new_image(title: &str, order: Option<i64>) -> NewContent {
        NewContent {
            title: title.into(),
            kind: MediaKind::Image,
            url: format!("/uploads/{title}.png"),
            duration_seconds: Some(10),
            playlist_name: None,
            playlist_order: order,
        }
    }

    fn raw(id: &str, order: serde_json::Value) -> RawReorderEntry {
        RawReorderEntry {
            id: Some(json!(id)),
            order: Some(order),
            tenant_id: None,
        }
    }

    mod create {
        use super::*;

        #[tokio::test]
        async fn created_item_is_listed_and_version_moves() {
            let service = service();
            let acme = tid("acme");
            assert_eq!(service.version(&acme), 0);

            let item = service
                .create(&acme, new_image("ad1", Some(0)))
                .await
                .unwrap();

            let items = service.list(&acme).await.unwrap();
            assert_eq!(items.len(), 1);
            assert_eq!(items[0], item);
            assert_eq!(item.title, "ad1");
            assert_eq!(item.kind, MediaKind::Image);
            assert_eq!(item.duration_seconds, 10);
            assert_eq!(item.playlist_order, 0);
            assert_eq!(item.playlist_name, "default");
            assert!(service.version(&acme) > 0);
        }

        #[tokio::test]
        async fn defaults_fill_missing_fields() {
            let service = service();
            let new = NewContent {
                duration_seconds: None,
                ..new_image("ad1", None)
            };
            let item = service.create(&tid("acme"), new).await.unwrap();
            assert_eq!(item.duration_seconds, 10);
            assert_eq!(item.playlist_order, 0);
        }

        #[tokio::test]
        async fn blank_title_is_rejected_without_bump() {
            let service = service();
            let acme = tid("acme");
            let err = service
                .create(&acme, new_image("  ", None))
                .await
                .unwrap_err();
            assert!(matches!(err, SignageError::Validation(_)));
            assert_eq!(service.version(&acme), 0);
        }
    }

    mod mutations {
        use super::*;

        #[tokio::test]
        async fn every_mutation_strictly_increases_version() {
            let service = service();
            let acme = tid("acme");

            let item = service.create(&acme, new_image("a", None)).await.unwrap();
            let v1 = service.version(&acme);

            let patch = ContentPatch {
                title: Some("b".into()),
                ..ContentPatch::default()
            };
            service.update(&acme, item.id.as_str(), patch).await.unwrap();
            let v2 = service.version(&acme);
            assert!(v2 > v1);

            service
                .reorder(&acme, &[raw(item.id.as_str(), json!(4))])
                .await
                .unwrap();
            let v3 = service.version(&acme);
            assert!(v3 > v2);

            let v4 = service.publish(&acme);
            assert!(v4 > v3);
            assert_eq!(service.version(&acme), v4);

            service.delete(&acme, item.id.as_str()).await.unwrap();
            assert!(service.version(&acme) > v4);
        }

        #[tokio::test]
        async fn reorder_skips_invalid_entries() {
            let service = service();
            let acme = tid("acme");
            let x = service.create(&acme, new_image("x", None)).await.unwrap();
            let y = service.create(&acme, new_image("y", Some(1))).await.unwrap();

            let outcome = service
                .reorder(
                    &acme,
                    &[raw(x.id.as_str(), json!(5)), raw("bad-id", json!("NaN"))],
                )
                .await
                .unwrap();
            assert_eq!(
                outcome,
                ReorderOutcome {
                    updated: 1,
                    skipped: 1
                }
            );

            let items = service.list(&acme).await.unwrap();
            assert_eq!(items[0].id, y.id);
            assert_eq!(items[1].id, x.id);
            assert_eq!(items[1].playlist_order, 5);
        }

        #[tokio::test]
        async fn reorder_with_no_valid_entries_is_rejected() {
            let service = service();
            let acme = tid("acme");
            let err = service
                .reorder(&acme, &[raw("a", json!("NaN")), RawReorderEntry::default()])
                .await
                .unwrap_err();
            assert!(matches!(err, SignageError::Validation(m) if m == "No valid items to update"));
            assert_eq!(service.version(&acme), 0);
        }

        #[tokio::test]
        async fn reorder_matching_nothing_keeps_version() {
            let service = service();
            let zeta = tid("zeta");

            let outcome = service
                .reorder(&zeta, &[raw("ghost", json!(1))])
                .await
                .unwrap();
            assert_eq!(
                outcome,
                ReorderOutcome {
                    updated: 0,
                    skipped: 0
                }
            );
            assert_eq!(service.version(&zeta), 0);
        }

        #[tokio::test]
        async fn reorder_of_foreign_id_keeps_both_versions() {
            let service = service();
            let acme = tid("acme");
            let beta = tid("beta");
            let item = service.create(&acme, new_image("a", None)).await.unwrap();
            let acme_version = service.version(&acme);

            let outcome = service
                .reorder(&beta, &[raw(item.id.as_str(), json!(9))])
                .await
                .unwrap();
            assert_eq!(outcome.updated, 0);
            assert_eq!(service.version(&beta), 0);
            assert_eq!(service.version(&acme), acme_version);
            assert_eq!(service.list(&acme).await.unwrap()[0].playlist_order, 0);
        }

        #[tokio::test]
        async fn cross_tenant_delete_is_not_found_and_keeps_item() {
            let service = service();
            let acme = tid("acme");
            let beta = tid("beta");
            let item = service.create(&acme, new_image("a", None)).await.unwrap();
            let before = service.version(&beta);

            let err = service.delete(&beta, item.id.as_str()).await.unwrap_err();
            assert!(matches!(err, SignageError::NotFound(_)));
            assert_eq!(service.list(&acme).await.unwrap().len(), 1);
            assert_eq!(service.version(&beta), before);
        }

        #[tokio::test]
        async fn update_of_unknown_id_is_not_found() {
            let service = service();
            let err = service
                .update(&tid("acme"), "missing", ContentPatch::default())
                .await
                .unwrap_err();
            assert!(matches!(err, SignageError::NotFound(_)));
        }
    }

    mod versions {
        use super::*;

        #[tokio::test]
        async fn untouched_tenant_reads_zero() {
            let service = service();
            service
                .create(&tid("acme"), new_image("a", None))
                .await
                .unwrap();
            assert_eq!(service.version(&tid("beta")), 0);
        }

        #[tokio::test]
        async fn mutations_emit_content_events() {
            let emitter = Arc::new(RecordingEventEmitter::default());
            let service = ContentService::new(
                Arc::new(MemoryContentStore::new()),
                Arc::new(PublishTracker::new(Arc::new(VersionClock::new()))),
                Arc::clone(&emitter) as Arc<dyn EventEmitter>,
                ContentDefaults::default(),
            );
            let acme = tid("acme");
            service.create(&acme, new_image("a", None)).await.unwrap();
            let published = service.publish(&acme);

            let events = emitter.content.lock();
            assert_eq!(events.len(), 2);
            assert_eq!(events[0].cause, ChangeCause::Created);
            assert_eq!(events[1].cause, ChangeCause::Published);
            assert_eq!(events[1].version, published);
        }
    }
}
