//! Content items and their playlist placement.
//!
//! A [`ContentItem`] is one uploaded image or video, owned by exactly one
//! tenant. Items are listed in ascending `playlist_order`, ties broken by
//! insertion order.

pub mod file_store;
pub mod store;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{SignageError, SignageResult};
use crate::protocol_constants::VIDEO_CONTENT_TYPE_PREFIX;
use crate::tenant::TenantId;
use crate::utils::coerce_integer;

pub use file_store::FileContentStore;
pub use store::{ContentRepository, MemoryContentStore, StoreError, StoreResult};

/// Opaque content identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Generates a fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ContentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of media an item holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Infers the media kind from an upload's content type.
    ///
    /// `video/*` is a video; anything else, including a missing type, is
    /// treated as an image.
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        match content_type {
            Some(ct) if ct.starts_with(VIDEO_CONTENT_TYPE_PREFIX) => Self::Video,
            _ => Self::Image,
        }
    }
}

/// A stored media item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: ContentId,
    pub tenant_id: TenantId,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    /// Public locator of the media file.
    pub url: String,
    pub duration_seconds: u32,
    pub playlist_name: String,
    pub playlist_order: i64,
    /// Unix millis.
    pub created_at: u64,
    /// Unix millis.
    pub updated_at: u64,
}

/// Fields for a new item. Optional fields fall back to configured defaults.
#[derive(Debug, Clone)]
pub struct NewContent {
    pub title: String,
    pub kind: MediaKind,
    pub url: String,
    pub duration_seconds: Option<u32>,
    pub playlist_name: Option<String>,
    pub playlist_order: Option<i64>,
}

/// Partial update. Only `Some` fields are applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentPatch {
    pub title: Option<String>,
    pub duration_seconds: Option<u32>,
    pub playlist_name: Option<String>,
    pub playlist_order: Option<i64>,
}

impl ContentPatch {
    /// Builds a patch from loosely typed request fields.
    ///
    /// Numeric fields accept numbers or numeric strings.
    ///
    /// # Errors
    ///
    /// Returns [`SignageError::Validation`] if a provided numeric field is
    /// not an integer, if the duration is not positive, or if the title is blank.
    pub fn from_request(
        title: Option<String>,
        duration_seconds: Option<&Value>,
        playlist_name: Option<String>,
        playlist_order: Option<&Value>,
    ) -> SignageResult<Self> {
        let title = match title {
            Some(t) if t.trim().is_empty() => {
                return Err(SignageError::Validation("title must not be empty".into()))
            }
            other => other,
        };

        let duration_seconds = duration_seconds
            .filter(|v| !v.is_null())
            .map(|v| {
                coerce_integer(v)
                    .and_then(|n| u32::try_from(n).ok())
                    .filter(|n| *n > 0)
                    .ok_or_else(|| {
                        SignageError::Validation(
                            "durationSeconds must be a positive integer".into(),
                        )
                    })
            })
            .transpose()?;

        let playlist_order = playlist_order
            .filter(|v| !v.is_null())
            .map(|v| {
                coerce_integer(v).ok_or_else(|| {
                    SignageError::Validation("playlistOrder must be an integer".into())
                })
            })
            .transpose()?;

        Ok(Self {
            title,
            duration_seconds,
            playlist_name,
            playlist_order,
        })
    }

    /// Applies the patch to `item`, stamping `updated_at`.
    pub fn apply_to(&self, item: &mut ContentItem, now: u64) {
        if let Some(title) = &self.title {
            item.title = title.clone();
        }
        if let Some(duration) = self.duration_seconds {
            item.duration_seconds = duration;
        }
        if let Some(name) = &self.playlist_name {
            item.playlist_name = name.clone();
        }
        if let Some(order) = self.playlist_order {
            item.playlist_order = order;
        }
        item.updated_at = now;
    }
}

/// One entry of a bulk reorder request, as received.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReorderEntry {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub order: Option<Value>,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

/// A validated reorder entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderEntry {
    pub id: ContentId,
    pub order: i64,
}

impl ReorderEntry {
    /// Validates a raw entry against the resolved tenant.
    ///
    /// Returns `None` (entry skipped) when the id is missing or blank, the
    /// order is not an integer, or the entry names a different tenant.
    /// An entry without a tenant, or with a blank one, is assumed to belong
    /// to `tenant`.
    pub fn validate(raw: &RawReorderEntry, tenant: &TenantId) -> Option<Self> {
        let id = match raw.id.as_ref()? {
            Value::String(s) if !s.trim().is_empty() => ContentId::from(s.trim()),
            _ => return None,
        };
        let order = coerce_integer(raw.order.as_ref()?)?;
        match raw.tenant_id.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() && t != tenant.as_str() => None,
            _ => Some(Self { id, order }),
        }
    }
}

/// Sorts items into playback order.
///
/// The sort is stable, so items with equal `playlist_order` keep their
/// insertion order.
pub fn sort_for_playback(items: &mut [ContentItem]) {
    items.sort_by_key(|item| item.playlist_order);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tenant() -> TenantId {
        TenantId::parse("acme").unwrap()
    }

    fn raw(id: Value, order: Value, tenant_id: Option<&str>) -> RawReorderEntry {
        RawReorderEntry {
            id: Some(id),
            order: Some(order),
            tenant_id: tenant_id.map(str::to_string),
        }
    }

    #[test]
    fn media_kind_from_content_type() {
        assert_eq!(
            MediaKind::from_content_type(Some("video/mp4")),
            MediaKind::Video
        );
        assert_eq!(
            MediaKind::from_content_type(Some("image/png")),
            MediaKind::Image
        );
        assert_eq!(
            MediaKind::from_content_type(Some("application/octet-stream")),
            MediaKind::Image
        );
        assert_eq!(MediaKind::from_content_type(None), MediaKind::Image);
    }

    #[test]
    fn item_serializes_with_wire_names() {
        let item = ContentItem {
            id: ContentId::from("x1"),
            tenant_id: tenant(),
            title: "ad1".into(),
            kind: MediaKind::Image,
            url: "/uploads/a.png".into(),
            duration_seconds: 10,
            playlist_name: "default".into(),
            playlist_order: 0,
            created_at: 1,
            updated_at: 2,
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["id"], "x1");
        assert_eq!(value["tenantId"], "acme");
        assert_eq!(value["type"], "image");
        assert_eq!(value["durationSeconds"], 10);
        assert_eq!(value["playlistName"], "default");
        assert_eq!(value["playlistOrder"], 0);
    }

    #[test]
    fn reorder_entry_accepts_numeric_strings() {
        let entry = ReorderEntry::validate(&raw(json!("x1"), json!("5"), None), &tenant());
        assert_eq!(
            entry,
            Some(ReorderEntry {
                id: ContentId::from("x1"),
                order: 5
            })
        );
    }

    #[test]
    fn reorder_entry_skips_invalid() {
        let t = tenant();
        assert!(ReorderEntry::validate(&raw(json!("x1"), json!("NaN"), None), &t).is_none());
        assert!(ReorderEntry::validate(&raw(json!(""), json!(1), None), &t).is_none());
        assert!(ReorderEntry::validate(&raw(json!(7), json!(1), None), &t).is_none());
        assert!(ReorderEntry::validate(&RawReorderEntry::default(), &t).is_none());
    }

    #[test]
    fn reorder_entry_skips_foreign_tenant() {
        let t = tenant();
        assert!(ReorderEntry::validate(&raw(json!("x1"), json!(1), Some("beta")), &t).is_none());
        assert!(ReorderEntry::validate(&raw(json!("x1"), json!(1), Some("acme")), &t).is_some());
    }

    #[test]
    fn reorder_entry_with_blank_tenant_counts_as_own() {
        let t = tenant();
        assert!(ReorderEntry::validate(&raw(json!("x1"), json!(1), Some("")), &t).is_some());
        assert!(ReorderEntry::validate(&raw(json!("x1"), json!(1), Some("  ")), &t).is_some());
        assert!(ReorderEntry::validate(&raw(json!("x1"), json!(1), Some(" acme ")), &t).is_some());
    }

    #[test]
    fn patch_from_request_coerces_numbers() {
        let patch = ContentPatch::from_request(
            Some("new".into()),
            Some(&json!("15")),
            None,
            Some(&json!(3)),
        )
        .unwrap();
        assert_eq!(patch.title.as_deref(), Some("new"));
        assert_eq!(patch.duration_seconds, Some(15));
        assert_eq!(patch.playlist_order, Some(3));
        assert_eq!(patch.playlist_name, None);
    }

    #[test]
    fn patch_from_request_rejects_bad_numbers() {
        assert!(ContentPatch::from_request(None, Some(&json!("abc")), None, None).is_err());
        assert!(ContentPatch::from_request(None, Some(&json!(0)), None, None).is_err());
        assert!(ContentPatch::from_request(None, None, None, Some(&json!("NaN"))).is_err());
        assert!(ContentPatch::from_request(Some("  ".into()), None, None, None).is_err());
    }

    #[test]
    fn sort_is_stable_for_equal_orders() {
        let mk = |id: &str, order: i64| ContentItem {
            id: ContentId::from(id),
            tenant_id: tenant(),
            title: id.into(),
            kind: MediaKind::Image,
            url: String::new(),
            duration_seconds: 10,
            playlist_name: "default".into(),
            playlist_order: order,
            created_at: 0,
            updated_at: 0,
        };
        let mut items = vec![mk("a", 1), mk("b", 0), mk("c", 1), mk("d", 0)];
        sort_for_playback(&mut items);
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "a", "c"]);
    }
}
