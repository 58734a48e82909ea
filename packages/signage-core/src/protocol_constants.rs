//! Fixed constants shared with player clients and the admin console.
//!
//! Players and the console depend on these values; changing them breaks
//! deployed clients.

// ─────────────────────────────────────────────────────────────────────────────
// Service Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Service identifier reported by `/health`.
pub const SERVICE_ID: &str = "signage-control-plane";

// ─────────────────────────────────────────────────────────────────────────────
// Content Defaults
// ─────────────────────────────────────────────────────────────────────────────

/// Playback duration applied when an upload omits one (seconds).
pub const DEFAULT_DURATION_SECONDS: u32 = 10;

/// Playlist name applied when an upload omits one.
pub const DEFAULT_PLAYLIST_NAME: &str = "default";

/// Playlist order applied when an upload omits one.
pub const DEFAULT_PLAYLIST_ORDER: i64 = 0;

/// Largest accepted upload (500 MiB, enough for 1080p clips).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 500 * 1024 * 1024;

/// Content-type prefix that marks an upload as video. Everything else is an image.
pub const VIDEO_CONTENT_TYPE_PREFIX: &str = "video";

// ─────────────────────────────────────────────────────────────────────────────
// HTTP Surface
// ─────────────────────────────────────────────────────────────────────────────

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 5000;

/// URL prefix uploaded media is served under.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

/// Query/body parameter naming the tenant.
pub const TENANT_PARAM: &str = "tenantId";

/// Longest accepted tenant id.
pub const MAX_TENANT_ID_LEN: usize = 128;

/// Maximum JSON body accepted by non-upload endpoints (bytes).
pub const MAX_JSON_BODY_BYTES: usize = 1024 * 1024;

/// Suffix for in-flight upload and snapshot files before the atomic rename.
pub const TEMP_FILE_SUFFIX: &str = ".part";
