//! Core configuration types.
//!
//! [`Config`] holds every setting the core services need. The server binary
//! builds it from YAML, environment and CLI overrides; tests build it
//! directly with struct-update syntax over [`Config::default`].

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{SignageError, SignageResult};
use crate::protocol_constants::{
    DEFAULT_DURATION_SECONDS, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_PLAYLIST_NAME, DEFAULT_PORT,
    UPLOADS_URL_PREFIX,
};

/// How tenants are derived for incoming requests.
///
/// Single-tenant deployments are a configuration of the same code path:
/// the resolver simply always yields the configured tenant.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TenancyMode {
    /// Tenant derived per request from the caller and request parameters.
    #[default]
    Multi,
    /// Every request is scoped to one fixed tenant.
    Single {
        /// The installation's tenant id.
        tenant: String,
    },
}

/// Defaults applied to content items when optional fields are absent.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ContentDefaults {
    /// Playback duration in seconds.
    pub duration_seconds: u32,
    /// Playlist an item lands in when none is given.
    pub playlist_name: String,
}

impl Default for ContentDefaults {
    fn default() -> Self {
        Self {
            duration_seconds: DEFAULT_DURATION_SECONDS,
            playlist_name: DEFAULT_PLAYLIST_NAME.to_string(),
        }
    }
}

/// Bearer token verification settings.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct JwtConfig {
    /// HS256 shared secret. When unset every bearer token is rejected.
    pub secret: Option<String>,
    /// Expected `iss` claim, if any.
    pub issuer: Option<String>,
    /// Expected `aud` claim, if any.
    pub audience: Option<String>,
    /// Clock skew tolerance for `exp`/`nbf` (seconds).
    pub leeway_seconds: u64,
}

/// Configuration for the signage control plane.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    // Server
    /// Address the HTTP server binds to.
    pub bind_address: IpAddr,

    /// Port the HTTP server binds to.
    pub port: u16,

    /// Allowed CORS origins. Empty allows any origin.
    pub cors_allowed_origins: Vec<String>,

    // Tenancy
    /// Multi-tenant (default) or fixed single-tenant deployment.
    pub tenancy: TenancyMode,

    /// Token verification.
    pub jwt: JwtConfig,

    // Content
    /// Defaults for optional content fields.
    pub content: ContentDefaults,

    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: u64,

    /// Directory for durable content metadata. `None` keeps content in memory.
    pub data_dir: Option<PathBuf>,

    /// Directory uploaded media files are written to.
    pub uploads_dir: PathBuf,

    /// Public URL prefix under which uploaded media is served.
    pub uploads_url_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            cors_allowed_origins: Vec::new(),
            tenancy: TenancyMode::default(),
            jwt: JwtConfig::default(),
            content: ContentDefaults::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            data_dir: None,
            uploads_dir: PathBuf::from("uploads"),
            uploads_url_prefix: UPLOADS_URL_PREFIX.to_string(),
        }
    }
}

impl Config {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`SignageError::Configuration`] if any value would cause
    /// runtime issues.
    pub fn validate(&self) -> SignageResult<()> {
        if self.max_upload_bytes == 0 {
            return Err(SignageError::Configuration(
                "max_upload_bytes must be >= 1".to_string(),
            ));
        }
        if usize::try_from(self.max_upload_bytes).is_err() {
            return Err(SignageError::Configuration(
                "max_upload_bytes does not fit in memory addressing on this platform".to_string(),
            ));
        }
        if let TenancyMode::Single { tenant } = &self.tenancy {
            if tenant.trim().is_empty() {
                return Err(SignageError::Configuration(
                    "single-tenant mode requires a tenant".to_string(),
                ));
            }
        }
        if matches!(self.jwt.secret.as_deref(), Some(s) if s.is_empty()) {
            return Err(SignageError::Configuration(
                "jwt.secret must not be empty".to_string(),
            ));
        }
        validate_uploads_prefix(&self.uploads_url_prefix)?;
        if self.content.duration_seconds == 0 {
            return Err(SignageError::Configuration(
                "content.duration_seconds must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Leading path segments owned by the router itself.
const RESERVED_PREFIXES: &[&str] = &["api", "health"];

/// Checks the prefix the way the router will mount it, trailing slashes
/// stripped.
fn validate_uploads_prefix(prefix: &str) -> SignageResult<()> {
    let invalid = |why: &str| {
        Err(SignageError::Configuration(format!(
            "uploads_url_prefix '{prefix}' {why}"
        )))
    };

    let mounted = prefix.trim_end_matches('/');
    if !mounted.starts_with('/') || mounted.len() < 2 {
        return invalid("must be an absolute path like /uploads");
    }
    let segments: Vec<&str> = mounted[1..].split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return invalid("must not contain empty path segments");
    }
    let safe = mounted
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_' | '.'));
    if !safe {
        return invalid("may only contain letters, digits, '-', '_', '.' and '/'");
    }
    if RESERVED_PREFIXES.contains(&segments[0]) {
        return invalid("overlaps the API routes");
    }
    Ok(())
}
