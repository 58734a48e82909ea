//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use signage_core::protocol_constants::{
    DEFAULT_DURATION_SECONDS, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_PLAYLIST_NAME, DEFAULT_PORT,
    UPLOADS_URL_PREFIX,
};
use signage_core::{ContentDefaults, JwtConfig, TenancyMode};

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to.
    /// Override: `SIGNAGE_BIND_ADDRESS`
    pub bind_address: IpAddr,

    /// Port to bind the HTTP server to.
    /// Override: `SIGNAGE_BIND_PORT`
    pub bind_port: u16,

    /// Pins every request to one tenant. Unset means multi-tenant.
    /// Override: `SIGNAGE_SINGLE_TENANT`
    pub single_tenant: Option<String>,

    /// HS256 secret for verifying admin console tokens.
    /// Override: `SIGNAGE_JWT_SECRET`
    pub jwt_secret: Option<String>,

    /// Expected token issuer.
    pub jwt_issuer: Option<String>,

    /// Expected token audience.
    pub jwt_audience: Option<String>,

    /// Clock skew tolerance for token expiry, in seconds.
    pub jwt_leeway_seconds: u64,

    /// Largest accepted media upload, in bytes.
    /// Override: `SIGNAGE_MAX_UPLOAD_BYTES`
    pub max_upload_bytes: u64,

    /// Duration given to items uploaded without one.
    pub default_duration_seconds: u32,

    /// Playlist items land in when none is given.
    pub default_playlist_name: String,

    /// Directory for durable content metadata. Unset keeps content in memory.
    /// Override: `SIGNAGE_DATA_DIR`
    pub data_dir: Option<PathBuf>,

    /// Directory uploaded media is written to.
    /// Override: `SIGNAGE_UPLOADS_DIR`
    pub uploads_dir: PathBuf,

    /// URL prefix uploaded media is served under.
    pub uploads_url_prefix: String,

    /// Allowed CORS origins. Empty allows any origin.
    /// Override: `SIGNAGE_CORS_ORIGINS` (comma-separated)
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            bind_port: DEFAULT_PORT,
            single_tenant: None,
            jwt_secret: None,
            jwt_issuer: None,
            jwt_audience: None,
            jwt_leeway_seconds: 0,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            default_duration_seconds: DEFAULT_DURATION_SECONDS,
            default_playlist_name: DEFAULT_PLAYLIST_NAME.to_string(),
            data_dir: None,
            uploads_dir: PathBuf::from("uploads"),
            uploads_url_prefix: UPLOADS_URL_PREFIX.to_string(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_yaml(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Applies environment variable overrides to the configuration.
    ///
    /// Unparseable values are ignored with a warning.
    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("SIGNAGE_BIND_ADDRESS") {
            match val.parse() {
                Ok(addr) => self.bind_address = addr,
                Err(_) => log::warn!("Ignoring invalid SIGNAGE_BIND_ADDRESS '{}'", val),
            }
        }

        if let Some(val) = var("SIGNAGE_BIND_PORT") {
            match val.parse() {
                Ok(port) => self.bind_port = port,
                Err(_) => log::warn!("Ignoring invalid SIGNAGE_BIND_PORT '{}'", val),
            }
        }

        if let Some(val) = var("SIGNAGE_MAX_UPLOAD_BYTES") {
            match val.parse() {
                Ok(bytes) => self.max_upload_bytes = bytes,
                Err(_) => log::warn!("Ignoring invalid SIGNAGE_MAX_UPLOAD_BYTES '{}'", val),
            }
        }

        if let Some(val) = var("SIGNAGE_SINGLE_TENANT") {
            self.single_tenant = Some(val).filter(|t| !t.trim().is_empty());
        }

        if let Some(val) = var("SIGNAGE_UPLOADS_DIR") {
            self.uploads_dir = PathBuf::from(val);
        }

        if let Some(val) = var("SIGNAGE_CORS_ORIGINS") {
            self.cors_allowed_origins = val
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }

        // Note: SIGNAGE_JWT_SECRET and SIGNAGE_DATA_DIR are handled by clap
        // via #[arg(env = ...)] in main.rs
    }

    /// Converts to signage-core's Config type.
    pub fn to_core_config(&self) -> signage_core::Config {
        let tenancy = match &self.single_tenant {
            Some(tenant) => TenancyMode::Single {
                tenant: tenant.clone(),
            },
            None => TenancyMode::Multi,
        };

        signage_core::Config {
            bind_address: self.bind_address,
            port: self.bind_port,
            cors_allowed_origins: self.cors_allowed_origins.clone(),
            tenancy,
            jwt: JwtConfig {
                secret: self.jwt_secret.clone(),
                issuer: self.jwt_issuer.clone(),
                audience: self.jwt_audience.clone(),
                leeway_seconds: self.jwt_leeway_seconds,
            },
            content: ContentDefaults {
                duration_seconds: self.default_duration_seconds,
                playlist_name: self.default_playlist_name.clone(),
            },
            max_upload_bytes: self.max_upload_bytes,
            data_dir: self.data_dir.clone(),
            uploads_dir: self.uploads_dir.clone(),
            uploads_url_prefix: self.uploads_url_prefix.clone(),
        }
    }
}
