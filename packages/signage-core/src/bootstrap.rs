//! Application bootstrap and dependency wiring.
//!
//! This module contains the composition root - the single place where all
//! services are instantiated and wired together.

use std::sync::Arc;

use crate::api::MediaUploader;
use crate::auth::{IdentityVerifier, JwtVerifier, RejectAllVerifier};
use crate::content::{ContentRepository, FileContentStore, MemoryContentStore};
use crate::control::ControlChannel;
use crate::error::{SignageError, SignageResult};
use crate::events::EventEmitter;
use crate::publish::{PublishTracker, VersionClock};
use crate::services::ContentService;
use crate::state::{Config, TenancyMode};
use crate::tenant::TenantResolver;

/// Container for all bootstrapped services.
///
/// This struct holds all the wired services created during bootstrap.
/// It's consumed by `AppState` to build the final application state.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// Content CRUD coupled to publish versions.
    pub content: Arc<ContentService>,
    /// Per-scope control slots.
    pub control: Arc<ControlChannel>,
    /// Tenant derivation for requests.
    pub resolver: Arc<TenantResolver>,
    /// Bearer token verification.
    pub verifier: Arc<dyn IdentityVerifier>,
    /// Media file storage.
    pub uploads: Arc<MediaUploader>,
    /// Validated configuration.
    pub config: Arc<Config>,
}

/// Bootstraps all application services with their dependencies.
///
/// This is the composition root where all services are instantiated and
/// wired together.
///
/// # Arguments
///
/// * `config` - Application configuration, validated here
/// * `emitter` - Observer for content and control events
///
/// # Errors
///
/// Returns [`SignageError::Configuration`] for invalid settings or when the
/// data or uploads directories cannot be prepared.
pub fn bootstrap_services(
    config: Config,
    emitter: Arc<dyn EventEmitter>,
) -> SignageResult<BootstrappedServices> {
    config.validate()?;

    let resolver = TenantResolver::from_mode(&config.tenancy)?;
    if let TenancyMode::Single { tenant } = &config.tenancy {
        log::info!("[Bootstrap] Single-tenant mode, tenant '{}'", tenant);
    }

    let store: Arc<dyn ContentRepository> = match &config.data_dir {
        Some(dir) => Arc::new(FileContentStore::open(dir).map_err(|e| {
            SignageError::Configuration(format!("data_dir {}: {e}", dir.display()))
        })?),
        None => {
            log::info!("[Bootstrap] No data_dir configured, content is kept in memory");
            Arc::new(MemoryContentStore::new())
        }
    };

    let verifier: Arc<dyn IdentityVerifier> = match JwtVerifier::from_config(&config.jwt) {
        Some(verifier) => Arc::new(verifier),
        None => {
            log::warn!("[Bootstrap] No JWT secret configured, all bearer tokens will be rejected");
            Arc::new(RejectAllVerifier)
        }
    };

    let uploads = MediaUploader::new(
        config.uploads_dir.clone(),
        &config.uploads_url_prefix,
        config.max_upload_bytes,
    )
    .map_err(|e| {
        SignageError::Configuration(format!(
            "uploads_dir {}: {e}",
            config.uploads_dir.display()
        ))
    })?;

    // Publish versions and control slots draw from one clock.
    let clock = Arc::new(VersionClock::new());
    let publish = Arc::new(PublishTracker::new(Arc::clone(&clock)));
    let control = Arc::new(ControlChannel::new(clock, Arc::clone(&emitter)));
    let content = Arc::new(ContentService::new(
        store,
        publish,
        emitter,
        config.content.clone(),
    ));

    Ok(BootstrappedServices {
        content,
        control,
        resolver: Arc::new(resolver),
        verifier,
        uploads: Arc::new(uploads),
        config: Arc::new(config),
    })
}
