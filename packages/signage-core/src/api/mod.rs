//! HTTP API layer.
//!
//! This module contains thin handlers that delegate to services.
//! It provides the router construction and server startup functionality.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;

use crate::auth::IdentityVerifier;
use crate::bootstrap::BootstrappedServices;
use crate::control::ControlChannel;
use crate::services::ContentService;
use crate::state::Config;
use crate::tenant::TenantResolver;

pub mod extract;
pub mod http;
pub mod response;
pub mod upload;

pub use upload::MediaUploader;

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the listen address.
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// The server stopped with an I/O error.
    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Shared application state for the API layer.
///
/// This is a thin wrapper that holds references to services.
/// All business logic lives in the services themselves.
#[derive(Clone)]
pub struct AppState {
    /// Content CRUD coupled to publish versions.
    pub content: Arc<ContentService>,
    /// Per-scope control slots.
    pub control: Arc<ControlChannel>,
    /// Derives the tenant of each request.
    pub resolver: Arc<TenantResolver>,
    /// Verifies bearer tokens.
    pub verifier: Arc<dyn IdentityVerifier>,
    /// Stores uploaded media files.
    pub uploads: Arc<MediaUploader>,
    /// Application configuration.
    pub config: Arc<Config>,
}

impl AppState {
    /// Builds the API state from bootstrapped services.
    pub fn new(services: &BootstrappedServices) -> Self {
        Self {
            content: Arc::clone(&services.content),
            control: Arc::clone(&services.control),
            resolver: Arc::clone(&services.resolver),
            verifier: Arc::clone(&services.verifier),
            uploads: Arc::clone(&services.uploads),
            config: Arc::clone(&services.config),
        }
    }
}

/// Starts the HTTP server and runs it until `shutdown` resolves.
pub async fn start_server<F>(state: AppState, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::new(state.config.bind_address, state.config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    log::info!("[Server] Listening on http://{}", addr);
    let app = http::create_router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    log::info!("[Server] Stopped");
    Ok(())
}
