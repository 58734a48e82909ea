//! Signage Core - shared library for the signage control plane.
//!
//! This crate provides everything behind the admin console and the player
//! polling endpoints: tenant-scoped content storage, per-tenant publish
//! versions and a single-slot remote control channel. It is used by the
//! headless server binary and can be embedded elsewhere.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`tenant`]: Tenant ids, caller identity and tenant resolution
//! - [`auth`]: Bearer token verification
//! - [`content`]: Content items and the tenant-scoped stores
//! - [`publish`]: Per-tenant publish versions
//! - [`control`]: Per-scope control state
//! - [`services`]: Content operations coupled to publish versioning
//! - [`events`]: Domain events for in-process observers
//! - [`api`]: HTTP router, handlers and server startup
//! - [`state`]: Configuration
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! - [`ContentRepository`](content::ContentRepository): Content persistence
//! - [`IdentityVerifier`](auth::IdentityVerifier): Token verification
//! - [`EventEmitter`](events::EventEmitter): Emitting domain events
//!
//! Each trait has default implementations suitable for the standalone server.

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod content;
pub mod control;
pub mod error;
pub mod events;
pub mod protocol_constants;
pub mod publish;
pub mod services;
pub mod state;
pub mod tenant;
pub mod utils;

// Re-export commonly used types at the crate root
pub use error::{ErrorCode, SignageError, SignageResult};
pub use events::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};
pub use state::{Config, ContentDefaults, JwtConfig, TenancyMode};
pub use utils::now_millis;

// Re-export domain types
pub use content::{
    ContentId, ContentItem, ContentRepository, FileContentStore, MediaKind, MemoryContentStore,
};
pub use control::{CommandType, ControlChannel, ControlCommand, ControlScope, ControlState};
pub use publish::{PublishTracker, VersionClock};
pub use tenant::{Caller, TenantId, TenantResolver};

// Re-export service types
pub use services::{ContentService, ReorderOutcome};

// Re-export bootstrap types
pub use bootstrap::{bootstrap_services, BootstrappedServices};

// Re-export API types
pub use api::{start_server, AppState, ServerError};
