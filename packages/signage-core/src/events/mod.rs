//! Domain events for in-process observers.
//!
//! This module provides:
//! - [`EventEmitter`] trait for domain services to emit events
//! - Event types for content and control changes
//!
//! Events never reach players; players learn about changes only by polling.

mod emitter;

pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};

#[cfg(test)]
pub(crate) use emitter::test_support;

use serde::Serialize;

use crate::control::{CommandType, ControlScope};
use crate::tenant::TenantId;

/// What kind of mutation bumped a tenant's publish version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeCause {
    Created,
    Updated,
    Reordered,
    Deleted,
    /// Explicit publish with no content change.
    Published,
}

/// A tenant's content state changed and its publish version moved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentEvent {
    pub tenant_id: TenantId,
    pub cause: ChangeCause,
    /// The publish version after the change.
    pub version: u64,
    /// Items affected (1 for single-item mutations, batch size for reorders).
    pub affected: usize,
}

/// A control slot was overwritten.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlEvent {
    pub scope: ControlScope,
    pub command: CommandType,
    pub version: u64,
}
