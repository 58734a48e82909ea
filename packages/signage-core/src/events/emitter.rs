//! Event emitter abstraction for decoupling services from observers.
//!
//! Services depend on the [`EventEmitter`] trait rather than a concrete sink,
//! enabling testing and alternative observers (audit logs, metrics).

use super::{ContentEvent, ControlEvent};

/// Trait for emitting domain events without knowledge of the observer.
///
/// # Example
///
/// ```ignore
/// struct MyService {
///     emitter: Arc<dyn EventEmitter>,
/// }
///
/// impl MyService {
///     fn do_something(&self) {
///         self.emitter.emit_content(ContentEvent { ... });
///     }
/// }
/// ```
pub trait EventEmitter: Send + Sync {
    /// Emits a content change (publish version bump).
    fn emit_content(&self, event: ContentEvent);

    /// Emits a control slot change.
    fn emit_control(&self, event: ControlEvent);
}

/// No-op emitter for tests and embedded use.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit_content(&self, _event: ContentEvent) {}

    fn emit_control(&self, _event: ControlEvent) {}
}

/// Logging emitter used by the server.
///
/// Logs content changes at info level and control changes at debug level,
/// since players may be driven with rapid command sequences.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit_content(&self, event: ContentEvent) {
        tracing::info!(
            tenant = %event.tenant_id,
            cause = ?event.cause,
            version = event.version,
            affected = event.affected,
            "content_changed"
        );
    }

    fn emit_control(&self, event: ControlEvent) {
        tracing::debug!(
            scope = %event.scope,
            command = %event.command,
            version = event.version,
            "control_changed"
        );
    }
}
