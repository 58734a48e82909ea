//! Control state: the single current command a player should act on.
//!
//! Each scope (a tenant, or the installation as a whole) holds exactly one
//! [`ControlState`]. Issuing a command overwrites the slot and draws a fresh
//! version; nothing is queued. A player that polls slower than commands are
//! issued only ever sees the latest one.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{SignageError, SignageResult};
use crate::events::{ControlEvent, EventEmitter};
use crate::publish::VersionClock;
use crate::tenant::TenantId;

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Command vocabulary understood by players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    /// Idle. Initial state and the state reached via clear.
    None,
    Play,
    Pause,
    Reload,
    Prev,
    Next,
    /// Payload: `{ "index": n }`.
    Jump,
    /// Payload: `{ "message": "..." }`.
    ShowMessage,
    ClearMessage,
}

impl CommandType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Reload => "reload",
            Self::Prev => "prev",
            Self::Next => "next",
            Self::Jump => "jump",
            Self::ShowMessage => "show_message",
            Self::ClearMessage => "clear_message",
        }
    }

    /// Parses a command type from request input.
    ///
    /// # Errors
    ///
    /// Returns [`SignageError::Validation`] if the type is missing, blank or
    /// outside the vocabulary.
    pub fn from_request(raw: Option<&str>) -> SignageResult<Self> {
        match raw.map(str::trim) {
            None | Some("") => Err(SignageError::Validation("Missing control type".into())),
            Some(s) => s.parse(),
        }
    }
}

impl FromStr for CommandType {
    type Err = SignageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "none" => Self::None,
            "play" => Self::Play,
            "pause" => Self::Pause,
            "reload" => Self::Reload,
            "prev" => Self::Prev,
            "next" => Self::Next,
            "jump" => Self::Jump,
            "show_message" => Self::ShowMessage,
            "clear_message" => Self::ClearMessage,
            other => {
                return Err(SignageError::Validation(format!(
                    "Unknown control type: {other}"
                )))
            }
        })
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command and its parameters.
///
/// The payload shape is up to the command; it is stored as given, with a
/// missing or `null` payload normalized to `{}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlCommand {
    #[serde(rename = "type")]
    pub kind: CommandType,
    pub payload: Value,
}

impl ControlCommand {
    pub fn new(kind: CommandType, payload: Option<Value>) -> Self {
        let payload = match payload {
            None | Some(Value::Null) => empty_payload(),
            Some(value) => value,
        };
        Self { kind, payload }
    }

    /// The idle command with an empty payload.
    pub fn idle() -> Self {
        Self::new(CommandType::None, None)
    }
}

fn empty_payload() -> Value {
    Value::Object(Map::new())
}

/// What a polling player receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlState {
    pub version: u64,
    pub command: ControlCommand,
}

// ─────────────────────────────────────────────────────────────────────────────
// Scope
// ─────────────────────────────────────────────────────────────────────────────

/// Which control slot a request addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "scope", content = "tenantId", rename_all = "camelCase")]
pub enum ControlScope {
    /// Installation-wide slot, used when no tenant is named.
    Installation,
    Tenant(TenantId),
}

impl fmt::Display for ControlScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installation => f.write_str("installation"),
            Self::Tenant(tenant) => write!(f, "tenant:{}", tenant),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Channel
// ─────────────────────────────────────────────────────────────────────────────

/// Single-slot, last-write-wins command channel per scope.
///
/// Slots are created on first write. Reading a slot that was never written
/// returns the channel's initial state (idle, versioned at construction) and
/// does not create it.
pub struct ControlChannel {
    slots: DashMap<ControlScope, ControlState>,
    initial: ControlState,
    clock: Arc<VersionClock>,
    emitter: Arc<dyn EventEmitter>,
}

impl ControlChannel {
    pub fn new(clock: Arc<VersionClock>, emitter: Arc<dyn EventEmitter>) -> Self {
        let initial = ControlState {
            version: clock.next(),
            command: ControlCommand::idle(),
        };
        Self {
            slots: DashMap::new(),
            initial,
            clock,
            emitter,
        }
    }

    /// Replaces the scope's command and returns the new state.
    pub fn issue(&self, scope: ControlScope, command: ControlCommand) -> ControlState {
        let state = self.replace(&scope, command);
        log::info!(
            "[Control] {} <- {} (v{})",
            scope,
            state.command.kind,
            state.version
        );
        self.emitter.emit_control(ControlEvent {
            scope,
            command: state.command.kind,
            version: state.version,
        });
        state
    }

    /// Resets the scope to idle and returns the new state.
    pub fn clear(&self, scope: ControlScope) -> ControlState {
        self.issue(scope, ControlCommand::idle())
    }

    /// Returns the scope's current state without side effects.
    pub fn state(&self, scope: &ControlScope) -> ControlState {
        self.slots
            .get(scope)
            .map(|s| s.value().clone())
            .unwrap_or_else(|| self.initial.clone())
    }

    fn replace(&self, scope: &ControlScope, command: ControlCommand) -> ControlState {
        let mut slot = self
            .slots
            .entry(scope.clone())
            .or_insert_with(|| self.initial.clone());
        let next = ControlState {
            version: self.clock.next(),
            command,
        };
        *slot = next.clone();
        next
    }
}
