//! Tenant identity and resolution.
//!
//! Every read and write is scoped to a [`TenantId`]. The id is derived from
//! the [`Caller`] and an optional explicit tenant parameter by
//! [`resolve_tenant`]; a failed resolution is surfaced as
//! [`TenantResolution::Missing`] and callers must reject the request instead
//! of falling back to some fixed tenant.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SignageError, SignageResult};
use crate::protocol_constants::{MAX_TENANT_ID_LEN, TENANT_PARAM};
use crate::state::TenancyMode;

// ─────────────────────────────────────────────────────────────────────────────
// TenantId
// ─────────────────────────────────────────────────────────────────────────────

/// Validated tenant identifier.
///
/// Non-empty, at most [`MAX_TENANT_ID_LEN`] characters of ASCII alphanumerics,
/// `-`, `_`, `.` and `@`, and not starting with `.`. The restriction keeps ids
/// safe to use as file names for durable storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Parses and validates a tenant id.
    ///
    /// # Errors
    ///
    /// Returns [`SignageError::Validation`] if the id is empty, too long or
    /// contains disallowed characters.
    pub fn parse(raw: &str) -> SignageResult<Self> {
        let id = raw.trim();
        if id.is_empty() {
            return Err(SignageError::Validation(format!("{TENANT_PARAM} is empty")));
        }
        if id.len() > MAX_TENANT_ID_LEN {
            return Err(SignageError::Validation(format!(
                "{TENANT_PARAM} exceeds {MAX_TENANT_ID_LEN} characters"
            )));
        }
        if id.starts_with('.') {
            return Err(SignageError::Validation(format!(
                "{TENANT_PARAM} must not start with '.'"
            )));
        }
        let valid = id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'));
        if !valid {
            return Err(SignageError::Validation(format!(
                "{TENANT_PARAM} contains invalid characters"
            )));
        }
        Ok(Self(id.to_string()))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TenantId {
    type Error = SignageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Caller
// ─────────────────────────────────────────────────────────────────────────────

/// Identity of whoever issued the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    /// No credentials presented (player polling, public reads).
    Anonymous,
    /// Regular operator. Usernames double as tenant ids.
    User { username: TenantId },
    /// Operator allowed to act on behalf of any tenant.
    Admin { username: TenantId },
}

impl Caller {
    /// Returns `true` if the caller presented valid credentials.
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::Anonymous)
    }

    /// Returns the authenticated username, if any.
    pub fn username(&self) -> Option<&TenantId> {
        match self {
            Self::Anonymous => None,
            Self::User { username } | Self::Admin { username } => Some(username),
        }
    }
}

/// Where the explicit tenant parameter of a request comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantSource {
    /// Request body, used by writes.
    Body,
    /// Query string, used by reads and player polling.
    Query,
}

/// Outcome of tenant resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantResolution {
    Resolved(TenantId),
    Missing,
}

impl TenantResolution {
    /// Converts to a result, rejecting a missing tenant with 400.
    ///
    /// Used by public reads where the tenant must be supplied by the client.
    pub fn or_bad_request(self) -> SignageResult<TenantId> {
        match self {
            Self::Resolved(id) => Ok(id),
            Self::Missing => Err(SignageError::Validation(format!(
                "{TENANT_PARAM} required (query or token)"
            ))),
        }
    }

    /// Converts to a result, rejecting a missing tenant with 401.
    ///
    /// Used by authenticated-only operations.
    pub fn or_unauthorized(self) -> SignageResult<TenantId> {
        match self {
            Self::Resolved(id) => Ok(id),
            Self::Missing => Err(SignageError::Unauthorized(
                "no tenant could be derived for this caller".to_string(),
            )),
        }
    }
}

/// Derives the tenant for a request.
///
/// Rules, in priority order:
/// 1. An admin's explicit tenant from the expected `source` wins.
/// 2. An authenticated caller's username.
/// 3. For [`TenantSource::Query`] only, the explicit tenant (unauthenticated players).
/// 4. Otherwise [`TenantResolution::Missing`].
pub fn resolve_tenant(
    caller: &Caller,
    requested: Option<&TenantId>,
    source: TenantSource,
) -> TenantResolution {
    if let (Caller::Admin { .. }, Some(tenant)) = (caller, requested) {
        return TenantResolution::Resolved(tenant.clone());
    }
    if let Some(username) = caller.username() {
        return TenantResolution::Resolved(username.clone());
    }
    match (source, requested) {
        (TenantSource::Query, Some(tenant)) => TenantResolution::Resolved(tenant.clone()),
        _ => TenantResolution::Missing,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TenantResolver
// ─────────────────────────────────────────────────────────────────────────────

/// Applies the configured [`TenancyMode`] on top of [`resolve_tenant`].
#[derive(Debug, Clone)]
pub struct TenantResolver {
    fixed: Option<TenantId>,
}

impl TenantResolver {
    /// Resolver for multi-tenant deployments.
    pub fn multi() -> Self {
        Self { fixed: None }
    }

    /// Resolver that pins every request to `tenant`.
    pub fn single(tenant: TenantId) -> Self {
        Self {
            fixed: Some(tenant),
        }
    }

    /// Builds a resolver from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SignageError::Configuration`] if the single tenant is invalid.
    pub fn from_mode(mode: &TenancyMode) -> SignageResult<Self> {
        match mode {
            TenancyMode::Multi => Ok(Self::multi()),
            TenancyMode::Single { tenant } => TenantId::parse(tenant)
                .map(Self::single)
                .map_err(|e| SignageError::Configuration(format!("tenancy.tenant: {e}"))),
        }
    }

    /// Returns the pinned tenant in single-tenant mode.
    pub fn fixed_tenant(&self) -> Option<&TenantId> {
        self.fixed.as_ref()
    }

    /// Resolves the tenant for a request.
    pub fn resolve(
        &self,
        caller: &Caller,
        requested: Option<&TenantId>,
        source: TenantSource,
    ) -> TenantResolution {
        match &self.fixed {
            Some(tenant) => TenantResolution::Resolved(tenant.clone()),
            None => resolve_tenant(caller, requested, source),
        }
    }
}
