//! Request extractors: caller identity, tenant parameters and lenient JSON bodies.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::api::AppState;
use crate::auth::bearer_token;
use crate::error::{SignageError, SignageResult};
use crate::tenant::{Caller, TenantId};

/// Resolves the caller from the `Authorization` header.
///
/// No header means [`Caller::Anonymous`]. A header that is present but not a
/// valid bearer token is rejected with 401, even on public routes.
impl FromRequestParts<AppState> for Caller {
    type Rejection = SignageError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
            return Ok(Caller::Anonymous);
        };
        let token = value
            .to_str()
            .ok()
            .and_then(bearer_token)
            .ok_or_else(|| {
                SignageError::Unauthorized(
                    "Authorization header must be 'Bearer <token>'".to_string(),
                )
            })?;
        state.verifier.verify(token)
    }
}

/// Rejects anonymous callers before any business logic runs.
pub fn require_authenticated(caller: &Caller) -> SignageResult<()> {
    if caller.is_authenticated() {
        Ok(())
    } else {
        Err(SignageError::Unauthorized("Unauthorized".to_string()))
    }
}

/// `?tenantId=` query parameter.
#[derive(Debug, Default, Deserialize)]
pub struct TenantQuery {
    #[serde(rename = "tenantId", default)]
    pub tenant_id: Option<String>,
}

impl TenantQuery {
    pub fn tenant(&self) -> SignageResult<Option<TenantId>> {
        requested_tenant(self.tenant_id.as_deref())
    }
}

/// Parses an explicitly requested tenant. Blank counts as absent.
pub fn requested_tenant(raw: Option<&str>) -> SignageResult<Option<TenantId>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(id) => TenantId::parse(id).map(Some),
    }
}

/// JSON body that falls back to `T::default()` when the request has no body.
///
/// Many admin calls carry their tenant in the query string and send no body
/// at all. A request without a `Content-Type` is treated as empty; anything
/// else must be valid JSON.
pub struct JsonOrDefault<T>(pub T);

impl<T, S> FromRequest<S> for JsonOrDefault<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = SignageError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !req.headers().contains_key(header::CONTENT_TYPE) {
            return Ok(Self(T::default()));
        }
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> SignageError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        SignageError::PayloadTooLarge(rejection.body_text())
    } else {
        SignageError::Validation(rejection.body_text())
    }
}
