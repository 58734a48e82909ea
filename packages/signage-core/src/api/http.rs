//! HTTP route handlers.
//!
//! All handlers are thin - they resolve the tenant and delegate to services
//! for business logic.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::HeaderValue,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::api::extract::{require_authenticated, requested_tenant, JsonOrDefault, TenantQuery};
use crate::api::response::{api_message, api_message_with, api_success};
use crate::api::AppState;
use crate::content::{ContentPatch, NewContent, RawReorderEntry};
use crate::control::{CommandType, ControlCommand, ControlScope, ControlState};
use crate::error::{SignageError, SignageResult};
use crate::protocol_constants::{MAX_JSON_BODY_BYTES, SERVICE_ID};
use crate::tenant::{Caller, TenantId, TenantResolution, TenantSource};

// ─────────────────────────────────────────────────────────────────────────────
// Request Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateContentRequest {
    title: Option<String>,
    duration_seconds: Option<Value>,
    playlist_name: Option<String>,
    playlist_order: Option<Value>,
    tenant_id: Option<String>,
}

/// Entries stay untyped so one malformed entry is skipped instead of
/// failing the whole batch.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReorderRequest {
    items: Option<Vec<Value>>,
    tenant_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishRequest {
    tenant_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueControlRequest {
    #[serde(rename = "type")]
    kind: Option<String>,
    payload: Option<Value>,
    tenant_id: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Creates the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    let upload_limit = state.uploads.body_limit();
    let media = ServeDir::new(state.uploads.dir());
    let media_prefix = state.uploads.url_prefix().to_string();
    let cors = cors_layer(&state.config.cors_allowed_origins);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/content", get(list_content))
        .route(
            "/api/content/upload",
            post(upload_content).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/content/{id}",
            put(update_content).delete(delete_content),
        )
        .route("/api/playlist/reorder", post(reorder_content))
        .route("/api/publish", post(trigger_publish))
        .route("/api/publish/version", get(publish_version))
        .route("/api/control", post(issue_control))
        .route("/api/control/state", get(control_state))
        .route("/api/control/clear", post(clear_control))
        .nest_service(&media_prefix, media)
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_JSON_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("[Server] Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Liveness probe: "Is the process running?"
async fn health_check() -> impl IntoResponse {
    api_success(json!({
        "status": "ok",
        "service": SERVICE_ID,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn list_content(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<TenantQuery>,
) -> SignageResult<impl IntoResponse> {
    let tenant = state
        .resolver
        .resolve(&caller, query.tenant()?.as_ref(), TenantSource::Query)
        .or_bad_request()?;
    let items = state.content.list(&tenant).await?;
    Ok(api_success(items))
}

async fn upload_content(
    State(state): State<AppState>,
    caller: Caller,
    multipart: Multipart,
) -> SignageResult<impl IntoResponse> {
    require_authenticated(&caller)?;

    let form = state.uploads.receive(multipart).await?;
    let requested = requested_tenant(form.tenant_id.as_deref())?;
    let tenant = state
        .resolver
        .resolve(&caller, requested.as_ref(), TenantSource::Body)
        .or_unauthorized()?;

    let duration_seconds = form.duration_seconds()?;
    let playlist_order = form.playlist_order()?;
    let title = form
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    let Some(file) = form.file else {
        return Err(SignageError::Validation("No file uploaded".to_string()));
    };
    let Some(title) = title else {
        return Err(SignageError::Validation("title is required".to_string()));
    };

    log::info!(
        "[Upload] {} stored {} ({} bytes)",
        tenant,
        file.file_name(),
        file.size()
    );
    let new = NewContent {
        title,
        kind: file.kind(),
        url: state.uploads.public_url(file.file_name()),
        duration_seconds,
        playlist_name: form.playlist_name,
        playlist_order,
    };
    let item = state.content.create(&tenant, new).await?;
    file.keep();

    Ok(api_message_with("Uploaded successfully", item))
}

async fn update_content(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Query(query): Query<TenantQuery>,
    JsonOrDefault(body): JsonOrDefault<UpdateContentRequest>,
) -> SignageResult<impl IntoResponse> {
    require_authenticated(&caller)?;
    let requested = match requested_tenant(body.tenant_id.as_deref())? {
        Some(tenant) => Some(tenant),
        None => query.tenant()?,
    };
    let tenant = state
        .resolver
        .resolve(&caller, requested.as_ref(), TenantSource::Body)
        .or_unauthorized()?;

    let patch = ContentPatch::from_request(
        body.title,
        body.duration_seconds.as_ref(),
        body.playlist_name,
        body.playlist_order.as_ref(),
    )?;
    let item = state.content.update(&tenant, &id, patch).await?;
    Ok(api_message_with("Updated", item))
}

async fn delete_content(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Query(query): Query<TenantQuery>,
) -> SignageResult<impl IntoResponse> {
    require_authenticated(&caller)?;
    let tenant = state
        .resolver
        .resolve(&caller, query.tenant()?.as_ref(), TenantSource::Query)
        .or_unauthorized()?;

    state.content.delete(&tenant, &id).await?;
    Ok(api_message("Content deleted"))
}

async fn reorder_content(
    State(state): State<AppState>,
    caller: Caller,
    JsonOrDefault(body): JsonOrDefault<ReorderRequest>,
) -> SignageResult<impl IntoResponse> {
    require_authenticated(&caller)?;
    let requested = requested_tenant(body.tenant_id.as_deref())?;
    let tenant = state
        .resolver
        .resolve(&caller, requested.as_ref(), TenantSource::Body)
        .or_unauthorized()?;

    let items = body.items.unwrap_or_default();
    if items.is_empty() {
        return Err(SignageError::Validation("No items to reorder".to_string()));
    }
    let entries: Vec<RawReorderEntry> = items
        .into_iter()
        .map(|item| serde_json::from_value(item).unwrap_or_default())
        .collect();

    let outcome = state.content.reorder(&tenant, &entries).await?;
    Ok(api_success(json!({
        "message": "Reordered",
        "updated": outcome.updated,
    })))
}

async fn trigger_publish(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<TenantQuery>,
    JsonOrDefault(body): JsonOrDefault<PublishRequest>,
) -> SignageResult<impl IntoResponse> {
    require_authenticated(&caller)?;
    let requested = match requested_tenant(body.tenant_id.as_deref())? {
        Some(tenant) => Some(tenant),
        None => query.tenant()?,
    };
    let tenant = state
        .resolver
        .resolve(&caller, requested.as_ref(), TenantSource::Body)
        .or_unauthorized()?;

    let version = state.content.publish(&tenant);
    Ok(api_success(json!({
        "message": "Publish signal sent",
        "version": version,
    })))
}

async fn publish_version(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<TenantQuery>,
) -> SignageResult<impl IntoResponse> {
    let tenant = state
        .resolver
        .resolve(&caller, query.tenant()?.as_ref(), TenantSource::Query)
        .or_bad_request()?;
    Ok(api_success(json!({ "version": state.content.version(&tenant) })))
}

// ─────────────────────────────────────────────────────────────────────────────
// Control Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Control slot addressed by a request: the resolved tenant, or the
/// installation-wide slot when no tenant resolves.
fn control_scope(state: &AppState, caller: &Caller, requested: Option<&TenantId>) -> ControlScope {
    match state.resolver.resolve(caller, requested, TenantSource::Query) {
        TenantResolution::Resolved(tenant) => ControlScope::Tenant(tenant),
        TenantResolution::Missing => ControlScope::Installation,
    }
}

async fn issue_control(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<TenantQuery>,
    JsonOrDefault(body): JsonOrDefault<IssueControlRequest>,
) -> SignageResult<Json<ControlState>> {
    let kind = CommandType::from_request(body.kind.as_deref())?;
    let requested = match requested_tenant(body.tenant_id.as_deref())? {
        Some(tenant) => Some(tenant),
        None => query.tenant()?,
    };
    let scope = control_scope(&state, &caller, requested.as_ref());
    let command = ControlCommand::new(kind, body.payload);
    Ok(Json(state.control.issue(scope, command)))
}

async fn control_state(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<TenantQuery>,
) -> SignageResult<Json<ControlState>> {
    let scope = control_scope(&state, &caller, query.tenant()?.as_ref());
    Ok(Json(state.control.state(&scope)))
}

async fn clear_control(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<TenantQuery>,
) -> SignageResult<Json<ControlState>> {
    let scope = control_scope(&state, &caller, query.tenant()?.as_ref());
    Ok(Json(state.control.clear(scope)))
}
