//! HTTP response helper functions for consistent API responses.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::json;

/// Standard API success response with JSON data.
pub fn api_success<T: Serialize>(data: T) -> impl IntoResponse {
    (StatusCode::OK, Json(data))
}

/// Acknowledgement carrying only a message, e.g. `{ "message": "Content deleted" }`.
pub fn api_message(message: &str) -> impl IntoResponse {
    api_success(json!({ "message": message }))
}

/// Acknowledgement with a message and the affected resource under `data`.
pub fn api_message_with<T: Serialize>(message: &str, data: T) -> impl IntoResponse {
    api_success(json!({ "message": message, "data": data }))
}
