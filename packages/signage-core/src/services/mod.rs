//! Application services layer.
//!
//! Services hold the business rules that sit between the HTTP handlers and
//! the stores (`content/`, `publish`, `control`).

pub mod content_service;

pub use content_service::{ContentService, ReorderOutcome};
