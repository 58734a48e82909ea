//! General utilities shared across the application.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

// ─────────────────────────────────────────────────────────────────────────────
// Time Utilities
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the current Unix timestamp in milliseconds.
///
/// Returns 0 if the system clock is before the Unix epoch (shouldn't happen in practice).
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ─────────────────────────────────────────────────────────────────────────────
// Loose Numeric Input
// ─────────────────────────────────────────────────────────────────────────────

/// Interprets a JSON value as a finite number.
///
/// Admin clients send numbers either as JSON numbers or as numeric strings
/// (form inputs), so both are accepted. Blank strings, booleans, `null` and
/// non-finite values yield `None`.
#[must_use]
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Interprets a JSON value as an integer.
///
/// Accepts anything [`coerce_number`] accepts as long as it has no
/// fractional part and fits in an `i64`.
#[must_use]
pub fn coerce_integer(value: &Value) -> Option<i64> {
    let n = coerce_number(value)?;
    if n.fract() != 0.0 || n < i64::MIN as f64 || n > i64::MAX as f64 {
        return None;
    }
    Some(n as i64)
}
