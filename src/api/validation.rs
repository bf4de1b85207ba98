//! Request validation helpers.

use super::error::ApiError;

/// Require a non-empty (after trimming) text field.
pub fn require_field<'a>(value: &'a str, field: &str) -> Result<&'a str, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ApiError::validation(format!("{field} is required")))
    } else {
        Ok(trimmed)
    }
}

/// Upper bound for `page` and `limit`. Values past this are treated like any
/// other bad input; it also keeps `(page - 1) * limit` far from i64 overflow.
pub const MAX_PAGE_PARAM: i64 = 1_000_000;

/// Coerce a pagination query parameter to a positive integer.
///
/// Absent, non-numeric, non-positive, and absurdly large values all silently
/// fall back to the default; bad pagination input is never a validation
/// error.
pub fn coerce_page_param(value: Option<&str>, default: i64) -> i64 {
    value
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|n| (1..=MAX_PAGE_PARAM).contains(n))
        .unwrap_or(default)
}
