//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{ApiError, ResolutionError};

/// Map domain/service errors to a string for CLI output.
///
/// Resolution failures carry their stable kind so scripts can match on it.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::Resolution(inner) => format!("{} [{}]", e, kind_hint(inner)),
        _ => e.to_string(),
    }
}

fn kind_hint(error: &ResolutionError) -> &'static str {
    if error.is_retryable() {
        "retryable"
    } else {
        error.kind()
    }
}
