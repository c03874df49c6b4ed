//! Error handling helpers for best-effort calls
//!
//! Collaborators such as telemetry sinks must never break resolution: their
//! failures and panics are logged and swallowed here.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::warn;

/// Execute an operation and log errors without failing
///
/// Returns `Some(T)` on success, `None` on error (after logging).
///
/// ```rust
/// use modgraph::utils::log_error;
///
/// let parsed: Option<u32> = log_error(|| "42".parse::<u32>(), "Failed to parse");
/// assert_eq!(parsed, Some(42));
/// assert_eq!(log_error(|| "x".parse::<u32>(), "Failed to parse"), None);
/// ```
pub fn log_error<F, T, E>(operation: F, context: &str) -> Option<T>
where
    F: FnOnce() -> Result<T, E>,
    E: std::fmt::Display,
{
    match operation() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("{}: {}", context, e);
            None
        }
    }
}

/// Like [`log_error`], but a panic inside `operation` is logged and
/// swallowed too
pub fn best_effort<F, T, E>(operation: F, context: &str) -> Option<T>
where
    F: FnOnce() -> Result<T, E>,
    E: std::fmt::Display,
{
    match panic::catch_unwind(AssertUnwindSafe(|| log_error(operation, context))) {
        Ok(result) => result,
        Err(payload) => {
            warn!("{}: panicked: {}", context, panic_message(payload.as_ref()));
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
