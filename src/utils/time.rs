//! Time helpers

use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Current Unix timestamp in seconds (0 if the clock is before the epoch)
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_else(|_| {
            warn!("System time is before UNIX epoch, using 0 as timestamp");
            0
        })
}
