//! Snowflake ID helpers.
//!
//! IDs are 64-bit integers whose top 42 bits are milliseconds since the
//! platform epoch (2015-01-01T00:00:00Z).

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Platform epoch in milliseconds since the Unix epoch.
pub const EPOCH_MS: u64 = 1_420_070_400_000;

/// Returns the creation time encoded in a snowflake ID.
///
/// Returns `None` if `id` is not a decimal integer.
pub fn created_at(id: &str) -> Option<SystemTime> {
    let raw: u64 = id.parse().ok()?;
    let ms = (raw >> 22) + EPOCH_MS;
    Some(UNIX_EPOCH + Duration::from_millis(ms))
}
