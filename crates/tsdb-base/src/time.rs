//! Wall-clock access, isolated in one place so tests can reason about it and
//! so the rest of the workspace never calls `SystemTime::now()` directly.

use std::time::{SystemTime, UNIX_EPOCH};

/// The current wall-clock time as nanoseconds since the Unix epoch. Used as
/// the write-path fallback when neither a point nor its batch carries a
/// timestamp.
pub fn now_nanos() -> i64 {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch");
    since_epoch.as_nanos() as i64
}
