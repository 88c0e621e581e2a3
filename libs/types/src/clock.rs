//! Wall-clock helper. All timestamps in this workspace are Unix nanoseconds.

use chrono::Utc;

/// Current wall-clock time as Unix nanoseconds.
pub fn now_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or_default()
}
