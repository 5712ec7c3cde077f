//! Time utilities.
//!
//! Message and event timestamps are Unix nanoseconds, matching the
//! `occurred_at` field written to the event stream.

use chrono::Utc;

pub fn now_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or_default()
}
