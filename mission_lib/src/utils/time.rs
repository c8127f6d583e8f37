use chrono::Utc;

/// Wall-clock timestamp in milliseconds since the Unix epoch.
///
/// Used to stamp outbound messages; control timing uses monotonic clocks.
pub fn now_millis() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}
