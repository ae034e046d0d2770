use chrono::{DateTime, TimeZone};

/// Completion-store key for the occurrence of `event_id` that starts at
/// `unclipped_start`, as `{event_id}_{unix_millis}`.
///
/// Pass the unclipped start: two windows that cut the same occurrence
/// differently must still agree on its key.
pub fn occurrence_key<Tz: TimeZone>(event_id: &str, unclipped_start: DateTime<Tz>) -> String {
    format!("{event_id}_{}", unclipped_start.timestamp_millis())
}
