use chrono::{DateTime, FixedOffset};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("malformed {field}: {value:?}")]
    MalformedInput { field: &'static str, value: String },

    #[error("degenerate window: end {end} is not after start {start}")]
    DegenerateWindow {
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    },

    #[error("utc offset out of range: {0} minutes")]
    InvalidOffset(i32),
}

impl ScheduleError {
    pub(crate) fn malformed(field: &'static str, value: impl Into<String>) -> Self {
        Self::MalformedInput {
            field,
            value: value.into(),
        }
    }
}
