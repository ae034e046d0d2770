use chrono::{DateTime, Duration, FixedOffset};

use crate::clock::ReferenceClock;
use crate::error::ScheduleError;

/// Half-open query range `[start, end)`. Both bounds are kept in the offset
/// of `start` so wall-clock arithmetic on the window stays in one timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

impl Window {
    pub fn new(
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Self, ScheduleError> {
        if end <= start {
            return Err(ScheduleError::DegenerateWindow { start, end });
        }
        Ok(Self {
            start,
            end: end.with_timezone(&start.timezone()),
        })
    }

    /// Midnight `days_back` days before `now` up to midnight `days_ahead`
    /// days after it, on the reference clock.
    pub fn around(
        clock: &ReferenceClock,
        now: DateTime<FixedOffset>,
        days_back: u32,
        days_ahead: u32,
    ) -> Result<Self, ScheduleError> {
        let start = clock.midnight(now, -i64::from(days_back));
        let end = clock.midnight(now, i64::from(days_ahead));
        Self::new(start, end)
    }

    /// Reference clock the window was expressed in.
    pub fn clock(&self) -> ReferenceClock {
        ReferenceClock::from_fixed(self.start.timezone())
    }

    pub fn start(&self) -> DateTime<FixedOffset> {
        self.start
    }

    pub fn end(&self) -> DateTime<FixedOffset> {
        self.end
    }

    pub fn span(&self) -> Duration {
        self.end - self.start
    }

    pub fn contains(&self, instant: DateTime<FixedOffset>) -> bool {
        instant >= self.start && instant < self.end
    }

    pub fn overlaps(&self, start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> bool {
        end > self.start && start < self.end
    }

    /// Position of `instant` within the window; 0.0 at `start`, 1.0 at `end`.
    /// Instants outside the window land outside `[0, 1]`.
    pub fn fraction(&self, instant: DateTime<FixedOffset>) -> f64 {
        let total = self.span().num_milliseconds() as f64;
        let offset = (instant - self.start).num_milliseconds() as f64;
        offset / total
    }
}
