use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate};
use tracing::trace;

use crate::key::occurrence_key;
use crate::rule::RecurrenceRule;
use crate::window::Window;

/// One concrete realization of a rule, clipped to the window it was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub unclipped_start: DateTime<FixedOffset>,
    pub unclipped_end: DateTime<FixedOffset>,
}

impl Occurrence {
    pub fn is_clipped(&self) -> bool {
        self.start != self.unclipped_start || self.end != self.unclipped_end
    }

    pub fn contains(&self, instant: DateTime<FixedOffset>) -> bool {
        instant >= self.unclipped_start && instant < self.unclipped_end
    }

    /// Persistence key; stable no matter which window found the occurrence.
    pub fn key(&self, event_id: &str) -> String {
        occurrence_key(event_id, self.unclipped_start)
    }
}

/// Every occurrence of `rule` overlapping `window`, ordered by start.
///
/// The scan starts one full cycle before the window so an occurrence that
/// began earlier but is still running at `window.start()` is included. Each
/// candidate spans from its start time on the cursor date to its end time
/// `end_day_offset` days later.
pub fn occurrences(rule: &RecurrenceRule, window: &Window) -> Vec<Occurrence> {
    let clock = window.clock();
    let step = Duration::days(rule.cycle_days());
    let mut day = first_candidate_day(rule, window.start().date_naive());
    let span = Duration::days(rule.end_day_offset());

    let mut out = Vec::new();
    loop {
        let raw_start = clock.on_date(day, rule.start_time());
        if raw_start >= window.end() {
            break;
        }
        let raw_end = clock.on_date(day + span, rule.end_time());

        if window.overlaps(raw_start, raw_end) {
            out.push(Occurrence {
                start: raw_start.max(window.start()),
                end: raw_end.min(window.end()),
                unclipped_start: raw_start,
                unclipped_end: raw_end,
            });
        }

        day = day + step;
    }

    trace!(%rule, count = out.len(), "generated occurrences");
    out
}

/// The occurrence in progress at `now`, if any. Daily rules longer than a
/// day overlap their successor; the most recently started one wins.
pub fn active_occurrence(rule: &RecurrenceRule, now: DateTime<FixedOffset>) -> Option<Occurrence> {
    let window = Window::new(now, now + Duration::seconds(1)).ok()?;
    occurrences(rule, &window)
        .into_iter()
        .rev()
        .find(|occ| occ.contains(now))
}

fn first_candidate_day(rule: &RecurrenceRule, window_day: NaiveDate) -> NaiveDate {
    match rule {
        RecurrenceRule::Daily { .. } => window_day - Duration::days(1),
        RecurrenceRule::Weekly { start_day, .. } => {
            let mut day = window_day - Duration::days(7);
            while day.weekday() != *start_day {
                day = day + Duration::days(1);
            }
            day
        }
    }
}
