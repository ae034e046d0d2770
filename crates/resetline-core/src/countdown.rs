use chrono::{DateTime, Datelike, Duration, FixedOffset};

use crate::catalog::Event;
use crate::clock::ReferenceClock;
use crate::rule::RecurrenceRule;

/// The first reset strictly after `now`.
///
/// A `now` that sits exactly on a reset boundary counts as past it, so the
/// countdown rolls over to the following cycle instead of showing zero.
pub fn next_reset(rule: &RecurrenceRule, now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    let clock = ReferenceClock::from_fixed(now.timezone());
    let today = now.date_naive();

    let candidate_day = match rule {
        RecurrenceRule::Daily { .. } => today,
        RecurrenceRule::Weekly { start_day, .. } => {
            let ahead = (7 + i64::from(start_day.num_days_from_sunday())
                - i64::from(today.weekday().num_days_from_sunday()))
                % 7;
            today + Duration::days(ahead)
        }
    };

    let candidate = clock.on_date(candidate_day, rule.start_time());
    if now >= candidate {
        candidate + Duration::days(rule.cycle_days())
    } else {
        candidate
    }
}

pub fn time_until_reset(rule: &RecurrenceRule, now: DateTime<FixedOffset>) -> Duration {
    next_reset(rule, now) - now
}

#[derive(Debug, Clone)]
pub struct Countdown<'a> {
    pub event: &'a Event,
    pub reset_at: DateTime<FixedOffset>,
    pub remaining: Duration,
}

/// Countdown rows for every event, soonest reset first.
pub fn countdowns(events: &[Event], now: DateTime<FixedOffset>) -> Vec<Countdown<'_>> {
    let mut rows: Vec<Countdown<'_>> = events
        .iter()
        .map(|event| {
            let reset_at = next_reset(&event.rule, now);
            Countdown {
                event,
                reset_at,
                remaining: reset_at - now,
            }
        })
        .collect();
    rows.sort_by(|a, b| a.remaining.cmp(&b.remaining).then_with(|| a.event.id.cmp(&b.event.id)));
    rows
}

/// `HH:MM:SS`, prefixed with `Nd ` once the duration reaches a full day.
pub fn format_remaining(remaining: Duration) -> String {
    let total = remaining.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    if days > 0 {
        format!("{days}d {hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}
