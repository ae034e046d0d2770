use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use resetline_core::{Occurrence, RecurrenceRule, ReferenceClock, Window, next_reset, occurrences};

fn daily_rules() -> Vec<RecurrenceRule> {
    [
        ("08:00", "08:00"),
        ("20:00", "04:00"),
        ("08:00", "20:00"),
        ("00:00", "00:00"),
        ("23:59", "00:00"),
        ("15:00", "14:59"),
    ]
    .into_iter()
    .map(|(start, end)| {
        RecurrenceRule::from_parts("daily", start, Some(end), None, None).expect("daily rule")
    })
    .collect()
}

/// Every start weekday, each paired with a same-day end (full-week wrap)
/// and a Wednesday end; the Friday rows also keep the Fri -> Sun span.
fn weekly_rules() -> Vec<RecurrenceRule> {
    let days = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
    let mut out = Vec::new();
    for start_day in days {
        let mut end_days = vec![start_day];
        if start_day != "Wed" {
            end_days.push("Wed");
        }
        if start_day == "Fri" {
            end_days.push("Sun");
        }
        for end_day in end_days {
            for (start, end) in [("20:00", "20:00"), ("08:00", "16:00"), ("16:00", "08:00")] {
                out.push(
                    RecurrenceRule::from_parts("weekly", start, Some(end), Some(start_day), Some(end_day))
                        .expect("weekly rule"),
                );
            }
        }
    }
    out
}

fn all_rules() -> Vec<RecurrenceRule> {
    let mut rules = daily_rules();
    rules.extend(weekly_rules());
    rules
}

fn clocks() -> Vec<ReferenceClock> {
    [0, 480, -330]
        .into_iter()
        .map(|minutes| ReferenceClock::from_offset_minutes(minutes).expect("offset"))
        .collect()
}

/// Independent reference: visit every calendar day around the window, start
/// an occurrence on each day the rule starts on, and walk forward day by day
/// to find where it ends.
fn reference_occurrences(rule: &RecurrenceRule, window: &Window) -> Vec<Occurrence> {
    let clock = window.clock();
    let first = window.start().date_naive() - Duration::days(10);
    let last = window.end().date_naive() + Duration::days(1);

    let mut out = Vec::new();
    let mut day = first;
    while day <= last {
        if let Some(raw_start) = start_on(rule, &clock, day) {
            let raw_end = end_after(rule, &clock, day, raw_start);
            if raw_end > window.start() && raw_start < window.end() {
                out.push(Occurrence {
                    start: raw_start.max(window.start()),
                    end: raw_end.min(window.end()),
                    unclipped_start: raw_start,
                    unclipped_end: raw_end,
                });
            }
        }
        day = day + Duration::days(1);
    }
    out
}

fn start_on(rule: &RecurrenceRule, clock: &ReferenceClock, day: NaiveDate) -> Option<DateTime<FixedOffset>> {
    match rule {
        RecurrenceRule::Daily { start, .. } => Some(clock.on_date(day, *start)),
        RecurrenceRule::Weekly { start_day, start, .. } => {
            (day.weekday() == *start_day).then(|| clock.on_date(day, *start))
        }
    }
}

fn end_after(
    rule: &RecurrenceRule,
    clock: &ReferenceClock,
    day: NaiveDate,
    raw_start: DateTime<FixedOffset>,
) -> DateTime<FixedOffset> {
    match rule {
        RecurrenceRule::Daily { end, .. } => clock.on_date(day + Duration::days(1), *end),
        RecurrenceRule::Weekly { end_day, end, .. } => {
            let mut k = 0;
            loop {
                let candidate_day = day + Duration::days(k);
                let candidate = clock.on_date(candidate_day, *end);
                if candidate_day.weekday() == *end_day && candidate > raw_start {
                    return candidate;
                }
                k += 1;
            }
        }
    }
}

fn windows(clock: &ReferenceClock) -> Vec<Window> {
    let base = clock.at(Utc.with_ymd_and_hms(2024, 2, 26, 0, 0, 0).single().expect("base"));
    let mut out = Vec::new();
    // Eight starts spread over a week at shifting times of day.
    for step in 0..8 {
        let start = base + Duration::hours(21 * step) + Duration::minutes(13 * step);
        for length in [Duration::hours(1), Duration::days(1), Duration::days(9)] {
            out.push(Window::new(start, start + length).expect("window"));
        }
    }
    // Exact day boundary, as the timeline builds it.
    out.push(Window::around(clock, base, 1, 8).expect("timeline window"));
    out
}

#[test]
fn generator_matches_brute_force_reference() {
    for clock in clocks() {
        for window in windows(&clock) {
            for rule in all_rules() {
                let got = occurrences(&rule, &window);
                for occ in &got {
                    assert!(occ.start >= window.start(), "rule {rule}");
                    assert!(occ.end <= window.end(), "rule {rule}");
                    assert!(occ.start < occ.end, "rule {rule}");
                }
                for pair in got.windows(2) {
                    assert!(pair[0].unclipped_start < pair[1].unclipped_start, "rule {rule}");
                }

                let want = reference_occurrences(&rule, &window);
                assert_eq!(got, want, "rule {rule} window {window:?}");
            }
        }
    }
}

#[test]
fn finder_agrees_with_generator() {
    for clock in clocks() {
        let base = clock.at(Utc.with_ymd_and_hms(2024, 2, 26, 0, 0, 0).single().expect("base"));
        for rule in all_rules() {
            let mut instants: Vec<_> = (0..40)
                .map(|step| base + Duration::minutes(377 * step))
                .collect();
            // Exact reset boundaries.
            let window = Window::new(base, base + Duration::days(8)).expect("window");
            instants.extend(occurrences(&rule, &window).iter().map(|occ| occ.unclipped_start));

            for now in instants {
                let window = Window::new(now, now + Duration::days(14)).expect("window");
                let upcoming = occurrences(&rule, &window)
                    .into_iter()
                    .find(|occ| occ.unclipped_start > now)
                    .expect("an upcoming occurrence within two weeks");
                let reset = next_reset(&rule, now);
                assert_eq!(upcoming.unclipped_start, reset, "rule {rule} now {now}");
                assert!(reset > now);
                assert!(reset - now <= Duration::days(rule.cycle_days()));
            }
        }
    }
}

#[test]
fn exact_boundary_now_starts_the_window_and_resets_next_cycle() {
    let clock = ReferenceClock::utc();
    let rule = RecurrenceRule::from_parts("daily", "08:00", Some("08:00"), None, None).expect("rule");
    let now = clock.at(Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).single().expect("now"));
    let window = Window::new(now, now + Duration::days(14)).expect("window");

    let segments = occurrences(&rule, &window);
    // The occurrence ending exactly at `now` does not overlap.
    assert_eq!(segments[0].start, now);
    assert_eq!(segments[0].unclipped_start, now);
    assert_eq!(next_reset(&rule, now), now + Duration::days(1));
    assert_eq!(segments[1].unclipped_start, next_reset(&rule, now));
}

#[test]
fn daily_scenario_over_three_days() {
    let clock = ReferenceClock::from_offset_minutes(0).expect("offset");
    let start = clock.at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("start"));
    let end = clock.at(Utc.with_ymd_and_hms(2024, 1, 4, 0, 0, 0).single().expect("end"));
    let window = Window::new(start, end).expect("window");
    let rule = RecurrenceRule::from_parts("daily", "08:00", Some("08:00"), None, None).expect("rule");

    let got: Vec<_> = occurrences(&rule, &window)
        .iter()
        .map(|occ| {
            (
                occ.start.to_rfc3339(),
                occ.end.to_rfc3339(),
                occ.unclipped_start.to_rfc3339(),
            )
        })
        .collect();
    assert_eq!(
        got,
        vec![
            (
                "2024-01-01T00:00:00+00:00".to_string(),
                "2024-01-01T08:00:00+00:00".to_string(),
                "2023-12-31T08:00:00+00:00".to_string(),
            ),
            (
                "2024-01-01T08:00:00+00:00".to_string(),
                "2024-01-02T08:00:00+00:00".to_string(),
                "2024-01-01T08:00:00+00:00".to_string(),
            ),
            (
                "2024-01-02T08:00:00+00:00".to_string(),
                "2024-01-03T08:00:00+00:00".to_string(),
                "2024-01-02T08:00:00+00:00".to_string(),
            ),
            (
                "2024-01-03T08:00:00+00:00".to_string(),
                "2024-01-04T00:00:00+00:00".to_string(),
                "2024-01-03T08:00:00+00:00".to_string(),
            ),
        ]
    );
}

#[test]
fn weekly_monday_scenario_over_two_weeks() {
    let clock = ReferenceClock::utc();
    let start = clock.at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("start"));
    let window = Window::new(start, start + Duration::days(14)).expect("window");
    let rule = RecurrenceRule::from_parts("weekly", "00:00", Some("00:00"), Some("Mon"), Some("Tue"))
        .expect("rule");

    let got = occurrences(&rule, &window);
    assert_eq!(got.len(), 2);
    assert_eq!(got[0].start, start);
    assert_eq!(got[1].start, start + Duration::days(7));
    for occ in got {
        assert_eq!(occ.end - occ.start, Duration::hours(24));
        assert!(!occ.is_clipped());
    }
}

#[test]
fn weekly_friday_wraparound_is_a_full_week() {
    let clock = ReferenceClock::from_offset_minutes(480).expect("offset");
    let start = clock.at(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).single().expect("start"));
    let window = Window::new(start, start + Duration::days(35)).expect("window");
    let rule = RecurrenceRule::from_parts("weekly", "20:00", Some("20:00"), Some("Fri"), Some("Fri"))
        .expect("rule");

    let got = occurrences(&rule, &window);
    assert!(got.len() >= 5);
    for occ in &got {
        assert_eq!(occ.unclipped_end - occ.unclipped_start, Duration::days(7));
        assert_eq!(occ.unclipped_start.format("%a %H:%M").to_string(), "Fri 20:00");
    }
    // Back to back: each week's end is the next week's start.
    for pair in got.windows(2) {
        assert_eq!(pair[0].unclipped_end, pair[1].unclipped_start);
    }
}

#[test]
fn keys_agree_across_overlapping_windows() {
    let clock = ReferenceClock::from_offset_minutes(480).expect("offset");
    let day0 = clock.midnight(
        clock.at(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).single().expect("day0")),
        0,
    );
    let a = Window::new(day0, day0 + Duration::days(10)).expect("window a");
    let b = Window::new(day0 + Duration::days(5), day0 + Duration::days(15)).expect("window b");

    for rule in all_rules() {
        let from_a = occurrences(&rule, &a);
        let from_b = occurrences(&rule, &b);
        for occ_b in &from_b {
            if let Some(occ_a) = from_a
                .iter()
                .find(|occ| occ.unclipped_start == occ_b.unclipped_start)
            {
                assert_eq!(occ_a.key("evt"), occ_b.key("evt"), "rule {rule}");
            }
        }
    }
}
