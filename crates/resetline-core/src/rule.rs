use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike, Weekday};
use regex::Regex;

use crate::error::ScheduleError;

/// Wall-clock time of day in the reference timezone, minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    time: NaiveTime,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Result<Self, ScheduleError> {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(|time| Self { time })
            .ok_or_else(|| ScheduleError::malformed("time of day", format!("{hour}:{minute}")))
    }

    pub fn midnight() -> Self {
        Self {
            time: NaiveTime::MIN,
        }
    }

    pub fn hour(&self) -> u32 {
        self.time.hour()
    }

    pub fn minute(&self) -> u32 {
        self.time.minute()
    }

    pub fn as_naive(&self) -> NaiveTime {
        self.time
    }
}

impl FromStr for TimeOfDay {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ScheduleError::malformed("time of day", s);

        let clock_re = Regex::new(r"^(?P<hour>\d{1,2}):(?P<minute>\d{1,2})$")
            .map_err(|_| malformed())?;
        let caps = clock_re.captures(s.trim()).ok_or_else(malformed)?;

        let hour = caps
            .name("hour")
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .ok_or_else(malformed)?;
        let minute = caps
            .name("minute")
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .ok_or_else(malformed)?;
        if hour > 23 || minute > 59 {
            return Err(malformed());
        }

        Self::new(hour, minute)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// Parses one of the catalog weekday tokens `Sun`..`Sat`. Nothing else is accepted.
pub fn parse_weekday(token: &str) -> Result<Weekday, ScheduleError> {
    match token {
        "Sun" => Ok(Weekday::Sun),
        "Mon" => Ok(Weekday::Mon),
        "Tue" => Ok(Weekday::Tue),
        "Wed" => Ok(Weekday::Wed),
        "Thu" => Ok(Weekday::Thu),
        "Fri" => Ok(Weekday::Fri),
        "Sat" => Ok(Weekday::Sat),
        other => Err(ScheduleError::malformed("weekday", other)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Daily,
    Weekly,
}

impl FromStr for RuleKind {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            other => Err(ScheduleError::malformed("event type", other)),
        }
    }
}

/// Validated recurrence of a single catalog event.
///
/// A daily end time always falls on the calendar day after the start, so
/// `08:00 -> 08:00` is a full 24 hour cycle and `20:00 -> 04:00` spans
/// midnight. A weekly rule whose end does not come after its start within the
/// same week wraps to the following week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurrenceRule {
    Daily {
        start: TimeOfDay,
        end: TimeOfDay,
    },
    Weekly {
        start_day: Weekday,
        start: TimeOfDay,
        end_day: Weekday,
        end: TimeOfDay,
    },
}

impl RecurrenceRule {
    /// Builds a rule from the raw string fields of a catalog record.
    pub fn from_parts(
        kind: &str,
        start_time: &str,
        end_time: Option<&str>,
        start_day: Option<&str>,
        end_day: Option<&str>,
    ) -> Result<Self, ScheduleError> {
        let kind: RuleKind = kind.parse()?;
        let start: TimeOfDay = start_time.parse()?;
        let end = match end_time {
            Some(raw) => raw.parse()?,
            None => start,
        };

        match kind {
            RuleKind::Daily => Ok(Self::Daily { start, end }),
            RuleKind::Weekly => {
                let start_day = start_day
                    .ok_or_else(|| ScheduleError::malformed("startDay", "<missing>"))
                    .and_then(parse_weekday)?;
                let end_day = match end_day {
                    Some(token) => parse_weekday(token)?,
                    None => start_day,
                };
                Ok(Self::Weekly {
                    start_day,
                    start,
                    end_day,
                    end,
                })
            }
        }
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            Self::Daily { .. } => RuleKind::Daily,
            Self::Weekly { .. } => RuleKind::Weekly,
        }
    }

    pub fn start_time(&self) -> TimeOfDay {
        match self {
            Self::Daily { start, .. } | Self::Weekly { start, .. } => *start,
        }
    }

    pub fn end_time(&self) -> TimeOfDay {
        match self {
            Self::Daily { end, .. } | Self::Weekly { end, .. } => *end,
        }
    }

    /// Length of one cycle in days.
    pub fn cycle_days(&self) -> i64 {
        match self {
            Self::Daily { .. } => 1,
            Self::Weekly { .. } => 7,
        }
    }

    /// Whole days between an occurrence's start date and its end date.
    pub(crate) fn end_day_offset(&self) -> i64 {
        match self {
            Self::Daily { .. } => 1,
            Self::Weekly {
                start_day,
                start,
                end_day,
                end,
            } => {
                let mut day_diff = end_day.num_days_from_sunday() as i64
                    - start_day.num_days_from_sunday() as i64;
                if day_diff < 0 || (day_diff == 0 && end <= start) {
                    day_diff += 7;
                }
                day_diff
            }
        }
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily { start, end } => write!(f, "daily {start} -> {end}"),
            Self::Weekly {
                start_day,
                start,
                end_day,
                end,
            } => write!(f, "weekly {start_day} {start} -> {end_day} {end}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Weekday;

    use super::{RecurrenceRule, TimeOfDay, parse_weekday};
    use crate::error::ScheduleError;

    #[test]
    fn parses_valid_times() {
        let t: TimeOfDay = "08:05".parse().expect("valid time");
        assert_eq!((t.hour(), t.minute()), (8, 5));

        let t: TimeOfDay = "0:00".parse().expect("single digit hour");
        assert_eq!((t.hour(), t.minute()), (0, 0));

        let t: TimeOfDay = "23:59".parse().expect("last minute");
        assert_eq!(t.to_string(), "23:59");
    }

    #[test]
    fn rejects_malformed_times() {
        for raw in ["24:00", "12:60", "8", "08-00", "aa:bb", "", "08:00:00", "-1:30"] {
            let err = raw.parse::<TimeOfDay>().expect_err(raw);
            assert!(
                matches!(err, ScheduleError::MalformedInput { .. }),
                "unexpected error for {raw}: {err}"
            );
        }
    }

    #[test]
    fn weekday_tokens_are_exact() {
        assert_eq!(parse_weekday("Fri").expect("fri"), Weekday::Fri);
        assert_eq!(parse_weekday("Sun").expect("sun"), Weekday::Sun);
        assert!(parse_weekday("fri").is_err());
        assert!(parse_weekday("Friday").is_err());
        assert!(parse_weekday("").is_err());
    }

    #[test]
    fn weekly_defaults_end_to_start() {
        let rule = RecurrenceRule::from_parts("weekly", "20:00", None, Some("Fri"), None)
            .expect("weekly rule");
        assert_eq!(rule.end_day_offset(), 7);
    }

    #[test]
    fn weekly_requires_start_day() {
        let err = RecurrenceRule::from_parts("weekly", "20:00", None, None, None)
            .expect_err("missing startDay");
        assert!(matches!(err, ScheduleError::MalformedInput { field: "startDay", .. }));
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(RecurrenceRule::from_parts("monthly", "08:00", None, None, None).is_err());
    }

    #[test]
    fn weekly_day_offset_wraps() {
        let rule = RecurrenceRule::from_parts("weekly", "08:00", Some("08:00"), Some("Tue"), Some("Mon"))
            .expect("rule");
        assert_eq!(rule.end_day_offset(), 6);

        let rule = RecurrenceRule::from_parts("weekly", "08:00", Some("09:00"), Some("Tue"), Some("Tue"))
            .expect("rule");
        assert_eq!(rule.end_day_offset(), 0);
    }
}
