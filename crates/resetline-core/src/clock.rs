use anyhow::anyhow;
use chrono::{
  DateTime,
  Duration,
  FixedOffset,
  NaiveDate,
  NaiveDateTime,
  Offset,
  Utc
};

use crate::error::ScheduleError;
use crate::rule::TimeOfDay;

pub const DEFAULT_OFFSET_MINUTES: i32 =
  8 * 60;

/// Fixed-offset game/server clock.
///
/// Every wall-clock read (day boundaries, weekdays, times of day) goes
/// through this type so the offset is applied in exactly one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceClock {
  offset: FixedOffset
}

impl ReferenceClock {
  pub fn from_offset_minutes(
    minutes: i32
  ) -> Result<Self, ScheduleError> {
    FixedOffset::east_opt(
      minutes.saturating_mul(60)
    )
    .map(|offset| Self { offset })
    .ok_or(
      ScheduleError::InvalidOffset(
        minutes
      )
    )
  }

  pub(crate) fn from_fixed(
    offset: FixedOffset
  ) -> Self {
    Self { offset }
  }

  pub fn utc() -> Self {
    Self {
      offset: Utc.fix()
    }
  }

  #[must_use]
  pub fn offset(&self) -> FixedOffset {
    self.offset
  }

  #[must_use]
  pub fn offset_minutes(&self) -> i32 {
    self.offset.local_minus_utc() / 60
  }

  /// Current instant, read on the reference clock.
  #[must_use]
  pub fn now(
    &self
  ) -> DateTime<FixedOffset> {
    self.at(Utc::now())
  }

  #[must_use]
  pub fn at(
    &self,
    instant: DateTime<Utc>
  ) -> DateTime<FixedOffset> {
    instant.with_timezone(&self.offset)
  }

  /// Reference-local midnight `days` days away from the day containing
  /// `instant`.
  #[must_use]
  pub fn midnight(
    &self,
    instant: DateTime<FixedOffset>,
    days: i64
  ) -> DateTime<FixedOffset> {
    let date = self
      .at(instant.with_timezone(&Utc))
      .date_naive()
      + Duration::days(days);
    self.on_date(
      date,
      TimeOfDay::midnight()
    )
  }

  /// The instant at which the reference wall clock reads `time` on `date`.
  #[must_use]
  pub fn on_date(
    &self,
    date: NaiveDate,
    time: TimeOfDay
  ) -> DateTime<FixedOffset> {
    self.from_local(
      date.and_time(time.as_naive())
    )
  }

  /// Fixed offsets have no gaps or folds, so every local reading maps to
  /// exactly one instant.
  #[must_use]
  pub fn from_local(
    &self,
    local: NaiveDateTime
  ) -> DateTime<FixedOffset> {
    let utc = local
      - Duration::seconds(i64::from(
        self.offset.local_minus_utc()
      ));
    DateTime::from_naive_utc_and_offset(
      utc,
      self.offset
    )
  }
}

/// Parses a user-supplied instant:
/// `now`, RFC3339, or a reference-local
/// `YYYY-MM-DD HH:MM` /
/// `YYYY-MM-DDTHH:MM`.
#[tracing::instrument(skip(clock, now), fields(input = input))]
pub fn parse_instant(
  input: &str,
  clock: &ReferenceClock,
  now: DateTime<FixedOffset>
) -> anyhow::Result<DateTime<FixedOffset>>
{
  let token = input.trim();

  if token.eq_ignore_ascii_case("now") {
    return Ok(now);
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(clock.at(
      dt.with_timezone(&Utc)
    ));
  }

  for fmt in
    ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
  {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return Ok(clock.from_local(ndt));
    }
  }

  Err(anyhow!(
    "unrecognized instant: {input} \
     (expected now, RFC3339, or \
     YYYY-MM-DD HH:MM)"
  ))
}

impl Default for ReferenceClock {
  fn default() -> Self {
    Self::from_offset_minutes(
      DEFAULT_OFFSET_MINUTES
    )
    .unwrap_or_else(|_| Self::utc())
  }
}
