//! Due-time countdown labels.
//!
//! A todo carries its due point as two loose strings, a calendar date
//! (`YYYY-MM-DD`) and a time of day (`HH:MM:SS` or `HH:MM`). [`estimate`]
//! joins them into a local date-time in the zone of the supplied `now` and
//! reports how far away it is. The result renders as one of:
//!
//! - `""` when either field is missing,
//! - `"Overdue"` when the due point is not strictly in the future or the
//!   fields do not form a valid date-time,
//! - `"{d}d {h}h left"`, `"{h}h {m}m left"` or `"{m}m left"`.

use std::fmt;
use std::sync::OnceLock;

use chrono::{
  DateTime,
  LocalResult,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  TimeZone
};
use regex::Regex;
use tracing::trace;

const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_HOUR: i64 = 3_600_000;

fn due_shape_re() -> &'static Regex {
  static RE: OnceLock<Regex> =
    OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(
      r"^(?P<y>[0-9]{4})-(?P<mo>[0-9]{2})-(?P<d>[0-9]{2})T(?P<h>[0-9]{2}):(?P<mi>[0-9]{2})(?::(?P<s>[0-9]{2})(?:\.(?P<frac>[0-9]+))?)?$",
    )
    .unwrap_or_else(|e| {
      panic!("due shape regex: {e}")
    })
  })
}

/// Why a todo reads as overdue. Both causes render as `"Overdue"`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum OverdueCause {
  /// The due point parsed and is at or before `now`.
  Past,
  /// The date/time fields did not form a valid local date-time.
  Unparseable
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Countdown {
  Unknown,
  Overdue(OverdueCause),
  /// `hours` is the hour-of-day part (`0..24`), `minutes` is `0..60`.
  Remaining {
    days:    u64,
    hours:   u64,
    minutes: u64
  }
}

impl Countdown {
  /// Decomposes a signed millisecond distance to the due point.
  #[must_use]
  pub fn from_millis(
    diff_ms: i64
  ) -> Self {
    if diff_ms <= 0 {
      return Self::Overdue(
        OverdueCause::Past
      );
    }

    let diff = diff_ms.unsigned_abs();
    let total_hours =
      diff / MS_PER_HOUR as u64;
    let minutes = (diff
      % MS_PER_HOUR as u64)
      / MS_PER_MINUTE as u64;

    Self::Remaining {
      days: total_hours / 24,
      hours: total_hours % 24,
      minutes
    }
  }

  #[must_use]
  pub fn is_overdue(&self) -> bool {
    matches!(self, Self::Overdue(_))
  }

  #[must_use]
  pub fn overdue_cause(
    &self
  ) -> Option<OverdueCause> {
    match self {
      | Self::Overdue(cause) => {
        Some(*cause)
      }
      | _ => None
    }
  }

  #[must_use]
  pub fn label(&self) -> String {
    self.to_string()
  }
}

impl fmt::Display for Countdown {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    match self {
      | Self::Unknown => Ok(()),
      | Self::Overdue(_) => {
        f.write_str("Overdue")
      }
      | Self::Remaining {
        days,
        hours,
        minutes
      } => {
        if *days > 0 {
          write!(
            f,
            "{days}d {hours}h left"
          )
        } else if *hours > 0 {
          write!(
            f,
            "{hours}h {minutes}m left"
          )
        } else {
          write!(f, "{minutes}m left")
        }
      }
    }
  }
}

/// Reads `<date>T<time>` as a naive date-time.
///
/// Only zero-padded `YYYY-MM-DDTHH:MM[:SS[.fff]]` is accepted. Seconds must
/// be below 60 and fractions past nanoseconds are truncated.
fn parse_due_naive(
  combined: &str
) -> Option<NaiveDateTime> {
  let caps =
    due_shape_re().captures(combined)?;
  let num = |name: &str| -> Option<u32> {
    caps
      .name(name)
      .map_or(Some(0), |m| {
        m.as_str().parse().ok()
      })
  };

  let year: i32 =
    caps.name("y")?.as_str().parse().ok()?;
  let second = num("s")?;
  if second >= 60 {
    return None;
  }
  let nanos = match caps.name("frac") {
    | Some(m) => {
      let digits: String = m
        .as_str()
        .chars()
        .chain(std::iter::repeat('0'))
        .take(9)
        .collect();
      digits.parse().ok()?
    }
    | None => 0
  };

  let date = NaiveDate::from_ymd_opt(
    year,
    num("mo")?,
    num("d")?
  )?;
  let time = NaiveTime::from_hms_nano_opt(
    num("h")?,
    num("mi")?,
    second,
    nanos
  )?;
  Some(date.and_time(time))
}

/// Resolves `<date>T<time>` as a local date-time in `tz`.
///
/// Returns `None` for malformed input and for local times skipped by a DST
/// transition. Times repeated by a DST fold resolve to the earlier instant.
pub fn parse_due_instant<Tz: TimeZone>(
  due_date: &str,
  due_time: &str,
  tz: &Tz
) -> Option<DateTime<Tz>> {
  let naive = parse_due_naive(&format!(
    "{due_date}T{due_time}"
  ))?;

  match tz.from_local_datetime(&naive)
  {
    | LocalResult::Single(dt) => {
      Some(dt)
    }
    | LocalResult::Ambiguous(
      first,
      second
    ) => {
      if first <= second {
        Some(first)
      } else {
        Some(second)
      }
    }
    | LocalResult::None => None
  }
}

/// Computes the countdown for a todo's due fields as seen from `now`.
///
/// The due fields are read in the time zone carried by `now`.
pub fn estimate<Tz: TimeZone>(
  due_date: Option<&str>,
  due_time: Option<&str>,
  now: &DateTime<Tz>
) -> Countdown {
  let (Some(date), Some(time)) = (
    due_date.filter(|d| !d.is_empty()),
    due_time.filter(|t| !t.is_empty())
  ) else {
    return Countdown::Unknown;
  };

  let Some(due) = parse_due_instant(
    date,
    time,
    &now.timezone()
  ) else {
    trace!(
      date,
      time,
      "due fields did not parse"
    );
    return Countdown::Overdue(
      OverdueCause::Unparseable
    );
  };

  Countdown::from_millis(
    due.timestamp_millis()
      - now.timestamp_millis()
  )
}

pub fn estimate_label<Tz: TimeZone>(
  due_date: Option<&str>,
  due_time: Option<&str>,
  now: &DateTime<Tz>
) -> String {
  estimate(due_date, due_time, now)
    .label()
}

#[cfg(test)]
mod tests {
  use chrono::{
    DateTime,
    TimeZone,
    Utc
  };
  use chrono_tz::America::New_York;

  use super::{
    Countdown,
    OverdueCause,
    estimate,
    estimate_label
  };

  fn new_year() -> DateTime<Utc> {
    Utc
      .with_ymd_and_hms(
        2024, 1, 1, 0, 0, 0
      )
      .single()
      .expect("valid now")
  }

  #[test]
  fn missing_fields_render_empty() {
    let now = new_year();
    assert_eq!(
      estimate_label(
        None,
        Some("10:00:00"),
        &now
      ),
      ""
    );
    assert_eq!(
      estimate_label(
        Some("2030-01-01"),
        None,
        &now
      ),
      ""
    );
    assert_eq!(
      estimate(
        Some(""),
        Some("10:00:00"),
        &now
      ),
      Countdown::Unknown
    );
  }

  #[test]
  fn garbage_date_is_overdue_but_unparseable()
  {
    let now = new_year();
    let result = estimate(
      Some("not-a-date"),
      Some("10:00:00"),
      &now
    );
    assert_eq!(result.label(), "Overdue");
    assert_eq!(
      result.overdue_cause(),
      Some(OverdueCause::Unparseable)
    );
  }

  #[test]
  fn whitespace_fields_are_not_missing()
  {
    let now = new_year();
    assert_eq!(
      estimate(
        Some(" "),
        Some("10:00:00"),
        &now
      ),
      Countdown::Overdue(
        OverdueCause::Unparseable
      )
    );
  }

  #[test]
  fn past_instant_is_overdue() {
    let now = new_year();
    let result = estimate(
      Some("2023-12-31"),
      Some("23:59:59"),
      &now
    );
    assert_eq!(result.label(), "Overdue");
    assert_eq!(
      result.overdue_cause(),
      Some(OverdueCause::Past)
    );
  }

  #[test]
  fn due_exactly_now_is_overdue() {
    let now = new_year();
    assert_eq!(
      estimate(
        Some("2024-01-01"),
        Some("00:00:00"),
        &now
      ),
      Countdown::Overdue(
        OverdueCause::Past
      )
    );
  }

  #[test]
  fn day_branch_drops_minutes() {
    let now = new_year();
    assert_eq!(
      estimate_label(
        Some("2024-01-02"),
        Some("01:30:00"),
        &now
      ),
      "1d 1h left"
    );
  }

  #[test]
  fn hour_branch_shows_minutes() {
    let now = new_year();
    assert_eq!(
      estimate_label(
        Some("2024-01-01"),
        Some("02:15:00"),
        &now
      ),
      "2h 15m left"
    );
  }

  #[test]
  fn minute_branch() {
    let now = new_year();
    assert_eq!(
      estimate_label(
        Some("2024-01-01"),
        Some("00:45:00"),
        &now
      ),
      "45m left"
    );
  }

  #[test]
  fn under_a_minute_reads_zero_minutes()
  {
    let now = new_year();
    assert_eq!(
      estimate_label(
        Some("2024-01-01"),
        Some("00:00:59"),
        &now
      ),
      "0m left"
    );
  }

  #[test]
  fn accepts_short_and_fractional_times()
  {
    let now = new_year();
    assert_eq!(
      estimate_label(
        Some("2024-01-01"),
        Some("03:00"),
        &now
      ),
      "3h 0m left"
    );
    assert_eq!(
      estimate_label(
        Some("2024-01-01"),
        Some("00:10:00.250000"),
        &now
      ),
      "10m left"
    );
  }

  #[test]
  fn rejects_impossible_calendar_dates()
  {
    let now = new_year();
    assert_eq!(
      estimate(
        Some("2024-02-30"),
        Some("10:00:00"),
        &now
      ),
      Countdown::Overdue(
        OverdueCause::Unparseable
      )
    );
  }

  #[test]
  fn rejects_leap_second() {
    let now = new_year();
    assert_eq!(
      estimate(
        Some("2024-01-01"),
        Some("00:59:60"),
        &now
      ),
      Countdown::Overdue(
        OverdueCause::Unparseable
      )
    );
  }

  #[test]
  fn rejects_loose_shapes() {
    let now = new_year();
    let cases = [
      ("2024-1-2", "01:30:00"),
      ("2024-01-02", "1:05:00"),
      ("+2024-01-02", "00:00:00"),
      (" 2024-01-02", "00:00:00"),
      ("2024-01-02", "00:00:00 "),
      ("2024-01-02", "00:00:00Z"),
      ("2024-01-02", "00:00:00."),
      ("２０２４-01-02", "00:00:00")
    ];
    for (date, time) in cases {
      assert_eq!(
        estimate(
          Some(date),
          Some(time),
          &now
        ),
        Countdown::Overdue(
          OverdueCause::Unparseable
        ),
        "{date:?} {time:?}"
      );
    }
  }

  #[test]
  fn long_fractions_truncate() {
    let now = new_year();
    assert_eq!(
      estimate_label(
        Some("2024-01-01"),
        Some("00:10:59.9999999999"),
        &now
      ),
      "10m left"
    );
  }

  #[test]
  fn reads_fields_in_the_zone_of_now()
  {
    // 2024-01-01T00:00Z is 2023-12-31T19:00 in New York.
    let now = new_year()
      .with_timezone(&New_York);
    assert_eq!(
      estimate_label(
        Some("2023-12-31"),
        Some("21:30:00"),
        &now
      ),
      "2h 30m left"
    );
  }

  #[test]
  fn skipped_local_time_is_unparseable()
  {
    let now = Utc
      .with_ymd_and_hms(
        2024, 3, 1, 0, 0, 0
      )
      .single()
      .expect("valid now")
      .with_timezone(&New_York);
    assert_eq!(
      estimate(
        Some("2024-03-10"),
        Some("02:30:00"),
        &now
      ),
      Countdown::Overdue(
        OverdueCause::Unparseable
      )
    );
  }

  #[test]
  fn repeated_local_time_uses_earliest()
  {
    // 01:30 EDT on 2024-11-03 is 05:30Z.
    let now = Utc
      .with_ymd_and_hms(
        2024, 11, 3, 5, 0, 0
      )
      .single()
      .expect("valid now")
      .with_timezone(&New_York);
    assert_eq!(
      estimate_label(
        Some("2024-11-03"),
        Some("01:30:00"),
        &now
      ),
      "30m left"
    );
  }

  #[test]
  fn remaining_fields_stay_in_range() {
    let step = 37 * 60_000 + 1_234;
    let mut diff = 1_i64;
    while diff < 90 * 24 * 3_600_000 {
      match Countdown::from_millis(diff)
      {
        | Countdown::Remaining {
          days,
          hours,
          minutes
        } => {
          assert!(hours < 24);
          assert!(minutes < 60);
          let total =
            days * 24 + hours;
          assert_eq!(
            total,
            (diff / 3_600_000) as u64
          );
          let label = Countdown::from_millis(diff).label();
          let branches = [
            days > 0
              && label.ends_with("h left")
              && label.contains('d'),
            days == 0
              && total > 0
              && label.contains("h ")
              && label.ends_with("m left"),
            total == 0
              && !label.contains('h')
              && label.ends_with("m left")
          ];
          assert_eq!(
            branches
              .iter()
              .filter(|hit| **hit)
              .count(),
            1,
            "label {label} for {diff}ms"
          );
        }
        | other => {
          panic!(
            "expected remaining for \
             {diff}ms, got {other:?}"
          )
        }
      }
      diff += step;
    }
  }

  #[test]
  fn identical_inputs_identical_output()
  {
    let now = new_year();
    let first = estimate(
      Some("2024-03-04"),
      Some("05:06:07"),
      &now
    );
    for _ in 0..10 {
      assert_eq!(
        estimate(
          Some("2024-03-04"),
          Some("05:06:07"),
          &now
        ),
        first
      );
    }
  }

  #[test]
  fn decrements_as_now_advances() {
    let due = (
      Some("2024-01-03"),
      Some("12:00:00")
    );
    let mut now = new_year();
    let mut last = i64::MAX;
    loop {
      let result =
        estimate(due.0, due.1, &now);
      let Countdown::Remaining {
        days,
        hours,
        minutes
      } = result
      else {
        assert_eq!(
          result,
          Countdown::Overdue(
            OverdueCause::Past
          )
        );
        break;
      };
      let total_minutes = ((days * 24
        + hours)
        * 60
        + minutes)
        as i64;
      assert!(total_minutes < last);
      last = total_minutes;
      now += chrono::Duration::minutes(
        17
      );
    }
  }
}
