use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::sync::OnceLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  Local,
  NaiveDate,
  NaiveTime,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

use crate::countdown::{
  self,
  Countdown
};

const TIMEZONE_CONFIG_FILE: &str =
  "duetrack-time.toml";
const TIMEZONE_ENV_VAR: &str =
  "DUETRACK_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str =
  "DUETRACK_TIME_CONFIG";

pub const DUE_DATE_FORMAT: &str =
  "%Y-%m-%d";
pub const DUE_TIME_FORMAT: &str =
  "%H:%M:%S";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
  timezone: Option<String>,
  time:     Option<TimezoneSection>
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
  timezone: Option<String>
}

/// Zone in which a todo's date and time fields are read.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum DueZone {
  Named(Tz),
  Local
}

impl DueZone {
  pub fn estimate(
    &self,
    due_date: Option<&str>,
    due_time: Option<&str>,
    now: DateTime<Utc>
  ) -> Countdown {
    match self {
      | Self::Named(tz) => {
        countdown::estimate(
          due_date,
          due_time,
          &now.with_timezone(tz)
        )
      }
      | Self::Local => {
        countdown::estimate(
          due_date,
          due_time,
          &now.with_timezone(&Local)
        )
      }
    }
  }

  pub fn due_instant(
    &self,
    due_date: &str,
    due_time: &str
  ) -> Option<DateTime<Utc>> {
    match self {
      | Self::Named(tz) => {
        countdown::parse_due_instant(
          due_date, due_time, tz
        )
        .map(|dt| dt.with_timezone(&Utc))
      }
      | Self::Local => {
        countdown::parse_due_instant(
          due_date, due_time, &Local
        )
        .map(|dt| dt.with_timezone(&Utc))
      }
    }
  }

  #[must_use]
  pub fn today(
    &self,
    now: DateTime<Utc>
  ) -> NaiveDate {
    match self {
      | Self::Named(tz) => {
        now.with_timezone(tz).date_naive()
      }
      | Self::Local => {
        now
          .with_timezone(&Local)
          .date_naive()
      }
    }
  }

  #[must_use]
  pub fn name(&self) -> String {
    match self {
      | Self::Named(tz) => {
        tz.name().to_string()
      }
      | Self::Local => {
        "local".to_string()
      }
    }
  }
}

pub fn due_zone() -> DueZone {
  static DUE_ZONE: OnceLock<DueZone> =
    OnceLock::new();
  *DUE_ZONE.get_or_init(resolve_due_zone)
}

fn resolve_due_zone() -> DueZone {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) =
      parse_timezone(&raw, TIMEZONE_ENV_VAR)
  {
    return DueZone::Named(tz);
  }

  if let Some(path) =
    timezone_config_path()
    && let Some(tz) =
      load_timezone_from_file(&path)
  {
    return DueZone::Named(tz);
  }

  tracing::debug!(
    "no timezone configured; reading \
     due fields in the system zone"
  );
  DueZone::Local
}

fn timezone_config_path()
-> Option<PathBuf> {
  if let Ok(raw) = std::env::var(
    TIMEZONE_CONFIG_ENV_VAR
  ) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  std::env::current_dir().ok().map(
    |dir| {
      dir.join(TIMEZONE_CONFIG_FILE)
    }
  )
}

fn load_timezone_from_file(
  path: &Path
) -> Option<Tz> {
  if !path.exists() {
    tracing::debug!(
      file = %path.display(),
      "timezone config file not found"
    );
    return None;
  }

  let raw = match fs::read_to_string(
    path
  ) {
    | Ok(raw) => raw,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed reading timezone config file"
      );
      return None;
    }
  };

  let parsed = match toml::from_str::<
    TimezoneConfig
  >(&raw)
  {
    | Ok(parsed) => parsed,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed parsing timezone config file"
      );
      return None;
    }
  };

  let timezone =
    parsed.timezone.or_else(|| {
      parsed.time.and_then(|section| {
        section.timezone
      })
    });
  let Some(timezone) = timezone else {
    tracing::warn!(
      file = %path.display(),
      "timezone config had no timezone field"
    );
    return None;
  };

  parse_timezone(
    timezone.as_str(),
    &format!("file:{}", path.display())
  )
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured due timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

/// Parses a due date given on the command line.
///
/// Accepts `today`, `tomorrow`, `yesterday`, weekday names (next
/// occurrence, never today), `+Nd`/`-Nd` and `YYYY-MM-DD`.
#[tracing::instrument(skip_all, fields(input = input))]
pub fn parse_due_date(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return shift_days(today, 1);
    }
    | "yesterday" => {
      return shift_days(today, -1);
    }
    | _ => {}
  }

  if let Some(target_weekday) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today,
      target_weekday
    ));
  }

  if let Some(caps) =
    relative_days_re().captures(token)
  {
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let signed = match caps
      .name("sign")
      .map(|m| m.as_str())
    {
      | Some("-") => -num,
      | _ => num
    };
    return shift_days(today, signed);
  }

  NaiveDate::parse_from_str(
    token,
    DUE_DATE_FORMAT
  )
  .with_context(|| {
    format!(
      "unrecognized due date: \
       {input} (expected YYYY-MM-DD, \
       today, tomorrow, a weekday \
       name or +Nd)"
    )
  })
}

/// Parses a due time: `HH:MM`, `HH:MM:SS` or a 12-hour clock such as
/// `3:23pm`.
#[tracing::instrument(skip_all, fields(input = input))]
pub fn parse_due_time(
  input: &str
) -> anyhow::Result<NaiveTime> {
  parse_clock_time(input.trim())
    .ok_or_else(|| {
      anyhow!(
        "unrecognized due time: \
         {input} (expected HH:MM:SS, \
         HH:MM or h:mm[am|pm])"
      )
    })
}

#[must_use]
pub fn format_due_date(
  date: NaiveDate
) -> String {
  date.format(DUE_DATE_FORMAT).to_string()
}

#[must_use]
pub fn format_due_time(
  time: NaiveTime
) -> String {
  time.format(DUE_TIME_FORMAT).to_string()
}

fn shift_days(
  from: NaiveDate,
  days: i64
) -> anyhow::Result<NaiveDate> {
  Duration::try_days(days)
    .and_then(|delta| {
      from.checked_add_signed(delta)
    })
    .ok_or_else(|| {
      anyhow!(
        "date out of range: {from} \
         {days:+}d"
      )
    })
}

fn relative_days_re() -> &'static Regex {
  static RE: OnceLock<Regex> =
    OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(
      r"^(?P<sign>[+-])(?P<num>\d+)d$"
    )
    .unwrap_or_else(|e| {
      panic!(
        "relative day regex: {e}"
      )
    })
  })
}

fn clock_re() -> &'static Regex {
  static RE: OnceLock<Regex> =
    OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(
      r"(?i)^(?P<hour>\d{1,2}):(?P<minute>\d{2})(?::(?P<second>\d{2}))?\s*(?P<ampm>[ap]m)?$",
    )
    .unwrap_or_else(|e| {
      panic!("clock regex: {e}")
    })
  })
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  from
    .checked_add_signed(Duration::days(
      delta
    ))
    .unwrap_or(from)
}

fn parse_clock_time(
  token: &str
) -> Option<NaiveTime> {
  let captures =
    clock_re().captures(token)?;

  let raw_hour = captures
    .name("hour")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  let minute = captures
    .name("minute")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  let second = match captures
    .name("second")
  {
    | Some(m) => {
      m.as_str().parse::<u32>().ok()?
    }
    | None => 0
  };

  let hour = if let Some(ampm_match) =
    captures.name("ampm")
  {
    let ampm = ampm_match
      .as_str()
      .to_ascii_lowercase();
    if raw_hour == 0 || raw_hour > 12 {
      return None;
    }
    match ampm.as_str() {
      | "am" => {
        if raw_hour == 12 {
          0
        } else {
          raw_hour
        }
      }
      | "pm" => {
        if raw_hour == 12 {
          12
        } else {
          raw_hour + 12
        }
      }
      | _ => return None
    }
  } else {
    raw_hour
  };

  NaiveTime::from_hms_opt(
    hour, minute, second
  )
}

#[cfg(test)]
mod tests {
  use std::fs;

  use chrono::{
    NaiveDate,
    NaiveTime,
    TimeZone,
    Utc
  };
  use tempfile::tempdir;

  use super::{
    DueZone,
    format_due_time,
    load_timezone_from_file,
    parse_due_date,
    parse_due_time,
    parse_timezone
  };

  fn tuesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 17)
      .expect("valid date")
  }

  #[test]
  fn parses_named_days() {
    assert_eq!(
      parse_due_date("today", tuesday())
        .expect("today"),
      tuesday()
    );
    assert_eq!(
      parse_due_date(
        "Tomorrow",
        tuesday()
      )
      .expect("tomorrow")
      .to_string(),
      "2026-02-18"
    );
  }

  #[test]
  fn parses_weekday_name() {
    assert_eq!(
      parse_due_date(
        "wednesday",
        tuesday()
      )
      .expect("weekday")
      .to_string(),
      "2026-02-18"
    );
    assert_eq!(
      parse_due_date("tue", tuesday())
        .expect("same weekday")
        .to_string(),
      "2026-02-24"
    );
  }

  #[test]
  fn parses_relative_days() {
    assert_eq!(
      parse_due_date("+14d", tuesday())
        .expect("relative")
        .to_string(),
      "2026-03-03"
    );
    assert_eq!(
      parse_due_date("-1d", tuesday())
        .expect("relative back")
        .to_string(),
      "2026-02-16"
    );
  }

  #[test]
  fn rejects_bad_dates() {
    assert!(
      parse_due_date(
        "2026-02-30",
        tuesday()
      )
      .is_err()
    );
    assert!(
      parse_due_date("soon", tuesday())
        .is_err()
    );
  }

  #[test]
  fn parses_clock_times() {
    let expect = |h, m, s| {
      NaiveTime::from_hms_opt(h, m, s)
        .expect("valid time")
    };
    assert_eq!(
      parse_due_time("09:05")
        .expect("short"),
      expect(9, 5, 0)
    );
    assert_eq!(
      parse_due_time("23:59:30")
        .expect("full"),
      expect(23, 59, 30)
    );
    assert_eq!(
      parse_due_time("3:23pm")
        .expect("pm"),
      expect(15, 23, 0)
    );
    assert_eq!(
      parse_due_time("12:00 AM")
        .expect("midnight"),
      expect(0, 0, 0)
    );
    assert_eq!(
      format_due_time(expect(7, 0, 0)),
      "07:00:00"
    );
  }

  #[test]
  fn rejects_bad_times() {
    for raw in
      ["24:00", "10:60", "13:00pm", "noon"]
    {
      assert!(
        parse_due_time(raw).is_err(),
        "{raw} should be rejected"
      );
    }
  }

  #[test]
  fn timezone_ids_validate() {
    assert!(
      parse_timezone(
        "Europe/Berlin",
        "test"
      )
      .is_some()
    );
    assert!(
      parse_timezone("Mars/Olympus", "test")
        .is_none()
    );
    assert!(
      parse_timezone("  ", "test")
        .is_none()
    );
  }

  #[test]
  fn timezone_file_accepts_both_layouts()
  {
    let dir = tempdir().expect("tempdir");
    let flat = dir.path().join("flat.toml");
    fs::write(
      &flat,
      "timezone = \"Asia/Tokyo\"\n"
    )
    .expect("write flat");
    let nested =
      dir.path().join("nested.toml");
    fs::write(
      &nested,
      "[time]\ntimezone = \"UTC\"\n"
    )
    .expect("write nested");

    assert_eq!(
      load_timezone_from_file(&flat)
        .map(|tz| tz.name().to_string()),
      Some("Asia/Tokyo".to_string())
    );
    assert_eq!(
      load_timezone_from_file(&nested)
        .map(|tz| tz.name().to_string()),
      Some("UTC".to_string())
    );
    assert!(
      load_timezone_from_file(
        &dir.path().join("missing.toml")
      )
      .is_none()
    );
  }

  #[test]
  fn named_zone_shifts_today_and_instants()
  {
    let zone =
      DueZone::Named(chrono_tz::Asia::Tokyo);
    let now = Utc
      .with_ymd_and_hms(
        2026, 2, 17, 20, 0, 0
      )
      .single()
      .expect("valid now");

    assert_eq!(
      zone.today(now).to_string(),
      "2026-02-18"
    );
    assert_eq!(
      zone
        .due_instant(
          "2026-02-18",
          "09:00:00"
        )
        .expect("instant"),
      Utc
        .with_ymd_and_hms(
          2026, 2, 18, 0, 0, 0
        )
        .single()
        .expect("valid")
    );
    assert_eq!(
      zone
        .estimate(
          Some("2026-02-18"),
          Some("06:30:00"),
          now
        )
        .label(),
      "1h 30m left"
    );
  }
}
