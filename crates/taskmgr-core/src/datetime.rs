use chrono::{
  DateTime,
  Datelike,
  Duration,
  LocalResult,
  NaiveDate,
  NaiveTime,
  TimeZone
};

use crate::error::TaskError;

pub const DATE_KEY_FORMAT: &str =
  "%Y-%m-%d";

/// Longest DST gap we step over when
/// local midnight does not exist.
const MAX_GAP_MINUTES: i64 = 180;

#[must_use]
pub fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .unwrap_or(NaiveDate::MIN)
}

/// Day before the first of the
/// following month.
#[must_use]
pub fn last_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  let (next_year, next_month) =
    if month >= 12 {
      (year.saturating_add(1), 1_u32)
    } else {
      (year, month + 1)
    };
  add_days(
    first_day_of_month(
      next_year, next_month
    ),
    -1
  )
}

#[must_use]
pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  last_day_of_month(year, month).day()
}

/// Weekday of the 1st, Sunday = 0.
#[must_use]
pub fn starting_weekday(
  year: i32,
  month: u32
) -> u32 {
  first_day_of_month(year, month)
    .weekday()
    .num_days_from_sunday()
}

#[must_use]
pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .unwrap_or(date)
}

/// Month arithmetic with year
/// rollover. `month` is 1-based.
#[must_use]
pub fn shift_months(
  year: i32,
  month: u32,
  delta: i32
) -> (i32, u32) {
  let index = i64::from(year) * 12
    + i64::from(month)
    - 1
    + i64::from(delta);
  let year = index.div_euclid(12);
  let month = index.rem_euclid(12) + 1;
  (
    i32::try_from(year).unwrap_or(
      if year < 0 {
        i32::MIN
      } else {
        i32::MAX
      }
    ),
    month as u32
  )
}

#[must_use]
pub fn date_key(
  date: NaiveDate
) -> String {
  date
    .format(DATE_KEY_FORMAT)
    .to_string()
}

/// Accepts `YYYY-MM-DD` or an ISO
/// date-time, keeping the date part.
pub fn parse_date_key(
  raw: &str
) -> Result<NaiveDate, TaskError> {
  let trimmed = raw.trim();
  let date_part = trimmed
    .split_once('T')
    .map_or(trimmed, |(date, _)| date);
  NaiveDate::parse_from_str(
    date_part,
    DATE_KEY_FORMAT
  )
  .map_err(|_| {
    TaskError::InvalidDate(
      raw.to_string()
    )
  })
}

#[must_use]
pub fn is_same_day(
  a: NaiveDate,
  b: NaiveDate
) -> bool {
  date_key(a) == date_key(b)
}

#[must_use]
pub fn is_today<Z: TimeZone>(
  date: NaiveDate,
  now: &DateTime<Z>
) -> bool {
  is_same_day(date, now.date_naive())
}

/// First instant of `date` in `zone`.
///
/// Ambiguous midnights resolve to the
/// earlier instant; skipped midnights
/// resolve to the first valid minute
/// after the gap.
pub fn local_midnight<Z: TimeZone>(
  date: NaiveDate,
  zone: &Z
) -> DateTime<Z> {
  let naive =
    date.and_time(NaiveTime::MIN);
  match zone
    .from_local_datetime(&naive)
  {
    | LocalResult::Single(dt) => dt,
    | LocalResult::Ambiguous(
      first,
      second
    ) => {
      tracing::debug!(
        date = %date_key(date),
        "ambiguous local midnight; using earliest"
      );
      if first <= second {
        first
      } else {
        second
      }
    }
    | LocalResult::None => {
      for minutes in
        1..=MAX_GAP_MINUTES
      {
        let shifted = naive
          + Duration::minutes(minutes);
        if let Some(dt) = zone
          .from_local_datetime(
            &shifted
          )
          .earliest()
        {
          tracing::debug!(
            date = %date_key(date),
            minutes,
            "local midnight skipped; using first valid time"
          );
          return dt;
        }
      }
      tracing::warn!(
        date = %date_key(date),
        "no valid local time near midnight; treating as UTC"
      );
      zone.from_utc_datetime(&naive)
    }
  }
}

/// Past local midnight of the due date
/// and not completed.
#[must_use]
pub fn is_overdue<Z: TimeZone>(
  due_date: Option<NaiveDate>,
  completed: bool,
  now: &DateTime<Z>
) -> bool {
  if completed {
    return false;
  }
  due_date.is_some_and(|due| {
    local_midnight(
      due,
      &now.timezone()
    )
    .timestamp_millis()
      < now.timestamp_millis()
  })
}

/// `Oct 19, 2026`
#[must_use]
pub fn format_display_date(
  date: NaiveDate
) -> String {
  date.format("%b %-d, %Y").to_string()
}

/// `Monday, October 19, 2026`
#[must_use]
pub fn format_long_date(
  date: NaiveDate
) -> String {
  date
    .format("%A, %B %-d, %Y")
    .to_string()
}

/// `October 2026`
#[must_use]
pub fn month_title(
  year: i32,
  month: u32
) -> String {
  first_day_of_month(year, month)
    .format("%B %Y")
    .to_string()
}


pub mod due_date_serde {
  use chrono::NaiveDate;
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  use super::{
    date_key,
    parse_date_key
  };

  pub fn serialize<S>(
    date: &Option<NaiveDate>,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    match date {
      | Some(value) => {
        serializer
          .serialize_str(&date_key(*value))
      }
      | None => serializer.serialize_none()
    }
  }

  /// Empty strings (an untouched date
  /// input) read back as no due date.
  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<Option<NaiveDate>, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw =
      Option::<String>::deserialize(
        deserializer
      )?;
    match raw {
      | Some(text)
        if !text.trim().is_empty() =>
      {
        parse_date_key(&text)
          .map(Some)
          .map_err(serde::de::Error::custom)
      }
      | _ => Ok(None)
    }
  }
}

pub mod created_at_serde {
  use chrono::{
    DateTime,
    SecondsFormat,
    Utc
  };
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  pub fn serialize<S>(
    dt: &DateTime<Utc>,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.serialize_str(
      &dt.to_rfc3339_opts(
        SecondsFormat::Millis,
        true
      )
    )
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<DateTime<Utc>, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = String::deserialize(
      deserializer
    )?;
    DateTime::parse_from_rfc3339(&raw)
      .map(|dt| dt.with_timezone(&Utc))
      .map_err(serde::de::Error::custom)
  }
}
