use crate::error::{validation_error, AppResult};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Wall-clock format the language model is asked to emit for event times
pub const LOCAL_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Calendar date format used by searches
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse an IANA timezone identifier
pub fn parse_timezone(name: &str) -> AppResult<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| validation_error(&format!("Unknown timezone: {}", name)))
}

/// Parse a `YYYY-MM-DD` calendar date
pub fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| validation_error(&format!("Invalid date '{}', expected YYYY-MM-DD", value)))
}

/// Parse an event start/end value.
///
/// Accepts a wall-clock `YYYY-MM-DDTHH:mm:ss` (optionally with fractional
/// seconds) or a fully qualified RFC 3339 timestamp. The naive local part is
/// returned for ordering checks.
pub fn parse_event_datetime(value: &str) -> AppResult<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.naive_local());
    }
    NaiveDateTime::parse_from_str(value, LOCAL_DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .map_err(|_| {
            validation_error(&format!(
                "Invalid date-time '{}', expected YYYY-MM-DDTHH:mm:ss",
                value
            ))
        })
}

/// Read an event start/end value as an instant.
///
/// Offsets carried by RFC 3339 values win; wall-clock values are read in `tz`.
pub fn event_instant(value: &str, tz: Tz) -> AppResult<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = parse_event_datetime(value)?;
    Ok(localize(tz, naive).with_timezone(&Utc))
}

/// Parse a list boundary into an absolute instant.
///
/// RFC 3339 values are taken as-is; bare date-times and dates are read in `tz`.
pub fn parse_time_bound(value: &str, tz: Tz) -> AppResult<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = parse_event_datetime(value) {
        return Ok(localize(tz, naive).with_timezone(&Utc));
    }
    let date = parse_date(value)
        .map_err(|_| validation_error(&format!("Invalid time bound '{}', expected RFC 3339", value)))?;
    Ok(start_of_day(date, tz))
}

/// Attach a timezone to a wall-clock time, picking the earlier instant when the
/// local time is ambiguous and reading it as UTC offset when it does not exist
fn localize(tz: Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&naive).earliest() {
        Some(dt) => dt,
        None => tz.from_utc_datetime(&naive),
    }
}

/// First instant of `date` in `tz`
pub fn start_of_day(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let naive = date.and_time(chrono::NaiveTime::MIN);
    localize(tz, naive).with_timezone(&Utc)
}

/// Last second of `date` in `tz`
pub fn end_of_day(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    match date.succ_opt() {
        Some(next) => start_of_day(next, tz) - Duration::seconds(1),
        None => start_of_day(date, tz) + Duration::seconds(86_399),
    }
}

/// Search window covering one whole local day
pub fn day_window(date: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    (start_of_day(date, tz), end_of_day(date, tz))
}

/// Search window from `now` to `days` days ahead
pub fn look_ahead_window(now: DateTime<Utc>, days: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    (now, now + Duration::days(i64::from(days)))
}

/// Today, tomorrow and the current time as seen by a user in `tz`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalClock {
    pub today: String,
    pub tomorrow: String,
    /// `YYYY-MM-DDTHH:mm:00`
    pub now: String,
    pub timezone: String,
}

/// Describe `now` in the user's timezone for the prompt context
pub fn local_clock(now: DateTime<Utc>, tz: Tz) -> LocalClock {
    let local = now.with_timezone(&tz);
    let today = local.date_naive();
    let tomorrow = today.succ_opt().unwrap_or(today);

    LocalClock {
        today: today.format(DATE_FORMAT).to_string(),
        tomorrow: tomorrow.format(DATE_FORMAT).to_string(),
        now: local.format("%Y-%m-%dT%H:%M:00").to_string(),
        timezone: tz.name().to_string(),
    }
}
