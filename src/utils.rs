//! Date parsing and small string helpers.
//!
//! Upstream feeds hand out dates in whatever shape their backend produced:
//! ISO 8601 with or without an offset, RFC 2822, US-style `06/15/2009`,
//! spelled-out months. [`parse_date`] accepts all of these and always returns
//! a naive datetime in local wall-clock time:
//!
//! - values with an offset are converted to the local timezone and the offset
//!   is dropped
//! - values without one are assumed to be local already and returned as parsed
//!
//! [`datetime_from_tuple`] does the same for feedparser-style 9-field time
//! tuples.

use crate::error::DateError;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use std::fmt::Write;
use tracing::{debug, instrument};
use url::Url;

/// Formats carrying an explicit UTC offset, tried after RFC 3339 and RFC 2822.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%a %b %d %H:%M:%S %z %Y",
    "%d %b %Y %H:%M:%S %z",
    "%B %d, %Y %H:%M:%S %z",
    "%B %d %Y %H:%M:%S %z",
    "%B %d %Y %I:%M %p %z",
];

/// Zone names that chrono's `%z` does not read, with their offsets.
const ZONE_ABBREVIATIONS: &[(&str, &str)] = &[
    ("UTC", "+0000"),
    ("GMT", "+0000"),
    ("EST", "-0500"),
    ("EDT", "-0400"),
    ("CST", "-0600"),
    ("CDT", "-0500"),
    ("MST", "-0700"),
    ("MDT", "-0600"),
    ("PST", "-0800"),
    ("PDT", "-0700"),
];

/// Query parameters whose values never reach the logs.
const SECRET_PARAMS: &[&str] = &["apiKey", "key"];

/// Formats with a time of day but no offset.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
    // Day-first only after month-first, so 06/07/2009 stays June 7.
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%B %d, %Y %H:%M:%S",
    "%B %d, %Y %H:%M",
    "%B %d, %Y %I:%M %p",
    "%b %d, %Y %H:%M:%S",
    "%b %d, %Y %I:%M %p",
    "%B %d %Y %H:%M:%S",
    "%B %d %Y %H:%M",
    "%B %d %Y %I:%M %p",
    "%b %d %Y %H:%M:%S",
    "%b %d %Y %H:%M",
    "%b %d %Y %I:%M %p",
    "%d %B %Y %H:%M:%S",
    "%d %b %Y %H:%M:%S",
    "%a, %d %b %Y %H:%M:%S",
    "%a %b %d %H:%M:%S %Y",
];

/// Date-only formats; the result is midnight.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%A, %B %d, %Y",
    "%a, %d %b %Y",
];

/// Convert an offset-aware timestamp to naive local wall-clock time.
pub fn to_local_naive(dt: DateTime<FixedOffset>) -> NaiveDateTime {
    dt.with_timezone(&Local).naive_local()
}

/// Replace a trailing zone name or ISO `Z` with a numeric offset.
fn normalize_zone_suffix(s: &str) -> String {
    if let Some(head) = s.strip_suffix('Z') {
        // `Z` alone is only a zone marker after a digit (ISO 8601).
        if head.ends_with(|c: char| c.is_ascii_digit()) {
            return format!("{head} +0000");
        }
    }
    if let Some((head, zone)) = s.rsplit_once(' ') {
        if let Some((_, offset)) = ZONE_ABBREVIATIONS.iter().find(|(name, _)| zone.eq_ignore_ascii_case(name)) {
            return format!("{head} {offset}");
        }
    }
    s.to_string()
}

fn parse_aware(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt);
    }
    let normalized = normalize_zone_suffix(s);
    OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(&normalized, fmt).ok())
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Parse a free-form date string into a naive local datetime.
///
/// Numeric dates are read month-first (`06/07/2009` is June 7) and fall back
/// to day-first when that cannot be a valid date (`15/06/2009`). Trailing US
/// zone abbreviations (`EST`, `PDT`, ...) are treated as fixed offsets.
///
/// # Arguments
///
/// * `s` - The date string, surrounding whitespace ignored
///
/// # Returns
///
/// The parsed time, converted to local wall-clock time when `s` carried an
/// offset or zone.
///
/// # Errors
///
/// [`DateError::Unparseable`] if no known layout matches.
///
/// # Examples
///
/// ```
/// use newsutils::utils::parse_date;
///
/// let dt = parse_date("2009-06-15 13:45:30").unwrap();
/// assert_eq!(dt.to_string(), "2009-06-15 13:45:30");
/// ```
#[instrument(level = "debug")]
pub fn parse_date(s: &str) -> Result<NaiveDateTime, DateError> {
    let trimmed = s.trim();
    if let Some(aware) = parse_aware(trimmed) {
        let local = to_local_naive(aware);
        debug!(%aware, %local, "Converted offset-aware date to local time");
        return Ok(local);
    }
    parse_naive(trimmed).ok_or_else(|| DateError::Unparseable(s.to_string()))
}

/// A struct-time style tuple:
/// `(year, month, day, hour, minute, second, weekday, yearday, isdst)`.
///
/// The calendar fields decide the wall-clock time. `weekday` and `yearday` are
/// range-checked but otherwise unused; `isdst` picks between the two readings
/// of a time repeated when daylight saving ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeTuple {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub weekday: i64,
    pub yearday: i64,
    pub isdst: i64,
}

impl TimeTuple {
    /// Build from nine integers, range-checking each calendar field.
    pub fn from_fields(fields: &[i64]) -> Result<Self, DateError> {
        let [year, month, day, hour, minute, second, weekday, yearday, isdst] = fields else {
            return Err(DateError::TupleLength(fields.len()));
        };

        fn ranged<T: TryFrom<i64>>(
            field: &'static str,
            value: i64,
            range: std::ops::RangeInclusive<i64>,
        ) -> Result<T, DateError> {
            if !range.contains(&value) {
                return Err(DateError::OutOfRange { field, value });
            }
            T::try_from(value).map_err(|_| DateError::OutOfRange { field, value })
        }

        Ok(Self {
            year: ranged("year", *year, 1..=9999)?,
            month: ranged("month", *month, 1..=12)?,
            day: ranged("day", *day, 1..=31)?,
            hour: ranged("hour", *hour, 0..=23)?,
            minute: ranged("minute", *minute, 0..=59)?,
            // 60 and 61 are struct_time leap seconds, clamped to 59 when converted.
            second: ranged("second", *second, 0..=61)?,
            weekday: ranged("weekday", *weekday, 0..=6)?,
            yearday: ranged("yearday", *yearday, 1..=366)?,
            isdst: ranged("isdst", *isdst, -1..=1)?,
        })
    }

    fn naive(&self) -> Result<NaiveDateTime, DateError> {
        let date = NaiveDate::from_ymd_opt(self.year, self.month, self.day).ok_or(
            DateError::OutOfRange {
                field: "day",
                value: i64::from(self.day),
            },
        )?;
        let time = NaiveTime::from_hms_opt(self.hour, self.minute, self.second.min(59)).ok_or(
            DateError::OutOfRange {
                field: "second",
                value: i64::from(self.second),
            },
        )?;
        Ok(date.and_time(time))
    }
}

/// Interpret a [`TimeTuple`] as local wall-clock time.
///
/// Times skipped by a daylight-saving jump are rejected rather than shifted.
///
/// # Arguments
///
/// * `tuple` - A range-checked tuple from [`TimeTuple::from_fields`]
///
/// # Returns
///
/// The naive local datetime the tuple names.
///
/// # Examples
///
/// ```
/// use newsutils::utils::{TimeTuple, datetime_from_tuple};
///
/// let tuple = TimeTuple::from_fields(&[2009, 1, 15, 12, 30, 0, 3, 15, 0]).unwrap();
/// assert_eq!(datetime_from_tuple(&tuple).unwrap().to_string(), "2009-01-15 12:30:00");
/// ```
pub fn datetime_from_tuple(tuple: &TimeTuple) -> Result<NaiveDateTime, DateError> {
    let naive = tuple.naive()?;
    resolve_local(Local.from_local_datetime(&naive), tuple.isdst)
        .map(|dt| dt.naive_local())
        .ok_or(DateError::NonexistentLocalTime(naive))
}

/// Pick one reading of a local time. During the repeated hour the first
/// reading is still daylight time, so `isdst == 0` selects the later one.
fn resolve_local<T>(result: LocalResult<T>, isdst: i64) -> Option<T> {
    match result {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(_, later) if isdst == 0 => Some(later),
        LocalResult::Ambiguous(earlier, _) => Some(earlier),
        LocalResult::None => None,
    }
}

/// Format `dt` with a strftime-style specifier.
///
/// # Errors
///
/// [`DateError::InvalidFormat`] for malformed specifiers and for ones a naive
/// datetime cannot fill in, such as `%z` or `%Z`.
///
/// # Examples
///
/// ```
/// use newsutils::utils::{format_datetime, parse_date};
///
/// let dt = parse_date("2009-06-15 13:45:30").unwrap();
/// assert_eq!(format_datetime(&dt, "%B %d, %Y").unwrap(), "June 15, 2009");
/// assert!(format_datetime(&dt, "%z").is_err());
/// ```
pub fn format_datetime(dt: &NaiveDateTime, format: &str) -> Result<String, DateError> {
    let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(DateError::InvalidFormat(format.to_string()));
    }
    let mut out = String::new();
    write!(out, "{}", dt.format_with_items(items.iter()))
        .map_err(|_| DateError::InvalidFormat(format.to_string()))?;
    Ok(out)
}

/// Mask credential query parameters (`apiKey`, `key`) in a URL before it is
/// logged or put into an error.
///
/// # Arguments
///
/// * `raw` - A request URL
///
/// # Returns
///
/// `raw` unchanged when it carries no credentials, otherwise the same URL with
/// each credential value replaced by `REDACTED`. A URL that does not parse
/// loses its whole query string.
///
/// # Examples
///
/// ```
/// use newsutils::utils::redact_url;
///
/// assert_eq!(
///     redact_url("http://api.bit.ly/shorten?longUrl=x&apiKey=R_123"),
///     "http://api.bit.ly/shorten?longUrl=x&apiKey=REDACTED"
/// );
/// ```
pub fn redact_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return raw.split('?').next().unwrap_or_default().to_string();
    };
    let is_secret = |name: &str| SECRET_PARAMS.contains(&name);
    if !url.query_pairs().any(|(name, _)| is_secret(name.as_ref())) {
        return raw.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(name, value)| {
            let value = if is_secret(name.as_ref()) {
                "REDACTED".to_string()
            } else {
                value.into_owned()
            };
            (name.into_owned(), value)
        })
        .collect();
    url.query_pairs_mut().clear().extend_pairs(&pairs);
    url.to_string()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at `max` bytes (on a char boundary) and get a
/// `"…(+N bytes)"` marker appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}
