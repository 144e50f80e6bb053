//! Template filters for dates.
//!
//! ```text
//! {{ link.publication_date|parsedate:"%B %d, %Y" }}
//! {{ entry.updated_parsed|datetime_from_tuple }}
//! ```
//!
//! Without an argument both produce a datetime; with one they produce the
//! datetime formatted by that strftime specifier.

use super::context::ContextValue;
use crate::error::RenderError;
use crate::utils::{TimeTuple, datetime_from_tuple, format_datetime, parse_date};
use chrono::NaiveDateTime;
use serde_json::Value;

/// A filter: input value plus optional argument.
pub type FilterFn = fn(ContextValue, Option<&str>) -> Result<ContextValue, RenderError>;

/// Every registered filter by name.
pub const FILTERS: [(&str, FilterFn); 2] = [
    ("parsedate", parsedate),
    ("datetime_from_tuple", datetime_from_tuple_filter),
];

pub fn lookup(name: &str) -> Option<FilterFn> {
    FILTERS
        .iter()
        .find(|(registered, _)| *registered == name)
        .map(|(_, filter)| *filter)
}

fn finish(dt: NaiveDateTime, format: Option<&str>) -> Result<ContextValue, RenderError> {
    match format {
        Some(format) => Ok(ContextValue::Text(format_datetime(&dt, format)?)),
        None => Ok(ContextValue::DateTime(dt)),
    }
}

/// Parse a date-like string into a local naive datetime.
pub fn parsedate(value: ContextValue, format: Option<&str>) -> Result<ContextValue, RenderError> {
    let dt = match &value {
        ContextValue::DateTime(dt) => *dt,
        other => match other.as_str() {
            Some(s) => parse_date(s)?,
            None => {
                return Err(RenderError::FilterInput {
                    filter: "parsedate".into(),
                    got: other.kind(),
                });
            }
        },
    };
    finish(dt, format)
}

/// Turn a 9-field time tuple (a JSON array of integers) into a datetime.
pub fn datetime_from_tuple_filter(
    value: ContextValue,
    format: Option<&str>,
) -> Result<ContextValue, RenderError> {
    let bad_input = |got: &'static str| RenderError::FilterInput {
        filter: "datetime_from_tuple".into(),
        got,
    };
    let ContextValue::Json(Value::Array(items)) = &value else {
        return Err(bad_input(value.kind()));
    };
    let fields = items
        .iter()
        .map(Value::as_i64)
        .collect::<Option<Vec<i64>>>()
        .ok_or_else(|| bad_input("list with non-integer fields"))?;

    let tuple = TimeTuple::from_fields(&fields)?;
    finish(datetime_from_tuple(&tuple)?, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DateError;
    use serde_json::json;

    #[test]
    fn test_parsedate_without_format() {
        let out = parsedate("2009-06-15 13:45:30".into(), None).unwrap();
        assert_eq!(out.render(), "2009-06-15 13:45:30");
        assert!(matches!(out, ContextValue::DateTime(_)));
    }

    #[test]
    fn test_parsedate_with_format() {
        let out = parsedate(json!("June 15, 2009").into(), Some("%d %b %Y")).unwrap();
        assert_eq!(out, ContextValue::Text("15 Jun 2009".into()));
    }

    #[test]
    fn test_parsedate_rejects_lists() {
        let err = parsedate(json!([1, 2]).into(), None).unwrap_err();
        assert!(matches!(err, RenderError::FilterInput { got: "list", .. }));
    }

    #[test]
    fn test_datetime_from_tuple() {
        let out = datetime_from_tuple_filter(
            json!([2009, 6, 15, 13, 45, 30, 0, 166, 1]).into(),
            Some("%Y-%m-%d %H:%M"),
        )
        .unwrap();
        assert_eq!(out.render(), "2009-06-15 13:45");
    }

    #[test]
    fn test_datetime_from_tuple_month_13() {
        let err =
            datetime_from_tuple_filter(json!([2009, 13, 1, 0, 0, 0, 0, 1, 0]).into(), None)
                .unwrap_err();
        assert!(matches!(
            err,
            RenderError::Date(DateError::OutOfRange { field: "month", .. })
        ));
    }

    #[test]
    fn test_datetime_from_tuple_rejects_text() {
        assert!(datetime_from_tuple_filter("2009".into(), None).is_err());
    }

    #[test]
    fn test_lookup() {
        assert!(lookup("parsedate").is_some());
        assert!(lookup("date").is_none());
    }
}
