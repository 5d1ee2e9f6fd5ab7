//! Date parsing and formatting for voting windows.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeParseError {
    #[error("no date given")]
    Empty,

    #[error("unrecognised date: {0}")]
    Unrecognised(String),

    #[error("date must be after the Unix epoch: {0}")]
    NotPositive(String),
}

/// Parse user input into a positive Unix timestamp (seconds).
///
/// Accepts plain integer seconds, `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM[:SS]`
/// (both read as UTC) and RFC 3339.
pub fn parse_timestamp(input: &str) -> Result<u64, TimeParseError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(TimeParseError::Empty);
    }

    let secs: i64 = if s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse()
            .map_err(|_| TimeParseError::Unrecognised(s.to_string()))?
    } else if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        dt.timestamp()
    } else if let Some(dt) = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        dt.and_utc().timestamp()
    } else if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        date.and_hms_opt(0, 0, 0)
            .ok_or_else(|| TimeParseError::Unrecognised(s.to_string()))?
            .and_utc()
            .timestamp()
    } else {
        return Err(TimeParseError::Unrecognised(s.to_string()));
    };

    if secs <= 0 {
        return Err(TimeParseError::NotPositive(s.to_string()));
    }
    Ok(secs as u64)
}

/// Format a Unix timestamp as a day, e.g. `Mon Oct 19 2026`.
pub fn format_date(secs: u64) -> String {
    match i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
    {
        Some(dt) => dt.format("%a %b %d %Y").to_string(),
        None => format!("{secs}s"),
    }
}

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_integer_seconds() {
        assert_eq!(parse_timestamp("1700000000"), Ok(1_700_000_000));
    }

    #[test]
    fn parses_plain_date_as_utc_midnight() {
        assert_eq!(parse_timestamp("2024-01-01"), Ok(1_704_067_200));
    }

    #[test]
    fn parses_datetime_local_input() {
        assert_eq!(parse_timestamp("2024-01-01T01:00"), Ok(1_704_070_800));
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        assert_eq!(parse_timestamp("2024-01-01T02:00:00+01:00"), Ok(1_704_070_800));
    }

    #[test]
    fn rejects_garbage_and_empty() {
        assert!(matches!(
            parse_timestamp("next tuesday"),
            Err(TimeParseError::Unrecognised(_))
        ));
        assert_eq!(parse_timestamp("   "), Err(TimeParseError::Empty));
    }

    #[test]
    fn rejects_epoch_and_before() {
        assert!(matches!(parse_timestamp("0"), Err(TimeParseError::NotPositive(_))));
        assert!(matches!(
            parse_timestamp("1960-05-01"),
            Err(TimeParseError::NotPositive(_))
        ));
    }

    #[test]
    fn formats_day() {
        assert_eq!(format_date(1_704_067_200), "Mon Jan 01 2024");
    }
}
