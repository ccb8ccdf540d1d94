//! Temporal feature extraction.
//!
//! Derives day of week (0 = Monday), hour, month and year from a date and
//! an optional time of day. Malformed values are errors, never defaults.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Time-derived part of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalFeatures {
    /// Day of week, 0 = Monday through 6 = Sunday.
    pub day_of_week: u8,
    /// Hour of day, 0-23.
    pub hour: u8,
    /// Month, 1-12.
    pub month: u8,
    /// Calendar year.
    pub year: i32,
}

/// A date or time value could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The date is not `YYYY-MM-DD`.
    #[error("invalid date '{value}': expected YYYY-MM-DD")]
    InvalidDate {
        /// The rejected value.
        value: String,
    },

    /// The time is not `HH:MM` (or `HH:MM:SS`).
    #[error("invalid time '{value}': expected HH:MM")]
    InvalidTime {
        /// The rejected value.
        value: String,
    },
}

impl ParseError {
    /// Name of the request/CSV field that failed.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::InvalidDate { .. } => "dia",
            Self::InvalidTime { .. } => "hora",
        }
    }
}

/// Parses a `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns [`ParseError::InvalidDate`] for anything else.
pub fn parse_date(value: &str) -> Result<NaiveDate, ParseError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ParseError::InvalidDate {
        value: value.to_string(),
    })
}

/// Parses an `HH:MM` or `HH:MM:SS` time of day.
///
/// # Errors
///
/// Returns [`ParseError::InvalidTime`] for anything else.
pub fn parse_time(value: &str) -> Result<NaiveTime, ParseError> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| ParseError::InvalidTime {
            value: value.to_string(),
        })
}

/// Extracts temporal features from a date and an optional time.
///
/// `None` or a blank time means midnight; a present but malformed time is
/// an error.
///
/// # Errors
///
/// Returns [`ParseError`] if either value is malformed.
#[allow(clippy::cast_possible_truncation)]
pub fn extract(date: &str, time: Option<&str>) -> Result<TemporalFeatures, ParseError> {
    let date = parse_date(date)?;
    let time = match time.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => parse_time(t)?,
        None => NaiveTime::MIN,
    };

    Ok(TemporalFeatures {
        day_of_week: date.weekday().num_days_from_monday() as u8,
        hour: time.hour() as u8,
        month: date.month() as u8,
        year: date.year(),
    })
}

/// Strips a trailing time part from an exported date column
/// (`"2024-10-23 00:00:00"` → `"2024-10-23"`).
#[must_use]
pub fn date_part(value: &str) -> &str {
    value.split_whitespace().next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_wednesday_afternoon() {
        let features = extract("2024-10-23", Some("14:00")).unwrap();
        assert_eq!(
            features,
            TemporalFeatures {
                day_of_week: 2,
                hour: 14,
                month: 10,
                year: 2024,
            }
        );
    }

    #[test]
    fn monday_is_zero_and_sunday_is_six() {
        assert_eq!(extract("2024-10-21", None).unwrap().day_of_week, 0);
        assert_eq!(extract("2024-10-27", None).unwrap().day_of_week, 6);
    }

    #[test]
    fn missing_time_is_midnight() {
        assert_eq!(extract("2024-10-23", None).unwrap().hour, 0);
        assert_eq!(extract("2024-10-23", Some("  ")).unwrap().hour, 0);
    }

    #[test]
    fn accepts_seconds() {
        assert_eq!(extract("2024-10-23", Some("22:30:15")).unwrap().hour, 22);
    }

    #[test]
    fn malformed_date_is_rejected() {
        let err = extract("23/10/2024", Some("14:00")).unwrap_err();
        assert_eq!(err.field(), "dia");
        assert!(extract("2024-02-30", None).is_err());
    }

    #[test]
    fn malformed_time_is_rejected_not_defaulted() {
        let err = extract("2024-10-23", Some("25:00")).unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidTime {
                value: "25:00".to_string()
            }
        );
        assert_eq!(err.field(), "hora");
        assert!(extract("2024-10-23", Some("noon")).is_err());
    }

    #[test]
    fn strips_exported_time_part() {
        assert_eq!(date_part("2024-10-23 00:00:00"), "2024-10-23");
        assert_eq!(date_part("2024-10-23"), "2024-10-23");
        assert_eq!(date_part(""), "");
    }
}
