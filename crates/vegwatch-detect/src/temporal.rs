//! Date and time window parsing.
//!
//! Each of the four request fields is reduced to its calendar date, in the offset it
//! was written in. `Z` is read as `+00:00`.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use vegwatch_core::models::window::DATE_FORMAT;
use vegwatch_core::models::TimeWindow;
use vegwatch_core::ValidationError;

use crate::models::{AnalysisRequest, AnalysisWindows};

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parses the request date fields into analysis windows
pub struct TemporalWindowParser;

impl TemporalWindowParser {
    /// Parse all four fields. Every field must be present before any is parsed.
    pub fn parse(request: &AnalysisRequest) -> Result<AnalysisWindows, ValidationError> {
        let fields = [
            ("startDate1", request.start_date1.as_deref()),
            ("endDate1", request.end_date1.as_deref()),
            ("startDate2", request.start_date2.as_deref()),
            ("endDate2", request.end_date2.as_deref()),
        ];

        for (field, value) in fields {
            if value.map_or(true, |v| v.trim().is_empty()) {
                return Err(ValidationError::MissingDate { field });
            }
        }

        let [start1, end1, start2, end2] =
            fields.map(|(field, value)| (field, value.unwrap_or("")));

        Ok(AnalysisWindows {
            before: Self::window(start1, end1)?,
            after: Self::window(start2, end2)?,
        })
    }

    fn window(
        (start_field, start): (&'static str, &str),
        (end_field, end): (&'static str, &str),
    ) -> Result<TimeWindow, ValidationError> {
        let start_date = Self::parse_date(start_field, start)?;
        let end_date = Self::parse_date(end_field, end)?;

        if start_date > end_date {
            return Err(ValidationError::ReversedWindow {
                start_field,
                end_field,
                start: start_date.format(DATE_FORMAT).to_string(),
                end: end_date.format(DATE_FORMAT).to_string(),
            });
        }

        Ok(TimeWindow::new(start_date, end_date))
    }

    /// Calendar date of an ISO-8601 date or date-time
    pub fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ValidationError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingDate { field });
        }

        let normalized = match trimmed.strip_suffix(['Z', 'z']) {
            Some(rest) => format!("{}+00:00", rest),
            None => trimmed.to_string(),
        };

        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
            return Ok(dt.date_naive());
        }
        for format in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(&normalized, format) {
                return Ok(dt.date_naive());
            }
        }
        for format in NAIVE_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(&normalized, format) {
                return Ok(dt.date());
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(&normalized, DATE_FORMAT) {
            return Ok(date);
        }

        Err(ValidationError::InvalidDate {
            field,
            value: value.to_string(),
        })
    }

    /// Normalize to `YYYY-MM-DD`
    pub fn normalize(field: &'static str, value: &str) -> Result<String, ValidationError> {
        Ok(Self::parse_date(field, value)?.format(DATE_FORMAT).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn request() -> AnalysisRequest {
        AnalysisRequest::default()
            .with_before("2023-01-01", "2023-01-31")
            .with_after("2023-06-01", "2023-06-30")
    }

    #[test]
    fn test_accepted_forms() {
        let cases = [
            ("2023-01-15", "2023-01-15"),
            ("2023-01-15T10:30:00Z", "2023-01-15"),
            ("2023-01-15T10:30:00.123Z", "2023-01-15"),
            ("2023-01-15T23:30:00-05:00", "2023-01-15"),
            ("2023-01-15T00:30:00+09:00", "2023-01-15"),
            ("2023-01-15T10:30", "2023-01-15"),
            ("2023-01-15 10:30:00", "2023-01-15"),
            ("2023-01-15T10:30:00.5", "2023-01-15"),
            ("  2023-01-15  ", "2023-01-15"),
        ];
        for (input, expected) in cases {
            assert_eq!(
                TemporalWindowParser::normalize("startDate1", input).unwrap(),
                expected,
                "input {}",
                input
            );
        }
    }

    #[test]
    fn test_invalid_date_names_field() {
        let err = TemporalWindowParser::parse_date("endDate2", "15/01/2023").unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidDate {
                field: "endDate2",
                value: "15/01/2023".to_string(),
            }
        );
        assert!(TemporalWindowParser::parse_date("endDate2", "2023-02-30").is_err());
    }

    #[test]
    fn test_parse_windows() {
        let windows = TemporalWindowParser::parse(&request()).unwrap();
        assert_eq!(windows.before, TimeWindow::new(date("2023-01-01"), date("2023-01-31")));
        assert_eq!(windows.after, TimeWindow::new(date("2023-06-01"), date("2023-06-30")));
    }

    #[test]
    fn test_missing_field_is_reported_before_parsing() {
        let mut req = request();
        req.start_date1 = Some("garbage".to_string());
        req.end_date2 = Some("   ".to_string());
        assert_eq!(
            TemporalWindowParser::parse(&req),
            Err(ValidationError::MissingDate { field: "endDate2" })
        );

        req.end_date2 = None;
        assert_eq!(
            TemporalWindowParser::parse(&req),
            Err(ValidationError::MissingDate { field: "endDate2" })
        );
    }

    #[test]
    fn test_reversed_window_rejected() {
        let req = AnalysisRequest::default()
            .with_before("2023-01-01", "2023-01-31")
            .with_after("2023-06-30", "2023-06-01");
        assert!(matches!(
            TemporalWindowParser::parse(&req),
            Err(ValidationError::ReversedWindow {
                start_field: "startDate2",
                ..
            })
        ));
    }

    #[test]
    fn test_equal_and_overlapping_windows_allowed() {
        let req = AnalysisRequest::default()
            .with_before("2023-03-01", "2023-03-01")
            .with_after("2023-02-01", "2023-04-01");
        assert!(TemporalWindowParser::parse(&req).is_ok());
    }

    proptest! {
        #[test]
        fn prop_normalization_is_idempotent(
            days in 0i64..40_000,
            hour in 0u32..24,
            minute in 0u32..60,
            offset_hours in -12i32..=14,
            form in 0usize..4,
        ) {
            let day = date("1970-01-01") + chrono::Duration::days(days);
            let d = day.format(DATE_FORMAT).to_string();
            let input = match form {
                0 => d.clone(),
                1 => format!("{}T{:02}:{:02}:00Z", d, hour, minute),
                2 => format!("{}T{:02}:{:02}:00{:+03}:00", d, hour, minute, offset_hours),
                _ => format!("{} {:02}:{:02}", d, hour, minute),
            };

            let once = TemporalWindowParser::normalize("startDate1", &input).unwrap();
            let twice = TemporalWindowParser::normalize("startDate1", &once).unwrap();
            prop_assert_eq!(&once, &d);
            prop_assert_eq!(once, twice);
        }
    }
}
