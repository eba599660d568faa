//! Business validation rules shared by projects and todos.
//!
//! # Responsibility
//! - Enforce display-name length rules for project names and todo titles.
//! - Resolve user-entered finish dates into calendar dates.
//!
//! # Invariants
//! - Lengths are counted in chars after trimming surrounding whitespace.
//! - Validation never mutates the value under test.

use chrono::{DateTime, Days, NaiveDate};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Minimum length for project names and todo titles.
pub const MIN_NAME_CHARS: usize = 5;

/// Days added to "today" when a finish date is left blank or unparseable.
pub const DEFAULT_FINISH_OFFSET_DAYS: u64 = 30;

/// Rule violations raised when constructing or editing entities.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Project name is shorter than [`MIN_NAME_CHARS`].
    NameTooShort { chars: usize },
    /// Todo title is shorter than [`MIN_NAME_CHARS`].
    TitleTooShort { chars: usize },
    /// Cost is negative, NaN or infinite.
    InvalidCost(f64),
    /// Progress is outside `[0, 1]`, NaN or infinite.
    InvalidProgress(f64),
    /// Icon color is not a `#RRGGBB` hex string.
    InvalidIconColor(String),
    /// Supplied id is blank after trim.
    BlankId,
    /// Finish date lies before the reference day.
    PastFinishDate { date: NaiveDate, today: NaiveDate },
    /// Todo names a different owning project than the one it is added to.
    ProjectMismatch { expected: String, actual: String },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NameTooShort { chars } => write!(
                f,
                "project name too short: {chars} chars, need at least {MIN_NAME_CHARS}"
            ),
            Self::TitleTooShort { chars } => write!(
                f,
                "todo title too short: {chars} chars, need at least {MIN_NAME_CHARS}"
            ),
            Self::InvalidCost(value) => write!(f, "cost must be a finite value >= 0, got {value}"),
            Self::InvalidProgress(value) => {
                write!(f, "progress must be within [0, 1], got {value}")
            }
            Self::InvalidIconColor(value) => {
                write!(f, "icon color must look like #RRGGBB, got `{value}`")
            }
            Self::BlankId => write!(f, "id must not be blank"),
            Self::PastFinishDate { date, today } => {
                write!(f, "finish date {date} is before {today}; pick a future date")
            }
            Self::ProjectMismatch { expected, actual } => write!(
                f,
                "todo belongs to project `{actual}` but was added to `{expected}`"
            ),
        }
    }
}

impl Error for ValidationError {}

/// Checks the project name rule and returns the trimmed name.
pub fn validate_project_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    let chars = trimmed.chars().count();
    if chars < MIN_NAME_CHARS {
        return Err(ValidationError::NameTooShort { chars });
    }
    Ok(trimmed.to_string())
}

/// Checks the todo title rule and returns the trimmed title.
pub fn validate_todo_title(title: &str) -> Result<String, ValidationError> {
    let trimmed = title.trim();
    let chars = trimmed.chars().count();
    if chars < MIN_NAME_CHARS {
        return Err(ValidationError::TitleTooShort { chars });
    }
    Ok(trimmed.to_string())
}

pub(crate) fn validate_cost(cost: f64) -> Result<f64, ValidationError> {
    if cost.is_finite() && cost >= 0.0 {
        Ok(cost)
    } else {
        Err(ValidationError::InvalidCost(cost))
    }
}

pub(crate) fn validate_progress(progress: f64) -> Result<f64, ValidationError> {
    if progress.is_finite() && (0.0..=1.0).contains(&progress) {
        Ok(progress)
    } else {
        Err(ValidationError::InvalidProgress(progress))
    }
}

/// Normalizes an externally supplied id; blank ids are rejected.
pub(crate) fn normalize_id(id: &str) -> Result<String, ValidationError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankId);
    }
    Ok(trimmed.to_string())
}

/// Parses a calendar date from `YYYY-MM-DD` or an RFC 3339 timestamp.
///
/// Returns `None` for blank or unrecognized input.
pub fn parse_calendar_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|value| value.date_naive())
}

/// Serde adapter reading a `finishDate` through [`parse_calendar_date`].
///
/// Exported snapshots may carry full timestamps such as
/// `2030-05-01T00:00:00.000Z`; only the calendar date is kept.
pub(crate) fn deserialize_calendar_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_calendar_date(&raw)
        .ok_or_else(|| D::Error::custom(format!("unrecognized calendar date `{raw}`")))
}

/// Resolves a form-entered finish date against `today`.
///
/// Rules:
/// - blank or unparseable input falls back to `today + 30 days`;
/// - a date strictly before `today` is rejected;
/// - `today` itself is accepted.
///
/// # Errors
/// - Returns [`ValidationError::PastFinishDate`] for past dates.
pub fn resolve_finish_date(input: &str, today: NaiveDate) -> Result<NaiveDate, ValidationError> {
    let Some(date) = parse_calendar_date(input) else {
        return Ok(default_finish_date(today));
    };
    if date < today {
        return Err(ValidationError::PastFinishDate { date, today });
    }
    Ok(date)
}

/// Returns the fallback finish date for `today`.
pub fn default_finish_date(today: NaiveDate) -> NaiveDate {
    today
        .checked_add_days(Days::new(DEFAULT_FINISH_OFFSET_DAYS))
        .unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::{
        parse_calendar_date, resolve_finish_date, validate_cost, validate_progress,
        validate_project_name, validate_todo_title, ValidationError,
    };
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    #[test]
    fn name_rule_counts_trimmed_chars() {
        assert_eq!(
            validate_project_name("  abcd  ").unwrap_err(),
            ValidationError::NameTooShort { chars: 4 }
        );
        assert_eq!(validate_project_name(" Tower ").unwrap(), "Tower");
        // multi-byte characters count once
        assert!(validate_todo_title("ÅÄÖÜß").is_ok());
    }

    #[test]
    fn title_rule_rejects_short_titles() {
        let err = validate_todo_title("Pour").unwrap_err();
        assert_eq!(err, ValidationError::TitleTooShort { chars: 4 });
        assert!(err.to_string().contains("too short"));
    }

    #[test]
    fn cost_and_progress_bounds() {
        assert!(validate_cost(0.0).is_ok());
        assert!(validate_cost(-1.0).is_err());
        assert!(validate_cost(f64::NAN).is_err());
        assert!(validate_progress(1.0).is_ok());
        assert!(validate_progress(1.01).is_err());
        assert!(validate_progress(f64::INFINITY).is_err());
    }

    #[test]
    fn parse_accepts_plain_and_rfc3339_dates() {
        assert_eq!(parse_calendar_date("2030-05-01"), Some(day(2030, 5, 1)));
        assert_eq!(
            parse_calendar_date("2030-05-01T10:00:00Z"),
            Some(day(2030, 5, 1))
        );
        assert_eq!(parse_calendar_date("next tuesday"), None);
        assert_eq!(parse_calendar_date("   "), None);
    }

    #[test]
    fn serde_reads_timestamps_as_calendar_dates() {
        #[derive(serde::Deserialize)]
        struct Wrapper {
            #[serde(deserialize_with = "super::deserialize_calendar_date")]
            date: NaiveDate,
        }

        let read: Wrapper =
            serde_json::from_str(r#"{"date": "2030-05-01T00:00:00.000Z"}"#).unwrap();
        assert_eq!(read.date, day(2030, 5, 1));
        let plain: Wrapper = serde_json::from_str(r#"{"date": "2030-05-01"}"#).unwrap();
        assert_eq!(plain.date, day(2030, 5, 1));
        assert!(serde_json::from_str::<Wrapper>(r#"{"date": "soon"}"#).is_err());
        assert!(serde_json::from_str::<Wrapper>(r#"{"date": 12}"#).is_err());
    }

    #[test]
    fn resolve_defaults_blank_input_to_thirty_days_out() {
        let today = day(2026, 10, 15);
        assert_eq!(resolve_finish_date("", today).unwrap(), day(2026, 11, 14));
        assert_eq!(
            resolve_finish_date("garbage", today).unwrap(),
            day(2026, 11, 14)
        );
    }

    #[test]
    fn resolve_rejects_past_and_accepts_today() {
        let today = day(2026, 10, 15);
        assert_eq!(resolve_finish_date("2026-10-15", today).unwrap(), today);
        let err = resolve_finish_date("2026-10-14", today).unwrap_err();
        assert!(matches!(err, ValidationError::PastFinishDate { .. }));
    }
}
