// Boundary parsing for loosely-typed request values. Clients send numbers
// either as JSON numbers or as strings; both are accepted, garbage is not.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::error::ValidationError;

/// An integer that may arrive as a JSON number (`2` or `2.0`) or a
/// numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum IntParam {
    Number(i64),
    Float(f64),
    Text(String),
}

impl IntParam {
    /// `None` for a blank string, an error for fractions and anything
    /// non-numeric.
    pub fn parse(&self, field: &'static str) -> Result<Option<i64>, ValidationError> {
        match self {
            IntParam::Number(n) => Ok(Some(*n)),
            IntParam::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Ok(Some(*f as i64))
            }
            IntParam::Float(f) => Err(ValidationError::invalid(field, "an integer", f.to_string())),
            IntParam::Text(text) => parse_int(field, text),
        }
    }
}

pub fn parse_int(field: &'static str, raw: &str) -> Result<Option<i64>, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<i64>()
        .map(Some)
        .map_err(|_| ValidationError::invalid(field, "an integer", raw))
}

/// RFC 3339, `YYYY-MM-DDTHH:MM:SS` (taken as UTC) or `YYYY-MM-DD`
/// (midnight UTC). Blank means "not supplied".
pub fn parse_timestamp(
    field: &'static str,
    raw: &str,
) -> Result<Option<DateTime<Utc>>, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Some(naive.and_utc()));
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(Some(midnight.and_utc()));
        }
    }

    Err(ValidationError::invalid(field, "a date (YYYY-MM-DD or RFC 3339)", raw))
}
