use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::analytics::DateRange;
use crate::errors::AppError;

/// Parse `from`/`to` query values. Accepts RFC 3339 timestamps or plain
/// `YYYY-MM-DD` dates; a bare `to` date covers the whole day.
pub fn parse_date_range(from: Option<&str>, to: Option<&str>) -> Result<DateRange, AppError> {
    let range = DateRange {
        from: parse_bound(from, "from", NaiveTime::MIN)?,
        to: parse_bound(to, "to", end_of_day())?,
    };

    if let (Some(from), Some(to)) = (range.from, range.to) {
        if from > to {
            return Err(AppError::BadRequest("`from` must not be after `to`".into()));
        }
    }
    Ok(range)
}

/// Comma-separated list with blanks dropped.
pub fn parse_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bound(
    raw: Option<&str>,
    name: &str,
    time_of_day: NaiveTime,
) -> Result<Option<DateTime<Utc>>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(at.with_timezone(&Utc)));
    }
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(Some(day.and_time(time_of_day).and_utc()));
    }
    Err(AppError::BadRequest(format!(
        "invalid `{name}` date {raw:?}; expected YYYY-MM-DD or RFC 3339"
    )))
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN)
}
