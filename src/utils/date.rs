// src/utils/date.rs

//! Date extraction from free-form announcement text.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

const DATE_PATTERN: &str = r"(\d{4})\s*[/.\-年]\s*(\d{1,2})\s*[/.\-月]\s*(\d{1,2})";

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(DATE_PATTERN).expect("date pattern is valid")
});

static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(r"{DATE_PATTERN}\s*日?[^\d]{{0,12}}?\s*[-~～至到]\s*{DATE_PATTERN}");
    Regex::new(&pattern).expect("date range pattern is valid")
});

/// Output format for normalized dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

fn date_from_captures(caps: &regex::Captures<'_>, offset: usize) -> Option<NaiveDate> {
    let year = caps.get(offset + 1)?.as_str().parse().ok()?;
    let month = caps.get(offset + 2)?.as_str().parse().ok()?;
    let day = caps.get(offset + 3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Find the first calendar date in `text`.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    DATE_RE
        .captures_iter(text)
        .find_map(|caps| date_from_captures(&caps, 0))
}

/// Find a date range in `text`.
///
/// A single date yields a one-day range.
pub fn parse_range(text: &str) -> Option<(NaiveDate, NaiveDate)> {
    if let Some(caps) = RANGE_RE.captures(text) {
        if let (Some(start), Some(end)) = (date_from_captures(&caps, 0), date_from_captures(&caps, 3))
        {
            return Some((start, end));
        }
    }
    parse_date(text).map(|d| (d, d))
}
