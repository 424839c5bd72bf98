use chrono::{Datelike, Days, Months, NaiveDate};

use crate::domain::DatePrecision;
use crate::error::UpcomingError;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDate {
    pub sort_date: NaiveDate,
    pub display_date: String,
    pub precision: DatePrecision,
}

/// Inclusive date range sent to the catalog as a cover-date filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }
}

/// Rolling window around "today": a trailing number of days and a leading
/// number of months.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseWindow {
    pub past_days: u32,
    pub future_months: u32,
}

impl Default for ReleaseWindow {
    fn default() -> Self {
        Self {
            past_days: 30,
            future_months: 9,
        }
    }
}

impl ReleaseWindow {
    pub fn bounds(&self, today: NaiveDate) -> DateRange {
        let from = today
            .checked_sub_days(Days::new(u64::from(self.past_days)))
            .unwrap_or(NaiveDate::MIN);
        let to = today
            .checked_add_months(Months::new(self.future_months))
            .unwrap_or(NaiveDate::MAX);
        DateRange { from, to }
    }
}

/// Parses a catalog date. Blank strings and the literal `null` are absent.
pub fn parse_catalog_date(value: Option<&str>) -> Option<NaiveDate> {
    let value = value?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("null") {
        return None;
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

pub fn parse_cli_date(value: &str) -> Result<NaiveDate, UpcomingError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| UpcomingError::InvalidDate(value.to_string()))
}

pub fn format_catalog_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn ordinal_suffix(day: u32) -> &'static str {
    if (11..=13).contains(&day) {
        return "th";
    }
    match day % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

/// "February 18th, 2026"
pub fn format_exact(date: NaiveDate) -> String {
    format!(
        "{} {}{}, {}",
        date.format("%B"),
        date.day(),
        ordinal_suffix(date.day()),
        date.year()
    )
}

/// "February 2026"
pub fn format_month(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

/// "Wednesday, February 18th"
pub fn format_weekday(date: NaiveDate) -> String {
    format!(
        "{}, {} {}{}",
        date.format("%A"),
        date.format("%B"),
        date.day(),
        ordinal_suffix(date.day())
    )
}

pub fn format_for_precision(date: NaiveDate, precision: DatePrecision) -> String {
    match precision {
        DatePrecision::Exact => format_exact(date),
        DatePrecision::MonthOnly => format_month(date),
        DatePrecision::YearOnly => date.year().to_string(),
    }
}

/// Picks the sort date, display string and precision for an issue.
///
/// A parsable store date always wins. A cover date on the first of the month
/// is how the catalog records month-only knowledge, so it is shown without a
/// day. Returns `None` when neither date parses.
pub fn normalize_release_date(store_date: Option<&str>, cover_date: Option<&str>) -> Option<ResolvedDate> {
    if let Some(date) = parse_catalog_date(store_date) {
        return Some(ResolvedDate {
            sort_date: date,
            display_date: format_exact(date),
            precision: DatePrecision::Exact,
        });
    }

    let date = parse_catalog_date(cover_date)?;
    let precision = if date.day() == 1 {
        DatePrecision::MonthOnly
    } else {
        DatePrecision::Exact
    };
    Some(ResolvedDate {
        sort_date: date,
        display_date: format_for_precision(date, precision),
        precision,
    })
}
