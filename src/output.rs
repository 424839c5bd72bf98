use std::fmt::Write as _;
use std::io::{self, Write};
use std::sync::LazyLock;

use chrono::{Days, NaiveDate};
use regex::Regex;
use serde::Serialize;

use crate::app::UpcomingState;
use crate::dates::format_weekday;
use crate::domain::{DatePrecision, UpcomingDay, UpcomingIssue};

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Text,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_state(state: &UpcomingState) -> io::Result<()> {
        Self::print_json(state)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_state(state: &UpcomingState, today: NaiveDate) -> io::Result<()> {
        let mut stdout = io::stdout();
        stdout.write_all(render_state(state, today).as_bytes())?;
        Ok(())
    }
}

pub fn render_state(state: &UpcomingState, today: NaiveDate) -> String {
    match state {
        UpcomingState::NoApiKey => {
            "No ComicVine API key set.\nAdd it with `comicvine-upcoming key set <KEY>`.\n".to_string()
        }
        UpcomingState::Loading => "Loading upcoming releases...\n".to_string(),
        UpcomingState::Empty => "No upcoming releases found for your library.\n".to_string(),
        UpcomingState::Error(message) => format!("Error: {message}\n"),
        UpcomingState::Success(days) => render_calendar(days, today),
    }
}

pub fn render_calendar(days: &[UpcomingDay], today: NaiveDate) -> String {
    let mut out = String::new();
    for (index, day) in days.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "{}", day_header(day, today));
        for issue in &day.issues {
            for line in issue_lines(issue) {
                let _ = writeln!(out, "  {line}");
            }
        }
    }
    out
}

/// "Today", "Tomorrow", "Wednesday, February 18th", or the day's own display
/// string when only the month or year is known.
pub fn day_header(day: &UpcomingDay, today: NaiveDate) -> String {
    if day.precision != DatePrecision::Exact {
        return day.display_date.clone();
    }
    if day.date == today {
        return "Today".to_string();
    }
    if today.checked_add_days(Days::new(1)) == Some(day.date) {
        return "Tomorrow".to_string();
    }
    format_weekday(day.date)
}

pub fn issue_lines(issue: &UpcomingIssue) -> Vec<String> {
    let mut lines = vec![issue.series_title.clone()];
    if let Some(number) = issue.issue_number.as_deref() {
        lines.push(format!("  Issue #{number}"));
    }
    if !issue.issue_title.trim().is_empty() && issue.issue_title != issue.series_title {
        lines.push(format!("  {}", issue.issue_title));
    }
    if let Some(description) = issue.description.as_deref() {
        let text = strip_html(description);
        if !text.is_empty() {
            lines.push(format!("  {text}"));
        }
    }
    if let Some(url) = image_url(issue) {
        lines.push(format!("  {url}"));
    }
    lines
}

/// Cover art, or the library thumbnail when the catalog has none.
pub fn image_url(issue: &UpcomingIssue) -> Option<&str> {
    issue
        .cover_url
        .as_deref()
        .or(issue.thumbnail_url.as_deref())
}

pub fn strip_html(text: &str) -> String {
    HTML_TAG.replace_all(text, "").trim().to_string()
}
