use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::UpcomingError;

/// Identifier of a series in the host library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesId(i64);

impl SeriesId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a volume in the ComicVine catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VolumeId(i64);

impl VolumeId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesRef {
    pub id: SeriesId,
    pub title: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

impl SeriesRef {
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id: SeriesId::new(id),
            title: title.into(),
            thumbnail_url: None,
        }
    }

    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }
}

/// A trimmed, non-empty ComicVine API key.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key with everything but the last four characters hidden.
    pub fn masked(&self) -> String {
        let chars = self.0.chars().collect::<Vec<_>>();
        if chars.len() <= 4 {
            return "*".repeat(chars.len());
        }
        let visible = chars[chars.len() - 4..].iter().collect::<String>();
        format!("{}{visible}", "*".repeat(chars.len() - 4))
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&self.masked()).finish()
    }
}

impl FromStr for ApiKey {
    type Err = UpcomingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(UpcomingError::EmptyApiKey);
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// How confidently a release date is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatePrecision {
    Exact,
    MonthOnly,
    /// Not produced by date normalization today; kept so stored or
    /// serialized calendars can express a year-only date.
    YearOnly,
}

impl fmt::Display for DatePrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatePrecision::Exact => write!(f, "exact"),
            DatePrecision::MonthOnly => write!(f, "month"),
            DatePrecision::YearOnly => write!(f, "year"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpcomingIssue {
    pub series_id: SeriesId,
    pub series_title: String,
    pub thumbnail_url: Option<String>,
    pub issue_title: String,
    pub issue_number: Option<String>,
    pub sort_date: NaiveDate,
    pub display_date: String,
    pub precision: DatePrecision,
    pub cover_url: Option<String>,
    pub description: Option<String>,
}

/// One calendar row. `issues` is never empty and is ordered by series title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpcomingDay {
    pub date: NaiveDate,
    pub display_date: String,
    pub precision: DatePrecision,
    pub issues: Vec<UpcomingIssue>,
}
