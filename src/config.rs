use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::{DEFAULT_CHUNK_SIZE, LibrarySource};
use crate::catalog::HttpSettings;
use crate::dates::ReleaseWindow;
use crate::domain::{SeriesId, SeriesRef};
use crate::error::UpcomingError;

pub const DEFAULT_CONFIG_FILE: &str = "upcoming.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub library: Vec<SeriesEntry>,
    #[serde(default)]
    pub window: Option<WindowConfig>,
    #[serde(default)]
    pub chunk_size: Option<usize>,
    #[serde(default)]
    pub http: Option<HttpConfig>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SeriesEntry {
    Shorthand(String),
    Detailed(SeriesEntryObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SeriesEntryObject {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct WindowConfig {
    #[serde(default)]
    pub past_days: Option<u32>,
    #[serde(default)]
    pub future_months: Option<u32>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub test_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub library: Vec<SeriesRef>,
    pub window: ReleaseWindow,
    pub chunk_size: usize,
    pub http: HttpSettings,
}

impl LibrarySource for ResolvedConfig {
    fn library(&self) -> Result<Vec<SeriesRef>, UpcomingError> {
        Ok(self.library.clone())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, UpcomingError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Err(UpcomingError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| UpcomingError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| UpcomingError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, UpcomingError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let library = config
            .library
            .into_iter()
            .enumerate()
            .map(|(index, entry)| match entry {
                // Shorthand entries are numbered by position, so reordering
                // them invalidates their cached volumes.
                SeriesEntry::Shorthand(title) => series_ref(index as i64 + 1, title, None),
                SeriesEntry::Detailed(obj) => series_ref(obj.id, obj.title, obj.thumbnail_url),
            })
            .collect::<Result<Vec<_>, UpcomingError>>()?;

        let mut seen = HashSet::new();
        if let Some(duplicate) = library.iter().find(|series| !seen.insert(series.id)) {
            return Err(UpcomingError::InvalidSeries(format!(
                "duplicate series id {}",
                duplicate.id
            )));
        }

        let defaults = ReleaseWindow::default();
        let window = config.window.unwrap_or_default();
        let window = ReleaseWindow {
            past_days: window.past_days.unwrap_or(defaults.past_days),
            future_months: window.future_months.unwrap_or(defaults.future_months),
        };

        let http_defaults = HttpSettings::default();
        let http = config.http.unwrap_or_default();
        let http = HttpSettings {
            base_url: http.base_url.unwrap_or(http_defaults.base_url),
            user_agent: http.user_agent.unwrap_or(http_defaults.user_agent),
            timeout: http
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(http_defaults.timeout),
            test_timeout: http
                .test_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(http_defaults.test_timeout),
        };

        Ok(ResolvedConfig {
            schema_version,
            library,
            window,
            chunk_size: config.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE).max(1),
            http,
        })
    }
}

fn series_ref(
    id: i64,
    title: String,
    thumbnail_url: Option<String>,
) -> Result<SeriesRef, UpcomingError> {
    let title = title.trim().to_string();
    if title.is_empty() {
        return Err(UpcomingError::InvalidSeries(format!(
            "series {id} has an empty title"
        )));
    }
    Ok(SeriesRef {
        id: SeriesId::new(id),
        title,
        thumbnail_url: thumbnail_url.filter(|url| !url.trim().is_empty()),
    })
}
