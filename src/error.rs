use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum UpcomingError {
    #[error("API key is empty")]
    #[diagnostic(help("get a free key at comicvine.gamespot.com and run `key set <KEY>`"))]
    EmptyApiKey,

    #[error("no ComicVine API key configured")]
    #[diagnostic(help("run `comicvine-upcoming key set <KEY>`"))]
    MissingApiKey,

    #[error("invalid series entry: {0}")]
    InvalidSeries(String),

    #[error("invalid date (expected YYYY-MM-DD): {0}")]
    InvalidDate(String),

    #[error("missing config file upcoming.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("ComicVine request failed: {0}")]
    CatalogHttp(String),

    #[error("ComicVine returned status {status}: {message}")]
    CatalogStatus { status: u16, message: String },

    #[error("failed to decode ComicVine response: {0}")]
    CatalogDecode(String),

    #[error("preferences store error: {0}")]
    Store(String),

    #[error("failed to load library: {0}")]
    Library(String),
}
