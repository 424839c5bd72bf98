use std::collections::BTreeMap;
use std::thread;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::catalog::{CatalogClient, ConnectionStatus};
use crate::dates::ReleaseWindow;
use crate::domain::{ApiKey, SeriesRef, UpcomingDay, UpcomingIssue};
use crate::error::UpcomingError;
use crate::events::{DiagnosticEvent, DiagnosticSink};
use crate::fetcher::ReleaseWindowFetcher;
use crate::resolver::VolumeResolver;
use crate::store::{KeyValueStore, Preferences};

pub const DEFAULT_CHUNK_SIZE: usize = 3;

/// What the presentation layer shows for the release calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum UpcomingState {
    NoApiKey,
    /// Before the first aggregate call returns.
    Loading,
    Empty,
    Error(String),
    Success(Vec<UpcomingDay>),
}

/// Host library provider.
pub trait LibrarySource {
    fn library(&self) -> Result<Vec<SeriesRef>, UpcomingError>;
}

impl LibrarySource for Vec<SeriesRef> {
    fn library(&self) -> Result<Vec<SeriesRef>, UpcomingError> {
        Ok(self.clone())
    }
}

pub struct LibraryAggregator<C: CatalogClient, S: KeyValueStore> {
    catalog: C,
    preferences: Preferences<S>,
    window: ReleaseWindow,
    chunk_size: usize,
}

impl<C: CatalogClient, S: KeyValueStore> LibraryAggregator<C, S> {
    pub fn new(catalog: C, preferences: Preferences<S>) -> Self {
        Self {
            catalog,
            preferences,
            window: ReleaseWindow::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_window(mut self, window: ReleaseWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn preferences(&self) -> &Preferences<S> {
        &self.preferences
    }

    /// Tests `candidate`, or the stored key when `None`.
    pub fn test_connection(&self, candidate: Option<&str>) -> ConnectionStatus {
        let key = match candidate {
            Some(raw) => raw.parse::<ApiKey>().ok(),
            None => self.preferences.api_key(),
        };
        match key {
            Some(key) => self.catalog.test_connection(&key),
            None => ConnectionStatus::Failed("Key is empty".to_string()),
        }
    }

    pub fn aggregate(
        &self,
        library: &[SeriesRef],
        today: NaiveDate,
        sink: &dyn DiagnosticSink,
    ) -> UpcomingState {
        let Some(api_key) = self.preferences.api_key() else {
            return UpcomingState::NoApiKey;
        };
        if library.is_empty() {
            return UpcomingState::Empty;
        }
        let days = self.collect_days(&api_key, library, today, sink);
        if days.is_empty() {
            UpcomingState::Empty
        } else {
            UpcomingState::Success(days)
        }
    }

    /// Like [`aggregate`](Self::aggregate), reading the library from `source`.
    /// A failing source becomes the error state.
    pub fn aggregate_from(
        &self,
        source: &dyn LibrarySource,
        today: NaiveDate,
        sink: &dyn DiagnosticSink,
    ) -> UpcomingState {
        if self.preferences.api_key().is_none() {
            return UpcomingState::NoApiKey;
        }
        match source.library() {
            Ok(library) => self.aggregate(&library, today, sink),
            Err(err) => UpcomingState::Error(err.to_string()),
        }
    }

    /// Resolves and fetches every series, `chunk_size` at a time. Each chunk
    /// runs concurrently and finishes before the next one starts.
    pub fn collect_days(
        &self,
        api_key: &ApiKey,
        library: &[SeriesRef],
        today: NaiveDate,
        sink: &dyn DiagnosticSink,
    ) -> Vec<UpcomingDay> {
        let resolver = VolumeResolver::new(&self.catalog, &self.preferences, api_key, today.year());
        let fetcher = ReleaseWindowFetcher::new(&self.catalog, api_key, self.window);

        let mut issues = Vec::new();
        for (index, chunk) in library.chunks(self.chunk_size).enumerate() {
            let chunk_issues = thread::scope(|scope| {
                let handles = chunk
                    .iter()
                    .map(|series| {
                        let resolver = &resolver;
                        let fetcher = &fetcher;
                        scope.spawn(move || match resolver.resolve(series, sink) {
                            Some(volume) => fetcher.fetch_issues(series, volume, today, sink),
                            None => Vec::new(),
                        })
                    })
                    .collect::<Vec<_>>();
                handles
                    .into_iter()
                    .flat_map(|handle| handle.join().unwrap_or_default())
                    .collect::<Vec<_>>()
            });
            sink.event(DiagnosticEvent::ChunkCompleted {
                index,
                size: chunk.len(),
                issues: chunk_issues.len(),
            });
            issues.extend(chunk_issues);
        }

        group_into_days(issues)
    }
}

/// Groups issues by exact sort date. A day takes its display string and
/// precision from the first issue seen for that date.
pub fn group_into_days(issues: Vec<UpcomingIssue>) -> Vec<UpcomingDay> {
    let mut days: BTreeMap<NaiveDate, UpcomingDay> = BTreeMap::new();
    for issue in issues {
        days.entry(issue.sort_date)
            .or_insert_with(|| UpcomingDay {
                date: issue.sort_date,
                display_date: issue.display_date.clone(),
                precision: issue.precision,
                issues: Vec::new(),
            })
            .issues
            .push(issue);
    }

    days.into_values()
        .map(|mut day| {
            day.issues
                .sort_by(|left, right| left.series_title.cmp(&right.series_title));
            day
        })
        .collect()
}
