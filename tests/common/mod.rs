#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use chrono::NaiveDate;

use comicvine_upcoming::catalog::{CatalogClient, ConnectionStatus, RawIssue, SearchCandidate};
use comicvine_upcoming::dates::DateRange;
use comicvine_upcoming::domain::{ApiKey, VolumeId};
use comicvine_upcoming::error::UpcomingError;
use comicvine_upcoming::events::{DiagnosticEvent, DiagnosticSink};

/// One catalog call: `label` is the search title or `volume:<id>`.
#[derive(Debug, Clone)]
pub struct CallSpan {
    pub label: String,
    pub started: Instant,
    pub finished: Instant,
}

#[derive(Default)]
pub struct MockCatalog {
    searches: HashMap<String, Result<Vec<SearchCandidate>, String>>,
    issues: HashMap<i64, Result<Vec<RawIssue>, String>>,
    connection: Option<ConnectionStatus>,
    delay: Option<Duration>,
    rendezvous: Option<(usize, Duration)>,
    pub search_calls: Mutex<Vec<String>>,
    pub issue_calls: Mutex<Vec<(VolumeId, DateRange)>>,
    pub test_calls: Mutex<Vec<String>>,
    pub spans: Mutex<Vec<CallSpan>>,
    in_flight: Mutex<usize>,
    arrivals: Condvar,
    pub max_in_flight: Mutex<usize>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, title: &str, candidates: Vec<SearchCandidate>) -> Self {
        self.searches.insert(title.to_string(), Ok(candidates));
        self
    }

    pub fn with_search_error(mut self, title: &str) -> Self {
        self.searches
            .insert(title.to_string(), Err("connection reset".to_string()));
        self
    }

    pub fn with_issues(mut self, volume: i64, issues: Vec<RawIssue>) -> Self {
        self.issues.insert(volume, Ok(issues));
        self
    }

    pub fn with_issue_error(mut self, volume: i64) -> Self {
        self.issues.insert(volume, Err("read timed out".to_string()));
        self
    }

    pub fn with_connection(mut self, status: ConnectionStatus) -> Self {
        self.connection = Some(status);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Holds searches until `peers` calls have been in flight at the same
    /// time at least once, or `timeout` passes.
    pub fn with_rendezvous(mut self, peers: usize, timeout: Duration) -> Self {
        self.rendezvous = Some((peers, timeout));
        self
    }

    pub fn spans(&self) -> Vec<CallSpan> {
        self.spans.lock().unwrap().clone()
    }

    pub fn search_count(&self) -> usize {
        self.search_calls.lock().unwrap().len()
    }

    pub fn issue_count(&self) -> usize {
        self.issue_calls.lock().unwrap().len()
    }

    pub fn total_calls(&self) -> usize {
        self.search_count() + self.issue_count() + self.test_calls.lock().unwrap().len()
    }

    fn enter(&self, wait_for_peers: bool) -> Instant {
        let started = Instant::now();
        let mut in_flight = self.in_flight.lock().unwrap();
        *in_flight += 1;
        {
            let mut max = self.max_in_flight.lock().unwrap();
            *max = (*max).max(*in_flight);
        }
        self.arrivals.notify_all();
        if let (true, Some((peers, timeout))) = (wait_for_peers, self.rendezvous) {
            let _ = self
                .arrivals
                .wait_timeout_while(in_flight, timeout, |_| {
                    *self.max_in_flight.lock().unwrap() < peers
                })
                .unwrap();
        }
        started
    }

    fn leave(&self, label: String, started: Instant) {
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        self.spans.lock().unwrap().push(CallSpan {
            label,
            started,
            finished: Instant::now(),
        });
        *self.in_flight.lock().unwrap() -= 1;
    }
}

impl CatalogClient for MockCatalog {
    fn search_volumes(
        &self,
        _api_key: &ApiKey,
        query: &str,
    ) -> Result<Vec<SearchCandidate>, UpcomingError> {
        let started = self.enter(true);
        self.search_calls.lock().unwrap().push(query.to_string());
        let result = match self.searches.get(query) {
            Some(Ok(candidates)) => Ok(candidates.clone()),
            Some(Err(message)) => Err(UpcomingError::CatalogHttp(message.clone())),
            None => Ok(Vec::new()),
        };
        self.leave(query.to_string(), started);
        result
    }

    fn list_issues(
        &self,
        _api_key: &ApiKey,
        volume: VolumeId,
        cover_dates: DateRange,
    ) -> Result<Vec<RawIssue>, UpcomingError> {
        let started = self.enter(false);
        self.issue_calls.lock().unwrap().push((volume, cover_dates));
        let result = match self.issues.get(&volume.get()) {
            Some(Ok(issues)) => Ok(issues.clone()),
            Some(Err(message)) => Err(UpcomingError::CatalogHttp(message.clone())),
            None => Ok(Vec::new()),
        };
        self.leave(format!("volume:{volume}"), started);
        result
    }

    fn test_connection(&self, api_key: &ApiKey) -> ConnectionStatus {
        self.test_calls
            .lock()
            .unwrap()
            .push(api_key.as_str().to_string());
        self.connection
            .clone()
            .unwrap_or(ConnectionStatus::Connected)
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl DiagnosticSink for RecordingSink {
    fn event(&self, event: DiagnosticEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn candidate(id: i64, name: &str, issues: i64, start_year: i32) -> SearchCandidate {
    SearchCandidate {
        id: VolumeId::new(id),
        name: name.to_string(),
        issue_count: issues,
        start_year,
        publisher: Some("DC Comics".to_string()),
    }
}

pub fn raw_issue(id: i64, store_date: Option<&str>, cover_date: Option<&str>) -> RawIssue {
    RawIssue {
        id,
        name: Some(format!("Chapter {id}")),
        issue_number: Some(id.to_string()),
        store_date: store_date.map(str::to_string),
        cover_date: cover_date.map(str::to_string),
        image_url: Some(format!("https://comicvine.gamespot.com/a/uploads/{id}.jpg")),
        description: None,
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn api_key() -> ApiKey {
    "0123456789abcdef".parse().unwrap()
}
