mod common;

use std::time::Duration;

use assert_matches::assert_matches;

use comicvine_upcoming::app::{LibraryAggregator, LibrarySource, UpcomingState};
use comicvine_upcoming::catalog::ConnectionStatus;
use comicvine_upcoming::domain::{DatePrecision, SeriesRef};
use comicvine_upcoming::error::UpcomingError;
use comicvine_upcoming::events::DiagnosticEvent;
use comicvine_upcoming::store::{MemoryStore, Preferences};

use common::{MockCatalog, RecordingSink, api_key, candidate, date, raw_issue};

fn preferences_with_key() -> Preferences<MemoryStore> {
    let prefs = Preferences::new(MemoryStore::new());
    prefs.set_api_key(&api_key()).unwrap();
    prefs
}

fn library(titles: &[&str]) -> Vec<SeriesRef> {
    titles
        .iter()
        .enumerate()
        .map(|(index, title)| SeriesRef::new(index as i64 + 1, *title))
        .collect()
}

struct BrokenLibrary;

impl LibrarySource for BrokenLibrary {
    fn library(&self) -> Result<Vec<SeriesRef>, UpcomingError> {
        Err(UpcomingError::Library("library database is locked".to_string()))
    }
}

#[test]
fn missing_key_makes_no_calls() {
    let catalog = MockCatalog::new().with_search("Saga", vec![candidate(1, "Saga", 60, 2012)]);
    let aggregator = LibraryAggregator::new(catalog, Preferences::new(MemoryStore::new()));

    let state = aggregator.aggregate(&library(&["Saga"]), date(2026, 2, 10), &RecordingSink::default());

    assert_eq!(state, UpcomingState::NoApiKey);
    assert_eq!(aggregator.catalog().total_calls(), 0);
}

#[test]
fn empty_library_is_empty_state() {
    let aggregator = LibraryAggregator::new(MockCatalog::new(), preferences_with_key());

    let state = aggregator.aggregate(&[], date(2026, 2, 10), &RecordingSink::default());

    assert_eq!(state, UpcomingState::Empty);
    assert_eq!(aggregator.catalog().total_calls(), 0);
}

#[test]
fn nothing_upcoming_is_empty_state() {
    let catalog = MockCatalog::new().with_search("Saga", vec![candidate(1, "Saga", 60, 2012)]);
    let aggregator = LibraryAggregator::new(catalog, preferences_with_key());

    let state = aggregator.aggregate(&library(&["Saga"]), date(2026, 2, 10), &RecordingSink::default());

    assert_eq!(state, UpcomingState::Empty);
}

#[test]
fn library_is_processed_in_chunks_of_three() {
    let titles = ["A", "B", "C", "D", "E", "F", "G"];
    let mut catalog = MockCatalog::new()
        .with_delay(Duration::from_millis(5))
        .with_rendezvous(3, Duration::from_secs(2));
    for (index, title) in titles.iter().enumerate() {
        let volume = 100 + index as i64;
        catalog = catalog
            .with_search(title, vec![candidate(volume, title, 10, 2025)])
            .with_issues(volume, vec![raw_issue(volume, Some("2026-02-18"), None)]);
    }
    let aggregator = LibraryAggregator::new(catalog, preferences_with_key());
    let sink = RecordingSink::default();

    aggregator.aggregate(&library(&titles), date(2026, 2, 10), &sink);

    let sizes = sink
        .events()
        .into_iter()
        .filter_map(|event| match event {
            DiagnosticEvent::ChunkCompleted { size, .. } => Some(size),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(sizes, vec![3, 3, 1]);
    assert_eq!(*aggregator.catalog().max_in_flight.lock().unwrap(), 3);
    assert_eq!(aggregator.catalog().search_count(), 7);
}

#[test]
fn next_chunk_starts_after_previous_chunk_returns() {
    let titles = ["A", "B", "C", "D", "E", "F", "G"];
    let mut catalog = MockCatalog::new().with_delay(Duration::from_millis(10));
    for (index, title) in titles.iter().enumerate() {
        let volume = 100 + index as i64;
        catalog = catalog
            .with_search(title, vec![candidate(volume, title, 10, 2025)])
            .with_issues(volume, vec![raw_issue(volume, Some("2026-02-18"), None)]);
    }
    let aggregator = LibraryAggregator::new(catalog, preferences_with_key());

    aggregator.aggregate(&library(&titles), date(2026, 2, 10), &RecordingSink::default());

    let chunk_of = |label: &str| {
        let index = match label.strip_prefix("volume:") {
            Some(volume) => volume.parse::<usize>().unwrap() - 100,
            None => titles.iter().position(|title| *title == label).unwrap(),
        };
        index / 3
    };
    let spans = aggregator.catalog().spans();
    assert_eq!(spans.len(), 14);
    for chunk in 0..2 {
        let last_finish = spans
            .iter()
            .filter(|span| chunk_of(&span.label) == chunk)
            .map(|span| span.finished)
            .max()
            .unwrap();
        let next_start = spans
            .iter()
            .filter(|span| chunk_of(&span.label) == chunk + 1)
            .map(|span| span.started)
            .min()
            .unwrap();
        assert!(
            last_finish <= next_start,
            "chunk {} started before chunk {chunk} finished",
            chunk + 1
        );
    }
}

#[test]
fn unresolvable_and_failing_series_do_not_block_others() {
    let catalog = MockCatalog::new()
        .with_search("Saga", vec![candidate(1, "Saga", 60, 2012)])
        .with_issues(
            1,
            vec![
                raw_issue(11, Some("2026-02-18"), None),
                raw_issue(12, None, Some("2026-04-01")),
            ],
        )
        .with_search_error("Monstress")
        .with_search("Paper Girls", vec![candidate(3, "Paper Girls", 30, 2015)])
        .with_issue_error(3)
        .with_search("Absolute Batman", vec![candidate(4, "Absolute Batman", 14, 2024)])
        .with_issues(4, vec![raw_issue(41, Some("2026-02-18"), None)]);
    let aggregator = LibraryAggregator::new(catalog, preferences_with_key());

    let state = aggregator.aggregate(
        &library(&["Saga", "Monstress", "Paper Girls", "Absolute Batman", "Unknown"]),
        date(2026, 2, 10),
        &RecordingSink::default(),
    );

    let UpcomingState::Success(days) = state else {
        panic!("expected success");
    };
    let total = days.iter().map(|day| day.issues.len()).sum::<usize>();
    assert_eq!(total, 3);
    assert_eq!(days.len(), 2);
    assert_eq!(days[0].date, date(2026, 2, 18));
    assert_eq!(days[1].display_date, "April 2026");
}

#[test]
fn days_ascend_and_issues_sort_by_series_title() {
    let catalog = MockCatalog::new()
        .with_search("Saga", vec![candidate(1, "Saga", 60, 2012)])
        .with_issues(
            1,
            vec![
                raw_issue(11, Some("2026-03-11"), None),
                raw_issue(12, Some("2026-02-18"), None),
            ],
        )
        .with_search("Absolute Batman", vec![candidate(2, "Absolute Batman", 14, 2024)])
        .with_issues(2, vec![raw_issue(21, Some("2026-02-18"), None)]);
    let aggregator = LibraryAggregator::new(catalog, preferences_with_key());

    let state = aggregator.aggregate(
        &library(&["Saga", "Absolute Batman"]),
        date(2026, 2, 10),
        &RecordingSink::default(),
    );

    let UpcomingState::Success(days) = state else {
        panic!("expected success");
    };
    assert_eq!(
        days.iter().map(|day| day.date).collect::<Vec<_>>(),
        vec![date(2026, 2, 18), date(2026, 3, 11)]
    );
    let titles = days[0]
        .issues
        .iter()
        .map(|issue| issue.series_title.as_str())
        .collect::<Vec<_>>();
    assert_eq!(titles, vec!["Absolute Batman", "Saga"]);
}

#[test]
fn mixed_precision_on_one_date_shares_a_day() {
    let catalog = MockCatalog::new()
        .with_search("Saga", vec![candidate(1, "Saga", 60, 2012)])
        .with_issues(1, vec![raw_issue(11, None, Some("2026-03-01"))])
        .with_search("Absolute Batman", vec![candidate(2, "Absolute Batman", 14, 2024)])
        .with_issues(2, vec![raw_issue(21, Some("2026-03-01"), None)]);
    let aggregator = LibraryAggregator::new(catalog, preferences_with_key()).with_chunk_size(1);

    let state = aggregator.aggregate(
        &library(&["Saga", "Absolute Batman"]),
        date(2026, 2, 10),
        &RecordingSink::default(),
    );

    let UpcomingState::Success(days) = state else {
        panic!("expected success");
    };
    assert_eq!(days.len(), 1);
    assert_eq!(days[0].issues.len(), 2);
    // First issue seen (Saga, month-only) decides the day's label.
    assert_eq!(days[0].precision, DatePrecision::MonthOnly);
    assert_eq!(days[0].display_date, "March 2026");
}

#[test]
fn failing_library_source_is_error_state() {
    let aggregator = LibraryAggregator::new(MockCatalog::new(), preferences_with_key());

    let state = aggregator.aggregate_from(&BrokenLibrary, date(2026, 2, 10), &RecordingSink::default());

    assert_matches!(state, UpcomingState::Error(message) if message.contains("locked"));
}

#[test]
fn connection_test_uses_candidate_or_stored_key() {
    let catalog = MockCatalog::new().with_connection(ConnectionStatus::InvalidKey);
    let aggregator = LibraryAggregator::new(catalog, preferences_with_key());

    assert_eq!(
        aggregator.test_connection(Some("  other-key  ")),
        ConnectionStatus::InvalidKey
    );
    assert_eq!(aggregator.test_connection(None), ConnectionStatus::InvalidKey);
    assert_eq!(
        aggregator.test_connection(Some("   ")),
        ConnectionStatus::Failed("Key is empty".to_string())
    );

    let calls = aggregator.catalog().test_calls.lock().unwrap().clone();
    assert_eq!(calls, vec!["other-key".to_string(), api_key().as_str().to_string()]);
}
