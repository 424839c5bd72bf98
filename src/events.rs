//! Structured diagnostics emitted by the resolver, fetcher and aggregator.
//!
//! The resolver, fetcher and aggregator never log directly; callers pass a [`DiagnosticSink`] and decide
//! what to do with the events. [`TracingSink`] forwards them to `tracing`.

use chrono::NaiveDate;

use crate::domain::{SeriesId, VolumeId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Neither the store date nor the cover date parsed.
    NoUsableDate,
    /// Released before the trailing edge of the window.
    BeforeWindow { date: NaiveDate },
    /// Sorted after the leading edge of the window.
    AfterWindow { date: NaiveDate },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticEvent {
    CacheHit {
        series: SeriesId,
        volume: VolumeId,
    },
    SearchCompleted {
        title: String,
        results: usize,
    },
    CandidateSkipped {
        title: String,
        candidate: String,
    },
    CandidateScored {
        title: String,
        volume: VolumeId,
        publisher: Option<String>,
        score: i64,
    },
    VolumeResolved {
        series: SeriesId,
        volume: VolumeId,
    },
    /// No exact title match; the first raw search result was taken unscored.
    VolumeFallback {
        series: SeriesId,
        volume: VolumeId,
    },
    VolumeNotFound {
        series: SeriesId,
        title: String,
    },
    ResolutionFailed {
        series: SeriesId,
        message: String,
    },
    CacheWriteFailed {
        series: SeriesId,
        message: String,
    },
    IssuesFetched {
        volume: VolumeId,
        raw: usize,
        kept: usize,
    },
    IssueSkipped {
        volume: VolumeId,
        issue_id: i64,
        reason: SkipReason,
    },
    FetchFailed {
        volume: VolumeId,
        message: String,
    },
    ChunkCompleted {
        index: usize,
        size: usize,
        issues: usize,
    },
}

pub trait DiagnosticSink: Send + Sync {
    fn event(&self, event: DiagnosticEvent);
}

pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn event(&self, _event: DiagnosticEvent) {}
}

pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn event(&self, event: DiagnosticEvent) {
        match event {
            DiagnosticEvent::CacheHit { series, volume } => {
                tracing::debug!(%series, %volume, "volume cache hit");
            }
            DiagnosticEvent::SearchCompleted { title, results } => {
                tracing::debug!(%title, results, "volume search completed");
            }
            DiagnosticEvent::CandidateSkipped { title, candidate } => {
                tracing::debug!(%title, %candidate, "skipping non-exact match");
            }
            DiagnosticEvent::CandidateScored {
                title,
                volume,
                publisher,
                score,
            } => {
                tracing::debug!(%title, %volume, publisher = publisher.as_deref(), score, "candidate scored");
            }
            DiagnosticEvent::VolumeResolved { series, volume } => {
                tracing::info!(%series, %volume, "volume resolved");
            }
            DiagnosticEvent::VolumeFallback { series, volume } => {
                tracing::info!(%series, %volume, "no exact match, using first search result");
            }
            DiagnosticEvent::VolumeNotFound { series, title } => {
                tracing::info!(%series, %title, "no volume found");
            }
            DiagnosticEvent::ResolutionFailed { series, message } => {
                tracing::warn!(%series, %message, "volume search failed");
            }
            DiagnosticEvent::CacheWriteFailed { series, message } => {
                tracing::warn!(%series, %message, "failed to cache volume id");
            }
            DiagnosticEvent::IssuesFetched { volume, raw, kept } => {
                tracing::debug!(%volume, raw, kept, "issues fetched");
            }
            DiagnosticEvent::IssueSkipped {
                volume,
                issue_id,
                reason,
            } => {
                tracing::debug!(%volume, issue_id, ?reason, "issue skipped");
            }
            DiagnosticEvent::FetchFailed { volume, message } => {
                tracing::warn!(%volume, %message, "issue listing failed");
            }
            DiagnosticEvent::ChunkCompleted {
                index,
                size,
                issues,
            } => {
                tracing::debug!(index, size, issues, "chunk completed");
            }
        }
    }
}
