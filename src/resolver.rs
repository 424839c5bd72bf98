use crate::catalog::{CatalogClient, SearchCandidate};
use crate::domain::{ApiKey, SeriesRef, VolumeId};
use crate::events::{DiagnosticEvent, DiagnosticSink};
use crate::store::{KeyValueStore, Preferences};

/// Bonus by how recently a volume started. Each tier outweighs any realistic
/// issue count in the tiers below it.
pub fn recency_bonus(start_year: i32, current_year: i32) -> i64 {
    if start_year >= current_year - 1 {
        10_000
    } else if start_year >= current_year - 3 {
        500
    } else if start_year >= current_year - 10 {
        0
    } else {
        -100
    }
}

pub fn score_candidate(candidate: &SearchCandidate, current_year: i32) -> i64 {
    candidate.issue_count + recency_bonus(candidate.start_year, current_year)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Best scoring exact title match.
    Scored(VolumeId),
    /// No exact title match; first result taken as-is.
    Fallback(VolumeId),
}

impl Selection {
    pub fn volume(self) -> VolumeId {
        match self {
            Selection::Scored(volume) | Selection::Fallback(volume) => volume,
        }
    }
}

/// Chooses a volume among search results for `title`.
pub fn select_volume(
    title: &str,
    candidates: &[SearchCandidate],
    current_year: i32,
    sink: &dyn DiagnosticSink,
) -> Option<Selection> {
    let first = candidates.first()?;
    let mut best: Option<(i64, VolumeId)> = None;

    for candidate in candidates {
        // Exact only, so "Absolute Batman: The Killing Joke" never stands in
        // for "Absolute Batman".
        if candidate.name.to_lowercase() != title.to_lowercase() {
            sink.event(DiagnosticEvent::CandidateSkipped {
                title: title.to_string(),
                candidate: candidate.name.clone(),
            });
            continue;
        }
        let score = score_candidate(candidate, current_year);
        sink.event(DiagnosticEvent::CandidateScored {
            title: title.to_string(),
            volume: candidate.id,
            publisher: candidate.publisher.clone(),
            score,
        });
        if best.is_none_or(|(best_score, _)| score > best_score) {
            best = Some((score, candidate.id));
        }
    }

    Some(match best {
        Some((_, volume)) => Selection::Scored(volume),
        None => Selection::Fallback(first.id),
    })
}

pub struct VolumeResolver<'a, C: CatalogClient, S: KeyValueStore> {
    catalog: &'a C,
    preferences: &'a Preferences<S>,
    api_key: &'a ApiKey,
    current_year: i32,
}

impl<'a, C: CatalogClient, S: KeyValueStore> VolumeResolver<'a, C, S> {
    pub fn new(
        catalog: &'a C,
        preferences: &'a Preferences<S>,
        api_key: &'a ApiKey,
        current_year: i32,
    ) -> Self {
        Self {
            catalog,
            preferences,
            api_key,
            current_year,
        }
    }

    /// Maps a library series to a catalog volume. Failures are reported to
    /// `sink` and come back as `None`; only successful picks are cached.
    pub fn resolve(&self, series: &SeriesRef, sink: &dyn DiagnosticSink) -> Option<VolumeId> {
        if let Some(volume) = self.preferences.cached_volume(series.id) {
            sink.event(DiagnosticEvent::CacheHit {
                series: series.id,
                volume,
            });
            return Some(volume);
        }

        let candidates = match self.catalog.search_volumes(self.api_key, &series.title) {
            Ok(candidates) => candidates,
            Err(err) => {
                sink.event(DiagnosticEvent::ResolutionFailed {
                    series: series.id,
                    message: err.to_string(),
                });
                return None;
            }
        };
        sink.event(DiagnosticEvent::SearchCompleted {
            title: series.title.clone(),
            results: candidates.len(),
        });

        let Some(selection) = select_volume(&series.title, &candidates, self.current_year, sink)
        else {
            sink.event(DiagnosticEvent::VolumeNotFound {
                series: series.id,
                title: series.title.clone(),
            });
            return None;
        };

        let volume = selection.volume();
        sink.event(match selection {
            Selection::Scored(_) => DiagnosticEvent::VolumeResolved {
                series: series.id,
                volume,
            },
            Selection::Fallback(_) => DiagnosticEvent::VolumeFallback {
                series: series.id,
                volume,
            },
        });

        if let Err(err) = self.preferences.set_cached_volume(series.id, volume) {
            sink.event(DiagnosticEvent::CacheWriteFailed {
                series: series.id,
                message: err.to_string(),
            });
        }
        Some(volume)
    }
}
