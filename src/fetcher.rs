use chrono::NaiveDate;

use crate::catalog::{CatalogClient, RawIssue};
use crate::dates::{DateRange, ReleaseWindow, normalize_release_date, parse_catalog_date};
use crate::domain::{ApiKey, SeriesRef, UpcomingIssue, VolumeId};
use crate::events::{DiagnosticEvent, DiagnosticSink, SkipReason};

/// Blank strings and the literal `null` become `None`.
pub fn clean_text(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() || value == "null" {
        return None;
    }
    Some(value.to_string())
}

/// Turns one raw catalog issue into a calendar entry, or says why it was dropped.
pub fn build_issue(
    series: &SeriesRef,
    raw: &RawIssue,
    window: DateRange,
) -> Result<UpcomingIssue, SkipReason> {
    let resolved = normalize_release_date(raw.store_date.as_deref(), raw.cover_date.as_deref())
        .ok_or(SkipReason::NoUsableDate)?;

    // The store date is the better signal for "already out too long ago";
    // the cover date only got the issue into the listing.
    let released = parse_catalog_date(raw.store_date.as_deref()).unwrap_or(resolved.sort_date);
    if released < window.from {
        return Err(SkipReason::BeforeWindow { date: released });
    }
    if resolved.sort_date > window.to {
        return Err(SkipReason::AfterWindow {
            date: resolved.sort_date,
        });
    }

    Ok(UpcomingIssue {
        series_id: series.id,
        series_title: series.title.clone(),
        thumbnail_url: series.thumbnail_url.clone(),
        issue_title: clean_text(raw.name.as_deref()).unwrap_or_default(),
        issue_number: clean_text(raw.issue_number.as_deref()),
        sort_date: resolved.sort_date,
        display_date: resolved.display_date,
        precision: resolved.precision,
        cover_url: clean_text(raw.image_url.as_deref()),
        description: clean_text(raw.description.as_deref()),
    })
}

pub struct ReleaseWindowFetcher<'a, C: CatalogClient> {
    catalog: &'a C,
    api_key: &'a ApiKey,
    window: ReleaseWindow,
}

impl<'a, C: CatalogClient> ReleaseWindowFetcher<'a, C> {
    pub fn new(catalog: &'a C, api_key: &'a ApiKey, window: ReleaseWindow) -> Self {
        Self {
            catalog,
            api_key,
            window,
        }
    }

    /// Issues of `volume` around `today`, ascending by sort date. A failed
    /// listing is reported to `sink` and yields no issues.
    pub fn fetch_issues(
        &self,
        series: &SeriesRef,
        volume: VolumeId,
        today: NaiveDate,
        sink: &dyn DiagnosticSink,
    ) -> Vec<UpcomingIssue> {
        let bounds = self.window.bounds(today);
        let raw_issues = match self.catalog.list_issues(self.api_key, volume, bounds) {
            Ok(issues) => issues,
            Err(err) => {
                sink.event(DiagnosticEvent::FetchFailed {
                    volume,
                    message: err.to_string(),
                });
                return Vec::new();
            }
        };

        let mut issues = Vec::with_capacity(raw_issues.len());
        for raw in &raw_issues {
            match build_issue(series, raw, bounds) {
                Ok(issue) => issues.push(issue),
                Err(reason) => sink.event(DiagnosticEvent::IssueSkipped {
                    volume,
                    issue_id: raw.id,
                    reason,
                }),
            }
        }
        issues.sort_by_key(|issue| issue.sort_date);

        sink.event(DiagnosticEvent::IssuesFetched {
            volume,
            raw: raw_issues.len(),
            kept: issues.len(),
        });
        issues
    }
}
