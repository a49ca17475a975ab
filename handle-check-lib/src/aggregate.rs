//! Collecting probe outcomes into a scan report.

use crate::types::{FoundProfile, ProbeOutcome, Verdict};
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use std::time::Duration;

/// Summary of one finished (or cancelled) scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub username: String,

    /// Sites where the username was found, in completion order
    pub found: Vec<FoundProfile>,

    pub not_found: usize,
    pub errors: usize,

    /// Number of probes that completed
    pub completed: usize,

    /// Number of probes the scan was asked to run
    pub total: usize,

    /// Whether the scan ended before every probe completed
    pub cancelled: bool,

    #[serde(skip)]
    pub duration: Duration,
}

impl ScanReport {
    /// Sort found profiles by site name.
    ///
    /// The engine keeps completion order; callers that want a stable listing
    /// sort explicitly.
    pub fn sort_by_site(&mut self) {
        self.found
            .sort_by(|a, b| a.site.to_lowercase().cmp(&b.site.to_lowercase()));
    }

    pub fn found_count(&self) -> usize {
        self.found.len()
    }
}

/// Accumulates outcomes as they arrive.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    found: Vec<FoundProfile>,
    not_found: usize,
    errors: usize,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one outcome; only found ones are kept.
    pub fn push(&mut self, outcome: &ProbeOutcome) {
        match outcome.verdict {
            Verdict::Found => {
                if let Some(profile) = outcome.to_profile() {
                    self.found.push(profile);
                }
            }
            Verdict::NotFound => self.not_found += 1,
            Verdict::Error => self.errors += 1,
        }
    }

    /// Profiles collected so far.
    pub fn found(&self) -> &[FoundProfile] {
        &self.found
    }

    pub fn completed(&self) -> usize {
        self.found.len() + self.not_found + self.errors
    }

    /// Close out the report.
    pub fn into_report(self, username: &str, total: usize, duration: Duration) -> ScanReport {
        let completed = self.completed();
        ScanReport {
            username: username.to_string(),
            found: self.found,
            not_found: self.not_found,
            errors: self.errors,
            completed,
            total,
            cancelled: completed < total,
            duration,
        }
    }
}

/// Drain an outcome stream and keep only found profiles, in completion order.
pub async fn collect_found<S>(stream: S) -> Vec<FoundProfile>
where
    S: Stream<Item = ProbeOutcome>,
{
    stream
        .filter_map(|outcome| async move { outcome.to_profile() })
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(site: &str, verdict: Verdict) -> ProbeOutcome {
        ProbeOutcome {
            site: site.to_string(),
            url: format!("https://{}.test/bob", site.to_lowercase()),
            elapsed_millis: 10,
            verdict,
            http_status: None,
            error_message: None,
        }
    }

    #[test]
    fn test_only_found_outcomes_are_kept() {
        let mut aggregator = ResultAggregator::new();
        aggregator.push(&outcome("B", Verdict::Found));
        aggregator.push(&outcome("X", Verdict::NotFound));
        aggregator.push(&outcome("Y", Verdict::Error));
        aggregator.push(&outcome("A", Verdict::Found));

        let report = aggregator.into_report("bob", 4, Duration::from_millis(5));
        assert_eq!(report.found_count(), 2);
        assert_eq!(report.not_found, 1);
        assert_eq!(report.errors, 1);
        assert_eq!(report.completed, 4);
        assert!(!report.cancelled);

        // completion order, not alphabetical
        let sites: Vec<&str> = report.found.iter().map(|p| p.site.as_str()).collect();
        assert_eq!(sites, vec!["B", "A"]);
    }

    #[test]
    fn test_sort_by_site_is_explicit() {
        let mut aggregator = ResultAggregator::new();
        for site in ["reddit", "GitHub", "about.me"] {
            aggregator.push(&outcome(site, Verdict::Found));
        }
        let mut report = aggregator.into_report("bob", 3, Duration::ZERO);
        report.sort_by_site();
        let sites: Vec<&str> = report.found.iter().map(|p| p.site.as_str()).collect();
        assert_eq!(sites, vec!["about.me", "GitHub", "reddit"]);
    }

    #[test]
    fn test_partial_report_is_marked_cancelled() {
        let mut aggregator = ResultAggregator::new();
        aggregator.push(&outcome("A", Verdict::Found));
        let report = aggregator.into_report("bob", 10, Duration::ZERO);
        assert!(report.cancelled);
        assert_eq!(report.completed, 1);
    }

    #[tokio::test]
    async fn test_collect_found() {
        let outcomes = vec![
            outcome("A", Verdict::Error),
            outcome("B", Verdict::Found),
            outcome("C", Verdict::NotFound),
        ];
        let found = collect_found(futures::stream::iter(outcomes)).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].site, "B");
    }
}
