//! Core data types for username probing.
//!
//! This module defines the main data structures shared across the library:
//! probe verdicts and outcomes, the exported profile record, engine
//! configuration, and scan modes.

use crate::descriptor::SiteDescriptor;
use crate::progress::ProgressStride;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of probes allowed in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 20;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of sites checked in fast mode.
pub const DEFAULT_FAST_LIMIT: usize = 50;

/// Upper bound accepted for the concurrency setting.
pub const MAX_CONCURRENCY: usize = 100;

/// Longest per-request timeout accepted from configuration.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Tri-state classification of one probe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The site reports an account for the username
    Found,

    /// The site reports no such account
    NotFound,

    /// The probe could not reach a conclusion (timeout, connection failure, ...)
    Error,
}

/// Result of probing one site for one username.
///
/// Produced by exactly one probe execution and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeOutcome {
    /// Site name from the catalog
    pub site: String,

    /// The profile URL that was requested
    pub url: String,

    /// Wall-clock time from request start to full body read
    pub elapsed_millis: u64,

    pub verdict: Verdict,

    /// Final HTTP status, when a response was received
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,

    /// Why the probe ended in `Verdict::Error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ProbeOutcome {
    pub fn is_found(&self) -> bool {
        self.verdict == Verdict::Found
    }

    /// Project a found outcome into the record handed to presentation and export.
    pub fn to_profile(&self) -> Option<FoundProfile> {
        self.is_found().then(|| FoundProfile {
            site: self.site.clone(),
            url: self.url.clone(),
            elapsed_millis: self.elapsed_millis,
        })
    }
}

/// A site where the username was found.
///
/// Field names are stable; CSV and JSON exports are built from them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FoundProfile {
    pub site: String,
    pub url: String,
    #[serde(rename = "elapsed_ms")]
    pub elapsed_millis: u64,
}

/// Configuration options for the scanning engine.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Maximum number of probes in flight
    /// Default: 20, Range: 1-100
    pub concurrency: usize,

    /// Timeout for each individual probe
    /// Default: 5 seconds
    pub timeout: Duration,

    /// How often progress snapshots are emitted
    pub progress: ProgressStride,

    /// User-Agent header sent with every probe
    pub user_agent: String,

    /// Redirects followed before a probe gives up
    pub max_redirects: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            progress: ProgressStride::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_redirects: 10,
        }
    }
}

/// Many sites answer differently to obvious bots, so probes look like a browser.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:129.0) Gecko/20100101 Firefox/129.0";

impl ScanConfig {
    /// Set the concurrency limit, clamped to 1-100.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the progress cadence.
    pub fn with_progress(mut self, progress: ProgressStride) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Which part of the catalog a scan covers.
///
/// This is a caller-side filter: the engine probes whatever it is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Only the first `limit` catalog entries
    Fast { limit: usize },

    /// Every catalog entry
    Full,
}

impl Default for ScanMode {
    fn default() -> Self {
        ScanMode::Fast {
            limit: DEFAULT_FAST_LIMIT,
        }
    }
}

impl ScanMode {
    /// Restrict a descriptor list according to this mode, keeping catalog order.
    pub fn select<'a>(&self, sites: &'a [SiteDescriptor]) -> &'a [SiteDescriptor] {
        match *self {
            ScanMode::Fast { limit } => &sites[..limit.min(sites.len())],
            ScanMode::Full => sites,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Found => write!(f, "Found"),
            Verdict::NotFound => write!(f, "Not found"),
            Verdict::Error => write!(f, "Error"),
        }
    }
}

impl std::fmt::Display for ScanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanMode::Fast { limit } => write!(f, "Fast (top {} sites)", limit),
            ScanMode::Full => write!(f, "Full (all sites)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DetectionRule;

    fn sites(n: usize) -> Vec<SiteDescriptor> {
        (0..n)
            .map(|i| {
                SiteDescriptor::new(
                    format!("site{}", i),
                    format!("https://s{}.test/{{}}", i),
                    DetectionRule::StatusCode,
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_fast_mode_takes_prefix_in_catalog_order() {
        let all = sites(5);
        let picked = ScanMode::Fast { limit: 3 }.select(&all);
        let names: Vec<&str> = picked.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["site0", "site1", "site2"]);
    }

    #[test]
    fn test_fast_mode_limit_larger_than_catalog() {
        let all = sites(2);
        assert_eq!(ScanMode::Fast { limit: 50 }.select(&all).len(), 2);
        assert_eq!(ScanMode::Full.select(&all).len(), 2);
    }

    #[test]
    fn test_concurrency_is_clamped() {
        assert_eq!(ScanConfig::default().with_concurrency(0).concurrency, 1);
        assert_eq!(ScanConfig::default().with_concurrency(500).concurrency, 100);
        assert_eq!(ScanConfig::default().concurrency, 20);
        assert_eq!(ScanConfig::default().timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_only_found_outcomes_project_to_profiles() {
        let mut outcome = ProbeOutcome {
            site: "GitHub".to_string(),
            url: "https://github.com/bob".to_string(),
            elapsed_millis: 42,
            verdict: Verdict::Found,
            http_status: Some(200),
            error_message: None,
        };
        assert_eq!(
            outcome.to_profile(),
            Some(FoundProfile {
                site: "GitHub".to_string(),
                url: "https://github.com/bob".to_string(),
                elapsed_millis: 42,
            })
        );

        outcome.verdict = Verdict::Error;
        assert!(outcome.to_profile().is_none());
    }

    #[test]
    fn test_profile_serializes_stable_field_names() {
        let profile = FoundProfile {
            site: "GitHub".to_string(),
            url: "https://github.com/bob".to_string(),
            elapsed_millis: 7,
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["site"], "GitHub");
        assert_eq!(json["url"], "https://github.com/bob");
        assert_eq!(json["elapsed_ms"], 7);
    }
}
