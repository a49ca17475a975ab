//! Main scanner implementation.
//!
//! This module provides the `Scanner` struct that ties together the shared
//! HTTP transport, the bounded dispatcher and the result aggregator.

use crate::aggregate::{collect_found, ResultAggregator, ScanReport};
use crate::concurrent::{dispatch, ScanSession, ScanStream};
use crate::descriptor::SiteDescriptor;
use crate::error::HandleCheckError;
use crate::probe::probe;
use crate::progress::{ProgressReceiver, ProgressReporter};
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::types::{FoundProfile, ProbeOutcome, ScanConfig};
use futures::stream::StreamExt;
use std::sync::Arc;
use tokio::time::Instant;

/// Main scanner that coordinates username probing.
///
/// The `Scanner` owns one HTTP transport shared by every probe it runs and
/// the engine settings applied to new sessions. Cloning is cheap; clones
/// share the transport.
///
/// # Example
///
/// ```rust,no_run
/// use handle_check_lib::{Catalog, Scanner, ScanMode};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let catalog = Catalog::load_file("data.json")?;
///     let scanner = Scanner::new()?;
///     let found = scanner
///         .check_username("bob", catalog.select(ScanMode::default()))
///         .await?;
///     for profile in found {
///         println!("{}: {}", profile.site, profile.url);
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Scanner {
    /// Settings applied to sessions created by this scanner
    config: ScanConfig,
    /// Transport shared read-only by all probes
    transport: Arc<dyn HttpTransport>,
}

impl Scanner {
    /// Create a scanner with default settings and a `reqwest` transport.
    ///
    /// Default settings:
    /// - Concurrency: 20
    /// - Timeout: 5 seconds
    /// - Progress: every 5%
    pub fn new() -> Result<Self, HandleCheckError> {
        Self::with_config(ScanConfig::default())
    }

    /// Create a scanner with custom settings and a `reqwest` transport.
    ///
    /// # Example
    ///
    /// ```rust
    /// use handle_check_lib::{ScanConfig, Scanner};
    /// use std::time::Duration;
    ///
    /// let config = ScanConfig::default()
    ///     .with_concurrency(40)
    ///     .with_timeout(Duration::from_secs(8));
    ///
    /// let scanner = Scanner::with_config(config).unwrap();
    /// assert_eq!(scanner.config().concurrency, 40);
    /// ```
    pub fn with_config(config: ScanConfig) -> Result<Self, HandleCheckError> {
        let transport = ReqwestTransport::with_config(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a scanner over any transport.
    pub fn with_transport(config: ScanConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self { config, transport }
    }

    /// Get the current configuration for this scanner.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Build a session for `username` using this scanner's concurrency and
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns `HandleCheckError::InvalidUsername` if the username is empty
    /// or contains characters that cannot appear in a profile URL.
    pub fn session<U, D>(&self, username: U, descriptors: D) -> Result<ScanSession, HandleCheckError>
    where
        U: Into<String>,
        D: Into<Arc<[SiteDescriptor]>>,
    {
        Ok(ScanSession::new(username, descriptors)?.with_config(&self.config))
    }

    /// Probe a single site.
    pub async fn probe_site(&self, descriptor: &SiteDescriptor, username: &str) -> ProbeOutcome {
        probe(
            self.transport.as_ref(),
            descriptor,
            username,
            self.config.timeout,
        )
        .await
    }

    /// Start a scan and return its outcomes as a stream.
    ///
    /// Outcomes arrive in completion order. Nothing is sent until the stream
    /// is first polled.
    pub fn scan(&self, session: &ScanSession) -> ScanStream {
        dispatch(Arc::clone(&self.transport), session)
    }

    /// Start a scan with a progress channel attached.
    ///
    /// The receiver observes snapshots at the scanner's configured cadence
    /// and always sees a final snapshot, even if the scan is cancelled.
    pub fn scan_with_progress(&self, session: &ScanSession) -> (ScanStream, ProgressReceiver) {
        let (reporter, receiver) = ProgressReporter::channel(session.len(), self.config.progress);
        (self.scan(session).with_progress(reporter), receiver)
    }

    /// Run a scan to completion (or cancellation) and summarize it.
    pub async fn run(
        &self,
        session: &ScanSession,
        progress: Option<Arc<ProgressReporter>>,
    ) -> ScanReport {
        let start = Instant::now();
        let mut stream = self.scan(session);
        if let Some(reporter) = progress {
            stream = stream.with_progress(reporter);
        }

        let mut aggregator = ResultAggregator::new();
        while let Some(outcome) = stream.next().await {
            aggregator.push(&outcome);
        }

        aggregator.into_report(session.username(), session.len(), start.elapsed())
    }

    /// Check one username against a list of sites and return where it exists.
    ///
    /// Profiles are returned in completion order.
    pub async fn check_username(
        &self,
        username: &str,
        descriptors: &[SiteDescriptor],
    ) -> Result<Vec<FoundProfile>, HandleCheckError> {
        let session = self.session(username, descriptors.to_vec())?;
        Ok(collect_found(self.scan(&session)).await)
    }
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
