//! Bounded-concurrency dispatch of probes.
//!
//! A [`ScanSession`] describes one scan: the username, the descriptors to
//! probe, the concurrency limit, the per-request timeout and a cancellation
//! token. [`dispatch`] turns a session into a [`ScanStream`] that yields
//! outcomes in completion order while never holding more than
//! `concurrency_limit` probes in flight.

use crate::descriptor::SiteDescriptor;
use crate::error::HandleCheckError;
use crate::probe::probe;
use crate::progress::ProgressReporter;
use crate::transport::HttpTransport;
use crate::types::{
    ProbeOutcome, ScanConfig, DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT, MAX_CONCURRENCY,
};
use crate::utils::validate_username;
use futures::future::{self, BoxFuture, FutureExt};
use futures::stream::{self, BoxStream, FusedStream, Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Everything one scan needs, fixed for its whole lifetime.
#[derive(Debug, Clone)]
pub struct ScanSession {
    username: String,
    descriptors: Arc<[SiteDescriptor]>,
    concurrency_limit: usize,
    timeout: Duration,
    cancel: CancellationToken,
}

impl ScanSession {
    /// Create a session with default concurrency (20) and timeout (5s).
    ///
    /// Descriptors are probed in the given order; duplicates are not removed.
    ///
    /// # Errors
    ///
    /// Returns `HandleCheckError::InvalidUsername` for an empty username or
    /// one that cannot be placed in a URL path segment.
    pub fn new<U, D>(username: U, descriptors: D) -> Result<Self, HandleCheckError>
    where
        U: Into<String>,
        D: Into<Arc<[SiteDescriptor]>>,
    {
        let username = username.into().trim().to_string();
        validate_username(&username)?;

        Ok(Self {
            username,
            descriptors: descriptors.into(),
            concurrency_limit: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            cancel: CancellationToken::new(),
        })
    }

    /// Set the concurrency limit, clamped to 1-100.
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit.clamp(1, MAX_CONCURRENCY);
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Take concurrency and timeout from engine settings.
    pub fn with_config(self, config: &ScanConfig) -> Self {
        self.with_concurrency(config.concurrency)
            .with_timeout(config.timeout)
    }

    /// Use an externally owned cancellation token, e.g. a child of an
    /// application-wide one.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn descriptors(&self) -> &[SiteDescriptor] {
        &self.descriptors
    }

    /// Number of probes this session will run.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// A handle that cancels this session when triggered.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop admitting probes and end the outcome stream.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Lazy, finite, completion-ordered stream of probe outcomes.
///
/// Nothing is sent until the stream is polled. Once it returns `None` it
/// stays exhausted. Dropping it drops every probe still in flight.
pub struct ScanStream {
    inner: Option<BoxStream<'static, ProbeOutcome>>,
    cancelled: BoxFuture<'static, ()>,
    progress: Option<Arc<ProgressReporter>>,
    completed: usize,
    total: usize,
}

/// Fan out one probe per descriptor, bounded by the session's limit.
///
/// Admission happens inside `buffer_unordered`: a probe future is only
/// created once a slot is free, and the next descriptor is admitted as soon
/// as any in-flight probe completes. The cancellation token is consulted at
/// every admission and before every outcome is forwarded.
pub fn dispatch(transport: Arc<dyn HttpTransport>, session: &ScanSession) -> ScanStream {
    let total = session.len();
    let timeout = session.timeout;
    let username: Arc<str> = Arc::from(session.username.as_str());
    let descriptors = Arc::clone(&session.descriptors);
    let admission = session.cancel.clone();

    info!(
        username = %username,
        sites = total,
        concurrency = session.concurrency_limit,
        timeout_ms = timeout.as_millis() as u64,
        "starting scan"
    );

    let probes = stream::iter(0..total)
        .take_while(move |_| future::ready(!admission.is_cancelled()))
        .map(move |index| {
            let transport = Arc::clone(&transport);
            let descriptors = Arc::clone(&descriptors);
            let username = Arc::clone(&username);
            async move { probe(transport.as_ref(), &descriptors[index], &username, timeout).await }
        })
        .buffer_unordered(session.concurrency_limit);

    ScanStream {
        inner: Some(probes.boxed()),
        cancelled: session.cancel.clone().cancelled_owned().boxed(),
        progress: None,
        completed: 0,
        total,
    }
}

impl ScanStream {
    /// Report every completion to `reporter`.
    pub fn with_progress(mut self, reporter: Arc<ProgressReporter>) -> Self {
        self.progress = Some(reporter);
        self
    }

    /// Probes completed so far.
    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn total(&self) -> usize {
        self.total
    }

    fn close(&mut self, cancelled: bool) {
        if self.inner.take().is_none() {
            return;
        }
        if let Some(reporter) = self.progress.take() {
            reporter.finish();
        }
        info!(
            completed = self.completed,
            total = self.total,
            cancelled,
            "scan finished"
        );
    }
}

impl Stream for ScanStream {
    type Item = ProbeOutcome;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.inner.is_none() {
            return Poll::Ready(None);
        }

        if this.cancelled.poll_unpin(cx).is_ready() {
            // In-flight probes are dropped with the inner stream.
            this.close(true);
            return Poll::Ready(None);
        }

        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };

        match inner.poll_next_unpin(cx) {
            Poll::Ready(Some(outcome)) => {
                this.completed += 1;
                if let Some(reporter) = &this.progress {
                    reporter.record();
                }
                Poll::Ready(Some(outcome))
            }
            Poll::Ready(None) => {
                this.close(false);
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl FusedStream for ScanStream {
    fn is_terminated(&self) -> bool {
        self.inner.is_none()
    }
}

impl Drop for ScanStream {
    fn drop(&mut self) {
        // An abandoned scan still closes out its progress channel.
        let cancelled = self.completed < self.total;
        self.close(cancelled);
    }
}
