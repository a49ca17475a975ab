//! Progress reporting for running scans.
//!
//! The dispatcher records each completion on a [`ProgressReporter`]; a
//! consumer reads snapshots from the paired [`ProgressReceiver`]. The channel
//! is a `tokio::sync::watch`, so recording never waits on the consumer and a
//! slow consumer simply sees fewer, newer snapshots. The final snapshot is
//! always delivered, exactly once.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// How often a snapshot is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStride {
    /// Every ⌈total / n⌉ completions (n = 20 reports every 5%).
    Fraction(usize),

    /// Every n completions.
    Every(usize),
}

impl Default for ProgressStride {
    fn default() -> Self {
        ProgressStride::Fraction(20)
    }
}

impl ProgressStride {
    /// Number of completions between snapshots for a scan of `total` probes.
    ///
    /// Never zero, whatever the catalog size.
    pub fn step(&self, total: usize) -> usize {
        match *self {
            ProgressStride::Fraction(parts) => total.div_ceil(parts.max(1)).max(1),
            ProgressStride::Every(n) => n.max(1),
        }
    }
}

/// Point-in-time view of a scan's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressSnapshot {
    pub completed: usize,
    pub total: usize,

    /// Set on the last snapshot of a scan, including a cancelled one
    pub finished: bool,
}

impl ProgressSnapshot {
    /// Completion percentage; an empty scan counts as complete.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.completed as f64 * 100.0 / self.total as f64
        }
    }
}

/// Producer half, owned by the scan stream.
#[derive(Debug)]
pub struct ProgressReporter {
    sender: watch::Sender<ProgressSnapshot>,
    completed: AtomicUsize,
    finished: AtomicBool,
    total: usize,
    step: usize,
}

/// Consumer half, held by the presentation layer.
#[derive(Debug)]
pub struct ProgressReceiver {
    receiver: watch::Receiver<ProgressSnapshot>,
}

impl ProgressReporter {
    /// Create a connected reporter/receiver pair for a scan of `total` probes.
    pub fn channel(total: usize, stride: ProgressStride) -> (Arc<Self>, ProgressReceiver) {
        let (sender, receiver) = watch::channel(ProgressSnapshot {
            completed: 0,
            total,
            finished: false,
        });

        let reporter = Arc::new(Self {
            sender,
            completed: AtomicUsize::new(0),
            finished: AtomicBool::new(false),
            total,
            step: stride.step(total),
        });

        (reporter, ProgressReceiver { receiver })
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Record one finished probe, whatever its verdict.
    pub fn record(&self) {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;

        if completed >= self.total {
            self.finish();
        } else if completed % self.step == 0 {
            self.publish(completed, false);
        }
    }

    /// Publish the final snapshot if it has not been published yet.
    ///
    /// Called when the scan stream ends, so cancelled scans still close out
    /// their progress.
    pub fn finish(&self) {
        if self.finished.swap(true, Ordering::SeqCst) {
            return;
        }
        self.publish(self.completed(), true);
    }

    fn publish(&self, completed: usize, finished: bool) {
        // Stores the value even with no receiver attached and never blocks.
        // A finished snapshot is never replaced, and counts never go backwards.
        self.sender.send_if_modified(|current| {
            if current.finished || (!finished && completed <= current.completed) {
                return false;
            }
            *current = ProgressSnapshot {
                completed,
                total: self.total,
                finished,
            };
            true
        });
    }
}

impl ProgressReceiver {
    /// Wait for the next snapshot.
    ///
    /// Returns `None` once the reporter is gone and its last snapshot has
    /// been observed.
    pub async fn next(&mut self) -> Option<ProgressSnapshot> {
        self.receiver.changed().await.ok()?;
        Some(*self.receiver.borrow_and_update())
    }

    /// The most recent snapshot, without waiting.
    pub fn latest(&self) -> ProgressSnapshot {
        *self.receiver.borrow()
    }
}
