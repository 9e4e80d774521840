//! Progress reporting for resolution runs.
//!
//! The resolver reports through [`ProgressCallback`]: the candidate bucket
//! count once up front, then the cumulative number of finished buckets after
//! each bucket completes. Callbacks fire on the worker, so anything driving a
//! UI should hop to its own thread. [`ChannelProgress`] does exactly that by
//! forwarding [`ProgressEvent`]s over a bounded channel.
//!
//! Implementations in this module:
//! - [`Progress`]: an indicatif bar for the terminal
//! - [`ChannelProgress`]: forwards events to another thread
//! - [`FnProgress`]: wraps a plain `(done, total)` closure

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use indicatif::{ProgressBar, ProgressStyle};

/// Receives progress from a resolution run.
pub trait ProgressCallback: Send + Sync {
    /// Called once before any bucket starts, with the candidate bucket count.
    fn on_total(&self, total: usize);

    /// Called after each bucket finishes with the cumulative finished count.
    ///
    /// Values never decrease.
    fn on_progress(&self, done: usize);

    /// Called when a bucket resolves, before its `on_progress`.
    fn on_resolved(&self, _size: u64, _prefix_len: u64) {}

    /// Called once when the run ends.
    fn on_finish(&self, _cancelled: bool) {}
}

/// Sink that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_total(&self, _total: usize) {}
    fn on_progress(&self, _done: usize) {}
}

/// Terminal progress bar.
pub struct Progress {
    bar: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Examples
    ///
    /// ```
    /// use checksize::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            quiet,
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} buckets ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(bar) = guard.as_ref() {
                f(bar);
            }
        }
    }
}

impl ProgressCallback for Progress {
    fn on_total(&self, total: usize) {
        if self.quiet {
            return;
        }
        let bar = ProgressBar::new(total as u64);
        bar.set_style(Self::style());
        bar.set_message("Resolving");
        if let Ok(mut guard) = self.bar.lock() {
            *guard = Some(bar);
        }
    }

    fn on_progress(&self, done: usize) {
        self.with_bar(|bar| bar.set_position(done as u64));
    }

    fn on_resolved(&self, size: u64, prefix_len: u64) {
        self.with_bar(|bar| bar.set_message(format!("{size} B -> {prefix_len} B")));
    }

    fn on_finish(&self, cancelled: bool) {
        let Ok(mut guard) = self.bar.lock() else {
            return;
        };
        if let Some(bar) = guard.take() {
            if cancelled {
                bar.abandon_with_message("Cancelled");
            } else {
                bar.finish_with_message("Resolution complete");
            }
        }
    }
}

/// One progress notification, as sent over a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Candidate bucket count
    Total(usize),
    /// Cumulative finished bucket count
    Progress(usize),
    /// A bucket became distinguishable at `prefix_len`
    Resolved {
        /// Bucket file size
        size: u64,
        /// Minimal sufficient prefix length
        prefix_len: u64,
    },
    /// The run ended
    Finished {
        /// Whether the run stopped early
        cancelled: bool,
    },
}

/// Forwards progress to a bounded channel.
///
/// No call ever blocks. Intermediate events are dropped once only one free
/// slot is left, so that slot is always there for `Finished` even when
/// nobody drains the channel. The next `Progress` carries the cumulative
/// count, so a slow consumer loses granularity and nothing else.
///
/// The reserved slot assumes a single producer; clones share the channel
/// and may take it from each other.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    sender: Sender<ProgressEvent>,
}

impl ChannelProgress {
    /// Create a sink and the receiver that drains it.
    #[must_use]
    pub fn bounded(capacity: usize) -> (Self, Receiver<ProgressEvent>) {
        let (sender, receiver) = crossbeam_channel::bounded(capacity.max(2));
        (Self { sender }, receiver)
    }

    /// Room left after this send, keeping one slot for `Finished`.
    fn has_spare_slot(&self) -> bool {
        self.sender
            .capacity()
            .map_or(true, |capacity| self.sender.len() + 1 < capacity)
    }

    fn send_lossy(&self, event: ProgressEvent) {
        if !self.has_spare_slot() {
            log::trace!("Progress channel nearly full, dropping {:?}", event);
            return;
        }
        self.send_now(event);
    }

    fn send_now(&self, event: ProgressEvent) {
        match self.sender.try_send(event) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(_)) => {
                log::trace!("Progress channel full, dropping {:?}", event);
            }
        }
    }
}

impl ProgressCallback for ChannelProgress {
    fn on_total(&self, total: usize) {
        self.send_now(ProgressEvent::Total(total));
    }

    fn on_progress(&self, done: usize) {
        self.send_lossy(ProgressEvent::Progress(done));
    }

    fn on_resolved(&self, size: u64, prefix_len: u64) {
        self.send_lossy(ProgressEvent::Resolved { size, prefix_len });
    }

    fn on_finish(&self, cancelled: bool) {
        self.send_now(ProgressEvent::Finished { cancelled });
    }
}

/// Adapts a `(done, total)` closure.
pub struct FnProgress<F> {
    callback: F,
    total: AtomicUsize,
}

impl<F> FnProgress<F>
where
    F: Fn(usize, usize) + Send + Sync,
{
    /// Wrap `callback`. It is called with `(0, total)` first.
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            total: AtomicUsize::new(0),
        }
    }
}

impl<F> ProgressCallback for FnProgress<F>
where
    F: Fn(usize, usize) + Send + Sync,
{
    fn on_total(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
        (self.callback)(0, total);
    }

    fn on_progress(&self, done: usize) {
        (self.callback)(done, self.total.load(Ordering::SeqCst));
    }
}
