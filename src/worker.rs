//! Background resolution.
//!
//! [`spawn_resolution`] moves a resolution run onto a dedicated, named
//! thread. The caller keeps a [`ResolutionHandle`] holding three things: the
//! cancellation token shared with the run, the receiving end of a bounded
//! progress channel, and the join handle for the final [`Resolution`].
//!
//! The presentation side drains the channel on its own thread (see
//! [`ResolutionHandle::drain_into`]), so a slow terminal never holds up the
//! digest loop.
//!
//! # Example
//!
//! ```no_run
//! use checksize::progress::Progress;
//! use checksize::scanner::{Blake3Prefix, FileRecord};
//! use checksize::uniqueness::{ResolverConfig, SizeBucketStore};
//! use checksize::worker::spawn_resolution;
//! use std::sync::Arc;
//!
//! let store: SizeBucketStore = vec![FileRecord::new("a", 10), FileRecord::new("b", 10)]
//!     .into_iter()
//!     .collect();
//!
//! let handle = spawn_resolution(
//!     Arc::new(store),
//!     Arc::new(Blake3Prefix::new()),
//!     ResolverConfig::default(),
//! )
//! .unwrap();
//!
//! handle.drain_into(&Progress::new(false));
//! let resolution = handle.join().unwrap();
//! ```

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;

use crate::progress::{ChannelProgress, ProgressCallback, ProgressEvent};
use crate::scanner::PrefixChecksum;
use crate::signal::CancelToken;
use crate::uniqueness::{Resolution, ResolveError, ResolverConfig, SizeBucketStore, UniquenessResolver};

/// Capacity of the worker's progress channel.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 256;

const WORKER_THREAD_NAME: &str = "checksize-resolver";

/// A resolution running on a background thread.
pub struct ResolutionHandle {
    cancel: CancelToken,
    events: Receiver<ProgressEvent>,
    thread: JoinHandle<Result<Resolution, ResolveError>>,
}

impl ResolutionHandle {
    /// Token shared with the running resolver.
    #[must_use]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Ask the worker to stop at its next poll.
    pub fn cancel(&self) {
        log::debug!("Cancelling background resolution");
        self.cancel.cancel();
    }

    /// Progress events. The channel closes when the worker returns.
    #[must_use]
    pub fn events(&self) -> &Receiver<ProgressEvent> {
        &self.events
    }

    /// Whether the worker thread has returned.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Replay every event into `sink` until the worker closes the channel.
    ///
    /// Blocks the calling thread.
    pub fn drain_into(&self, sink: &dyn ProgressCallback) {
        for event in self.events.iter() {
            match event {
                ProgressEvent::Total(total) => sink.on_total(total),
                ProgressEvent::Progress(done) => sink.on_progress(done),
                ProgressEvent::Resolved { size, prefix_len } => sink.on_resolved(size, prefix_len),
                ProgressEvent::Finished { cancelled } => sink.on_finish(cancelled),
            }
        }
    }

    /// Wait for the worker and take its result.
    ///
    /// Undrained events are discarded. Call [`drain_into`](Self::drain_into)
    /// first to observe them.
    ///
    /// # Errors
    ///
    /// Returns whatever the resolver returned, or
    /// [`ResolveError::WorkerPanicked`] if the thread panicked.
    pub fn join(self) -> Result<Resolution, ResolveError> {
        let Self { events, thread, .. } = self;
        drop(events);
        thread.join().map_err(|_| ResolveError::WorkerPanicked)?
    }
}

impl std::fmt::Debug for ResolutionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionHandle")
            .field("cancel", &self.cancel)
            .field("pending_events", &self.events.len())
            .field("finished", &self.thread.is_finished())
            .finish()
    }
}

/// Sends each callback to every inner sink in turn.
struct Fanout(Vec<Arc<dyn ProgressCallback>>);

impl ProgressCallback for Fanout {
    fn on_total(&self, total: usize) {
        self.0.iter().for_each(|sink| sink.on_total(total));
    }

    fn on_progress(&self, done: usize) {
        self.0.iter().for_each(|sink| sink.on_progress(done));
    }

    fn on_resolved(&self, size: u64, prefix_len: u64) {
        self.0.iter().for_each(|sink| sink.on_resolved(size, prefix_len));
    }

    fn on_finish(&self, cancelled: bool) {
        self.0.iter().for_each(|sink| sink.on_finish(cancelled));
    }
}

/// Start resolving `store` on a background thread.
///
/// The run uses `config.cancel` if set, otherwise a fresh token; either way
/// the handle exposes it. A progress callback already present in `config`
/// keeps receiving events on the worker thread alongside the channel.
///
/// # Errors
///
/// Returns [`ResolveError::WorkerSpawn`] if the OS refuses the thread.
pub fn spawn_resolution(
    store: Arc<SizeBucketStore>,
    checksum: Arc<dyn PrefixChecksum>,
    config: ResolverConfig,
) -> Result<ResolutionHandle, ResolveError> {
    let cancel = config.cancel.clone().unwrap_or_default();
    let (channel, events) = ChannelProgress::bounded(PROGRESS_CHANNEL_CAPACITY);

    let progress: Arc<dyn ProgressCallback> = match config.progress_callback.clone() {
        Some(existing) => Arc::new(Fanout(vec![existing, Arc::new(channel)])),
        None => Arc::new(channel),
    };
    let config = config
        .with_cancel_token(cancel.clone())
        .with_progress_callback(progress);

    log::debug!(
        "Spawning resolution worker for {} buckets ({} I/O threads)",
        store.bucket_count(),
        config.io_threads
    );

    let thread = thread::Builder::new()
        .name(WORKER_THREAD_NAME.to_owned())
        .spawn(move || UniquenessResolver::new(checksum, config).resolve(&store))
        .map_err(ResolveError::WorkerSpawn)?;

    Ok(ResolutionHandle {
        cancel,
        events,
        thread,
    })
}
