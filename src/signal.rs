//! Cooperative cancellation and Ctrl+C handling.
//!
//! A [`CancelToken`] wraps an `AtomicBool` that workers poll at safe points.
//! The walker checks it between directory entries and the resolver checks it
//! before every bucket and every schedule step. Nothing is ever interrupted
//! mid-read; cancellation only stops work from being started.
//!
//! # Usage
//!
//! ```rust,no_run
//! use checksize::signal::install_handler;
//!
//! let token = install_handler().expect("Failed to install signal handler");
//!
//! // Hand a clone to the worker; Ctrl+C trips both.
//! let worker_token = token.clone();
//! std::thread::spawn(move || {
//!     while !worker_token.is_cancelled() {
//!         // ... one unit of work ...
//!     }
//! });
//! ```
//!
//! # Exit Codes
//!
//! When Ctrl+C is received the token is cancelled, a short notice is printed
//! to stderr, and the binary exits with code 130 (128 + SIGINT) once the
//! worker has returned its partial result.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Exit code for SIGINT (Ctrl+C) interruption.
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Shared cancel-requested flag.
///
/// Cloning shares the flag, so cancelling any clone is observed by all.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token with no cancellation requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clear a previous request so the token can drive a fresh run.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// A polling predicate suitable for `should_cancel` parameters.
    pub fn as_predicate(&self) -> impl Fn() -> bool + Send + Sync + 'static {
        let flag = Arc::clone(&self.flag);
        move || flag.load(Ordering::SeqCst)
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_TOKEN: OnceLock<CancelToken> = OnceLock::new();

/// Install a Ctrl+C handler that cancels the returned token.
///
/// The OS handler can only be registered once per process. Later calls reset
/// and return the token registered first, so repeated `run_app` calls in
/// tests keep working.
///
/// # Errors
///
/// Returns [`SignalError`] only if the handler cannot be registered and no
/// token has been registered before.
pub fn install_handler() -> Result<CancelToken, SignalError> {
    if let Some(token) = GLOBAL_TOKEN.get() {
        token.reset();
        return Ok(token.clone());
    }

    let token = CancelToken::new();
    let handler_token = token.clone();

    ctrlc::set_handler(move || {
        handler_token.cancel();
        let _ = writeln!(std::io::stderr(), "\nInterrupted. Finishing current bucket...");
        let _ = std::io::stderr().flush();
        log::info!("Cancellation signal received");
    })?;

    let _ = GLOBAL_TOKEN.set(token.clone());
    Ok(token)
}

/// Whether Ctrl+C was pressed since the handler was last installed.
#[must_use]
pub fn interrupted() -> bool {
    GLOBAL_TOKEN.get().is_some_and(CancelToken::is_cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_new_is_not_cancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_cancel_and_reset() {
        let token = CancelToken::new();
        token.cancel();
        assert!(token.is_cancelled());

        token.reset();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_clone_shares_flag() {
        let token = CancelToken::new();
        let cloned = token.clone();

        token.cancel();
        assert!(cloned.is_cancelled());
    }

    #[test]
    fn test_predicate_tracks_token() {
        let token = CancelToken::new();
        let should_cancel = token.as_predicate();

        assert!(!should_cancel());
        token.cancel();
        assert!(should_cancel());
    }

    #[test]
    fn test_exit_code_interrupted() {
        assert_eq!(EXIT_CODE_INTERRUPTED, 130);
    }

    #[test]
    fn test_token_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CancelToken>();
    }
}
