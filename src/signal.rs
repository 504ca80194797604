//! Cooperative cancellation and Ctrl+C handling.
//!
//! A [`CancelToken`] wraps an `AtomicBool` that can be shared across threads.
//! The engine checks it between targets; [`install_handler`] wires it to
//! Ctrl+C so an interrupted preview or commit stops at the next boundary.
//!
//! # Usage
//!
//! ```rust,no_run
//! use cleanbit::signal::install_handler;
//!
//! let token = install_handler().expect("Failed to install signal handler");
//!
//! // Pass clones of the token to the engine, check it anywhere
//! if token.is_cancelled() {
//!     println!("Cancelled");
//! }
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Exit code for SIGINT (Ctrl+C) interruption.
/// This follows Unix convention: 128 + signal number (SIGINT = 2).
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Shared cancellation flag.
///
/// Cloning is cheap and every clone observes the same flag, so a token can
/// be cancelled from any thread while a run is in progress.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that is not cancelled.
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

    /// Clear the flag so the token can be reused for the next run.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// The underlying flag, for APIs that take an `Arc<AtomicBool>`.
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
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
/// Calling this more than once returns the same token, reset. If another
/// handler was registered elsewhere in the process (e.g. by a test harness),
/// an unhooked token is returned instead; it still works for manual
/// cancellation.
///
/// # Errors
///
/// Currently always succeeds; the `Result` leaves room for platforms where
/// installation must be reported.
pub fn install_handler() -> Result<CancelToken, SignalError> {
    if let Some(token) = GLOBAL_TOKEN.get() {
        token.reset();
        return Ok(token.clone());
    }

    let token = CancelToken::new();
    let flag = token.get_flag();

    match ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);

        let _ = writeln!(std::io::stderr(), "\nInterrupted. Finishing current item...");
        let _ = std::io::stderr().flush();

        log::info!("Cancellation requested by signal");
    }) {
        Ok(()) => {
            let _ = GLOBAL_TOKEN.set(token.clone());
            Ok(token)
        }
        Err(_) => {
            if let Some(token) = GLOBAL_TOKEN.get() {
                token.reset();
                Ok(token.clone())
            } else {
                log::debug!("Ctrl+C handler already registered, using unhooked token");
                let fallback = CancelToken::new();
                let _ = GLOBAL_TOKEN.set(fallback.clone());
                Ok(fallback)
            }
        }
    }
}
