//! Cooperative cancellation for the streaming loop.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag checked by the receive loop between socket reads.
///
/// Clones observe the same flag, so a handler holding one clone can stop a
/// stream owned elsewhere. Cancelling is sticky.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Reports whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Cancels `token` on SIGINT or SIGTERM.
///
/// A second signal after cancellation terminates the process immediately, so
/// an operator can still leave a blocked prompt.
#[cfg(unix)]
pub(crate) fn install_signal_handlers(token: &CancellationToken) -> io::Result<()> {
    use signal_hook::consts::signal::{SIGINT, SIGTERM};
    use signal_hook::flag;

    for signal in [SIGINT, SIGTERM] {
        flag::register_conditional_shutdown(signal, 130, Arc::clone(&token.cancelled))?;
        flag::register(signal, Arc::clone(&token.cancelled))?;
    }
    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn install_signal_handlers(_token: &CancellationToken) -> io::Result<()> {
    Ok(())
}
