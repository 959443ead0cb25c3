//! Cancellation shared between the watch loop and whoever wants to stop it, typically a Ctrl-C handler.
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Cheap to clone; all clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag and wake up everyone sleeping on this token.
    pub fn cancel(&self) {
        let (_, condvar) = &*self.inner;
        *self.flag() = true;
        condvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.flag()
    }

    /// Sleep for `duration`, or less if the token gets cancelled meanwhile. Returns `true` if cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        let (_, condvar) = &*self.inner;
        let deadline = Instant::now() + duration;
        let mut cancelled = self.flag();
        while !*cancelled {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            cancelled = match condvar.wait_timeout(cancelled, remaining) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        *cancelled
    }

    // Nothing can panic while holding the lock, but a poisoned bool is still a valid bool.
    fn flag(&self) -> MutexGuard<'_, bool> {
        self.inner.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
