//! Process-wide cancellation flag.
//!
//! Set by the Ctrl-C handler and polled by the copy/move progress callback
//! between entries. Relaxed atomics are enough for a one-way stop flag.

use std::sync::atomic::{AtomicBool, Ordering};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Request a cooperative shutdown (idempotent).
#[inline]
pub fn request() {
    SHUTDOWN.store(true, Ordering::Relaxed);
}

#[inline]
pub fn is_requested() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

/// Test-only: clear the shutdown flag.
#[cfg(any(test, feature = "test-helpers"))]
#[inline]
pub fn reset() {
    SHUTDOWN.store(false, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_then_reset() {
        reset();
        assert!(!is_requested());
        request();
        request();
        assert!(is_requested());
        reset();
        assert!(!is_requested());
    }
}
