//! Cancellation and deadlines.
//!
//! A `Context` is handed to every operation and passed through unchanged to
//! the driver. The layer never waits on it itself; drivers poll
//! [`Context::err`] before and during a backend call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::core::error::Error;

/// Carries the cancel flags it watches and an optional deadline.
#[derive(Debug, Clone, Default)]
pub struct Context {
    // Own flag last, preceded by those of cancellable ancestors.
    cancelled: Vec<Arc<AtomicBool>>,
    deadline: Option<Instant>,
}

/// Cancels the context that created it and every context derived from it.
/// Ancestors and siblings are unaffected.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Context::default()
    }

    /// Derives a cancellable context. It is also done once any ancestor is
    /// cancelled.
    pub fn with_cancel(&self) -> (Context, CancelHandle) {
        let flag = Arc::new(AtomicBool::new(false));
        let mut cancelled = self.cancelled.clone();
        cancelled.push(Arc::clone(&flag));
        let ctx = Context {
            cancelled,
            deadline: self.deadline,
        };
        (ctx, CancelHandle { flag })
    }

    /// Derives a context whose deadline is the earlier of the parent's and
    /// `deadline`.
    pub fn with_deadline(&self, deadline: Instant) -> Context {
        let deadline = match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        };
        Context {
            cancelled: self.cancelled.clone(),
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(&self, timeout: Duration) -> Context {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns why the context is done, or `None` while it is still live.
    pub fn err(&self) -> Option<Error> {
        if self.cancelled.iter().any(|flag| flag.load(Ordering::SeqCst)) {
            return Some(Error::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Error::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }
}
