//! Cancellation of blocked pulls.
//!
//! A [`CancelToken`] is handed to a pull by whoever owns the request (a
//! connection handler, a shutdown path). Cancelling it wakes every pull
//! currently waiting with that token; those pulls return an empty result
//! without moving any cursor.
//!
//! Tokens form a tree through [`CancelToken::child`]: cancelling a parent
//! cancels every child, while a child can be cancelled on its own. A
//! server hands each request a child of its shutdown token.

use crate::log::MessageLog;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// A cloneable, one-shot cancellation signal.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    /// Logs that pulls holding this token may be waiting on.
    logs: Mutex<Vec<Weak<MessageLog>>>,
    parent: Option<CancelToken>,
}

impl CancelToken {
    /// Creates a new, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token that is cancelled along with this one.
    ///
    /// Cancelling the child leaves this token untouched.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            inner: Arc::new(CancelInner {
                parent: Some(self.clone()),
                ..CancelInner::default()
            }),
        }
    }

    /// Cancels the token and wakes every pull waiting with it.
    ///
    /// Cancelling twice is a no-op.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        let logs = std::mem::take(&mut *self.inner.logs.lock());
        for log in logs.iter().filter_map(Weak::upgrade) {
            log.interrupt();
        }
    }

    /// Returns true once this token or any ancestor has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
            || self
                .inner
                .parent
                .as_ref()
                .is_some_and(CancelToken::is_cancelled)
    }

    /// Registers a log so that cancellation can wake waiters on it.
    ///
    /// The flag is set before the registry is drained, and waiters check
    /// the flag under the log lock, so a registration racing with
    /// `cancel` cannot miss the wakeup.
    pub(crate) fn register(&self, log: &Arc<MessageLog>) {
        let mut logs = self.inner.logs.lock();
        logs.retain(|w| w.strong_count() > 0);
        let target = Arc::downgrade(log);
        if !logs.iter().any(|w| w.ptr_eq(&target)) {
            logs.push(target);
        }
        drop(logs);

        if let Some(parent) = &self.inner.parent {
            parent.register(log);
        }
    }
}
