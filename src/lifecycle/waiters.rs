//! Counter of outstanding blocking work.
//!
//! The wait phase of the App only releases once every holder has let go.
//! Holding is RAII: dropping the [`WaiterGuard`] decrements the count.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Clone, Default)]
pub struct ActiveWaiters {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    count: AtomicUsize,
    notify: Notify,
}

impl ActiveWaiters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one outstanding waiter.
    pub fn hold(&self) -> WaiterGuard {
        self.inner.count.fetch_add(1, Ordering::SeqCst);
        WaiterGuard {
            inner: self.inner.clone(),
        }
    }

    pub fn count(&self) -> usize {
        self.inner.count.load(Ordering::SeqCst)
    }

    /// Waits until the count returns to zero.
    pub async fn drained(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Releases its hold on drop.
#[must_use = "dropping the guard releases the waiter immediately"]
pub struct WaiterGuard {
    inner: Arc<Inner>,
}

impl Drop for WaiterGuard {
    fn drop(&mut self) {
        if self.inner.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.notify.notify_waiters();
        }
    }
}
