//! One-shot process-wide shutdown broadcast.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tracing::{debug, info};

/// Why shutdown was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT / Ctrl+C.
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// Requested programmatically through [`Shutdown::trigger`].
    Requested,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Interrupt => write!(f, "interrupt"),
            ShutdownReason::Terminate => write!(f, "terminate"),
            ShutdownReason::Requested => write!(f, "requested"),
        }
    }
}

/// The cancellation signal.
///
/// Transitions exactly once from open to fired. Every clone observes the same
/// state. Firing a second time is a no-op, so concurrent delivery of several
/// stop signals is harmless.
#[derive(Clone, Default)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    fired: AtomicBool,
    reason: Mutex<Option<ShutdownReason>>,
    notify: Notify,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the signal. Returns `true` only for the call that actually fired it.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        // The reason is stored before the flag flips, under the same lock, so
        // anyone observing `is_triggered()` also sees the reason.
        {
            let mut guard = self
                .inner
                .reason
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if self.inner.fired.load(Ordering::SeqCst) {
                debug!(%reason, "Duplicate shutdown request ignored");
                return false;
            }
            *guard = Some(reason);
            self.inner.fired.store(true, Ordering::SeqCst);
        }
        info!(%reason, "Shutdown triggered");
        self.inner.notify.notify_waiters();
        true
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.fired.load(Ordering::SeqCst)
    }

    /// The reason recorded by the first `trigger`, if it has fired.
    pub fn reason(&self) -> Option<ShutdownReason> {
        *self
            .inner
            .reason
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Waits until the signal fires. Returns immediately if it already has.
    pub async fn wait(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Register interest before checking the flag so a trigger racing with
        // this call cannot be missed.
        notified.as_mut().enable();
        if self.is_triggered() {
            return;
        }
        notified.await;
    }
}

impl fmt::Debug for Shutdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shutdown")
            .field("fired", &self.is_triggered())
            .field("reason", &self.reason())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_once() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_triggered());
        assert_eq!(shutdown.reason(), None);

        assert!(shutdown.trigger(ShutdownReason::Interrupt));
        assert!(!shutdown.trigger(ShutdownReason::Terminate));

        assert!(shutdown.is_triggered());
        assert_eq!(shutdown.reason(), Some(ShutdownReason::Interrupt));

        // Already fired: returns immediately
        shutdown.wait().await;
    }

    #[tokio::test]
    async fn test_wait_released_by_clone() {
        let shutdown = Shutdown::new();
        let waiter = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { shutdown.wait().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        shutdown.clone().trigger(ShutdownReason::Requested);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should be released")
            .unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_triggers_fire_once() {
        let shutdown = Shutdown::new();
        let mut handles = Vec::new();
        for i in 0..16 {
            let shutdown = shutdown.clone();
            let reason = if i % 2 == 0 {
                ShutdownReason::Interrupt
            } else {
                ShutdownReason::Terminate
            };
            handles.push(tokio::spawn(async move { shutdown.trigger(reason) }));
        }

        let mut fired = 0;
        for handle in handles {
            if handle.await.unwrap() {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_released_waiters_always_see_a_reason() {
        for _ in 0..200 {
            let shutdown = Shutdown::new();
            let observers: Vec<_> = (0..4)
                .map(|_| {
                    let shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        shutdown.wait().await;
                        shutdown.reason()
                    })
                })
                .collect();

            let trigger = {
                let shutdown = shutdown.clone();
                tokio::spawn(async move { shutdown.trigger(ShutdownReason::Terminate) })
            };
            assert!(shutdown.trigger(ShutdownReason::Interrupt) ^ trigger.await.unwrap());

            for observer in observers {
                assert!(observer.await.unwrap().is_some());
            }
        }
    }
}
