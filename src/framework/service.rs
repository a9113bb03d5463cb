//! # Service Capability Trait
//!
//! The [`Service`] trait is the only thing the orchestrator knows about a unit
//! of work. Every transport (TCP accept loop, HTTP server, a bag of closures)
//! implements the same four capabilities and the [`App`](crate::lifecycle::App)
//! drives them through the lifecycle:
//!
//! ```text
//! Unstarted --on_init--> Initialized --serve--> Serving --close--> Closing --on_fini--> Finalized
//! ```
//!
//! A service never moves itself between states; only the App calls these
//! methods, and it calls each of them at most once per service.
//!
//! ## Context Injection
//!
//! Dependencies are injected at `on_init` time through a [`ServiceContext`]
//! rather than at construction. This lets services be built before the
//! process identity (cluster, index) is known.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::framework::ServiceError;
use crate::lifecycle::{ActiveWaiters, Shutdown};

/// A pluggable unit of work managed by the [`App`](crate::lifecycle::App).
///
/// # Contract
///
/// - `on_init` performs one-time setup (binding sockets, registering handlers) and must not block.
/// - `serve` begins accepting work. Unbounded work must be moved onto its own task,
///   typically with [`ServiceContext::spawn`], so that `serve` returns promptly.
/// - `close` requests a graceful stop. It must be idempotent, must be safe to call when
///   `serve` never started meaningful work, and must unwind anything `serve` started.
/// - `on_fini` releases resources after `close`. Errors are logged by the App, never propagated.
///
/// Only `on_init` is required; the other capabilities default to no-ops.
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Name used in logs and errors. Defaults to the short type name.
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// One-time setup.
    async fn on_init(&mut self, ctx: &ServiceContext) -> Result<(), ServiceError>;

    /// Begin accepting work.
    async fn serve(&mut self) -> Result<(), ServiceError> {
        Ok(())
    }

    /// Request a graceful stop.
    async fn close(&mut self) {}

    /// Release resources after `close`.
    async fn on_fini(&mut self) -> Result<(), ServiceError> {
        Ok(())
    }
}

/// Strips module path and generic arguments, e.g.
/// `service_lifecycle::adapters::HookService<F>` becomes `HookService`.
pub(crate) fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Runtime context handed to every service in `on_init`.
///
/// Cloning is cheap; services usually keep a copy for use in `serve` and `close`.
#[derive(Clone)]
pub struct ServiceContext {
    cluster: Arc<str>,
    index: u32,
    process_name: Arc<str>,
    shutdown: Shutdown,
    waiters: ActiveWaiters,
}

impl ServiceContext {
    pub fn new(
        cluster: impl Into<Arc<str>>,
        index: u32,
        process_name: impl Into<Arc<str>>,
        shutdown: Shutdown,
        waiters: ActiveWaiters,
    ) -> Self {
        Self {
            cluster: cluster.into(),
            index,
            process_name: process_name.into(),
            shutdown,
            waiters,
        }
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    /// The process-wide shutdown signal.
    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Spawns a long-running task that counts as an active waiter.
    ///
    /// The App's wait phase does not release until every task spawned here
    /// has finished, so the future must terminate once the owning service is
    /// closed (or the shutdown signal fires).
    pub fn spawn<F>(&self, name: impl Into<String>, future: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), ServiceError>> + Send + 'static,
    {
        let guard = self.waiters.hold();
        let name = name.into();
        debug!(task = %name, "Spawning service task");
        tokio::spawn(async move {
            let _guard = guard;
            match future.await {
                Ok(()) => debug!(task = %name, "Service task finished"),
                Err(e) => warn!(task = %name, error = %e, "Service task failed"),
            }
        })
    }
}

impl fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContext")
            .field("cluster", &self.cluster)
            .field("index", &self.index)
            .field("process_name", &self.process_name)
            .field("shutdown_triggered", &self.shutdown.is_triggered())
            .field("active_waiters", &self.waiters.count())
            .finish()
    }
}
