//! # Mock Services
//!
//! Utilities for testing the orchestrator without real transports.
//!
//! [`RecordingService`] writes every lifecycle call it receives into a shared
//! [`CallLog`], and can be scripted to fail a phase, to block in `serve`
//! until closed, or to request shutdown itself. [`CapturingSink`] records the
//! App's lifecycle messages.
//!
//! # Example
//! ```ignore
//! let log = CallLog::new();
//! let a = RecordingService::new("a", &log);
//! let b = RecordingService::new("b", &log).fail_init("boom");
//!
//! let err = app.run(vec![Box::new(a), Box::new(b)]).await.unwrap_err();
//! assert_eq!(log.services_for(CallKind::Init), ["a", "b"]);
//! assert!(log.services_for(CallKind::Fini).is_empty());
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::Level;

use crate::framework::{Service, ServiceContext, ServiceError};
use crate::lifecycle::{LogSink, ShutdownReason};

/// Which capability was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Init,
    Serve,
    Close,
    Fini,
}

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub kind: CallKind,
    pub service: String,
}

/// Shared, ordered journal of lifecycle calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, kind: CallKind, service: &str) {
        self.calls.lock().unwrap().push(Call {
            kind,
            service: service.to_string(),
        });
    }

    /// Every call, in the order received.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Names of the services that received `kind`, in call order.
    pub fn services_for(&self, kind: CallKind) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.service.clone())
            .collect()
    }

    pub fn count(&self, kind: CallKind, service: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.kind == kind && c.service == service)
            .count()
    }

    /// Position of the first matching call.
    pub fn position(&self, kind: CallKind, service: &str) -> Option<usize> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .position(|c| c.kind == kind && c.service == service)
    }
}

/// A scriptable service that records its lifecycle.
pub struct RecordingService {
    name: String,
    log: CallLog,
    fail_init: Option<String>,
    fail_serve: Option<String>,
    fail_fini: Option<String>,
    blocking: bool,
    shutdown_on_serve: bool,
    ctx: Option<ServiceContext>,
    stop: Option<oneshot::Sender<()>>,
}

impl RecordingService {
    pub fn new(name: impl Into<String>, log: &CallLog) -> Self {
        Self {
            name: name.into(),
            log: log.clone(),
            fail_init: None,
            fail_serve: None,
            fail_fini: None,
            blocking: false,
            shutdown_on_serve: false,
            ctx: None,
            stop: None,
        }
    }

    /// `on_init` returns this error.
    pub fn fail_init(mut self, msg: impl Into<String>) -> Self {
        self.fail_init = Some(msg.into());
        self
    }

    /// `serve` returns this error.
    pub fn fail_serve(mut self, msg: impl Into<String>) -> Self {
        self.fail_serve = Some(msg.into());
        self
    }

    /// `on_fini` returns this error.
    pub fn fail_fini(mut self, msg: impl Into<String>) -> Self {
        self.fail_fini = Some(msg.into());
        self
    }

    /// `serve` spawns a task that only ends when `close` is called.
    pub fn blocking(mut self) -> Self {
        self.blocking = true;
        self
    }

    /// `serve` requests shutdown as soon as it runs.
    pub fn shutdown_on_serve(mut self) -> Self {
        self.shutdown_on_serve = true;
        self
    }
}

#[async_trait]
impl Service for RecordingService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_init(&mut self, ctx: &ServiceContext) -> Result<(), ServiceError> {
        self.log.record(CallKind::Init, &self.name);
        if let Some(msg) = &self.fail_init {
            return Err(ServiceError::Custom(msg.clone()));
        }
        self.ctx = Some(ctx.clone());
        Ok(())
    }

    async fn serve(&mut self) -> Result<(), ServiceError> {
        self.log.record(CallKind::Serve, &self.name);
        if let Some(msg) = &self.fail_serve {
            return Err(ServiceError::Custom(msg.clone()));
        }
        let ctx = self
            .ctx
            .as_ref()
            .ok_or(ServiceError::NotInitialized("serve before on_init"))?;

        if self.blocking {
            let (tx, rx) = oneshot::channel();
            self.stop = Some(tx);
            ctx.spawn(format!("{}-serve", self.name), async move {
                let _ = rx.await;
                Ok(())
            });
        }
        if self.shutdown_on_serve {
            ctx.shutdown().trigger(ShutdownReason::Requested);
        }
        Ok(())
    }

    async fn close(&mut self) {
        self.log.record(CallKind::Close, &self.name);
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }

    async fn on_fini(&mut self) -> Result<(), ServiceError> {
        self.log.record(CallKind::Fini, &self.name);
        match &self.fail_fini {
            Some(msg) => Err(ServiceError::Custom(msg.clone())),
            None => Ok(()),
        }
    }
}

/// A [`LogSink`] that keeps every message.
#[derive(Debug, Clone, Default)]
pub struct CapturingSink {
    messages: Arc<Mutex<Vec<(Level, String)>>>,
}

impl CapturingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(Level, String)> {
        self.messages.lock().unwrap().clone()
    }

    /// Whether any message at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }
}

impl LogSink for CapturingSink {
    fn log(&self, level: Level, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((level, message.to_string()));
    }
}
