//! # Observability & Tracing
//!
//! Two layers are involved:
//!
//! - [`setup_tracing`] installs the global `tracing-subscriber` used by the whole
//!   process. Every module logs through `tracing` with structured fields
//!   (`service`, `phase`, `pid_file`, ...).
//! - [`LogSink`] is the pluggable sink for the App's own lifecycle messages
//!   ("App start...", "graceful shutdown...", finalize failures). The default
//!   [`TracingSink`] forwards into `tracing`; callers that own a different
//!   logging backend inject their own sink through
//!   [`AppConfig::with_sink`](crate::config::AppConfig::with_sink).
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run -- --cluster world100 --index 1
//! RUST_LOG=service_lifecycle=debug cargo run -- --cluster world100 --index 1
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Prefix carried by every lifecycle message routed through a [`LogSink`].
pub const LOG_PREFIX: &str = "[App] ";

/// Destination for the App's lifecycle messages.
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, message: &str);
}

/// Default sink: re-emits messages as `tracing` events. The subscriber
/// installed by [`setup_tracing`] adds timestamps.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::ERROR => tracing::error!(target: "app", "{message}"),
            Level::WARN => tracing::warn!(target: "app", "{message}"),
            Level::INFO => tracing::info!(target: "app", "{message}"),
            Level::DEBUG => tracing::debug!(target: "app", "{message}"),
            Level::TRACE => tracing::trace!(target: "app", "{message}"),
        }
    }
}

/// Adapts a closure into a [`LogSink`].
///
/// ```ignore
/// let sink = FnSink::new(|level, msg| eprintln!("{level} {msg}"));
/// ```
pub struct FnSink<F>(F);

impl<F> FnSink<F>
where
    F: Fn(Level, &str) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> LogSink for FnSink<F>
where
    F: Fn(Level, &str) + Send + Sync,
{
    fn log(&self, level: Level, message: &str) {
        (self.0)(level, message)
    }
}

/// Sink handle stored by the App; prepends [`LOG_PREFIX`].
#[derive(Clone)]
pub(crate) struct AppLogger {
    sink: Arc<dyn LogSink>,
}

impl AppLogger {
    pub(crate) fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    pub(crate) fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        self.sink.log(level, &format!("{LOG_PREFIX}{args}"));
    }

    pub(crate) fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::INFO, args)
    }

    pub(crate) fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::WARN, args)
    }

    pub(crate) fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::ERROR, args)
    }
}

impl Default for AppLogger {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

/// Initializes the global subscriber.
///
/// `default_filter` is used when `RUST_LOG` is unset. Calling this twice is
/// harmless: the second installation attempt is ignored.
pub fn setup_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .try_init();
}
