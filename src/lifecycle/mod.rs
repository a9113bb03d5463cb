//! # Process Lifecycle & Orchestration
//!
//! This module turns a set of [`Service`](crate::framework::Service)s into one
//! long-running process with coordinated startup and graceful shutdown.
//!
//! ## Phases
//!
//! ```text
//! init (forward) → serve (forward) → write pid → wait ──signal──▶ close (reverse)
//!                                                                  → drain waiters
//!                                                                  → fini (reverse)
//!                                                                  → remove pid
//! ```
//!
//! A service registered later may depend on one registered earlier, so it is
//! torn down first.
//!
//! ## Pieces
//!
//! - [`App`] - the orchestrator.
//! - [`Shutdown`] - one-shot broadcast; the only cancellation primitive.
//! - [`ActiveWaiters`] - counts outstanding blocking work; the wait phase releases at zero.
//! - [`spawn_signal_listener`] - SIGINT/SIGTERM bridge.
//! - [`PidFile`] - pid marker at `<dir>/<process name>.pid`.
//! - [`LogSink`] / [`setup_tracing`] - lifecycle messages and the global subscriber.
//!
//! ## No Timeouts
//!
//! Shutdown waits indefinitely for services to close and finalize. A service
//! whose spawned task never ends keeps the process alive.

pub mod app;
pub mod pid;
pub mod shutdown;
pub mod signals;
pub mod tracing;
pub mod waiters;

pub use app::{process_name_for, App};
pub use pid::PidFile;
pub use shutdown::{Shutdown, ShutdownReason};
pub use signals::spawn_signal_listener;
pub use self::tracing::{setup_tracing, FnSink, LogSink, TracingSink, LOG_PREFIX};
pub use waiters::{ActiveWaiters, WaiterGuard};
