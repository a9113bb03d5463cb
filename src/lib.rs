//! # Service Lifecycle
//!
//! > **Coordinated startup and graceful shutdown for long-running processes.**
//!
//! This crate turns an arbitrary set of independently initializable services
//! into a single process: ordered startup with first-failure-aborts semantics,
//! a blocking wait until SIGINT/SIGTERM (or a programmatic request), a single
//! shutdown broadcast, reverse-order teardown, and a pid marker for external
//! tooling.
//!
//! ## Core Concepts
//!
//! Every unit of work implements [`Service`](framework::Service):
//!
//! | Capability | Phase    | Order   | On error                  |
//! |------------|----------|---------|---------------------------|
//! | `on_init`  | init     | forward | `run` returns it          |
//! | `serve`    | serve    | forward | `run` returns it          |
//! | `close`    | finalize | reverse | n/a (idempotent)          |
//! | `on_fini`  | finalize | reverse | logged through the sink   |
//!
//! The [`App`](lifecycle::App) owns the shutdown signal and the service list,
//! and guarantees each phase runs once. A failed service aborts the process
//! rather than being restarted.
//!
//! ## Module Tour
//!
//! ### 1. The Contract ([`framework`])
//! - **Key items**: [`Service`](framework::Service), [`ServiceContext`](framework::ServiceContext),
//!   [`AppError`](framework::AppError).
//!
//! ### 2. The Orchestrator ([`lifecycle`])
//! - **Key items**: [`App`](lifecycle::App), [`Shutdown`](lifecycle::Shutdown),
//!   [`PidFile`](lifecycle::PidFile), [`LogSink`](lifecycle::LogSink).
//!
//! ### 3. Startup Parameters ([`config`])
//! - **Key items**: [`AppConfig`](config::AppConfig), [`ArgsParser`](config::ArgsParser).
//!
//! ### 4. Transports ([`adapters`])
//! - **Key items**: [`HookService`](adapters::HookService), [`TcpService`](adapters::TcpService),
//!   [`HttpService`](adapters::HttpService).
//!
//! ## Quick Start
//!
//! ```ignore
//! let args = ArgsParser::new("gate").parse()?;
//! let mut app = App::new();
//! app.init(AppConfig::from_args(&args)?)?;
//! app.register(HookService::new("db", |ctx| connect(ctx.cluster())));
//! app.run(Vec::new()).await?;
//! ```
//!
//! ```bash
//! RUST_LOG=info cargo run -- --cluster world100 --index 1
//! ```

pub mod adapters;
pub mod config;
pub mod framework;
pub mod lifecycle;

pub use config::AppConfig;
pub use framework::{AppError, Service, ServiceContext, ServiceError};
pub use lifecycle::App;
