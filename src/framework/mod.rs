//! Service abstraction.
//!
//! # Main Components
//!
//! - [`Service`] - the four-capability lifecycle trait every adapter implements
//! - [`ServiceContext`] - process identity and shutdown plumbing injected at `on_init`
//! - [`ServiceError`], [`ConfigError`], [`AppError`] - error types
//!
//! # Testing
//!
//! See [`mock`] for a recording service and a capturing log sink.

pub mod error;
pub mod mock;
pub mod service;

pub use error::{AppError, ConfigError, ServiceError};
pub use service::{Service, ServiceContext};
