//! # Lifecycle Errors
//!
//! Error types shared by the orchestrator, the configuration layer and every
//! service adapter. Keeping them in one place means a caller of
//! [`App::run`](crate::lifecycle::App::run) only ever matches on [`AppError`].

use std::net::SocketAddr;
use std::path::PathBuf;

/// Errors a [`Service`](crate::framework::Service) may report from `on_init`,
/// `serve` or `on_fini`.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A capability was used before `on_init` prepared the service.
    #[error("service not initialized: {0}")]
    NotInitialized(&'static str),
    #[error("{0}")]
    Custom(String),
}

impl From<String> for ServiceError {
    fn from(msg: String) -> Self {
        ServiceError::Custom(msg)
    }
}

impl From<&str> for ServiceError {
    fn from(msg: &str) -> Self {
        ServiceError::Custom(msg.to_string())
    }
}

/// Errors produced while assembling the startup parameters.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no cluster specified")]
    EmptyCluster,
    #[error("invalid instance index {0}: must be a positive integer")]
    InvalidIndex(i64),
    #[error("argument error: {0}")]
    Args(#[from] clap::Error),
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Errors surfaced by the orchestrator itself.
///
/// Only startup failures are reported here. Finalize-phase failures go to the
/// configured [`LogSink`](crate::lifecycle::LogSink) instead.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("service `{service}` failed to initialize: {source}")]
    ServiceInit {
        service: String,
        #[source]
        source: ServiceError,
    },
    #[error("service `{service}` failed to serve: {source}")]
    ServiceServe {
        service: String,
        #[source]
        source: ServiceError,
    },
    #[error("failed to build async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

impl AppError {
    /// Name of the service that caused the failure, if any.
    pub fn service(&self) -> Option<&str> {
        match self {
            AppError::ServiceInit { service, .. } | AppError::ServiceServe { service, .. } => {
                Some(service)
            }
            _ => None,
        }
    }
}
