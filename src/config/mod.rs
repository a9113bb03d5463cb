//! Configuration layer.
//!
//! # Data Flow
//! ```text
//! command line (args.rs)  ──┐
//!                           ├─→ AppConfig (builder setters) → validate() → App::init
//! settings file (settings.rs)┘
//! ```
//!
//! Cluster and index are required and validated before any service is touched.
//! Everything else has a documented default.

pub mod args;
pub mod settings;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::framework::ConfigError;
use crate::lifecycle::{LogSink, TracingSink};

pub use args::{ArgSpec, ArgsParser, ParsedArgs};
pub use settings::Settings;

/// Startup parameters for an [`App`](crate::lifecycle::App).
#[derive(Clone)]
pub struct AppConfig {
    /// Cluster identifier. Required, non-empty.
    pub cluster: Option<String>,
    /// Instance index within the cluster. Required, positive.
    pub index: Option<i64>,
    /// Directory holding the pid marker. Default: the OS temp dir.
    pub pid_dir: PathBuf,
    /// Install SIGINT/SIGTERM handlers during the wait phase. Default: `true`.
    pub handle_signals: bool,
    /// Worker threads for [`App::run_blocking`](crate::lifecycle::App::run_blocking).
    /// Default: tokio's choice.
    pub worker_threads: Option<usize>,
    /// `EnvFilter` directive used when `RUST_LOG` is unset. Default: `info`.
    pub log_filter: String,
    /// Overrides the executable base name used for the process name.
    pub process_base: Option<String>,
    /// Sink for lifecycle messages. Default: [`TracingSink`].
    pub sink: Arc<dyn LogSink>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cluster: None,
            index: None,
            pid_dir: std::env::temp_dir(),
            handle_signals: true,
            worker_threads: None,
            log_filter: "info".to_string(),
            process_base: None,
            sink: Arc::new(TracingSink),
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a config from parsed command-line arguments, applying the
    /// settings file first when `--config` was given.
    pub fn from_args(args: &ParsedArgs) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = args.settings_path() {
            config = Settings::load(path)?.apply(config);
        }
        if let Some(cluster) = args.cluster() {
            config.cluster = Some(cluster.to_string());
        }
        if let Some(index) = args.index() {
            config.index = Some(index);
        }
        Ok(config)
    }

    pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = Some(cluster.into());
        self
    }

    pub fn with_index(mut self, index: i64) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_pid_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.pid_dir = dir.into();
        self
    }

    pub fn with_signal_handling(mut self, enable: bool) -> Self {
        self.handle_signals = enable;
        self
    }

    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }

    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    pub fn with_process_base(mut self, base: impl Into<String>) -> Self {
        self.process_base = Some(base.into());
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Checks the required parameters and returns them as `(cluster, index)`.
    ///
    /// The cluster is returned exactly as supplied; only the empty string is rejected.
    pub fn validate(&self) -> Result<(String, u32), ConfigError> {
        let cluster = match self.cluster.as_deref() {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => return Err(ConfigError::EmptyCluster),
        };
        let raw = self.index.unwrap_or(0);
        let index = match u32::try_from(raw) {
            Ok(i) if i > 0 => i,
            _ => return Err(ConfigError::InvalidIndex(raw)),
        };
        Ok((cluster, index))
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("cluster", &self.cluster)
            .field("index", &self.index)
            .field("pid_dir", &self.pid_dir)
            .field("handle_signals", &self.handle_signals)
            .field("worker_threads", &self.worker_threads)
            .field("log_filter", &self.log_filter)
            .field("process_base", &self.process_base)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_valid_pairs() {
        for (cluster, index) in [("world100", 1), ("c", 7), ("eu-west", 65_535)] {
            let config = AppConfig::new().with_cluster(cluster).with_index(index);
            let (c, i) = config.validate().unwrap();
            assert_eq!(c, cluster);
            assert_eq!(i as i64, index);
        }
    }

    #[test]
    fn test_validate_rejects_missing_or_empty_cluster() {
        let missing = AppConfig::new().with_index(1);
        assert!(matches!(missing.validate(), Err(ConfigError::EmptyCluster)));

        let empty = AppConfig::new().with_cluster("").with_index(1);
        assert!(matches!(empty.validate(), Err(ConfigError::EmptyCluster)));
    }

    #[test]
    fn test_validate_keeps_cluster_verbatim() {
        for cluster in [" world100 ", "  ", "\tedge"] {
            let config = AppConfig::new().with_cluster(cluster).with_index(1);
            assert_eq!(config.validate().unwrap().0, cluster);
        }
    }

    #[test]
    fn test_validate_rejects_non_positive_index() {
        for index in [0, -1, -100, i64::from(u32::MAX) + 1] {
            let config = AppConfig::new().with_cluster("world").with_index(index);
            match config.validate() {
                Err(ConfigError::InvalidIndex(i)) => assert_eq!(i, index),
                other => panic!("expected InvalidIndex, got {other:?}"),
            }
        }
        let missing = AppConfig::new().with_cluster("world");
        assert!(matches!(missing.validate(), Err(ConfigError::InvalidIndex(0))));
    }
}
