//! Optional TOML settings file.
//!
//! ```toml
//! pid_dir = "/var/run/gate"
//! handle_signals = true
//! worker_threads = 4
//! log_filter = "info,service_lifecycle=debug"
//! ```
//!
//! Every key is optional. Cluster and index may also be given here, but the
//! command line wins.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::AppConfig;
use crate::framework::ConfigError;

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub cluster: Option<String>,
    pub index: Option<i64>,
    pub pid_dir: Option<PathBuf>,
    pub handle_signals: Option<bool>,
    pub worker_threads: Option<usize>,
    pub log_filter: Option<String>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlays the values present in this file onto `config`.
    pub fn apply(self, mut config: AppConfig) -> AppConfig {
        if let Some(cluster) = self.cluster {
            config.cluster = Some(cluster);
        }
        if let Some(index) = self.index {
            config.index = Some(index);
        }
        if let Some(dir) = self.pid_dir {
            config.pid_dir = dir;
        }
        if let Some(enable) = self.handle_signals {
            config.handle_signals = enable;
        }
        if let Some(threads) = self.worker_threads {
            config.worker_threads = Some(threads);
        }
        if let Some(filter) = self.log_filter {
            config.log_filter = filter;
        }
        config
    }
}
