//! Store configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where containers live and where new containers take their files from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Directory holding `<name>.zip` containers.
    #[serde(default = "default_containers_dir")]
    pub containers_dir: PathBuf,

    /// Directory whose file tree is compressed into every new container.
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Upper bound on a single signing call, in seconds.
    #[serde(default = "default_sign_timeout")]
    pub sign_timeout_secs: u64,
}

fn default_containers_dir() -> PathBuf {
    PathBuf::from("containers")
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("files")
}

fn default_sign_timeout() -> u64 {
    30
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            containers_dir: default_containers_dir(),
            source_dir: default_source_dir(),
            sign_timeout_secs: default_sign_timeout(),
        }
    }
}

impl StoreConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `SIGBOX_CONTAINERS_DIR` | Container directory (default: `containers`) |
    /// | `SIGBOX_SOURCE_DIR` | Source file tree (default: `files`) |
    /// | `SIGBOX_SIGN_TIMEOUT` | Signing timeout in seconds (default: 30) |
    pub fn from_env() -> Self {
        Self {
            containers_dir: std::env::var_os("SIGBOX_CONTAINERS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_containers_dir),
            source_dir: std::env::var_os("SIGBOX_SOURCE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_source_dir),
            sign_timeout_secs: std::env::var("SIGBOX_SIGN_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_sign_timeout),
        }
    }

    pub fn with_containers_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.containers_dir = dir.into();
        self
    }

    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = dir.into();
        self
    }

    pub fn with_sign_timeout_secs(mut self, secs: u64) -> Self {
        self.sign_timeout_secs = secs;
        self
    }

    pub fn sign_timeout(&self) -> Duration {
        Duration::from_secs(self.sign_timeout_secs)
    }
}
