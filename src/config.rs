//! Settings for loading call definitions and running the mock server.

use crate::liveness::StartupPolicy;
use crate::placeholder::Placeholders;
use crate::server::ServerSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main settings, usually loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MockSettings {
    /// Root directory of call definition files
    #[serde(default = "default_calls_dir")]
    pub calls_dir: PathBuf,

    /// Default placeholder values
    #[serde(default)]
    pub placeholders: Placeholders,

    /// Mock server startup
    #[serde(default)]
    pub startup: StartupSettings,

    /// In-memory server logging
    #[serde(default)]
    pub server: ServerSettings,

    /// Evict a cached call once it answered a request
    #[serde(default = "default_true")]
    pub single_use_calls: bool,
}

impl Default for MockSettings {
    fn default() -> Self {
        Self {
            calls_dir: default_calls_dir(),
            placeholders: Placeholders::new(),
            startup: StartupSettings::default(),
            server: ServerSettings::default(),
            single_use_calls: true,
        }
    }
}

impl MockSettings {
    /// Load settings from a YAML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let settings: Self = serde_yaml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate the settings.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.startup
            .validate()
            .map_err(|e| anyhow::anyhow!("startup: {}", e))
    }
}

/// Liveness wait configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StartupSettings {
    /// Seconds to wait for the mock server to become ready
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Milliseconds between readiness probes
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for StartupSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl StartupSettings {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than zero");
        }
        if self.poll_interval_ms == 0 {
            anyhow::bail!("poll_interval_ms must be greater than zero");
        }
        if self.poll_interval_ms > self.timeout_secs * 1000 {
            anyhow::bail!(
                "poll_interval_ms ({}) exceeds the timeout ({}s)",
                self.poll_interval_ms,
                self.timeout_secs
            );
        }
        Ok(())
    }

    pub fn policy(&self) -> StartupPolicy {
        StartupPolicy {
            timeout: Duration::from_secs(self.timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

fn default_calls_dir() -> PathBuf {
    PathBuf::from("mock/servers")
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_true() -> bool {
    true
}
