//! Bridge configuration.
//!
//! Sources, lowest precedence first: TOML file, environment, command line.

use clap::Parser;
use dataspace_client::RetryPolicy;
use dataspace_core::DuplicateReplyPolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything that varies between deployments of the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Dataspace to register into (e.g. "ds1.pisys.eu").
    pub dataspace_host: String,
    /// Log every forwarded message.
    pub verbose_logging: bool,
    /// Websocket URL of the dataspace. Defaults to `wss://<dataspace_host>`.
    pub endpoint: Option<String>,
    /// Give up if `registered` has not arrived by then. 0 waits forever.
    pub handshake_timeout_secs: u64,
    pub duplicate_reply: DuplicateReplyPolicy,
    pub retry: RetryConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            dataspace_host: String::new(),
            verbose_logging: false,
            endpoint: None,
            handshake_timeout_secs: 30,
            duplicate_reply: DuplicateReplyPolicy::Ignore,
            retry: RetryConfig::default(),
        }
    }
}

/// Send retry settings, in config-file units.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 200,
            max_backoff_ms: 5000,
        }
    }
}

impl BridgeConfig {
    /// Defaults for the given dataspace host.
    pub fn for_host(host: impl Into<String>) -> Self {
        Self {
            dataspace_host: host.into(),
            ..Self::default()
        }
    }

    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Reject settings the bridge cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dataspace_host.is_empty() {
            return Err(ConfigError::MissingHost);
        }
        if self.dataspace_host.contains('/') {
            return Err(ConfigError::InvalidHost(self.dataspace_host.clone()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        Ok(())
    }

    /// Websocket URL to dial.
    pub fn endpoint_url(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("wss://{}", self.dataspace_host))
    }

    /// `None` when the timeout is disabled.
    pub fn handshake_timeout(&self) -> Option<Duration> {
        (self.handshake_timeout_secs > 0).then(|| Duration::from_secs(self.handshake_timeout_secs))
    }

    /// The transport's view of [`RetryConfig`].
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
        }
    }
}

/// Command line for the `dataspace-bridge` binary.
#[derive(Debug, Parser)]
#[command(name = "dataspace-bridge", about = "Bridge an application into a dataspace")]
pub struct Cli {
    /// TOML configuration file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,
    /// Dataspace host to register into.
    #[arg(long, env = "DATASPACE_HOST")]
    pub dataspace: Option<String>,
    /// Websocket URL of the dataspace.
    #[arg(long, env = "DATASPACE_ENDPOINT")]
    pub endpoint: Option<String>,
    /// Log every forwarded message.
    #[arg(long, short)]
    pub verbose: bool,
    /// Use this name instead of a random one.
    #[arg(long)]
    pub name: Option<String>,
}

impl Cli {
    /// Merge the file (if any) with command line overrides and validate.
    pub fn load_config(&self) -> Result<BridgeConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => BridgeConfig::from_file(path)?,
            None => BridgeConfig::default(),
        };

        if let Some(host) = &self.dataspace {
            config.dataspace_host = host.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = Some(endpoint.clone());
        }
        if self.verbose {
            config.verbose_logging = true;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Invalid or unreadable configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("dataspace host is required (--dataspace or DATASPACE_HOST)")]
    MissingHost,
    #[error("dataspace host cannot contain '/': {0}")]
    InvalidHost(String),
    #[error("retry.max_attempts must be at least 1")]
    ZeroAttempts,
}
