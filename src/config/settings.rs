//! Monitor Settings
//!
//! Loads [`MonitorConfig`] from an optional YAML file and applies
//! environment variable overrides on top.
//!
//! Values are only parsed, never validated: an empty endpoint or token
//! is passed through and fails predictably at delivery time.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default monitoring endpoint.
pub const DEFAULT_CENTRAL_LOG_URL: &str = "http://central-log-server.example.com/api/cron-logs";

/// Default HTTP timeout for reports, in seconds.
pub const DEFAULT_REPORT_TIMEOUT_SECS: u64 = 5;

/// Default lifetime of a start record, in seconds.
pub const DEFAULT_START_TTL_SECS: u64 = 3600;

/// Default capacity of the background delivery queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

pub const ENV_APP_NAME: &str = "CRONWATCH_APP_NAME";
pub const ENV_CENTRAL_LOG_URL: &str = "CRONWATCH_CENTRAL_LOG_URL";
pub const ENV_API_KEY: &str = "CRONWATCH_API_KEY";
pub const ENV_REPORT_TIMEOUT: &str = "CRONWATCH_REPORT_TIMEOUT";
pub const ENV_SLACK_WEBHOOK: &str = "CRONWATCH_SLACK_WEBHOOK";

/// Errors raised while reading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Where report delivery runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Dedicated worker thread fed by a bounded queue
    #[default]
    Background,
    /// On the thread that delivered the signal
    Inline,
}

/// Long-running job alert settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Slack-compatible incoming webhook URL; empty disables alerts
    pub slack_webhook: String,
    /// Threshold for jobs without their own `max_runtime`
    pub long_running_secs: Option<u64>,
}

/// Expectations for a named job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoredJob {
    /// Cron expression, informational
    pub schedule: Option<String>,
    pub description: Option<String>,
    /// Maximum expected runtime in seconds
    pub max_runtime: Option<u64>,
}

/// Complete monitor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Application name attached to every report
    pub app_name: String,
    /// Endpoint receiving lifecycle reports
    pub central_log_url: String,
    /// Token sent with every request
    pub api_key: String,
    pub report_timeout_secs: u64,
    pub start_ttl_secs: u64,
    pub delivery: DeliveryMode,
    pub queue_capacity: usize,
    pub alerts: AlertConfig,
    /// Jobs keyed by their label (command text or description)
    pub monitored_jobs: HashMap<String, MonitoredJob>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            app_name: "cronwatch".to_string(),
            central_log_url: DEFAULT_CENTRAL_LOG_URL.to_string(),
            api_key: String::new(),
            report_timeout_secs: DEFAULT_REPORT_TIMEOUT_SECS,
            start_ttl_secs: DEFAULT_START_TTL_SECS,
            delivery: DeliveryMode::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            alerts: AlertConfig::default(),
            monitored_jobs: HashMap::new(),
        }
    }
}

impl MonitorConfig {
    /// Loads configuration from `path` (if given) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                debug!("No config file given, using defaults");
                Self::default()
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parses a YAML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_yaml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parses YAML configuration text. Missing keys take their defaults.
    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Applies overrides from a variable lookup such as the environment.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_APP_NAME) {
            self.app_name = value;
        }
        if let Some(value) = lookup(ENV_CENTRAL_LOG_URL) {
            self.central_log_url = value;
        }
        if let Some(value) = lookup(ENV_API_KEY) {
            self.api_key = value;
        }
        if let Some(value) = lookup(ENV_SLACK_WEBHOOK) {
            self.alerts.slack_webhook = value;
        }
        if let Some(value) = lookup(ENV_REPORT_TIMEOUT) {
            match value.trim().parse::<u64>() {
                Ok(secs) => self.report_timeout_secs = secs,
                Err(_) => warn!("Ignoring invalid {}: {}", ENV_REPORT_TIMEOUT, value),
            }
        }
    }

    /// HTTP timeout applied to reports and alerts.
    pub fn report_timeout(&self) -> Duration {
        Duration::from_secs(self.report_timeout_secs)
    }

    /// Lifetime of an unmatched start record.
    pub fn start_ttl(&self) -> Duration {
        Duration::from_secs(self.start_ttl_secs)
    }

    /// URL of the status listing on the monitoring server.
    pub fn status_url(&self) -> String {
        format!("{}/status", self.central_log_url.trim_end_matches('/'))
    }

    /// Runtime above which a finished task triggers an alert.
    ///
    /// A monitored job's own `max_runtime` wins over the global threshold.
    pub fn long_running_threshold(&self, label: &str) -> Option<Duration> {
        self.monitored_jobs
            .get(label)
            .and_then(|job| job.max_runtime)
            .or(self.alerts.long_running_secs)
            .map(Duration::from_secs)
    }
}
