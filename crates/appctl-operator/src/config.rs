use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Operator configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorConfig {
    #[serde(default)]
    pub controller: ControllerSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl OperatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.controller;
        if c.requeue_after_secs == 0 {
            return Err(ConfigError::invalid("controller.requeue_after_secs must be > 0"));
        }
        if c.concurrency == 0 {
            return Err(ConfigError::invalid("controller.concurrency must be > 0"));
        }
        if c.backoff_base_ms == 0 {
            return Err(ConfigError::invalid("controller.backoff_base_ms must be > 0"));
        }
        if c.backoff_max() < c.backoff_base() {
            return Err(ConfigError::invalid(
                "controller.backoff_max_secs must not be below controller.backoff_base_ms",
            ));
        }
        if c.namespace.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::invalid(
                "controller.namespace must be non-empty when set",
            ));
        }

        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }
        Ok(())
    }
}

/// Controller loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerSettings {
    /// Seconds between periodic passes for each App.
    #[serde(default = "default_requeue_after_secs")]
    pub requeue_after_secs: u64,
    /// Maximum number of Apps reconciled at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: u16,
    /// Namespace to watch. All namespaces when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// First retry delay after a failed pass.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Upper bound on the retry delay.
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,
}

impl ControllerSettings {
    pub fn requeue_after(&self) -> Duration {
        Duration::from_secs(self.requeue_after_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_secs(self.backoff_max_secs)
    }
}

fn default_requeue_after_secs() -> u64 {
    30
}

fn default_concurrency() -> u16 {
    4
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_backoff_max_secs() -> u64 {
    300
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            requeue_after_secs: default_requeue_after_secs(),
            concurrency: default_concurrency(),
            namespace: None,
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_secs: default_backoff_max_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config build error: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// From --config CLI argument
    CliArgument,
    /// From APPCTL_CONFIG environment variable
    EnvironmentVariable,
    /// Default path (appctl.toml)
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (APPCTL_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

pub mod loader {
    use super::{ConfigError, ConfigSource, OperatorConfig};
    use ::config::{Config, Environment, File};
    use std::env;
    use std::path::PathBuf;

    pub const DEFAULT_CONFIG_PATH: &str = "appctl.toml";
    pub const CONFIG_PATH_ENV: &str = "APPCTL_CONFIG";

    /// Resolve the configuration file path.
    ///
    /// Priority order:
    /// 1. CLI argument: --config <path>
    /// 2. Environment variable: APPCTL_CONFIG
    /// 3. Default: appctl.toml
    pub fn resolve_config_path(cli: Option<&str>) -> (String, ConfigSource) {
        if let Some(path) = cli.filter(|p| !p.is_empty()) {
            return (path.to_string(), ConfigSource::CliArgument);
        }
        if let Ok(path) = env::var(CONFIG_PATH_ENV) {
            if !path.is_empty() {
                return (path, ConfigSource::EnvironmentVariable);
            }
        }
        (DEFAULT_CONFIG_PATH.to_string(), ConfigSource::Default)
    }

    /// Loads configuration from an optional TOML file, then applies
    /// `APPCTL__SECTION__KEY` environment overrides and validates the result.
    /// A missing file is not an error; defaults apply.
    pub fn load_config(path: Option<&str>) -> Result<OperatorConfig, ConfigError> {
        let mut builder = Config::builder();
        let file = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        if file.exists() {
            builder = builder.add_source(File::from(file));
        }
        // Environment variable overrides, e.g., APPCTL__CONTROLLER__CONCURRENCY=8
        builder = builder.add_source(
            Environment::with_prefix("APPCTL")
                .try_parsing(true)
                .separator("__"),
        );
        let merged: OperatorConfig = builder.build()?.try_deserialize()?;
        merged.validate()?;
        Ok(merged)
    }
}
