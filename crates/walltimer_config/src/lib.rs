//! Timer configuration
//!
//! Settings shared by the timer and its logging setup. Values come from the
//! defaults, an optional TOML file and environment variables, in that order.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "walltimer.toml";

pub const ENV_LOG_FILTER: &str = "WALLTIMER_LOG";
pub const ENV_LOG_ANSI: &str = "WALLTIMER_LOG_ANSI";
pub const ENV_REPORT: &str = "WALLTIMER_REPORT";

/// Complete timer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TimerConfig {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Emit finished scopes at `info` instead of `debug`
    pub report_on_exit: bool,
}

impl TimerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().merge_with_vars(lookup)
    }

    /// Load configuration from TOML file
    #[cfg(feature = "toml-config")]
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: TimerConfig = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from TOML file (stub when toml feature is disabled)
    #[cfg(not(feature = "toml-config"))]
    pub fn from_file(_path: &Path) -> anyhow::Result<Self> {
        anyhow::bail!("TOML support not enabled. Enable the 'toml-config' feature.")
    }

    /// Save configuration to TOML file
    #[cfg(feature = "toml-config")]
    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Save configuration to TOML file (stub when toml feature is disabled)
    #[cfg(not(feature = "toml-config"))]
    pub fn save_to_file(&self, _path: &Path) -> anyhow::Result<()> {
        anyhow::bail!("TOML support not enabled. Enable the 'toml-config' feature.")
    }

    /// Merge with environment variables (env vars take precedence)
    pub fn merge_with_env(self) -> Self {
        self.merge_with_vars(|key| std::env::var(key).ok())
    }

    /// Override with the variables that are set and parse; anything else
    /// keeps its current value.
    pub fn merge_with_vars<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        self.logging = self.logging.merge_with_vars(&lookup);

        if let Some(val) = lookup(ENV_REPORT)
            && let Ok(report) = val.parse()
        {
            self.report_on_exit = report;
        }

        self
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback filter directive used when `RUST_LOG` is unset
    pub filter: String,

    /// Colourise output
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "walltimer=info".to_string(),
            ansi: true,
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self::default().merge_with_vars(|key| std::env::var(key).ok())
    }

    fn merge_with_vars<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup(ENV_LOG_FILTER)
            && !val.trim().is_empty()
        {
            self.filter = val;
        }

        if let Some(val) = lookup(ENV_LOG_ANSI)
            && let Ok(ansi) = val.parse()
        {
            self.ansi = ansi;
        }

        self
    }
}

/// Global configuration manager
pub struct ConfigManager {
    config: Arc<RwLock<TimerConfig>>,
    load_error: RwLock<Option<String>>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(TimerConfig::default())),
            load_error: RwLock::new(None),
        }
    }

    /// Initialize from environment and optional config file
    pub fn init(&self, config_file: Option<PathBuf>) -> anyhow::Result<()> {
        self.init_with_vars(config_file, |key| std::env::var(key).ok())
    }

    /// Initialize from an optional config file, then the given variables
    pub fn init_with_vars<F>(&self, config_file: Option<PathBuf>, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = if let Some(path) = config_file {
            TimerConfig::from_file(&path)?
        } else {
            TimerConfig::default()
        };

        *self.config.write() = config.merge_with_vars(lookup);
        Ok(())
    }

    /// Like [`ConfigManager::init_with_vars`], but a file that fails to load
    /// falls back to defaults plus variables. The failure is kept for
    /// [`ConfigManager::load_error`].
    pub fn init_or_default<F>(&self, config_file: Option<PathBuf>, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Err(err) = self.init_with_vars(config_file, &lookup) {
            *self.load_error.write() = Some(format!("{err:#}"));
            *self.config.write() = TimerConfig::from_vars(&lookup);
        }
    }

    /// Why the config file was ignored, if it was.
    pub fn load_error(&self) -> Option<String> {
        self.load_error.read().clone()
    }

    /// Get current configuration
    pub fn get(&self) -> TimerConfig {
        self.config.read().clone()
    }

    /// Update configuration
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut TimerConfig),
    {
        let mut config = self.config.write();
        f(&mut config);
    }

    pub fn logging(&self) -> LoggingConfig {
        self.config.read().logging.clone()
    }

    pub fn report_on_exit(&self) -> bool {
        self.config.read().report_on_exit
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_CONFIG: once_cell::sync::Lazy<ConfigManager> = once_cell::sync::Lazy::new(|| {
    let manager = ConfigManager::new();
    let default_config_path = PathBuf::from(DEFAULT_CONFIG_FILE);
    let config_file = if cfg!(feature = "toml-config") && default_config_path.exists() {
        Some(default_config_path)
    } else {
        None
    };
    manager.init_or_default(config_file, |key| std::env::var(key).ok());
    manager
});

/// Get the global configuration manager
pub fn get_config() -> &'static ConfigManager {
    &GLOBAL_CONFIG
}
