//! Configuration system: TOML file + env var overrides + built-in tab layout.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{DashError, Result};

/// Lowest accepted poll interval. Anything faster just burns CPU on re-renders.
pub const MIN_POLL_INTERVAL_MS: u64 = 10;

/// Full race_dash configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub feed: FeedConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
    pub tabs: Vec<TabConfig>,
    /// Path this config was loaded from (not serialized into TOML).
    #[serde(skip)]
    pub config_file: PathBuf,
}

/// Where the parameter payload comes from and how often it is polled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FeedConfig {
    /// `http(s)://` URL or local file path (optionally `file://`-prefixed).
    pub source: String,
    pub poll_interval_ms: u64,
    pub fetch_timeout_ms: u64,
}

/// Text substitutions and optional panels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Shown for descriptor keys absent from the latest payload.
    pub placeholder: String,
    /// Shown instead of the placeholder until the first fetch completes.
    pub loading_text: String,
    /// Start with the live-blocks panel visible.
    pub show_live_blocks: bool,
}

/// JSONL activity log settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub activity_log: PathBuf,
    pub fallback_log: Option<PathBuf>,
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
}

/// One dashboard page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TabConfig {
    pub title: String,
    pub parameters: Vec<ParameterDescriptor>,
}

/// Static `{label, key}` pair defining one displayed row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParameterDescriptor {
    pub label: String,
    pub key: String,
}

impl ParameterDescriptor {
    /// Descriptor whose label is the key itself.
    #[must_use]
    pub fn same(key: &str) -> Self {
        Self {
            label: key.to_string(),
            key: key.to_string(),
        }
    }
}

impl TabConfig {
    fn with_keys(title: &str, keys: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            parameters: keys.iter().map(|k| ParameterDescriptor::same(k)).collect(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            display: DisplayConfig::default(),
            logging: LoggingConfig::default(),
            tabs: default_tabs(),
            config_file: Self::default_path(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            source: "parameters.json".to_string(),
            poll_interval_ms: 200,
            fetch_timeout_ms: 1_000,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            placeholder: "---".to_string(),
            loading_text: "Loading...".to_string(),
            show_live_blocks: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let data = data_dir();
        Self {
            enabled: true,
            activity_log: data.join("activity.jsonl"),
            fallback_log: Some(env::temp_dir().join("race-dash-activity.jsonl")),
            max_size_bytes: 10 * 1024 * 1024,
            max_rotated_files: 3,
        }
    }
}

/// The stock four-by-four parameter layout.
#[must_use]
pub fn default_tabs() -> Vec<TabConfig> {
    vec![
        TabConfig::with_keys("Traction", &["TV_g", "TC_TV_map", "Mu", "Bypass"]),
        TabConfig::with_keys("Regen", &["Mode", "Rgdis", "Regagg", "Plim"]),
        TabConfig::with_keys("Limits", &["Plim_reg", "Tmax", "Tmax_reg", "DRS_ON"]),
        TabConfig::with_keys(
            "Auxiliary",
            &["Fans_on", "FR_distr", "Keuze_param1", "Keuze_param2"],
        ),
    ]
}

fn home_dir() -> PathBuf {
    env::var_os("HOME").map_or_else(
        || {
            eprintln!("[RD-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths");
            PathBuf::from("/tmp")
        },
        PathBuf::from,
    )
}

fn data_dir() -> PathBuf {
    home_dir().join(".local").join("share").join("race-dash")
}

impl FeedConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        home_dir()
            .join(".config")
            .join("race-dash")
            .join("config.toml")
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, env_var)
    }

    fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| DashError::Io {
                path: path_buf.clone(),
                source,
            })?;
            Self::from_toml_str(&raw)?
        } else if is_explicit_path {
            return Err(DashError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.config_file = path_buf;
        cfg.apply_env_overrides_from(lookup)?;
        cfg.normalize();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a TOML document. A document without `[[tabs]]` keeps the stock layout.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| DashError::Serialization {
            context: "toml",
            details: e.to_string(),
        })
    }

    /// Deterministic hash of the effective config for the activity log.
    ///
    /// FNV-1a over canonical JSON so the value is stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    /// Total number of descriptors across all tabs.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.tabs.iter().map(|t| t.parameters.len()).sum()
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("RDASH_FEED_SOURCE") {
            self.feed.source = raw;
        }
        if let Some(raw) = lookup("RDASH_FEED_POLL_INTERVAL_MS") {
            self.feed.poll_interval_ms = parse_env_u64("RDASH_FEED_POLL_INTERVAL_MS", &raw)?;
        }
        if let Some(raw) = lookup("RDASH_FEED_FETCH_TIMEOUT_MS") {
            self.feed.fetch_timeout_ms = parse_env_u64("RDASH_FEED_FETCH_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("RDASH_DISPLAY_SHOW_LIVE_BLOCKS") {
            self.display.show_live_blocks =
                parse_env_bool("RDASH_DISPLAY_SHOW_LIVE_BLOCKS", &raw)?;
        }
        if let Some(raw) = lookup("RDASH_LOGGING_ENABLED") {
            self.logging.enabled = parse_env_bool("RDASH_LOGGING_ENABLED", &raw)?;
        }
        if let Some(raw) = lookup("RDASH_LOGGING_ACTIVITY_LOG") {
            self.logging.activity_log = PathBuf::from(raw);
        }
        Ok(())
    }

    fn normalize(&mut self) {
        self.feed.source = self.feed.source.trim().to_string();
        for tab in &mut self.tabs {
            for param in &mut tab.parameters {
                param.key = param.key.trim().to_string();
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.feed.source.is_empty() {
            return Err(DashError::InvalidConfig {
                details: "feed.source must not be empty".to_string(),
            });
        }
        if self.feed.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(DashError::InvalidConfig {
                details: format!(
                    "feed.poll_interval_ms must be >= {MIN_POLL_INTERVAL_MS}, got {}",
                    self.feed.poll_interval_ms
                ),
            });
        }
        if self.feed.fetch_timeout_ms == 0 {
            return Err(DashError::InvalidConfig {
                details: "feed.fetch_timeout_ms must be > 0".to_string(),
            });
        }
        if self.tabs.is_empty() {
            return Err(DashError::InvalidConfig {
                details: "at least one [[tabs]] entry is required".to_string(),
            });
        }
        for (idx, tab) in self.tabs.iter().enumerate() {
            if tab.title.trim().is_empty() {
                return Err(DashError::InvalidConfig {
                    details: format!("tabs[{idx}].title must not be empty"),
                });
            }
            if tab.parameters.is_empty() {
                return Err(DashError::InvalidConfig {
                    details: format!("tab {:?} must list at least one parameter", tab.title),
                });
            }
            if let Some(param) = tab.parameters.iter().find(|p| p.key.is_empty()) {
                return Err(DashError::InvalidConfig {
                    details: format!(
                        "tab {:?}: parameter {:?} has an empty key",
                        tab.title, param.label
                    ),
                });
            }
        }
        if self.logging.enabled && self.logging.max_rotated_files == 0 {
            return Err(DashError::InvalidConfig {
                details: "logging.max_rotated_files must be >= 1".to_string(),
            });
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_u64(name: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|error| DashError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}

fn parse_env_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(DashError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: expected a boolean"),
        }),
    }
}
