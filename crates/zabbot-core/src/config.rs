//! Configuration for the Zabbot assistant.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the inventory TTL (seconds)
pub const ENV_TTL_HOSTS: &str = "ZABBOT_CACHE_TTL_HOSTS";
/// Environment variable overriding the volatile TTL (seconds)
pub const ENV_TTL_PROBLEMS: &str = "ZABBOT_CACHE_TTL_PROBLEMS";
/// Environment variable overriding the log level
pub const ENV_LOG_LEVEL: &str = "ZABBOT_LOG_LEVEL";

/// Top-level assistant configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// TTL classes for cache-eligible operations
    #[serde(default)]
    pub cache: CacheConfig,

    /// Row limits passed to fetch operations
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Bundle rendering limits
    #[serde(default)]
    pub render: RenderConfig,

    /// Behaviour of the last-resort host extraction rule
    #[serde(default)]
    pub host_fallback: HostFallback,
}

/// Cache TTL configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL for near-static inventory data (host lists)
    #[serde(default = "default_inventory_ttl")]
    pub inventory_ttl_secs: u64,

    /// TTL for volatile data (active problems)
    #[serde(default = "default_volatile_ttl")]
    pub volatile_ttl_secs: u64,
}

/// Limits forwarded to data sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Number of hosts returned by the problematic-hosts ranking
    #[serde(default = "default_top_problematic")]
    pub top_problematic_hosts: usize,

    /// Number of latest values fetched for a single host
    #[serde(default = "default_latest_data")]
    pub latest_data: usize,

    /// Look-back window for recent events, in hours
    #[serde(default = "default_recent_events_hours")]
    pub recent_events_hours: usize,
}

/// Context rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Maximum records rendered per list source
    #[serde(default = "default_max_records")]
    pub max_records_per_source: usize,

    /// Maximum rendered size in bytes
    #[serde(default = "default_max_content_size")]
    pub max_content_size: usize,
}

/// What the bare-token host rule is allowed to match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostFallback {
    /// Only tokens containing a dash (`dc-hyperv`, `vm-test`)
    #[default]
    Dashed,
    /// Any alphanumeric token, including ordinary words
    AnyToken,
    /// Never fall back to a bare token
    Disabled,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_inventory_ttl() -> u64 {
    300 // 5 minutes
}

fn default_volatile_ttl() -> u64 {
    60
}

fn default_top_problematic() -> usize {
    10
}

fn default_latest_data() -> usize {
    10
}

fn default_recent_events_hours() -> usize {
    24
}

fn default_max_records() -> usize {
    5
}

fn default_max_content_size() -> usize {
    100_000
}

fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".zabbot")
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            inventory_ttl_secs: default_inventory_ttl(),
            volatile_ttl_secs: default_volatile_ttl(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            top_problematic_hosts: default_top_problematic(),
            latest_data: default_latest_data(),
            recent_events_hours: default_recent_events_hours(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_records_per_source: default_max_records(),
            max_content_size: default_max_content_size(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            cache: CacheConfig::default(),
            limits: LimitsConfig::default(),
            render: RenderConfig::default(),
            host_fallback: HostFallback::default(),
        }
    }
}

impl CacheConfig {
    /// TTL applied to inventory reads.
    pub fn inventory_ttl(&self) -> Duration {
        Duration::from_secs(self.inventory_ttl_secs)
    }

    /// TTL applied to volatile reads.
    pub fn volatile_ttl(&self) -> Duration {
        Duration::from_secs(self.volatile_ttl_secs)
    }
}

impl ChatConfig {
    /// Default config file location (`~/.zabbot/config.yaml`)
    pub fn default_path() -> PathBuf {
        default_config_dir().join("config.yaml")
    }

    /// Load configuration from the default file and the process
    /// environment, falling back to defaults.
    pub fn load() -> Self {
        Self::load_or_default(&Self::default_path(), |key| std::env::var(key).ok())
    }

    /// Load `path` if it exists, apply overrides and validate the result.
    /// Any failure is logged and yields the defaults.
    pub fn load_or_default<F>(path: &Path, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if path.exists() {
            match Self::load_from(path) {
                Ok(loaded) => config = loaded,
                Err(e) => {
                    tracing::warn!("Failed to load config file: {}", e);
                }
            }
        }

        config.apply_env_overrides(lookup);
        if let Err(e) = config.validate() {
            tracing::warn!(error = %e, "Invalid environment override, using defaults");
            return Self::default();
        }
        config
    }

    /// Load `path`, apply overrides and validate the result.
    pub fn load_from_with_overrides<F>(path: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CoreError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup. Unparseable values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_TTL_HOSTS) {
            match value.trim().parse() {
                Ok(secs) => self.cache.inventory_ttl_secs = secs,
                Err(_) => tracing::warn!(var = ENV_TTL_HOSTS, value = %value, "Ignoring invalid TTL"),
            }
        }
        if let Some(value) = lookup(ENV_TTL_PROBLEMS) {
            match value.trim().parse() {
                Ok(secs) => self.cache.volatile_ttl_secs = secs,
                Err(_) => {
                    tracing::warn!(var = ENV_TTL_PROBLEMS, value = %value, "Ignoring invalid TTL")
                }
            }
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.cache.inventory_ttl_secs == 0 {
            return Err(CoreError::InvalidConfig {
                field: "cache.inventory_ttl_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.cache.volatile_ttl_secs == 0 {
            return Err(CoreError::InvalidConfig {
                field: "cache.volatile_ttl_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.render.max_records_per_source == 0 {
            return Err(CoreError::InvalidConfig {
                field: "render.max_records_per_source",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
