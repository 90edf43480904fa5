//! Dispatcher configuration
//!
//! Configuration can be built programmatically, read from environment
//! variables, or loaded from a TOML file. Keys accept both snake_case and
//! the camelCase option names (`maxConcurrentRenders`, ...).

use crate::error::ConfigError;
use pdf_snapshot_cache::config::{
    DEFAULT_BYTES_PER_PIXEL, DEFAULT_COST_LIMIT, DEFAULT_ENTRY_LIMIT,
};
use pdf_snapshot_cache::CacheLimits;
use pdf_snapshot_scheduler::WorkerPoolConfig;
use serde::Deserialize;
use std::fs;
use std::path::Path;

const ENV_MAX_CONCURRENT_RENDERS: &str = "PDF_SNAPSHOT_MAX_CONCURRENT_RENDERS";
const ENV_CACHE_ENTRY_LIMIT: &str = "PDF_SNAPSHOT_CACHE_ENTRY_LIMIT";
const ENV_CACHE_COST_LIMIT: &str = "PDF_SNAPSHOT_CACHE_COST_LIMIT_BYTES";
const ENV_BYTES_PER_PIXEL: &str = "PDF_SNAPSHOT_BYTES_PER_PIXEL";
const ENV_REVALIDATE_ON_HIT: &str = "PDF_SNAPSHOT_REVALIDATE_ON_HIT";

/// Settings for a [`RenderDispatcher`](crate::RenderDispatcher)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Maximum renders running at once (worker pool size)
    #[serde(alias = "maxConcurrentRenders")]
    pub max_concurrent_renders: usize,

    /// Maximum number of cached bitmaps
    #[serde(alias = "cacheEntryCountLimit")]
    pub cache_entry_count_limit: usize,

    /// Maximum total cost of cached bitmaps in bytes
    #[serde(alias = "cacheTotalCostLimitBytes")]
    pub cache_total_cost_limit_bytes: usize,

    /// Bytes charged per cached pixel
    #[serde(alias = "bytesPerPixel")]
    pub bytes_per_pixel: usize,

    /// Also start a background render when a fetch is served from cache
    #[serde(alias = "revalidateOnHit")]
    pub revalidate_on_hit: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_concurrent_renders: 4,
            cache_entry_count_limit: DEFAULT_ENTRY_LIMIT,
            cache_total_cost_limit_bytes: DEFAULT_COST_LIMIT,
            bytes_per_pixel: DEFAULT_BYTES_PER_PIXEL,
            revalidate_on_hit: false,
        }
    }
}

impl RenderConfig {
    pub fn with_max_concurrent_renders(mut self, renders: usize) -> Self {
        self.max_concurrent_renders = renders;
        self
    }

    pub fn with_cache_entry_count_limit(mut self, limit: usize) -> Self {
        self.cache_entry_count_limit = limit;
        self
    }

    pub fn with_cache_total_cost_limit_bytes(mut self, limit: usize) -> Self {
        self.cache_total_cost_limit_bytes = limit;
        self
    }

    pub fn with_bytes_per_pixel(mut self, bytes: usize) -> Self {
        self.bytes_per_pixel = bytes;
        self
    }

    pub fn with_revalidate_on_hit(mut self, revalidate: bool) -> Self {
        self.revalidate_on_hit = revalidate;
        self
    }

    /// Loads configuration from environment variables, starting from defaults.
    ///
    /// Environment variables:
    /// - `PDF_SNAPSHOT_MAX_CONCURRENT_RENDERS` (default: 4)
    /// - `PDF_SNAPSHOT_CACHE_ENTRY_LIMIT` (default: 150)
    /// - `PDF_SNAPSHOT_CACHE_COST_LIMIT_BYTES` (default: 10485760)
    /// - `PDF_SNAPSHOT_BYTES_PER_PIXEL` (default: 4)
    /// - `PDF_SNAPSHOT_REVALIDATE_ON_HIT` (`true`/`false`/`1`/`0`, default: false)
    ///
    /// # Errors
    /// Returns an error if any variable holds an unparsable or zero value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = env_usize(ENV_MAX_CONCURRENT_RENDERS)? {
            config.max_concurrent_renders = v;
        }
        if let Some(v) = env_usize(ENV_CACHE_ENTRY_LIMIT)? {
            config.cache_entry_count_limit = v;
        }
        if let Some(v) = env_usize(ENV_CACHE_COST_LIMIT)? {
            config.cache_total_cost_limit_bytes = v;
        }
        if let Some(v) = env_usize(ENV_BYTES_PER_PIXEL)? {
            config.bytes_per_pixel = v;
        }
        if let Ok(raw) = std::env::var(ENV_REVALIDATE_ON_HIT) {
            config.revalidate_on_hit = parse_bool(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: ENV_REVALIDATE_ON_HIT.to_string(),
                value: raw.clone(),
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// Missing keys keep their defaults:
    /// ```toml
    /// max_concurrent_renders = 4
    /// cache_entry_count_limit = 150
    /// cache_total_cost_limit_bytes = 10485760
    /// bytes_per_pixel = 4
    /// revalidate_on_hit = false
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the dispatcher cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_renders == 0 {
            return Err(ConfigError::Zero("max_concurrent_renders"));
        }
        if self.bytes_per_pixel == 0 {
            return Err(ConfigError::Zero("bytes_per_pixel"));
        }
        Ok(())
    }

    /// Limits for the snapshot cache
    pub fn cache_limits(&self) -> CacheLimits {
        CacheLimits::new(self.cache_entry_count_limit, self.cache_total_cost_limit_bytes)
            .with_bytes_per_pixel(self.bytes_per_pixel)
    }

    /// Configuration for the render worker pool
    pub fn pool_config(&self) -> WorkerPoolConfig {
        WorkerPoolConfig::new(self.max_concurrent_renders)
    }
}

fn env_usize(key: &str) -> Result<Option<usize>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
        Err(_) => Ok(None),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
