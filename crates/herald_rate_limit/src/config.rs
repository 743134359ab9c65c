//! Configuration structures for webhook dispatch.
//!
//! This module provides TOML-based configuration for the dispatcher constants.
//! The configuration system supports:
//! - Bundled defaults (include_str! from herald.toml)
//! - User overrides (./herald.toml or ~/.config/herald/herald.toml)
//! - Automatic merging with user values taking precedence

use config::{Config, File, FileFormat};
use herald_error::{ConfigError, HeraldError, HeraldResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

fn default_bucket_limit() -> u32 {
    5
}

fn default_queue_max() -> usize {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_safety_margin_ms() -> u64 {
    500
}

/// Dispatcher constants for one endpoint.
///
/// All values are overridable at deployment time through `herald.toml`:
///
/// ```toml
/// [dispatch]
/// bucket_limit = 5
/// queue_max = 10
/// max_attempts = 3
/// safety_margin_ms = 500
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct DispatchConfig {
    /// Requests allowed per rate limit window (the bucket size).
    #[serde(default = "default_bucket_limit")]
    pub bucket_limit: u32,

    /// Maximum senders suspended waiting for a reset before new sends
    /// are refused.
    #[serde(default = "default_queue_max")]
    pub queue_max: usize,

    /// Maximum transport attempts per logical send.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Extra wait added to server-reported reset/retry durations,
    /// in milliseconds.
    #[serde(default = "default_safety_margin_ms")]
    pub safety_margin_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            bucket_limit: default_bucket_limit(),
            queue_max: default_queue_max(),
            max_attempts: default_max_attempts(),
            safety_margin_ms: default_safety_margin_ms(),
        }
    }
}

impl DispatchConfig {
    /// The safety margin as a [`Duration`].
    pub fn safety_margin(&self) -> Duration {
        Duration::from_millis(self.safety_margin_ms)
    }
}

/// Top-level Herald configuration.
///
/// Loads dispatcher configuration from TOML files with a precedence system:
/// 1. Bundled defaults (include_str! from herald.toml)
/// 2. User override (./herald.toml or ~/.config/herald/herald.toml)
///
/// # Example
///
/// ```no_run
/// use herald_rate_limit::HeraldConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = HeraldConfig::load()?;
/// println!("bucket limit: {}", config.dispatch.bucket_limit);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
pub struct HeraldConfig {
    /// Dispatcher constants.
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl HeraldConfig {
    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> HeraldResult<Self> {
        debug!("Loading configuration from file");

        Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                HeraldError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                HeraldError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }

    /// Load configuration with precedence: user override > bundled default.
    ///
    /// Configuration sources in order of precedence (later sources override earlier):
    /// 1. Bundled defaults (herald.toml shipped with library)
    /// 2. User config in home directory (~/.config/herald/herald.toml)
    /// 3. User config in current directory (./herald.toml)
    ///
    /// User config files are optional and will be silently skipped if not found.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use herald_rate_limit::HeraldConfig;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = HeraldConfig::load()?;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument]
    pub fn load() -> HeraldResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");

        // Bundled default configuration
        const DEFAULT_CONFIG: &str = include_str!("../../../herald.toml");

        let mut builder = Config::builder()
            // Start with bundled defaults
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        // Add user config from home directory (optional)
        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/herald/herald.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        // Add user config from current directory (optional, highest precedence)
        builder = builder.add_source(File::with_name("herald").required(false));

        builder
            .build()
            .map_err(|e| {
                HeraldError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                HeraldError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }
}
