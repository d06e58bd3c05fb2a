//! Engine configuration, validation, and error types.
//!
//! [`EngineConfig`] is plain data with sensible defaults. It can be built
//! in code or loaded from TOML with [`EngineConfig::from_toml_str`]; both
//! paths go through [`validate()`](EngineConfig::validate).
//!
//! ```toml
//! memory_fraction = 0.25
//! memory_limit_bytes = 4_000_000_000
//! prefetch = true
//! max_resolution_depth = 8
//!
//! [store]
//! retry_delay_ms = 500
//! retry_attempts = 1
//! ```

use mdstream_store::StoreConfig;
use mdstream_transform::DEFAULT_MAX_DEPTH;
use serde::Deserialize;
use thiserror::Error;

// ── EngineConfig ───────────────────────────────────────────────────

/// Configuration for an [`Experiment`](crate::Experiment).
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Fraction of available memory a batch may use. Default: 0.5.
    pub memory_fraction: f64,
    /// Fixed memory budget in bytes, replacing the OS query. Default: none.
    pub memory_limit_bytes: Option<u64>,
    /// Read the next batch while the current one is transformed. Default: true.
    pub prefetch: bool,
    /// Maximum nesting of dependency resolution. Default: 8.
    pub max_resolution_depth: usize,
    /// Store tuning.
    pub store: StoreConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            memory_fraction: 0.5,
            memory_limit_bytes: None,
            prefetch: true,
            max_resolution_depth: DEFAULT_MAX_DEPTH,
            store: StoreConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document. Missing keys take defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let f = self.memory_fraction;
        if !f.is_finite() || f <= 0.0 || f > 1.0 {
            return Err(ConfigError::InvalidMemoryFraction { value: f });
        }
        if self.memory_limit_bytes == Some(0) {
            return Err(ConfigError::ZeroMemoryLimit);
        }
        if self.max_resolution_depth == 0 {
            return Err(ConfigError::ZeroResolutionDepth);
        }
        Ok(())
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while loading or validating an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `memory_fraction` is NaN, infinite, not positive, or above 1.
    #[error("memory_fraction must be in (0, 1], got {value}")]
    InvalidMemoryFraction {
        /// The invalid value.
        value: f64,
    },
    /// `memory_limit_bytes` is zero.
    #[error("memory_limit_bytes must be positive")]
    ZeroMemoryLimit,
    /// `max_resolution_depth` is zero, which would forbid running anything.
    #[error("max_resolution_depth must be at least 1")]
    ZeroResolutionDepth,
    /// The TOML document could not be parsed.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}
