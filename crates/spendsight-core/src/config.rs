//! Analytics engine configuration
//!
//! Thresholds and chunking limits live in an explicit struct handed to the
//! selector and the chunk coordinator at construction time.
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/spendsight/config/analytics.toml)
//! 2. Fall back to embedded defaults (compiled into binary)

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/analytics.toml");

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyticsConfig {
    /// Counts below this use raw data
    pub raw_threshold: u64,
    /// Counts below this (and at or above `raw_threshold`) use a summary
    pub summary_threshold: u64,
    /// Transactions per chunk window
    pub chunk_size: u64,
    /// Maximum windows analyzed per request
    pub max_chunks: usize,
    /// Token estimate per raw transaction
    pub raw_tokens_per_transaction: u64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            raw_threshold: 100,
            summary_threshold: 1000,
            chunk_size: 50,
            max_chunks: 5,
            raw_tokens_per_transaction: 20,
        }
    }
}

impl AnalyticsConfig {
    /// Load from the default override location, falling back to embedded defaults
    pub fn load() -> Result<Self> {
        load_config(None)
    }

    /// Load from an explicit file
    pub fn from_path(path: &Path) -> Result<Self> {
        load_config(Some(path))
    }

    /// Parse from TOML content
    pub fn from_toml(content: &str) -> Result<Self> {
        parse_config(content)
    }

    /// Override the chunk window size
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Result<Self> {
        self.chunk_size = chunk_size;
        self.validate()?;
        Ok(self)
    }

    /// Override the window cap
    pub fn with_max_chunks(mut self, max_chunks: usize) -> Result<Self> {
        self.max_chunks = max_chunks;
        self.validate()?;
        Ok(self)
    }

    /// Check invariants between fields
    pub fn validate(&self) -> Result<()> {
        if self.raw_threshold >= self.summary_threshold {
            return Err(Error::Config(format!(
                "raw_threshold ({}) must be less than summary_threshold ({})",
                self.raw_threshold, self.summary_threshold
            )));
        }
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be at least 1".into()));
        }
        if self.max_chunks == 0 {
            return Err(Error::Config("max_chunks must be at least 1".into()));
        }
        Ok(())
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("spendsight").join("config").join("analytics.toml"))
}

/// Load configuration (override first, then default)
fn load_config(override_path: Option<&Path>) -> Result<AnalyticsConfig> {
    let path = match override_path {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            Some(path.to_path_buf())
        }
        None => default_config_path().filter(|p| p.exists()),
    };

    let content = match path {
        Some(ref path) => {
            tracing::debug!(path = %path.display(), "Loading analytics config override");
            fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?
        }
        None => DEFAULT_CONFIG.to_string(),
    };

    parse_config(&content)
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    strategy: Option<RawStrategy>,
    chunking: Option<RawChunking>,
    estimates: Option<RawEstimates>,
}

#[derive(Debug, Deserialize)]
struct RawStrategy {
    raw_threshold: Option<u64>,
    summary_threshold: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawChunking {
    chunk_size: Option<u64>,
    max_chunks: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawEstimates {
    raw_tokens_per_transaction: Option<u64>,
}

/// Parse config from TOML content, layering values over the defaults
fn parse_config(content: &str) -> Result<AnalyticsConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = AnalyticsConfig::default();

    if let Some(strategy) = raw.strategy {
        if let Some(threshold) = strategy.raw_threshold {
            config.raw_threshold = threshold;
        }
        if let Some(threshold) = strategy.summary_threshold {
            config.summary_threshold = threshold;
        }
    }

    if let Some(chunking) = raw.chunking {
        if let Some(size) = chunking.chunk_size {
            config.chunk_size = size;
        }
        if let Some(max) = chunking.max_chunks {
            config.max_chunks = max;
        }
    }

    if let Some(estimates) = raw.estimates {
        if let Some(tokens) = estimates.raw_tokens_per_transaction {
            config.raw_tokens_per_transaction = tokens;
        }
    }

    config.validate()?;
    Ok(config)
}
