//! # Decoder Configuration
//!
//! Tunables for seeking and decode-error recovery.

use serde::{Deserialize, Serialize};

use crate::error::{DecoderError, Result};

/// Decode session configuration.
///
/// The seek ladder constants are empirical; they are exposed here so hosts can
/// trade accuracy for success rate on badly indexed streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Length of one host seek unit in seconds.
    ///
    /// Default: 0.001 (millisecond units).
    #[serde(default = "default_granularity_secs")]
    pub granularity_secs: f64,

    /// How far each backward retry steps when an exact seek fails.
    ///
    /// Default: 3.0 seconds.
    #[serde(default = "default_seek_step_secs")]
    pub seek_step_secs: f64,

    /// Maximum number of backward-stepped seek retries.
    ///
    /// Default: 10.
    #[serde(default = "default_seek_max_retries")]
    pub seek_max_retries: u32,

    /// Consecutive decode failures tolerated by one pull before giving up.
    ///
    /// `None` keeps retrying until the engine reaches end of stream or the
    /// host cancels.
    ///
    /// Default: `None`.
    #[serde(default)]
    pub decode_retry_limit: Option<u32>,

    /// Scratch capacity in frames when the stream header omits its maximum
    /// block size.
    ///
    /// Default: 65535 (the largest block FLAC can describe).
    #[serde(default = "default_max_block_fallback")]
    pub max_block_fallback: u32,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            granularity_secs: default_granularity_secs(),
            seek_step_secs: default_seek_step_secs(),
            seek_max_retries: default_seek_max_retries(),
            decode_retry_limit: None,
            max_block_fallback: default_max_block_fallback(),
        }
    }
}

impl DecoderConfig {
    /// Parse a configuration from JSON, filling omitted fields with defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| DecoderError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if !(self.granularity_secs > 0.0) {
            return Err(DecoderError::Config(
                "granularity_secs must be > 0".to_string(),
            ));
        }

        if !(self.seek_step_secs > 0.0) {
            return Err(DecoderError::Config("seek_step_secs must be > 0".to_string()));
        }

        if self.decode_retry_limit == Some(0) {
            return Err(DecoderError::Config(
                "decode_retry_limit must be > 0 when set".to_string(),
            ));
        }

        if self.max_block_fallback == 0 {
            return Err(DecoderError::Config(
                "max_block_fallback must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_granularity_secs() -> f64 {
    0.001
}

fn default_seek_step_secs() -> f64 {
    3.0
}

fn default_seek_max_retries() -> u32 {
    10
}

fn default_max_block_fallback() -> u32 {
    65535
}
