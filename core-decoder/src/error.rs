//! # Decoder Error Types
//!
//! Errors surfaced when opening a decode session. Decode-time failures never
//! leave a session: they are retried or reported as end of stream.

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Errors that can occur while opening or probing a FLAC stream.
#[derive(Error, Debug)]
pub enum DecoderError {
    // ========================================================================
    // Format Errors
    // ========================================================================
    /// Stream does not start with a recognised signature.
    #[error("Unsupported or invalid stream format: {0}")]
    InvalidFormat(String),

    /// Codec engine could not parse the stream headers.
    #[error("Failed to read stream metadata: {0}")]
    MetadataError(String),

    /// Header metadata was read but describes an unusable stream.
    #[error("Invalid stream info: {0}")]
    InvalidStreamInfo(String),

    /// The codec engine could not be created for this stream.
    #[error("Codec engine initialization failed: {0}")]
    EngineInit(String),

    // ========================================================================
    // Source Errors
    // ========================================================================
    /// Byte source failed while reading headers.
    #[error("Byte source error: {0}")]
    Source(#[from] BridgeError),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// Configuration is invalid.
    #[error("Invalid decoder configuration: {0}")]
    Config(String),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DecoderError {
    /// Returns `true` if the stream itself was rejected.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            DecoderError::InvalidFormat(_)
                | DecoderError::MetadataError(_)
                | DecoderError::InvalidStreamInfo(_)
        )
    }

    /// Returns `true` if the failure came from the byte source.
    pub fn is_io_error(&self) -> bool {
        matches!(self, DecoderError::Source(_) | DecoderError::IoError(_))
    }
}

/// Result type for decoder operations.
pub type Result<T> = std::result::Result<T, DecoderError>;
