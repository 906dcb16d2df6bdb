//! # Host Bridge Traits
//!
//! Abstractions over the facilities a media-player host lends to a decoder.
//!
//! ## Overview
//!
//! This crate defines the contract between the decoder core and whatever
//! embeds it. The core never opens files, talks to the network, or reports
//! to a UI on its own; it calls back into the host through the traits below.
//!
//! ## Traits
//!
//! ### I/O
//! - [`ByteSource`](source::ByteSource) - Pull/seek/tell/size access to an encoded
//!   stream, with network liveness and pre-buffering hints
//!
//! ### Host Integration
//! - [`DecoderHost`](host::DecoderHost) - Length updates, replay gain, and the
//!   cooperative cancellation predicate
//!
//! ### Utilities
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ Local files, memory buffers |
//! | Network  | host-provided       | 📋 Host supplies its own `ByteSource` |
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should convert their own errors to `BridgeError` and keep
//! the message actionable (file path, offset, connection state).
//!
//! ## Thread Safety
//!
//! A `ByteSource` is owned by exactly one decode session at a time and only
//! needs to be `Send`. `DecoderHost` and `LoggerSink` are shared and must be
//! `Send + Sync`.
//!
//! ## Examples
//!
//! ### Implementing ByteSource
//!
//! ```ignore
//! use bridge_traits::source::{ByteSource, SourceType};
//! use bridge_traits::error::Result;
//!
//! pub struct MyStream { /* ... */ }
//!
//! impl ByteSource for MyStream {
//!     fn read(&mut self, buf: &mut [u8]) -> Result<usize> { todo!() }
//!     fn seek(&mut self, offset: u64) -> Result<()> { todo!() }
//!     fn tell(&self) -> u64 { todo!() }
//!     fn size(&self) -> u64 { todo!() }
//!     fn source_type(&self) -> SourceType { SourceType::NetworkStream }
//! }
//! ```

pub mod error;
pub mod host;
pub mod logging;
pub mod source;

pub use error::BridgeError;

// Re-export commonly used types
pub use host::{DecoderHost, GainKind, NullHost};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use source::{ByteSource, SourceType};
