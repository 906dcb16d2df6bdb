//! # Core Runtime Module
//!
//! Provides the runtime infrastructure shared by the decoder crates:
//! - Logging and tracing infrastructure
//! - Runtime error type
//!
//! ## Overview
//!
//! The decoder core only emits `tracing` events. Whoever embeds it decides
//! where those events go by calling [`logging::init_logging`] once at startup,
//! optionally mirroring them into a host [`LoggerSink`](bridge_traits::LoggerSink).

pub mod error;
pub mod logging;

pub use error::{Error, Result};
