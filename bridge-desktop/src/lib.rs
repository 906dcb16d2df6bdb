//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! This crate provides ready-to-use [`ByteSource`](bridge_traits::ByteSource)
//! implementations:
//! - `LocalFileSource` over `std::fs::File`
//! - `MemorySource` over a shared `bytes::Bytes` buffer
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::LocalFileSource;
//! use bridge_traits::ByteSource;
//!
//! let source = LocalFileSource::open("/music/track.flac")?;
//! println!("{} bytes", source.size());
//! ```

mod file;
mod memory;

pub use file::LocalFileSource;
pub use memory::MemorySource;
