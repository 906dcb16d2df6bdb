//! # FLAC Streaming Decoder
//!
//! Streaming FLAC decode and seek on top of a host byte source.
//!
//! ## Overview
//!
//! This crate handles:
//! - Adapting a possibly network-backed [`ByteSource`](bridge_traits::ByteSource)
//!   to a codec engine, without stalling on network buffering while seeking
//! - Buffering decoded frame groups and pulling normalized `f32` samples
//! - Seeking with a bounded fallback ladder when exact seeks fail
//! - Tags, replay gain and info text for the open stream
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bridge_traits::NullHost;
//! use core_decoder::FlacDecoder;
//! use std::sync::Arc;
//!
//! # fn example(source: Box<dyn bridge_traits::ByteSource>) -> core_decoder::Result<()> {
//! let decoder = FlacDecoder::symphonia(Arc::new(NullHost));
//! let mut session = decoder.open(source)?;
//!
//! let (rate, channels, _) = session.format();
//! let mut block = vec![0.0f32; (rate * channels) as usize];
//! while session.pull(&mut block) == block.len() {
//!     // hand the block to the output device
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Threading Model
//!
//! A session is driven from one thread; nothing inside it spawns threads or
//! blocks waiting on the network. Sessions are independent of each other.

pub mod config;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod frame_buffer;
pub mod info;
pub mod seek;
pub mod session;
pub mod stream;
pub mod tags;

pub use config::DecoderConfig;
pub use decoder::{FileInfo, FlacDecoder};
#[cfg(feature = "decoder-flac")]
pub use engine::SymphoniaBackend;
pub use engine::{
    CodecBackend, CodecEngine, DecodedFrame, EngineState, FrameSink, MetadataBlock, StreamInfo,
    StreamKind, VorbisComment,
};
pub use error::{DecoderError, Result};
pub use frame_buffer::FrameBuffer;
pub use seek::{SeekController, SeekOutcome, SeekPolicy};
pub use session::Session;
pub use stream::{ReadOutcome, SharedStream, StreamAdapter};
pub use tags::TagSet;
