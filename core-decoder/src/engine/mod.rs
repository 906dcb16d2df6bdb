//! # Codec Engine Abstraction
//!
//! The black-box FLAC decoder as seen by a session: a stepwise engine that
//! pulls bytes through a [`SharedStream`] and pushes decoded frames and header
//! metadata into a [`FrameSink`].
//!
//! ```text
//! ByteSource → StreamAdapter → CodecEngine → FrameSink (FrameBuffer)
//! ```
//!
//! Any conforming backend can drive a session: the symphonia engine shipped
//! with the `decoder-flac` feature, or a scripted double in tests.

#[cfg(feature = "decoder-flac")]
mod symphonia;

#[cfg(feature = "decoder-flac")]
pub use self::symphonia::SymphoniaBackend;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::stream::SharedStream;

/// Framing of the FLAC bitstream, decided from the file signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    /// Raw FLAC stream starting with `fLaC`
    Native,
    /// FLAC carried in an Ogg container
    Ogg,
}

impl StreamKind {
    /// Detect the stream kind from the first four bytes.
    pub fn from_signature(sig: &[u8; 4]) -> Option<Self> {
        match sig {
            b"fLaC" => Some(StreamKind::Native),
            b"OggS" => Some(StreamKind::Ogg),
            _ => None,
        }
    }
}

/// Stream parameters from the header metadata, fixed for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreamInfo {
    pub sample_rate: u32,
    pub channels: u32,
    pub bits_per_sample: u32,
    /// Largest frame group in sample frames.
    pub max_block_size: u32,
    /// Total samples per channel; 0 when unknown.
    pub total_samples: u64,
}

impl StreamInfo {
    /// Length in seconds, when the total is known.
    pub fn length_secs(&self) -> Option<f64> {
        (self.total_samples > 0 && self.sample_rate > 0)
            .then(|| self.total_samples as f64 / self.sample_rate as f64)
    }
}

/// Vorbis comment block: vendor string plus raw `NAME=value` entries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VorbisComment {
    pub vendor: Option<String>,
    pub comments: Vec<String>,
}

/// Header metadata delivered while processing the stream headers.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataBlock {
    StreamInfo(StreamInfo),
    VorbisComment(VorbisComment),
}

/// One decoded frame group, planar.
///
/// Channel `c` occupies `planar[c * stride + offset..][..block_size]`.
#[derive(Debug, Clone, Copy)]
pub struct DecodedFrame<'a> {
    planar: &'a [i32],
    stride: usize,
    offset: usize,
    block_size: usize,
    channels: usize,
    first_sample: u64,
}

impl<'a> DecodedFrame<'a> {
    /// # Panics
    ///
    /// Panics if `planar` is shorter than `stride * channels` or
    /// `block_size` exceeds `stride`.
    pub fn new(
        planar: &'a [i32],
        stride: usize,
        channels: usize,
        block_size: usize,
        first_sample: u64,
    ) -> Self {
        assert!(block_size <= stride, "block larger than channel stride");
        assert!(planar.len() >= stride * channels, "planar buffer too short");
        Self {
            planar,
            stride,
            offset: 0,
            block_size,
            channels,
            first_sample,
        }
    }

    /// Samples of channel `c`, at native bit depth.
    pub fn channel(&self, c: usize) -> &'a [i32] {
        let start = c * self.stride + self.offset;
        &self.planar[start..start + self.block_size]
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Sample frames in this group.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Absolute index of the first sample frame.
    pub fn first_sample(&self) -> u64 {
        self.first_sample
    }

    /// Drop the first `n` sample frames.
    pub fn trimmed_front(&self, n: usize) -> Self {
        let n = n.min(self.block_size);
        Self {
            offset: self.offset + n,
            block_size: self.block_size - n,
            first_sample: self.first_sample + n as u64,
            ..*self
        }
    }
}

/// Receiver of decode-direction callbacks.
pub trait FrameSink {
    /// A frame group was decoded.
    fn on_frame(&mut self, frame: &DecodedFrame<'_>);

    /// A header metadata block was parsed.
    fn on_metadata(&mut self, block: MetadataBlock);
}

/// Engine state as reported after each operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Normal,
    /// The engine consumed the whole stream.
    EndOfStream,
    /// The last absolute seek failed; flush to recover.
    SeekFailed,
    /// The engine cannot continue.
    Aborted,
}

/// Stepwise FLAC decoder.
///
/// Every call runs synchronously on the session's thread. Implementations
/// read bytes only through the [`SharedStream`] they were created with and
/// must not hold its lock across calls.
pub trait CodecEngine: Send {
    /// Parse all header metadata, reporting each block to `sink`.
    ///
    /// Returns `false` if the headers cannot be read.
    fn process_until_end_of_metadata(&mut self, sink: &mut dyn FrameSink) -> bool;

    /// Decode exactly one frame group into `sink`.
    ///
    /// Returns `false` on a decode error. Reaching the end of the stream is
    /// not an error: the call returns `true` and [`state`](Self::state)
    /// becomes [`EngineState::EndOfStream`].
    fn process_single(&mut self, sink: &mut dyn FrameSink) -> bool;

    /// Discard in-flight decode state.
    fn flush(&mut self) -> bool;

    /// Position the engine so the next decoded sample is `sample`.
    ///
    /// Delivers no frames.
    fn seek_absolute(&mut self, sample: u64) -> bool;

    fn state(&self) -> EngineState;
}

/// Factory for codec engines.
pub trait CodecBackend: Send + Sync {
    /// Create an engine for `kind` reading from `stream`.
    fn init(&self, kind: StreamKind, stream: SharedStream) -> Result<Box<dyn CodecEngine>>;
}
