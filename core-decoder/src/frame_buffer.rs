//! # Frame Buffer
//!
//! Scratch buffer between the codec engine and the host's float pull: holds
//! one interleaved frame group and converts it to normalized `f32` on demand.

use tracing::{trace, warn};

use crate::engine::{DecodedFrame, FrameSink, MetadataBlock};

/// Interleaved integer samples of the most recent frame group.
///
/// Invariant: `read_pos <= write_len <= capacity`.
#[derive(Debug)]
pub struct FrameBuffer {
    samples: Vec<i32>,
    channels: usize,
    write_len: usize,
    read_pos: usize,
    /// Sample frame following the last decoded group.
    position: u64,
    scale: f32,
}

impl FrameBuffer {
    /// Allocate room for one frame group of `max_block` sample frames.
    pub fn new(max_block: usize, channels: usize, bits_per_sample: u32) -> Self {
        let channels = channels.max(1);
        let bits = bits_per_sample.clamp(1, 32);
        Self {
            samples: vec![0; max_block * channels],
            channels,
            write_len: 0,
            read_pos: 0,
            position: 0,
            scale: 1.0 / (1u64 << (bits - 1)) as f32,
        }
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    pub fn write_len(&self) -> usize {
        self.write_len
    }

    pub fn read_pos(&self) -> usize {
        self.read_pos
    }

    /// Samples written but not yet drained.
    pub fn available(&self) -> usize {
        self.write_len - self.read_pos
    }

    /// Everything written has been drained; a refill is due.
    pub fn is_exhausted(&self) -> bool {
        self.read_pos == self.write_len
    }

    /// Nothing has been written since the last reset.
    pub fn is_empty(&self) -> bool {
        self.write_len == 0
    }

    /// Current decode position in sample frames.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn set_position(&mut self, position: u64) {
        self.position = position;
    }

    /// Per-sample multiplier mapping full-scale integers onto [-1, 1).
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Drop buffered samples.
    pub fn reset(&mut self) {
        self.write_len = 0;
        self.read_pos = 0;
    }

    /// Interleave a frame group into the buffer, replacing its contents.
    pub fn write_frame(&mut self, frame: &DecodedFrame<'_>) {
        let max_frames = self.capacity() / self.channels;
        let frames = if frame.block_size() > max_frames {
            warn!(
                block_size = frame.block_size(),
                max_frames, "Frame group larger than declared maximum, truncating"
            );
            max_frames
        } else {
            frame.block_size()
        };

        for c in 0..self.channels {
            if c < frame.channels() {
                let src = &frame.channel(c)[..frames];
                for (i, &s) in src.iter().enumerate() {
                    self.samples[i * self.channels + c] = s;
                }
            } else {
                for i in 0..frames {
                    self.samples[i * self.channels + c] = 0;
                }
            }
        }

        self.write_len = frames * self.channels;
        self.read_pos = 0;
        self.position = frame.first_sample() + frame.block_size() as u64;
        trace!(
            first_sample = frame.first_sample(),
            frames,
            position = self.position,
            "Frame group buffered"
        );
    }

    /// Copy up to `out.len()` samples out as floats; returns the count.
    pub fn drain_into(&mut self, out: &mut [f32]) -> usize {
        let n = out.len().min(self.available());
        let src = &self.samples[self.read_pos..self.read_pos + n];
        for (dst, &s) in out.iter_mut().zip(src) {
            *dst = s as f32 * self.scale;
        }
        self.read_pos += n;
        n
    }
}

impl FrameSink for FrameBuffer {
    fn on_frame(&mut self, frame: &DecodedFrame<'_>) {
        self.write_frame(frame);
    }

    fn on_metadata(&mut self, block: MetadataBlock) {
        trace!(?block, "Ignoring metadata after headers");
    }
}
