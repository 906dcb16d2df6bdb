//! # Decode Session
//!
//! One open stream: the stream adapter, the codec engine driving it, the
//! scratch buffer it fills, and what was learned from the headers.
//!
//! ## Lifecycle
//!
//! ```text
//! open ──► pull / seek ... ──► drop
//! ```
//!
//! Opening is atomic: if the signature, the headers or the sample rate are
//! unusable, everything built so far is dropped and an error returned.
//! Afterwards no decode-time failure escapes; a short [`Session::pull`] is
//! the only end-of-playback signal.

use std::sync::Arc;

use bridge_traits::host::DecoderHost;
use bridge_traits::source::ByteSource;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::config::DecoderConfig;
use crate::engine::{
    CodecBackend, CodecEngine, DecodedFrame, EngineState, FrameSink, MetadataBlock, StreamInfo,
    StreamKind,
};
use crate::error::{DecoderError, Result};
use crate::frame_buffer::FrameBuffer;
use crate::info;
use crate::seek::{SeekController, SeekOutcome, SeekPolicy};
use crate::stream::{SharedStream, StreamAdapter};
use crate::tags::TagSet;

/// Collects header metadata; only the first comment block counts.
#[derive(Default)]
struct HeaderSink {
    info: Option<StreamInfo>,
    tags: Option<TagSet>,
}

impl FrameSink for HeaderSink {
    fn on_frame(&mut self, frame: &DecodedFrame<'_>) {
        debug!(
            first_sample = frame.first_sample(),
            "Dropping frame delivered during header parse"
        );
    }

    fn on_metadata(&mut self, block: MetadataBlock) {
        match block {
            MetadataBlock::StreamInfo(info) => self.info = Some(info),
            MetadataBlock::VorbisComment(comment) => {
                if self.tags.is_none() {
                    self.tags = Some(TagSet::from(comment));
                }
            }
        }
    }
}

/// An open decode session.
pub struct Session {
    stream: SharedStream,
    engine: Box<dyn CodecEngine>,
    buffer: FrameBuffer,
    info: StreamInfo,
    kind: StreamKind,
    tags: TagSet,
    byte_rate: u32,
    length_known: bool,
    host: Arc<dyn DecoderHost>,
    config: DecoderConfig,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("info", &self.info)
            .field("kind", &self.kind)
            .field("position", &self.buffer.position())
            .field("byte_rate", &self.byte_rate)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Open a session for playback.
    ///
    /// Reports the length (when known) and replay gain to `host`, and hints
    /// the byte rate to network sources.
    #[instrument(skip_all)]
    pub fn open(
        source: Box<dyn ByteSource>,
        backend: &dyn CodecBackend,
        host: Arc<dyn DecoderHost>,
        config: DecoderConfig,
    ) -> Result<Self> {
        let session = Self::init(source, backend, host, config)?;
        session.announce();
        Ok(session)
    }

    /// Parse headers without telling the host anything.
    pub(crate) fn init(
        source: Box<dyn ByteSource>,
        backend: &dyn CodecBackend,
        host: Arc<dyn DecoderHost>,
        config: DecoderConfig,
    ) -> Result<Self> {
        let mut adapter = StreamAdapter::new(source);
        let kind = match adapter.read_signature()? {
            Some(sig) => StreamKind::from_signature(&sig).ok_or_else(|| {
                DecoderError::InvalidFormat(format!(
                    "unrecognised signature {:?}",
                    String::from_utf8_lossy(&sig)
                ))
            })?,
            None => {
                return Err(DecoderError::InvalidFormat(
                    "stream shorter than its signature".to_string(),
                ))
            }
        };
        debug!(?kind, "Detected stream kind");

        let stream = adapter.into_shared();
        let mut engine = backend.init(kind, Arc::clone(&stream))?;

        // Headers must arrive in full, so a stalled network source pre-buffers
        let mut headers = HeaderSink::default();
        stream.lock().set_scratch_empty(false);
        let parsed = engine.process_until_end_of_metadata(&mut headers);
        stream.lock().set_scratch_empty(true);
        if !parsed {
            error!("Codec engine failed to read stream headers");
            return Err(DecoderError::MetadataError(
                "header metadata could not be processed".to_string(),
            ));
        }
        let info = headers
            .info
            .ok_or_else(|| DecoderError::MetadataError("no stream info block".to_string()))?;
        if info.sample_rate == 0 {
            error!("Stream info has zero sample rate");
            return Err(DecoderError::InvalidStreamInfo(
                "sample rate is zero".to_string(),
            ));
        }
        if info.channels == 0 {
            return Err(DecoderError::InvalidStreamInfo(
                "channel count is zero".to_string(),
            ));
        }

        let max_block = if info.max_block_size > 0 {
            info.max_block_size
        } else {
            config.max_block_fallback
        };
        let buffer = FrameBuffer::new(
            max_block as usize,
            info.channels as usize,
            info.bits_per_sample,
        );

        let byte_rate = match info.length_secs() {
            Some(length) => (stream.lock().length() as f64 / length) as u32,
            None => 0,
        };

        info!(
            sample_rate = info.sample_rate,
            channels = info.channels,
            bits_per_sample = info.bits_per_sample,
            total_samples = info.total_samples,
            byte_rate,
            "Session opened"
        );

        Ok(Self {
            stream,
            engine,
            buffer,
            info,
            kind,
            tags: headers.tags.unwrap_or_default(),
            byte_rate,
            length_known: info.total_samples > 0,
            host,
            config,
        })
    }

    fn announce(&self) {
        if let Some(length) = self.info.length_secs() {
            self.host.set_length(length);
        }

        {
            let mut stream = self.stream.lock();
            if stream.source_type().is_network() {
                let rate = if self.byte_rate > 0 {
                    self.byte_rate
                } else {
                    self.info.sample_rate * self.info.channels * self.info.bits_per_sample / 16
                };
                debug!(rate, "Hinting network byte rate");
                stream.set_net_rate(rate);
            }
        }

        for (kind, value) in self.tags.replay_gain() {
            debug!(?kind, value, "Applying replay gain");
            self.host.set_gain(kind, value);
        }
    }

    /// Fill `out` with normalized interleaved samples.
    ///
    /// Returns the number written; fewer than `out.len()` means playback has
    /// ended, or the host cancelled while decoding was failing or stalled.
    pub fn pull(&mut self, out: &mut [f32]) -> usize {
        let mut done = 0;
        let mut failures = 0u32;
        let mut stalls = 0u32;

        while done < out.len() {
            if self.buffer.is_exhausted() {
                match self.engine.state() {
                    EngineState::EndOfStream => {
                        self.discover_length();
                        break;
                    }
                    EngineState::Aborted => {
                        warn!("Codec engine aborted, ending playback");
                        break;
                    }
                    _ => {}
                }

                if (failures > 0 || stalls > 0) && self.host.check_cancel() {
                    info!(failures, stalls, "Decode retry cancelled by host");
                    break;
                }

                self.stream
                    .lock()
                    .set_scratch_empty(self.buffer.is_empty());
                if !self.engine.process_single(&mut self.buffer) {
                    failures += 1;
                    warn!(
                        failures,
                        position = self.buffer.position(),
                        "Frame decode failed, flushing"
                    );
                    if self
                        .config
                        .decode_retry_limit
                        .is_some_and(|limit| failures >= limit)
                    {
                        warn!(failures, "Decode retry limit reached, ending playback");
                        break;
                    }
                    self.engine.flush();
                } else {
                    failures = 0;
                    if self.buffer.is_exhausted() && self.engine.state() == EngineState::Normal {
                        stalls += 1;
                        trace!(stalls, "No frame decoded, source stalled");
                        std::thread::yield_now();
                    } else {
                        stalls = 0;
                    }
                }
                continue;
            }

            done += self.buffer.drain_into(&mut out[done..]);
        }

        done
    }

    fn discover_length(&mut self) {
        if self.length_known {
            return;
        }
        self.length_known = true;
        self.info.total_samples = self.buffer.position();
        let length = self.info.total_samples as f64 / self.info.sample_rate as f64;
        info!(
            total_samples = self.info.total_samples,
            length, "Stream length discovered at end of stream"
        );
        self.host.set_length(length);
    }

    /// Seek to `units` granularity units (milliseconds by default).
    #[instrument(skip(self))]
    pub fn seek(&mut self, units: u32) -> SeekOutcome {
        SeekController::new(
            self.engine.as_mut(),
            &mut self.buffer,
            &self.stream,
            self.info.sample_rate,
            SeekPolicy::from(&self.config),
        )
        .seek(units)
    }

    /// `(sample_rate, channels, bytes_per_sample)`.
    pub fn format(&self) -> (u32, u32, u32) {
        (
            self.info.sample_rate,
            self.info.channels,
            self.info.bits_per_sample / 8,
        )
    }

    /// Length of one seek unit in seconds.
    pub fn granularity(&self) -> f64 {
        self.config.granularity_secs
    }

    pub fn stream_info(&self) -> &StreamInfo {
        &self.info
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    /// Decode position in sample frames.
    pub fn position(&self) -> u64 {
        self.buffer.position()
    }

    /// Total length in sample frames, 0 while unknown.
    pub fn total_samples(&self) -> u64 {
        self.info.total_samples
    }

    pub fn length_secs(&self) -> Option<f64> {
        self.info.length_secs()
    }

    /// Estimated bytes per second, 0 when the length was unknown at open.
    pub fn byte_rate(&self) -> u32 {
        self.byte_rate
    }

    pub fn frame_buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    /// Whether the byte source has been read to its end.
    pub fn is_at_end(&self) -> bool {
        self.stream.lock().is_at_end()
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    pub fn info_text(&self) -> String {
        info::info_text(&self.info, self.byte_rate)
    }

    pub fn general_info(&self) -> String {
        info::general_info(&self.info, self.kind, &self.tags, self.byte_rate)
    }

    pub fn message_text(&self) -> String {
        info::message_text(&self.tags)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        debug!(position = self.buffer.position(), "Session closed");
    }
}
