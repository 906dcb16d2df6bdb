//! # Symphonia Codec Engine
//!
//! FLAC engine built on symphonia's FLAC (and, with `decoder-ogg-flac`, Ogg)
//! readers. All I/O goes through the session's [`StreamAdapter`], wrapped as
//! a symphonia [`MediaSource`].
//!
//! Symphonia hands out samples scaled to the full `i32` range; they are
//! shifted back to the stream's native bit depth so the session's
//! `1 / 2^(bits-1)` scale applies.
//!
//! [`StreamAdapter`]: crate::stream::StreamAdapter

use std::io::{self, Read, Seek, SeekFrom};

use symphonia::core::audio::{AudioBufferRef, SampleBuffer, SignalSpec};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::{MetadataOptions, MetadataRevision};
use symphonia::core::probe::Hint;
use tracing::{debug, error, instrument, trace, warn};

use crate::config::DecoderConfig;
use crate::engine::{
    CodecBackend, CodecEngine, DecodedFrame, EngineState, FrameSink, MetadataBlock, StreamInfo,
    StreamKind, VorbisComment,
};
use crate::error::Result;
use crate::stream::{ReadOutcome, SharedStream};

/// Creates [`SymphoniaEngine`]s.
#[derive(Debug, Clone)]
pub struct SymphoniaBackend {
    max_block_fallback: u32,
}

impl SymphoniaBackend {
    pub fn new(config: &DecoderConfig) -> Self {
        Self {
            max_block_fallback: config.max_block_fallback,
        }
    }
}

impl Default for SymphoniaBackend {
    fn default() -> Self {
        Self::new(&DecoderConfig::default())
    }
}

impl CodecBackend for SymphoniaBackend {
    fn init(&self, kind: StreamKind, stream: SharedStream) -> Result<Box<dyn CodecEngine>> {
        Ok(Box::new(SymphoniaEngine::new(
            kind,
            stream,
            self.max_block_fallback,
        )))
    }
}

/// Symphonia media source reading through the shared stream adapter.
struct AdapterMediaSource {
    stream: SharedStream,
    seekable: bool,
    byte_len: Option<u64>,
}

impl AdapterMediaSource {
    fn new(stream: SharedStream) -> Self {
        let (seekable, len) = {
            let adapter = stream.lock();
            (adapter.source_type().is_seekable(), adapter.length())
        };
        Self {
            stream,
            seekable,
            byte_len: (len > 0).then_some(len),
        }
    }
}

impl Read for AdapterMediaSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut adapter = self.stream.lock();
        let mut outcome = adapter.read(buf);
        // A stall must not reach the packet parser mid-frame.
        if outcome == ReadOutcome::Pending && adapter.pre_buffer() {
            trace!("Source pre-buffered, retrying read");
            outcome = adapter.read(buf);
        }
        match outcome {
            ReadOutcome::Data(n) => Ok(n),
            ReadOutcome::EndOfStream => Ok(0),
            ReadOutcome::Pending => Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                "byte source has no data yet",
            )),
            ReadOutcome::Aborted => Err(io::Error::new(io::ErrorKind::Other, "read aborted")),
        }
    }
}

impl Seek for AdapterMediaSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let mut adapter = self.stream.lock();
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => adapter.tell().checked_add_signed(delta),
            SeekFrom::End(delta) => adapter.length().checked_add_signed(delta),
        }
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "seek before start"))?;

        adapter
            .seek(target)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        Ok(target)
    }
}

impl MediaSource for AdapterMediaSource {
    fn is_seekable(&self) -> bool {
        self.seekable
    }

    fn byte_len(&self) -> Option<u64> {
        self.byte_len
    }
}

/// Stepwise FLAC engine backed by a symphonia format reader and decoder.
///
/// Probing is deferred to [`process_until_end_of_metadata`], so creating the
/// engine never touches the stream.
///
/// [`process_until_end_of_metadata`]: CodecEngine::process_until_end_of_metadata
pub struct SymphoniaEngine {
    kind: StreamKind,
    stream: SharedStream,
    max_block_fallback: u32,
    reader: Option<Box<dyn FormatReader>>,
    decoder: Option<Box<dyn Decoder>>,
    track_id: u32,
    bits_per_sample: u32,
    converter: PlanarConverter,
    /// First sample wanted after an accurate seek.
    trim_until: Option<u64>,
    /// Timestamp of the next sample owed to the sink.
    next_ts: u64,
    /// A stall interrupted a packet; reposition at `next_ts` before reading on.
    resync_pending: bool,
    state: EngineState,
}

impl SymphoniaEngine {
    pub fn new(kind: StreamKind, stream: SharedStream, max_block_fallback: u32) -> Self {
        Self {
            kind,
            stream,
            max_block_fallback,
            reader: None,
            decoder: None,
            track_id: 0,
            bits_per_sample: 16,
            converter: PlanarConverter::default(),
            trim_until: None,
            next_ts: 0,
            resync_pending: false,
            state: EngineState::Normal,
        }
    }

    fn hint(&self) -> Hint {
        let mut hint = Hint::new();
        hint.with_extension(match self.kind {
            StreamKind::Native => "flac",
            StreamKind::Ogg => "ogg",
        });
        hint
    }

    fn open_reader(&mut self, sink: &mut dyn FrameSink) -> std::result::Result<(), SymphoniaError> {
        let media_source = AdapterMediaSource::new(self.stream.clone());
        let mss = MediaSourceStream::new(Box::new(media_source), Default::default());

        let mut opened = symphonia::default::get_probe().format(
            &self.hint(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let mut reader = opened.format;

        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(SymphoniaError::Unsupported("no FLAC track in stream"))?;
        let params = track.codec_params.clone();
        let track_id = track.id;

        let decoder = symphonia::default::get_codecs().make(&params, &DecoderOptions::default())?;

        let info = StreamInfo {
            sample_rate: params.sample_rate.unwrap_or(0),
            channels: params.channels.map(|c| c.count() as u32).unwrap_or(0),
            bits_per_sample: params.bits_per_sample.unwrap_or(16),
            max_block_size: params
                .max_frames_per_packet
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(self.max_block_fallback),
            total_samples: params.n_frames.unwrap_or(0),
        };
        debug!(?info, track_id, "Stream headers read");
        sink.on_metadata(MetadataBlock::StreamInfo(info));

        let comment = reader
            .metadata()
            .current()
            .map(vorbis_comment)
            .or_else(|| opened.metadata.get()?.current().map(vorbis_comment));
        if let Some(comment) = comment {
            sink.on_metadata(MetadataBlock::VorbisComment(comment));
        }

        self.track_id = track_id;
        self.bits_per_sample = info.bits_per_sample;
        self.reader = Some(reader);
        self.decoder = Some(decoder);
        Ok(())
    }
}

/// Reusable conversion from symphonia buffers to planar native-depth samples.
#[derive(Default)]
struct PlanarConverter {
    sample_buf: Option<SampleBuffer<i32>>,
    capacity_frames: usize,
    planar: Vec<i32>,
}

impl PlanarConverter {
    /// Convert `decoded`; channel `c` lands at `c * decoded.frames()`.
    fn convert(&mut self, decoded: AudioBufferRef<'_>, bits_per_sample: u32) -> &[i32] {
        let capacity = decoded.capacity();
        let needs_realloc = self.sample_buf.is_none() || self.capacity_frames < capacity;
        if needs_realloc {
            let spec = SignalSpec::new(decoded.spec().rate, decoded.spec().channels);
            self.sample_buf = Some(SampleBuffer::<i32>::new(capacity as u64, spec));
            self.capacity_frames = capacity;
        }

        self.planar.clear();
        if let Some(sample_buf) = self.sample_buf.as_mut() {
            sample_buf.copy_planar_ref(decoded);
            let shift = 32u32.saturating_sub(bits_per_sample).min(31);
            self.planar
                .extend(sample_buf.samples().iter().map(|&s| s >> shift));
        }
        &self.planar
    }
}

fn vorbis_comment(revision: &MetadataRevision) -> VorbisComment {
    VorbisComment {
        vendor: None,
        comments: revision
            .tags()
            .iter()
            .map(|tag| format!("{}={}", tag.key, tag.value))
            .collect(),
    }
}

impl CodecEngine for SymphoniaEngine {
    #[instrument(skip_all, fields(kind = ?self.kind))]
    fn process_until_end_of_metadata(&mut self, sink: &mut dyn FrameSink) -> bool {
        match self.open_reader(sink) {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "Failed to read stream headers");
                self.state = EngineState::Aborted;
                false
            }
        }
    }

    fn process_single(&mut self, sink: &mut dyn FrameSink) -> bool {
        if self.state == EngineState::EndOfStream {
            return true;
        }
        let (Some(reader), Some(decoder)) = (self.reader.as_mut(), self.decoder.as_mut()) else {
            return false;
        };

        if self.resync_pending {
            let to = SeekTo::TimeStamp {
                ts: self.next_ts,
                track_id: self.track_id,
            };
            match reader.seek(SeekMode::Accurate, to) {
                Ok(seeked) => {
                    decoder.reset();
                    debug!(next_ts = self.next_ts, "Resumed after stall");
                    self.trim_until = Some(seeked.required_ts);
                    self.resync_pending = false;
                }
                Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::WouldBlock => {
                    trace!("Source still stalled");
                    return true;
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        next_ts = self.next_ts,
                        "Cannot resume after stall, samples skipped"
                    );
                    self.resync_pending = false;
                }
            }
        }

        loop {
            let packet = match reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    debug!("Reached end of stream");
                    self.state = EngineState::EndOfStream;
                    return true;
                }
                Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::WouldBlock => {
                    trace!(next_ts = self.next_ts, "Source stalled, no frame this round");
                    self.resync_pending = true;
                    return true;
                }
                Err(SymphoniaError::ResetRequired) => {
                    debug!("Track list changed, treating as end of stream");
                    self.state = EngineState::EndOfStream;
                    return true;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read packet");
                    return false;
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let skip = match self.trim_until {
                Some(until) if packet.ts() + packet.dur() <= until => continue,
                Some(until) => {
                    self.trim_until = None;
                    until.saturating_sub(packet.ts()) as usize
                }
                None => 0,
            };

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(e) => {
                    warn!(error = %e, ts = packet.ts(), "Failed to decode frame");
                    return false;
                }
            };
            let frames = decoded.frames();
            let channels = decoded.spec().channels.count();
            if frames == 0 {
                continue;
            }

            self.next_ts = packet.ts() + packet.dur();
            let planar = self.converter.convert(decoded, self.bits_per_sample);
            let frame =
                DecodedFrame::new(planar, frames, channels, frames, packet.ts()).trimmed_front(skip);
            sink.on_frame(&frame);
            return true;
        }
    }

    fn flush(&mut self) -> bool {
        let Some(decoder) = self.decoder.as_mut() else {
            return false;
        };
        decoder.reset();
        self.trim_until = None;
        if self.state != EngineState::Aborted {
            self.state = EngineState::Normal;
        }
        true
    }

    fn seek_absolute(&mut self, sample: u64) -> bool {
        let (Some(reader), Some(decoder)) = (self.reader.as_mut(), self.decoder.as_mut()) else {
            return false;
        };

        match reader.seek(
            SeekMode::Accurate,
            SeekTo::TimeStamp {
                ts: sample,
                track_id: self.track_id,
            },
        ) {
            Ok(seeked) => {
                decoder.reset();
                trace!(
                    required_ts = seeked.required_ts,
                    actual_ts = seeked.actual_ts,
                    "Reader positioned"
                );
                self.trim_until = Some(seeked.required_ts);
                self.next_ts = seeked.required_ts;
                self.resync_pending = false;
                self.state = EngineState::Normal;
                true
            }
            Err(e) => {
                debug!(sample, error = %e, "Absolute seek rejected");
                self.state = EngineState::SeekFailed;
                false
            }
        }
    }

    fn state(&self) -> EngineState {
        self.state
    }
}
