//! # FLAC Decoder Facade
//!
//! The surface a host drives: format sniffing, file info without playback,
//! and opening sessions.

use std::sync::Arc;

use bridge_traits::host::{DecoderHost, NullHost};
use bridge_traits::source::ByteSource;
use tracing::{debug, instrument};

use crate::config::DecoderConfig;
use crate::engine::CodecBackend;
use crate::error::Result;
use crate::session::Session;

/// Offset of the `FLAC` mapping marker inside the first Ogg page.
const OGG_FLAC_MARKER_OFFSET: usize = 0x1d;

/// Length and display tags of a stream, read without starting playback.
#[derive(Debug, Clone, PartialEq)]
pub struct FileInfo {
    /// Length in seconds, when the header carries a sample total.
    pub length_secs: Option<f64>,
    /// Display tags, `filetype=FLAC` first.
    pub tags: Vec<(String, String)>,
}

/// Opens FLAC decode sessions against a codec backend.
#[derive(Clone)]
pub struct FlacDecoder {
    backend: Arc<dyn CodecBackend>,
    host: Arc<dyn DecoderHost>,
    config: DecoderConfig,
}

impl std::fmt::Debug for FlacDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlacDecoder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FlacDecoder {
    pub fn new(backend: Arc<dyn CodecBackend>, host: Arc<dyn DecoderHost>) -> Self {
        Self {
            backend,
            host,
            config: DecoderConfig::default(),
        }
    }

    /// Replace the configuration after validating it.
    pub fn with_config(mut self, config: DecoderConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Decoder backed by symphonia.
    #[cfg(feature = "decoder-flac")]
    pub fn symphonia(host: Arc<dyn DecoderHost>) -> Self {
        Self::new(Arc::new(crate::engine::SymphoniaBackend::default()), host)
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Cheap signature check on the first bytes of a file.
    ///
    /// Accepts a native stream (`fLaC`) or an Ogg page whose first packet is
    /// the FLAC mapping header. Needs 33 bytes to recognise Ogg FLAC.
    pub fn check_format(header: &[u8]) -> bool {
        header.starts_with(b"fLaC")
            || (header.starts_with(b"OggS")
                && header
                    .get(OGG_FLAC_MARKER_OFFSET..OGG_FLAC_MARKER_OFFSET + 4)
                    .is_some_and(|marker| marker == b"FLAC"))
    }

    /// Read length and tags, then release the stream.
    ///
    /// The host is not notified of anything.
    #[instrument(skip_all)]
    pub fn file_info(&self, source: Box<dyn ByteSource>) -> Result<FileInfo> {
        let session = Session::init(
            source,
            self.backend.as_ref(),
            Arc::new(NullHost),
            self.config.clone(),
        )?;
        let info = FileInfo {
            length_secs: session.length_secs(),
            tags: session.tags().pairs(),
        };
        debug!(length_secs = ?info.length_secs, tags = info.tags.len(), "Read file info");
        Ok(info)
    }

    /// Open a session for playback.
    pub fn open(&self, source: Box<dyn ByteSource>) -> Result<Session> {
        Session::open(
            source,
            self.backend.as_ref(),
            Arc::clone(&self.host),
            self.config.clone(),
        )
    }

    /// Length of one seek unit in seconds.
    pub fn granularity(&self) -> f64 {
        self.config.granularity_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ogg_page(marker: &[u8; 4]) -> Vec<u8> {
        let mut page = b"OggS".to_vec();
        page.resize(OGG_FLAC_MARKER_OFFSET, 0);
        page.extend_from_slice(marker);
        page
    }

    #[test]
    fn test_check_format_native() {
        assert!(FlacDecoder::check_format(b"fLaC\0\0\0\x22"));
        assert!(!FlacDecoder::check_format(b"fLa"));
        assert!(!FlacDecoder::check_format(b"RIFF....WAVE"));
    }

    #[test]
    fn test_check_format_ogg() {
        assert!(FlacDecoder::check_format(&ogg_page(b"FLAC")));
        assert!(!FlacDecoder::check_format(&ogg_page(b"vorb")));
        // Too short to hold the mapping marker
        assert!(!FlacDecoder::check_format(b"OggS\0\x02"));
    }

    #[cfg(feature = "decoder-flac")]
    #[test]
    fn test_with_config_validates() {
        let decoder = FlacDecoder::new(
            Arc::new(crate::engine::SymphoniaBackend::default()),
            Arc::new(NullHost),
        );
        let bad = DecoderConfig {
            seek_step_secs: 0.0,
            ..Default::default()
        };
        assert!(decoder.clone().with_config(bad).is_err());

        let good = DecoderConfig {
            granularity_secs: 0.01,
            ..Default::default()
        };
        assert_eq!(decoder.with_config(good).unwrap().granularity(), 0.01);
    }
}
