//! Info-window text for an open stream.
//!
//! Lines are `heading\tvalue` terminated by `\r`, the layout hosts expect for
//! their general and message panes.

use std::fmt::Write;

use crate::engine::{StreamInfo, StreamKind};
use crate::tags::TagSet;

/// Main panel summary, e.g. `FLAC - 905kb/s - 44100hz`.
pub fn info_text(info: &StreamInfo, byte_rate: u32) -> String {
    let mut text = String::from("FLAC - ");
    if byte_rate > 0 {
        let _ = write!(text, "{}kb/s - ", byte_rate / 125);
    }
    let _ = write!(text, "{}hz", info.sample_rate);
    text
}

/// General info pane.
pub fn general_info(info: &StreamInfo, kind: StreamKind, tags: &TagSet, byte_rate: u32) -> String {
    let mut text = String::from("Format\t");
    text.push_str(match kind {
        StreamKind::Native => "FLAC",
        StreamKind::Ogg => "Ogg FLAC",
    });
    if let Some(vendor) = tags.vendor() {
        let _ = write!(text, " ({})", vendor);
    }
    text.push('\r');
    if byte_rate > 0 {
        let _ = write!(text, "Bit rate\t{} kbps\r", byte_rate / 125);
    }
    let _ = write!(
        text,
        "Sample rate\t{} hz\rChannels\t{}\rResolution\t{} bit\r",
        info.sample_rate, info.channels, info.bits_per_sample
    );
    text
}

/// Message pane built from the stream's comments.
pub fn message_text(tags: &TagSet) -> String {
    tags.message_lines()
        .into_iter()
        .fold(String::new(), |mut text, (name, value)| {
            let _ = write!(text, "{}\t{}\r", name.unwrap_or_default(), value);
            text
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::VorbisComment;

    fn cd_info() -> StreamInfo {
        StreamInfo {
            sample_rate: 44100,
            channels: 2,
            bits_per_sample: 16,
            max_block_size: 4096,
            total_samples: 441000,
        }
    }

    #[test]
    fn test_info_text() {
        assert_eq!(info_text(&cd_info(), 113_125), "FLAC - 905kb/s - 44100hz");
        assert_eq!(info_text(&cd_info(), 0), "FLAC - 44100hz");
    }

    #[test]
    fn test_general_info_native() {
        let text = general_info(&cd_info(), StreamKind::Native, &TagSet::default(), 113_125);
        assert_eq!(
            text,
            "Format\tFLAC\rBit rate\t905 kbps\rSample rate\t44100 hz\rChannels\t2\rResolution\t16 bit\r"
        );
    }

    #[test]
    fn test_general_info_ogg_with_vendor() {
        let tags = TagSet::from(VorbisComment {
            vendor: Some("libFLAC 1.3.2".to_string()),
            comments: Vec::new(),
        });
        let text = general_info(&cd_info(), StreamKind::Ogg, &tags, 0);
        assert!(text.starts_with("Format\tOgg FLAC (libFLAC 1.3.2)\rSample rate"));
    }

    #[test]
    fn test_message_text() {
        let tags = TagSet::from(VorbisComment {
            vendor: None,
            comments: vec!["TITLE=Song".into(), "cuesheet=...".into(), "note".into()],
        });
        assert_eq!(message_text(&tags), "TITLE\tSong\r\tnote\r");
    }
}
