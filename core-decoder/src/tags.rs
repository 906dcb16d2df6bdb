//! # Tags & Replay Gain
//!
//! Vorbis comments captured at open, exposed as display tags, replay gain
//! values and message-window lines.

use bridge_traits::host::GainKind;

use crate::engine::VorbisComment;

const GAIN_TAGS: [(&str, GainKind); 3] = [
    ("replaygain_track_gain=", GainKind::Track),
    ("replaygain_album_gain=", GainKind::Album),
    ("replaygain_track_peak=", GainKind::TrackPeak),
];

/// Comments from the first Vorbis comment block of a stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    vendor: Option<String>,
    comments: Vec<String>,
}

impl From<VorbisComment> for TagSet {
    fn from(block: VorbisComment) -> Self {
        Self {
            vendor: block.vendor,
            comments: block.comments,
        }
    }
}

impl TagSet {
    pub fn vendor(&self) -> Option<&str> {
        self.vendor.as_deref()
    }

    /// Raw `NAME=value` entries in stream order.
    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    pub fn is_empty(&self) -> bool {
        self.vendor.is_none() && self.comments.is_empty()
    }

    /// Display tags: `filetype=FLAC` first, then every comment with a name
    /// and a non-empty value.
    pub fn pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("filetype".to_string(), "FLAC".to_string())];
        pairs.extend(self.comments.iter().filter_map(|comment| {
            let (name, value) = comment.split_once('=')?;
            (!value.is_empty()).then(|| (name.to_string(), value.to_string()))
        }));
        pairs
    }

    /// Replay gain values, in stream order.
    pub fn replay_gain(&self) -> Vec<(GainKind, f32)> {
        self.comments
            .iter()
            .filter_map(|comment| {
                GAIN_TAGS.iter().find_map(|&(prefix, kind)| {
                    strip_prefix_ignore_case(comment, prefix)
                        .map(|value| (kind, parse_leading_float(value) as f32))
                })
            })
            .collect()
    }

    /// Message-window entries: `(name, value)` split at the first `=`, or
    /// `(None, comment)` when there is none. Cue sheets are left out.
    pub fn message_lines(&self) -> Vec<(Option<&str>, &str)> {
        self.comments
            .iter()
            .filter(|comment| strip_prefix_ignore_case(comment, "cuesheet=").is_none())
            .map(|comment| match comment.split_once('=') {
                Some((name, value)) => (Some(name), value),
                None => (None, comment.as_str()),
            })
            .collect()
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

/// Parse the longest numeric prefix of `s`, ignoring leading whitespace.
///
/// Returns 0.0 when there is none, so `"-6.5 dB"` reads as -6.5 and `"n/a"`
/// as 0.
pub fn parse_leading_float(s: &str) -> f64 {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let int_end = digits_from(end);
    let mut mantissa_end = int_end;
    if bytes.get(int_end) == Some(&b'.') {
        mantissa_end = digits_from(int_end + 1);
    }
    // A lone sign or dot is not a number
    if mantissa_end - end <= usize::from(mantissa_end > int_end) {
        return 0.0;
    }
    end = mantissa_end;

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }

    s[..end].parse().unwrap_or(0.0)
}
