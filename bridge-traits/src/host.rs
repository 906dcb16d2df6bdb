//! Decoder Host Callbacks
//!
//! The small surface a decoder uses to talk back to the player that drives it.

use serde::{Deserialize, Serialize};

/// Replay gain slot reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GainKind {
    /// Per-track gain in dB
    Track,
    /// Per-album gain in dB
    Album,
    /// Per-track peak amplitude
    TrackPeak,
}

/// Callbacks into the player hosting a decode session.
///
/// All methods are invoked from the thread that drives the session; the host
/// must not call back into the same session from inside them.
pub trait DecoderHost: Send + Sync {
    /// Report the stream length in seconds.
    ///
    /// Called once at open when the length is known, or later when it is
    /// discovered by decoding to the end.
    fn set_length(&self, seconds: f64);

    /// Report a replay gain value found in the stream's tags.
    fn set_gain(&self, kind: GainKind, value: f32);

    /// Cooperative cancellation check, polled during long decode loops.
    fn check_cancel(&self) -> bool {
        false
    }
}

/// Host that ignores every notification and never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl DecoderHost for NullHost {
    fn set_length(&self, _seconds: f64) {}

    fn set_gain(&self, _kind: GainKind, _value: f32) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use mockall::predicate::*;

    mock! {
        Host {}

        impl DecoderHost for Host {
            fn set_length(&self, seconds: f64);
            fn set_gain(&self, kind: GainKind, value: f32);
            fn check_cancel(&self) -> bool;
        }
    }

    #[test]
    fn null_host_never_cancels() {
        let host = NullHost;
        host.set_length(12.5);
        host.set_gain(GainKind::Album, -3.0);
        assert!(!host.check_cancel());
    }

    #[test]
    fn host_usable_as_trait_object() {
        let mut mock = MockHost::new();
        mock.expect_set_gain()
            .with(eq(GainKind::Track), eq(-6.5f32))
            .times(1)
            .return_const(());
        mock.expect_check_cancel().return_const(true);

        let host: &dyn DecoderHost = &mock;
        host.set_gain(GainKind::Track, -6.5);
        assert!(host.check_cancel());
    }
}
