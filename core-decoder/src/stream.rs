//! # Stream Adapter
//!
//! Presents a host [`ByteSource`] as the read/seek/tell/length/eof surface a
//! codec engine pulls from, including the network stall policy.

use std::sync::Arc;

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::source::{ByteSource, SourceType};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

/// Stream adapter shared between a session and its codec engine.
pub type SharedStream = Arc<Mutex<StreamAdapter>>;

/// Result of a single [`StreamAdapter::read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were written to the front of the buffer.
    Data(usize),
    /// The source is connected but has nothing yet; try again later.
    Pending,
    /// The source is exhausted or failed.
    EndOfStream,
    /// A zero-length read was requested.
    Aborted,
}

/// Byte-level I/O surface handed to the codec engine.
pub struct StreamAdapter {
    source: Box<dyn ByteSource>,
    eof: bool,
    scratch_empty: bool,
}

impl StreamAdapter {
    pub fn new(source: Box<dyn ByteSource>) -> Self {
        Self {
            source,
            eof: false,
            scratch_empty: true,
        }
    }

    /// Wrap the adapter for sharing with a codec engine.
    pub fn into_shared(self) -> SharedStream {
        Arc::new(Mutex::new(self))
    }

    /// Read up to `buf.len()` bytes.
    ///
    /// A connected network source that runs dry is not treated as the end:
    /// with an empty scratch buffer the decoder is probing (e.g. seeking) and
    /// gets [`ReadOutcome::Pending`] straight away; otherwise the source is
    /// asked to pre-buffer and the read is retried.
    pub fn read(&mut self, buf: &mut [u8]) -> ReadOutcome {
        if buf.is_empty() {
            return ReadOutcome::Aborted;
        }

        loop {
            let n = match self.source.read(buf) {
                Ok(n) => n,
                Err(e) => {
                    warn!(error = %e, "Byte source read failed, treating as end of stream");
                    self.eof = true;
                    return ReadOutcome::EndOfStream;
                }
            };

            if n > 0 {
                return ReadOutcome::Data(n);
            }

            if self.source.is_connected() {
                if self.scratch_empty {
                    trace!("Source stalled while scratch buffer is empty");
                    return ReadOutcome::Pending;
                }
                if self.source.pre_buffer() {
                    debug!("Source pre-buffered, retrying read");
                    continue;
                }
            }

            self.eof = true;
            return ReadOutcome::EndOfStream;
        }
    }

    /// Move to an absolute byte offset; success clears the end-of-stream flag.
    pub fn seek(&mut self, offset: u64) -> BridgeResult<()> {
        self.source.seek(offset).map_err(|e| {
            warn!(offset, error = %e, "Byte source seek failed");
            e
        })?;
        self.eof = false;
        Ok(())
    }

    pub fn tell(&self) -> u64 {
        self.source.tell()
    }

    /// Total stream length in bytes (0 when unknown).
    pub fn length(&self) -> u64 {
        self.source.size()
    }

    pub fn is_at_end(&self) -> bool {
        self.eof
    }

    pub fn source_type(&self) -> SourceType {
        self.source.source_type()
    }

    /// Record whether the session's scratch buffer holds no frame.
    pub fn set_scratch_empty(&mut self, empty: bool) {
        self.scratch_empty = empty;
    }

    /// Hint the expected byte rate to a network source.
    /// Ask a connected source to buffer more data; `true` if a retry is worthwhile.
    pub fn pre_buffer(&mut self) -> bool {
        self.source.is_connected() && self.source.pre_buffer()
    }

    pub fn set_net_rate(&mut self, bytes_per_sec: u32) {
        self.source.set_net_rate(bytes_per_sec);
    }

    /// Read the first four bytes of the stream, then rewind to the start.
    ///
    /// Goes straight to the source: the stall policy does not apply before a
    /// codec engine exists, so a connected source that runs dry is asked to
    /// pre-buffer.
    pub fn read_signature(&mut self) -> BridgeResult<Option<[u8; 4]>> {
        let mut sig = [0u8; 4];
        let mut filled = 0;
        while filled < sig.len() {
            let n = self.source.read(&mut sig[filled..])?;
            if n == 0 {
                if self.source.is_connected() && self.source.pre_buffer() {
                    continue;
                }
                break;
            }
            filled += n;
        }
        self.seek(0)?;
        Ok((filled == sig.len()).then_some(sig))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use mockall::mock;
    use mockall::Sequence;

    mock! {
        Source {}

        impl ByteSource for Source {
            fn read(&mut self, buf: &mut [u8]) -> BridgeResult<usize>;
            fn seek(&mut self, offset: u64) -> BridgeResult<()>;
            fn tell(&self) -> u64;
            fn size(&self) -> u64;
            fn source_type(&self) -> SourceType;
            fn is_connected(&self) -> bool;
            fn pre_buffer(&mut self) -> bool;
            fn set_net_rate(&mut self, bytes_per_sec: u32);
        }
    }

    #[test]
    fn test_zero_length_read_aborts() {
        let mut adapter = StreamAdapter::new(Box::new(MockSource::new()));
        assert_eq!(adapter.read(&mut []), ReadOutcome::Aborted);
    }

    #[test]
    fn test_stall_with_empty_scratch_is_pending() {
        let mut source = MockSource::new();
        source.expect_read().returning(|_| Ok(0));
        source.expect_is_connected().return_const(true);
        source.expect_pre_buffer().never();

        let mut adapter = StreamAdapter::new(Box::new(source));
        let mut buf = [0u8; 16];
        assert_eq!(adapter.read(&mut buf), ReadOutcome::Pending);
        assert!(!adapter.is_at_end());
    }

    #[test]
    fn test_stall_with_data_buffered_pre_buffers_and_retries() {
        let mut seq = Sequence::new();
        let mut source = MockSource::new();
        source
            .expect_read()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(0));
        source.expect_is_connected().return_const(true);
        source
            .expect_pre_buffer()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(true);
        source
            .expect_read()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|buf| {
                buf[..3].copy_from_slice(b"abc");
                Ok(3)
            });

        let mut adapter = StreamAdapter::new(Box::new(source));
        adapter.set_scratch_empty(false);
        let mut buf = [0u8; 8];
        assert_eq!(adapter.read(&mut buf), ReadOutcome::Data(3));
        assert_eq!(&buf[..3], b"abc");
    }

    #[test]
    fn test_refused_pre_buffer_ends_stream() {
        let mut source = MockSource::new();
        source.expect_read().returning(|_| Ok(0));
        source.expect_is_connected().return_const(true);
        source.expect_pre_buffer().times(1).return_const(false);

        let mut adapter = StreamAdapter::new(Box::new(source));
        adapter.set_scratch_empty(false);
        let mut buf = [0u8; 8];
        assert_eq!(adapter.read(&mut buf), ReadOutcome::EndOfStream);
        assert!(adapter.is_at_end());
    }

    #[test]
    fn test_disconnected_source_ends_stream() {
        let mut source = MockSource::new();
        source.expect_read().returning(|_| Ok(0));
        source.expect_is_connected().return_const(false);

        let mut adapter = StreamAdapter::new(Box::new(source));
        let mut buf = [0u8; 8];
        assert_eq!(adapter.read(&mut buf), ReadOutcome::EndOfStream);
        assert!(adapter.is_at_end());
    }

    #[test]
    fn test_read_error_reported_as_end() {
        let mut source = MockSource::new();
        source
            .expect_read()
            .returning(|_| Err(BridgeError::Disconnected("socket closed".into())));

        let mut adapter = StreamAdapter::new(Box::new(source));
        let mut buf = [0u8; 8];
        assert_eq!(adapter.read(&mut buf), ReadOutcome::EndOfStream);
        assert!(adapter.is_at_end());
    }

    #[test]
    fn test_seek_clears_end_flag_only_on_success() {
        let mut source = MockSource::new();
        source.expect_read().returning(|_| Ok(0));
        source.expect_is_connected().return_const(false);
        source
            .expect_seek()
            .withf(|offset| *offset == 100)
            .returning(|_| Err(BridgeError::OperationFailed("past end".into())));
        source.expect_seek().withf(|offset| *offset == 0).returning(|_| Ok(()));

        let mut adapter = StreamAdapter::new(Box::new(source));
        let mut buf = [0u8; 8];
        adapter.read(&mut buf);
        assert!(adapter.is_at_end());

        assert!(adapter.seek(100).is_err());
        assert!(adapter.is_at_end());

        assert!(adapter.seek(0).is_ok());
        assert!(!adapter.is_at_end());
    }

    #[test]
    fn test_passthroughs() {
        let mut source = MockSource::new();
        source.expect_tell().return_const(42u64);
        source.expect_size().return_const(1000u64);
        source.expect_source_type().return_const(SourceType::NetworkFile);
        source
            .expect_set_net_rate()
            .withf(|rate| *rate == 22050)
            .times(1)
            .return_const(());

        let mut adapter = StreamAdapter::new(Box::new(source));
        assert_eq!(adapter.tell(), 42);
        assert_eq!(adapter.length(), 1000);
        assert_eq!(adapter.source_type(), SourceType::NetworkFile);
        adapter.set_net_rate(22050);
    }

    #[test]
    fn test_read_signature_rewinds() {
        let mut source = MockSource::new();
        source.expect_read().times(1).returning(|buf| {
            buf[..4].copy_from_slice(b"fLaC");
            Ok(4)
        });
        source.expect_seek().withf(|offset| *offset == 0).times(1).returning(|_| Ok(()));

        let mut adapter = StreamAdapter::new(Box::new(source));
        assert_eq!(adapter.read_signature().unwrap(), Some(*b"fLaC"));
    }

    #[test]
    fn test_read_signature_short_stream() {
        let mut seq = Sequence::new();
        let mut source = MockSource::new();
        source
            .expect_read()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|buf| {
                buf[..2].copy_from_slice(b"fL");
                Ok(2)
            });
        source
            .expect_read()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(0));
        source.expect_is_connected().return_const(false);
        source.expect_seek().returning(|_| Ok(()));

        let mut adapter = StreamAdapter::new(Box::new(source));
        assert_eq!(adapter.read_signature().unwrap(), None);
    }

    #[test]
    fn test_read_signature_waits_out_stall() {
        let mut seq = Sequence::new();
        let mut source = MockSource::new();
        source
            .expect_read()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(0));
        source.expect_is_connected().return_const(true);
        source
            .expect_pre_buffer()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(true);
        source
            .expect_read()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|buf| {
                buf[..4].copy_from_slice(b"OggS");
                Ok(4)
            });
        source.expect_seek().returning(|_| Ok(()));

        let mut adapter = StreamAdapter::new(Box::new(source));
        assert_eq!(adapter.read_signature().unwrap(), Some(*b"OggS"));
    }

    #[test]
    fn test_pre_buffer_skipped_when_disconnected() {
        let mut source = MockSource::new();
        source.expect_is_connected().return_const(false);
        source.expect_pre_buffer().never();

        let mut adapter = StreamAdapter::new(Box::new(source));
        assert!(!adapter.pre_buffer());
    }
}
