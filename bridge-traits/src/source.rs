//! Byte Source Abstraction
//!
//! The host's file facility as seen by a decoder: a readable, possibly
//! seekable byte stream that may be backed by a local file, a memory buffer,
//! or a network connection that is still downloading.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Kind of storage behind a [`ByteSource`].
///
/// Ordered from "fully local" to "live": anything past [`SourceType::LocalFile`]
/// is network backed and may run dry while still connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Entire stream held in memory
    Memory,
    /// Local filesystem file
    LocalFile,
    /// Remote file with a known size, downloaded progressively
    NetworkFile,
    /// Live network stream, size and seekability not guaranteed
    NetworkStream,
}

impl SourceType {
    /// Returns `true` if the bytes arrive over the network.
    pub fn is_network(&self) -> bool {
        *self > SourceType::LocalFile
    }

    /// Returns `true` if byte-level seeking can be expected to work.
    pub fn is_seekable(&self) -> bool {
        !matches!(self, SourceType::NetworkStream)
    }
}

/// Readable byte stream provided by the host.
///
/// Mirrors the host's file routines: every call is synchronous and returns as
/// soon as it can. A network source that has no data *yet* returns `Ok(0)`
/// from [`read`](ByteSource::read) while [`is_connected`](ByteSource::is_connected)
/// stays `true`; callers decide whether to wait ([`pre_buffer`](ByteSource::pre_buffer))
/// or come back later.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::source::ByteSource;
///
/// fn sniff(source: &mut dyn ByteSource) -> bridge_traits::error::Result<[u8; 4]> {
///     let mut sig = [0u8; 4];
///     source.read(&mut sig)?;
///     source.seek(0)?;
///     Ok(sig)
/// }
/// ```
pub trait ByteSource: Send {
    /// Read up to `buf.len()` bytes, returning how many were read.
    ///
    /// `Ok(0)` means "nothing available right now"; whether that is the end of
    /// the stream depends on [`is_connected`](ByteSource::is_connected).
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Move the read position to an absolute byte offset.
    fn seek(&mut self, offset: u64) -> Result<()>;

    /// Current absolute read position.
    fn tell(&self) -> u64;

    /// Total size in bytes (0 when unknown).
    fn size(&self) -> u64;

    /// Storage kind behind this source.
    fn source_type(&self) -> SourceType;

    /// Whether a network connection is still delivering data.
    ///
    /// Local sources are never "connected": running out of bytes is final.
    fn is_connected(&self) -> bool {
        false
    }

    /// Ask a network source to buffer more data before the next read.
    ///
    /// Returns `true` if more data was buffered and a retry is worthwhile.
    fn pre_buffer(&mut self) -> bool {
        false
    }

    /// Tell a network source the expected consumption rate in bytes/second
    /// so it can size its buffering.
    fn set_net_rate(&mut self, _bytes_per_sec: u32) {}
}

impl<T: ByteSource + ?Sized> ByteSource for Box<T> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        (**self).seek(offset)
    }

    fn tell(&self) -> u64 {
        (**self).tell()
    }

    fn size(&self) -> u64 {
        (**self).size()
    }

    fn source_type(&self) -> SourceType {
        (**self).source_type()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn pre_buffer(&mut self) -> bool {
        (**self).pre_buffer()
    }

    fn set_net_rate(&mut self, bytes_per_sec: u32) {
        (**self).set_net_rate(bytes_per_sec)
    }
}
