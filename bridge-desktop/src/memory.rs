//! In-Memory Byte Source

use bridge_traits::{
    error::{BridgeError, Result},
    source::{ByteSource, SourceType},
};
use bytes::Bytes;

/// Byte source over an in-memory buffer.
///
/// Cloning the underlying `Bytes` is cheap, so several sources can share one
/// downloaded or cached file.
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Bytes,
    position: usize,
}

impl MemorySource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            position: 0,
        }
    }

    /// Bytes not yet read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }
}

impl ByteSource for MemorySource {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = buf.len().min(self.remaining());
        buf[..n].copy_from_slice(&self.data[self.position..self.position + n]);
        self.position += n;
        Ok(n)
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        let offset = usize::try_from(offset)
            .ok()
            .filter(|&o| o <= self.data.len())
            .ok_or_else(|| {
                BridgeError::OperationFailed(format!(
                    "seek to {} outside buffer of {} bytes",
                    offset,
                    self.data.len()
                ))
            })?;
        self.position = offset;
        Ok(())
    }

    fn tell(&self) -> u64 {
        self.position as u64
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn source_type(&self) -> SourceType {
        SourceType::Memory
    }
}
