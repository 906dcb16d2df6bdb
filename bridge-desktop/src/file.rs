//! Local File Byte Source using `std::fs`

use bridge_traits::{
    error::{BridgeError, Result},
    source::{ByteSource, SourceType},
};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Byte source backed by a local file.
///
/// Reads go straight to the file handle; the size is captured at open time.
pub struct LocalFileSource {
    file: File,
    path: PathBuf,
    size: u64,
    position: u64,
}

impl LocalFileSource {
    /// Open a file for reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(Self::map_io_error)?;
        let size = file.metadata().map_err(Self::map_io_error)?.len();
        debug!(path = ?path, size, "Opened local file source");

        Ok(Self {
            file,
            path,
            size,
            position: 0,
        })
    }

    /// Path the source was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Convert std::io::Error to BridgeError
    fn map_io_error(e: std::io::Error) -> BridgeError {
        BridgeError::Io(e)
    }
}

impl ByteSource for LocalFileSource {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.file.read(buf).map_err(Self::map_io_error)?;
        self.position += n as u64;
        Ok(n)
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        if offset > self.size {
            return Err(BridgeError::OperationFailed(format!(
                "seek to {} past end of {:?} ({} bytes)",
                offset, self.path, self.size
            )));
        }
        self.position = self
            .file
            .seek(SeekFrom::Start(offset))
            .map_err(Self::map_io_error)?;
        Ok(())
    }

    fn tell(&self) -> u64 {
        self.position
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn source_type(&self) -> SourceType {
        SourceType::LocalFile
    }
}
