//! Driver-facing chunk reader
//!
//! Reads the bytes behind a `ChunkPath` into a buffer that is reused across
//! calls. The buffer only grows; the chunk is always read into the
//! enlarged buffer, never into a stale smaller one.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::PathBuf;

use super::errors::{IndexError, IndexResult};
use super::path::ChunkPath;

/// Reusable reader keeping the last opened file handle
#[derive(Debug, Default)]
pub struct ChunkReader {
    buffer: Vec<u8>,
    open: Option<(PathBuf, File)>,
}

impl ChunkReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity],
            open: None,
        }
    }

    /// Current buffer capacity in bytes
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    fn ensure_open(&mut self, path: &ChunkPath) -> IndexResult<()> {
        if matches!(&self.open, Some((open_path, _)) if *open_path == path.file) {
            return Ok(());
        }
        let file = File::open(&path.file).map_err(|e| {
            IndexError::chunk_read_failed(format!("cannot open {}", path.file.display()), e)
        })?;
        self.open = Some((path.file.clone(), file));
        Ok(())
    }

    /// Read one chunk. The returned slice is valid until the next call.
    ///
    /// The chunk must lie inside the file as it is now; the buffer is only
    /// grown once that holds.
    pub fn read(&mut self, path: &ChunkPath) -> IndexResult<&[u8]> {
        let length = usize::try_from(path.length)
            .map_err(|_| IndexError::internal(format!("chunk {} too large for memory", path)))?;

        self.ensure_open(path)?;
        let Some((_, file)) = self.open.as_mut() else {
            return Err(IndexError::internal("chunk reader lost its file handle"));
        };

        let file_len = file
            .metadata()
            .map_err(|e| {
                IndexError::chunk_read_failed(format!("cannot stat {}", path.file.display()), e)
            })?
            .len();
        if path.offset.checked_add(path.length).map_or(true, |end| end > file_len) {
            return Err(IndexError::chunk_read_failed(
                format!("chunk {} ends past the file ({} bytes)", path, file_len),
                io::Error::new(io::ErrorKind::UnexpectedEof, "chunk past end of file"),
            ));
        }

        if self.buffer.len() < length {
            self.buffer.resize(length, 0);
        }
        file.seek(SeekFrom::Start(path.offset))
            .map_err(|e| IndexError::chunk_read_failed(format!("seek to {} failed", path), e))?;
        file.read_exact(&mut self.buffer[..length])
            .map_err(|e| IndexError::chunk_read_failed(format!("read of {} failed", path), e))?;

        Ok(&self.buffer[..length])
    }

    /// Read one chunk into an owned vector.
    pub fn read_to_vec(&mut self, path: &ChunkPath) -> IndexResult<Vec<u8>> {
        self.read(path).map(<[u8]>::to_vec)
    }
}
