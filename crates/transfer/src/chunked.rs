use std::path::Path;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{DEFAULT_UPLOAD_CHUNK_SIZE, TransferError};

/// A slice of a staged file.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Byte offset within the file.
    pub offset: u64,
    /// Raw chunk data.
    pub data: Vec<u8>,
}

impl Chunk {
    /// Offset just past the end of this chunk.
    pub fn end(&self) -> u64 {
        self.offset + self.data.len() as u64
    }
}

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Reads a file in fixed-size chunks.
pub struct ChunkReader {
    file: tokio::fs::File,
    chunk_size: usize,
    offset: u64,
    file_size: u64,
}

impl ChunkReader {
    /// Opens `path` for chunked reading.
    ///
    /// If `chunk_size` is 0, [`DEFAULT_UPLOAD_CHUNK_SIZE`] is used.
    pub async fn open(path: &Path, chunk_size: usize) -> Result<Self, TransferError> {
        let file = tokio::fs::File::open(path).await?;
        let file_size = file.metadata().await?.len();
        let chunk_size = if chunk_size == 0 {
            DEFAULT_UPLOAD_CHUNK_SIZE
        } else {
            chunk_size
        };
        Ok(Self {
            file,
            chunk_size,
            offset: 0,
            file_size,
        })
    }

    /// Reads the next chunk. Returns `None` at EOF.
    ///
    /// Every chunk except the last is exactly `chunk_size` bytes.
    pub async fn next_chunk(&mut self) -> Result<Option<Chunk>, TransferError> {
        let remaining = self.remaining();
        if remaining == 0 {
            return Ok(None);
        }

        let read_size = remaining.min(self.chunk_size as u64) as usize;
        let mut buf = vec![0u8; read_size];
        self.file.read_exact(&mut buf).await?;

        let chunk = Chunk {
            offset: self.offset,
            data: buf,
        };
        self.offset += read_size as u64;
        Ok(Some(chunk))
    }

    /// Reads everything that is left in one buffer.
    pub async fn read_rest(&mut self) -> Result<Vec<u8>, TransferError> {
        let mut buf = Vec::with_capacity(self.remaining() as usize);
        self.file.read_to_end(&mut buf).await?;
        self.offset += buf.len() as u64;
        Ok(buf)
    }

    /// Current byte offset.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Total file size in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Bytes remaining to read.
    pub fn remaining(&self) -> u64 {
        self.file_size.saturating_sub(self.offset)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

/// Fills `buf` from `reader` until it is full or the reader hits EOF.
///
/// Returns the number of bytes placed in `buf`; anything short of
/// `buf.len()` means the stream ended.
pub async fn read_up_to<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
