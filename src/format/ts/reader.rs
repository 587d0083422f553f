use super::types::TS_PACKET_SIZE;
use crate::error::{Result, ReplayError};
use bytes::{Bytes, BytesMut};
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Reads a transport stream in fixed-size, packet-aligned chunks.
///
/// Every chunk is `chunk_size` bytes except possibly the last one, which
/// is returned only when it still holds whole packets.
pub struct ChunkReader<R: AsyncRead + Unpin> {
    reader: R,
    chunk_size: usize,
    finished: bool,
    chunks_read: u64,
    bytes_read: u64,
}

impl ChunkReader<File> {
    /// Opens `path` for chunked reading.
    pub async fn open<P: AsRef<Path>>(path: P, chunk_size: usize) -> Result<Self> {
        validate_chunk_size(chunk_size)?;
        let file = File::open(path.as_ref()).await?;
        Self::new(file, chunk_size)
    }
}

impl<R: AsyncRead + Unpin> ChunkReader<R> {
    /// Wraps an async reader. `chunk_size` must be a positive multiple of 188.
    pub fn new(reader: R, chunk_size: usize) -> Result<Self> {
        validate_chunk_size(chunk_size)?;
        Ok(Self {
            reader,
            chunk_size,
            finished: false,
            chunks_read: 0,
            bytes_read: 0,
        })
    }

    pub fn chunks_read(&self) -> u64 {
        self.chunks_read
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Returns the next chunk, or `None` at end of stream.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        if self.finished {
            return Ok(None);
        }

        let mut buf = BytesMut::zeroed(self.chunk_size);
        let filled = self.fill(&mut buf).await?;

        if filled < self.chunk_size {
            self.finished = true;
            if filled == 0 {
                return Ok(None);
            }
            if filled % TS_PACKET_SIZE != 0 {
                return Err(ReplayError::Protocol(format!(
                    "trailing remainder of {} bytes is not packet aligned",
                    filled
                )));
            }
            buf.truncate(filled);
        }

        self.chunks_read += 1;
        self.bytes_read += filled as u64;
        Ok(Some(buf.freeze()))
    }

    /// Reads until `buf` is full or the source is exhausted.
    async fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]).await {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }
}

fn validate_chunk_size(chunk_size: usize) -> Result<()> {
    if chunk_size == 0 || chunk_size % TS_PACKET_SIZE != 0 {
        return Err(ReplayError::Config(format!(
            "chunk size {} is not a positive multiple of {}",
            chunk_size, TS_PACKET_SIZE
        )));
    }
    Ok(())
}
