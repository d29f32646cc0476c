//! Chunk streamer - fixed-size chunks over an immutable payload

use std::iter::FusedIterator;

use bytes::Bytes;

/// Chunk size used for maps and internal state
pub const CHUNK_SIZE_BYTES: usize = 1024 * 1024;

/// Lazy, finite, non-restartable sequence of chunks
///
/// Each chunk is a `Bytes` slice sharing the payload's buffer, so producing
/// a chunk never copies. Once exhausted the stream keeps returning `None`.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use slam_service::ChunkStream;
///
/// let mut stream = ChunkStream::with_chunk_size(Bytes::from_static(b"abcde"), 2);
/// assert_eq!(stream.next_chunk().as_deref(), Some(&b"ab"[..]));
/// assert_eq!(stream.next_chunk().as_deref(), Some(&b"cd"[..]));
/// assert_eq!(stream.next_chunk().as_deref(), Some(&b"e"[..]));
/// assert_eq!(stream.next_chunk(), None);
/// ```
#[derive(Debug, Clone)]
pub struct ChunkStream {
    payload: Bytes,
    chunk_size: usize,
    cursor: usize,
}

impl ChunkStream {
    /// Stream `payload` in chunks of [`CHUNK_SIZE_BYTES`]
    pub fn new(payload: Bytes) -> Self {
        Self::with_chunk_size(payload, CHUNK_SIZE_BYTES)
    }

    /// Stream `payload` in chunks of `chunk_size` bytes (at least one)
    pub fn with_chunk_size(payload: Bytes, chunk_size: usize) -> Self {
        Self {
            payload,
            chunk_size: chunk_size.max(1),
            cursor: 0,
        }
    }

    /// Next chunk, or `None` at end of stream
    pub fn next_chunk(&mut self) -> Option<Bytes> {
        if self.cursor >= self.payload.len() {
            return None;
        }
        let end = (self.cursor + self.chunk_size).min(self.payload.len());
        let chunk = self.payload.slice(self.cursor..end);
        self.cursor = end;
        Some(chunk)
    }

    /// Payload size
    pub fn total_len(&self) -> usize {
        self.payload.len()
    }

    /// Bytes not yet handed out
    pub fn remaining_bytes(&self) -> usize {
        self.payload.len() - self.cursor
    }

    /// Chunks not yet handed out
    pub fn remaining_chunks(&self) -> usize {
        self.remaining_bytes().div_ceil(self.chunk_size)
    }
}

impl Iterator for ChunkStream {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        self.next_chunk()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining_chunks();
        (n, Some(n))
    }
}

impl ExactSizeIterator for ChunkStream {}

impl FusedIterator for ChunkStream {}
