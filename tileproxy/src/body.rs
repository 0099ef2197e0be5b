//! Streaming tile payloads.
//!
//! Every layer hands tile data around as a [`TileBody`]: an owned async byte
//! stream that may be backed by an in-memory buffer, an open cache blob, or a
//! live upstream response. Callers either stream it (HTTP responses) or drain
//! it with [`TileBody::into_bytes`].

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

/// Initial buffer size when no length hint is available.
const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;

/// Upper bound on up-front allocation; hints come from untrusted headers.
const MAX_PREALLOC: u64 = 1024 * 1024;

/// Where a body's bytes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodySource {
    /// Fully buffered in memory
    Memory,
    /// Streaming from a cached blob on disk
    Cache,
    /// Streaming from an upstream response
    Upstream,
}

/// An owned, readable tile payload.
pub struct TileBody {
    reader: Pin<Box<dyn AsyncRead + Send>>,
    source: BodySource,
    len_hint: Option<u64>,
}

impl TileBody {
    /// Wraps an in-memory buffer.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes: Bytes = bytes.into();
        let len = bytes.len() as u64;
        Self {
            reader: Box::pin(io::Cursor::new(bytes)),
            source: BodySource::Memory,
            len_hint: Some(len),
        }
    }

    /// Wraps an arbitrary async reader.
    pub fn from_reader<R>(reader: R, source: BodySource) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Self {
            reader: Box::pin(reader),
            source,
            len_hint: None,
        }
    }

    /// Sets the expected payload length, when known.
    pub fn with_len_hint(mut self, len: u64) -> Self {
        self.len_hint = Some(len);
        self
    }

    /// Returns where this body's bytes come from.
    pub fn source(&self) -> BodySource {
        self.source
    }

    /// Returns the payload length if it is known up front.
    pub fn len_hint(&self) -> Option<u64> {
        self.len_hint
    }

    /// Drains the body into a single buffer.
    pub async fn into_bytes(mut self) -> io::Result<Bytes> {
        let capacity = self
            .len_hint
            .map_or(DEFAULT_BUFFER_SIZE, |n| n.min(MAX_PREALLOC) as usize);
        let mut buffer = Vec::with_capacity(capacity);
        self.reader.read_to_end(&mut buffer).await?;
        Ok(Bytes::from(buffer))
    }
}

impl AsyncRead for TileBody {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.reader.as_mut().poll_read(cx, buf)
    }
}

impl fmt::Debug for TileBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileBody")
            .field("source", &self.source)
            .field("len_hint", &self.len_hint)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_bytes_drains_to_same_bytes() {
        let body = TileBody::from_bytes(vec![1u8, 2, 3]);
        assert_eq!(body.source(), BodySource::Memory);
        assert_eq!(body.len_hint(), Some(3));
        assert_eq!(body.into_bytes().await.unwrap(), Bytes::from_static(&[1, 2, 3]));
    }

    #[tokio::test]
    async fn test_from_reader_keeps_source() {
        let body = TileBody::from_reader(io::Cursor::new(b"abc".to_vec()), BodySource::Upstream);
        assert_eq!(body.source(), BodySource::Upstream);
        assert_eq!(body.len_hint(), None);
        assert_eq!(body.into_bytes().await.unwrap().as_ref(), b"abc");
    }

    #[tokio::test]
    async fn test_oversized_len_hint_reads_actual_bytes() {
        let body = TileBody::from_reader(io::Cursor::new(b"abc".to_vec()), BodySource::Upstream)
            .with_len_hint(u64::MAX);
        assert_eq!(body.len_hint(), Some(u64::MAX));
        assert_eq!(body.into_bytes().await.unwrap().as_ref(), b"abc");
    }

    #[tokio::test]
    async fn test_body_longer_than_prealloc_cap() {
        let payload = vec![7u8; (MAX_PREALLOC as usize) + 10];
        let body = TileBody::from_reader(io::Cursor::new(payload.clone()), BodySource::Upstream)
            .with_len_hint(payload.len() as u64);
        assert_eq!(body.into_bytes().await.unwrap().len(), payload.len());
    }
}
