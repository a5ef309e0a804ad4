//! Byte source adapter.
//!
//! Every input variant is fully drained into one contiguous buffer before any
//! scanning starts; there is no incremental parsing.

use std::fmt;
use std::io::Read;
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{ExtractError, ExtractResult};

/// Input handed to the extraction pipeline.
pub enum ByteSource {
    /// Content already in memory.
    Bytes(Vec<u8>),
    /// Content from file path.
    Path(PathBuf),
    /// An open file handle, read from its current position.
    File(tokio::fs::File),
    /// Any async byte stream.
    Reader(Box<dyn AsyncRead + Send + Unpin>),
}

impl ByteSource {
    /// Wrap an async reader.
    pub fn reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self::Reader(Box::new(reader))
    }

    /// Drain the source into an immutable buffer, reading at most `max_bytes`.
    pub async fn into_buffer(self, max_bytes: u64) -> ExtractResult<ByteBuffer> {
        let data = match self {
            ByteSource::Bytes(bytes) => {
                if bytes.len() as u64 > max_bytes {
                    return Err(too_large(max_bytes));
                }
                bytes
            }
            // tokio::fs needs a runtime; fall back to blocking reads without one.
            ByteSource::Path(path) if !has_runtime() => {
                read_bounded_blocking(std::fs::File::open(&path)?, max_bytes)?
            }
            ByteSource::Path(path) => {
                let file = tokio::fs::File::open(&path).await?;
                read_bounded(file, max_bytes).await?
            }
            ByteSource::File(file) if !has_runtime() => match file.try_into_std() {
                Ok(file) => read_bounded_blocking(file, max_bytes)?,
                Err(_) => {
                    return Err(ExtractError::Io(std::io::Error::new(
                        std::io::ErrorKind::WouldBlock,
                        "file has an operation in flight",
                    )))
                }
            },
            ByteSource::File(file) => read_bounded(file, max_bytes).await?,
            ByteSource::Reader(reader) => read_bounded(reader, max_bytes).await?,
        };

        Ok(ByteBuffer::new(data))
    }
}

impl fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteSource::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            ByteSource::Path(p) => f.debug_tuple("Path").field(p).finish(),
            ByteSource::File(_) => f.write_str("File"),
            ByteSource::Reader(_) => f.write_str("Reader"),
        }
    }
}

impl From<Vec<u8>> for ByteSource {
    fn from(bytes: Vec<u8>) -> Self {
        ByteSource::Bytes(bytes)
    }
}

impl From<&[u8]> for ByteSource {
    fn from(bytes: &[u8]) -> Self {
        ByteSource::Bytes(bytes.to_vec())
    }
}

impl From<PathBuf> for ByteSource {
    fn from(path: PathBuf) -> Self {
        ByteSource::Path(path)
    }
}

impl From<tokio::fs::File> for ByteSource {
    fn from(file: tokio::fs::File) -> Self {
        ByteSource::File(file)
    }
}

async fn read_bounded<R: AsyncRead + Unpin>(reader: R, max_bytes: u64) -> ExtractResult<Vec<u8>> {
    let mut out = Vec::new();
    let mut limited = reader.take(max_bytes.saturating_add(1));
    limited.read_to_end(&mut out).await?;
    if out.len() as u64 > max_bytes {
        return Err(too_large(max_bytes));
    }
    Ok(out)
}

fn read_bounded_blocking<R: std::io::Read>(reader: R, max_bytes: u64) -> ExtractResult<Vec<u8>> {
    let mut out = Vec::new();
    reader
        .take(max_bytes.saturating_add(1))
        .read_to_end(&mut out)?;
    if out.len() as u64 > max_bytes {
        return Err(too_large(max_bytes));
    }
    Ok(out)
}

fn has_runtime() -> bool {
    tokio::runtime::Handle::try_current().is_ok()
}

fn too_large(max_bytes: u64) -> ExtractError {
    ExtractError::limit(format!("input exceeds {} bytes", max_bytes))
}

/// Immutable, randomly addressable view over a drained input.
///
/// Cloning is cheap; clones exist only so a blocking worker can own the
/// buffer for the duration of one extraction call.
#[derive(Clone, PartialEq, Eq)]
pub struct ByteBuffer {
    data: Arc<[u8]>,
}

impl ByteBuffer {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data: data.into() }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

impl Deref for ByteBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl AsRef<[u8]> for ByteBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteBuffer").field("len", &self.data.len()).finish()
    }
}
