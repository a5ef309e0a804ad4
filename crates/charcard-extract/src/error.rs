//! Extraction error types.
//!
//! Every variant is non-fatal: the pipeline maps them all to "no card" at its
//! public boundary. They exist so strategies can report why an attempt failed
//! and so callers of `try_extract` can tell the failure classes apart.

use thiserror::Error;

/// Errors that can occur while recovering a character card.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// File extension is not handled by any registered extractor.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Container lacks the structure the strategy looks for
    /// (missing marker, missing archive magic, missing card entry).
    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    /// A payload was located but could not be decoded.
    #[error("Corrupt payload: {0}")]
    CorruptPayload(String),

    /// Payload decoded but does not match any known card shape.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A configured size bound was exceeded.
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error while draining the byte source.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Task join error from spawn_blocking.
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Coarse failure class, stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedFormat,
    MalformedContainer,
    CorruptPayload,
    SchemaMismatch,
    LimitExceeded,
    Configuration,
    Io,
    Internal,
}

impl ErrorKind {
    /// Get the string code for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnsupportedFormat => "CARD_001",
            ErrorKind::MalformedContainer => "CARD_002",
            ErrorKind::CorruptPayload => "CARD_003",
            ErrorKind::SchemaMismatch => "CARD_004",
            ErrorKind::LimitExceeded => "CARD_005",
            ErrorKind::Configuration => "CFG_001",
            ErrorKind::Io => "IO_001",
            ErrorKind::Internal => "INT_001",
        }
    }
}

impl ExtractError {
    /// Create a malformed container error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedContainer(message.into())
    }

    /// Create a corrupt payload error.
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::CorruptPayload(message.into())
    }

    /// Create a schema mismatch error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::SchemaMismatch(message.into())
    }

    /// Create a limit exceeded error.
    pub fn limit(message: impl Into<String>) -> Self {
        Self::LimitExceeded(message.into())
    }

    /// Get the failure class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Self::MalformedContainer(_) => ErrorKind::MalformedContainer,
            Self::CorruptPayload(_) => ErrorKind::CorruptPayload,
            Self::SchemaMismatch(_) => ErrorKind::SchemaMismatch,
            Self::LimitExceeded(_) => ErrorKind::LimitExceeded,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Io(_) => ErrorKind::Io,
            Self::TaskJoin(_) => ErrorKind::Internal,
        }
    }
}

impl From<serde_json::Error> for ExtractError {
    fn from(err: serde_json::Error) -> Self {
        Self::CorruptPayload(format!("invalid JSON: {}", err))
    }
}

impl From<base64::DecodeError> for ExtractError {
    fn from(err: base64::DecodeError) -> Self {
        Self::CorruptPayload(format!("invalid base64: {}", err))
    }
}

impl From<std::str::Utf8Error> for ExtractError {
    fn from(err: std::str::Utf8Error) -> Self {
        Self::CorruptPayload(format!("invalid UTF-8: {}", err))
    }
}

#[cfg(feature = "charx")]
impl From<zip::result::ZipError> for ExtractError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::MalformedContainer(format!("unreadable archive: {}", err))
    }
}
