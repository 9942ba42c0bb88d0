use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    UnsupportedFormat,
    DecodeFailure,
    EngineFailure,
    Cancelled,
    InvalidArgument,
}

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("image not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("failed to decode image {}: {message}", path.display())]
    Decode { path: PathBuf, message: String },
    #[error("ocr engine failed: {0}")]
    Engine(String),
    #[error("batch processing was cancelled")]
    Cancelled,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl OcrError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OcrError::NotFound(_) => ErrorKind::NotFound,
            OcrError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            OcrError::Decode { .. } => ErrorKind::DecodeFailure,
            OcrError::Engine(_) => ErrorKind::EngineFailure,
            OcrError::Cancelled => ErrorKind::Cancelled,
            OcrError::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        OcrError::InvalidArgument(message.into())
    }

    /// Failures that a single-image call reports through a failed result
    /// instead of raising.
    pub(crate) fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::UnsupportedFormat | ErrorKind::DecodeFailure | ErrorKind::EngineFailure
        )
    }
}

impl From<anyhow::Error> for OcrError {
    fn from(err: anyhow::Error) -> Self {
        OcrError::Engine(format!("{:#}", err))
    }
}

pub type Result<T> = std::result::Result<T, OcrError>;
