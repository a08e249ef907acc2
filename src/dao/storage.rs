use std::error::Error;
use thiserror::Error;

/// Result alias for media storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by media backends regardless of where the bytes live.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backend failure.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// What was attempted.
        message: String,
        /// Underlying error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// No object under the key.
    #[error("object `{key}` not found")]
    NotFound {
        /// Missing key.
        key: String,
    },
    /// No bucket is configured.
    #[error("object storage is not configured")]
    NotConfigured,
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}
