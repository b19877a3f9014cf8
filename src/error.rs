use thiserror::Error;

use crate::blob::ContentRef;
use crate::scale::Abandoned;

/// Errors returned by a blob store backend
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// No blob with this reference exists in the store
    #[error("blob not found: {0}")]
    NotFound(ContentRef),

    /// Filesystem or transport failure inside the backend
    #[error("store I/O error: {0}")]
    Io(String),

    /// Text that does not parse as a content reference
    #[error("invalid blob reference: {0:?}")]
    InvalidRef(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

/// Request rejected before any work is done (HTTP 400)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Method is neither GET nor HEAD
    #[error("Invalid method")]
    InvalidMethod,

    /// Width or height is zero or above the configured maximum
    #[error("bogus dimensions")]
    BogusDimensions { width: u32, height: u32 },

    /// The blob reference in the path is malformed
    #[error("invalid blob reference: {0:?}")]
    InvalidRef(String),
}

/// Failures of the read/decode/encode pipeline (HTTP 500)
#[derive(Debug, Clone, Error)]
pub enum ScaleError {
    /// The source blob could not be read from the store
    #[error("image resize: error reading image {source_ref}: {message}")]
    Read {
        source_ref: ContentRef,
        message: String,
    },

    /// The source bytes could not be decoded
    #[error("image resize: error decoding image {source_ref}: {message}")]
    Decode {
        source_ref: ContentRef,
        message: String,
    },

    /// The scaled image could not be re-encoded
    #[error("image resize: error encoding image {source_ref}: {message}")]
    Encode {
        source_ref: ContentRef,
        message: String,
    },

    /// The shared scaling task died before producing a result
    #[error("image resize: scaling task for {key} was abandoned")]
    Abandoned { key: String },
}

impl From<Abandoned> for ScaleError {
    fn from(err: Abandoned) -> Self {
        ScaleError::Abandoned { key: err.key }
    }
}

/// Failure to persist a scaled image; logged and otherwise ignored.
#[derive(Debug, Clone, Error)]
pub enum CacheWriteError {
    #[error("failed to cache {key}: {source}")]
    Store {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to index {key} -> {content_ref}: {message}")]
    Index {
        key: String,
        content_ref: ContentRef,
        message: String,
    },
}

/// Error type surfaced by the thumbnail HTTP handler.
#[derive(Debug, Clone, Error)]
pub enum ThumbError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Scale(#[from] ScaleError),
}
