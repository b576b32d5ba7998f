//! Error types for twtfeeds operations

use thiserror::Error;

/// Core error type for twtfeeds operations
#[derive(Error, Debug)]
pub enum FeedsError {
    /// Artifact missing or feed not registered
    #[error("not found: {0}")]
    NotFound(String),

    /// Name is not a safe single path segment
    #[error("invalid name: {0:?}")]
    InvalidName(String),

    /// Registration submitted without a URL
    #[error("no url supplied")]
    MissingUrl,

    /// URL did not yield a valid RSS/Atom document
    #[error("unable to find a valid RSS/Atom feed for: {url}")]
    InvalidFeed { url: String, reason: String },

    /// A feed with this name is already registered
    #[error("feed already exists: {0}")]
    Conflict(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Durable registry could not be written
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Configuration could not be read or parsed
    #[error("configuration error: {0}")]
    Config(String),

    /// Image encoding failed
    #[error("image error: {0}")]
    Image(String),
}

/// Coarse classification used at the HTTP boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    BadRequest,
    Conflict,
    Internal,
}

impl FeedsError {
    /// Classify this error for conversion into exactly one response status
    pub fn class(&self) -> ErrorClass {
        match self {
            FeedsError::NotFound(_) => ErrorClass::NotFound,
            FeedsError::InvalidName(_)
            | FeedsError::MissingUrl
            | FeedsError::InvalidFeed { .. } => ErrorClass::BadRequest,
            FeedsError::Conflict(_) => ErrorClass::Conflict,
            FeedsError::Io(_)
            | FeedsError::Persistence(_)
            | FeedsError::Config(_)
            | FeedsError::Image(_) => ErrorClass::Internal,
        }
    }
}

/// Result type alias for twtfeeds operations
pub type Result<T> = std::result::Result<T, FeedsError>;
