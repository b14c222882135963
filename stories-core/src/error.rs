//! Error types for story creation and retrieval.
//!
//! Playback never fails: a broken media link is a transition of the
//! playback state machine, not an error value.

/// Main error type for the stories subsystem
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Creation-time error, reported to the initiating action
    #[error("Create error: {0}")]
    Create(#[from] CreateError),

    /// Read-time error, recovered locally by the feed
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
}

/// Errors raised while creating a story
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CreateError {
    /// No caller identity is available
    #[error("Not signed in")]
    Unauthenticated,

    /// The media link is empty or unsupported
    #[error("Invalid media: {reason}")]
    InvalidMedia { reason: String },
}

impl CreateError {
    /// Shorthand for an `InvalidMedia` error.
    pub fn invalid_media(reason: impl Into<String>) -> Self {
        Self::InvalidMedia {
            reason: reason.into(),
        }
    }
}

/// Errors raised while querying active stories
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The backend could not be reached
    #[error("Story backend unavailable: {reason}")]
    Unavailable { reason: String },

    /// The backend answered with an error
    #[error("Story backend error: {reason}")]
    Backend { reason: String },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

/// Result type for create operations
pub type CreateResult<T> = std::result::Result<T, CreateError>;

/// Result type for fetch operations
pub type FetchResult<T> = std::result::Result<T, FetchError>;
