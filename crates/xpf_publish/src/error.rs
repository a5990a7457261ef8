//! Error types for publishing.

use thiserror::Error;

/// Result type alias for publishing operations.
pub type PublishResult<T> = Result<T, PublishError>;

/// Errors that can occur while publishing a manifest set.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Nothing to publish: the manifest set is empty")]
    EmptySet,

    #[error("Refusing to write outside the output root: {0}")]
    InvalidPath(String),

    #[error("Git error: {0}")]
    Git(String),

    #[error("Publisher task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
