//! Error types for the policy module.

use thiserror::Error;

/// Result type alias for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;

/// Errors that can occur while rendering the policy table.
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
