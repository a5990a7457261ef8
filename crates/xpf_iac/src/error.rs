//! Error types for manifest generation.

use thiserror::Error;
use xpf_spec::SpecError;

use crate::document::DocumentId;

/// Result type alias for generation operations.
pub type IacResult<T> = Result<T, IacError>;

/// Failure classes surfaced to the caller of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidRequest,
    InvalidName,
    UnsupportedCombination,
    PathCollision,
    /// Internal defect: a template engine emitted a dangling reference.
    ReferenceIntegrity,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::InvalidName => "invalid_name",
            ErrorKind::UnsupportedCombination => "unsupported_combination",
            ErrorKind::PathCollision => "path_collision",
            ErrorKind::ReferenceIntegrity => "reference_integrity",
            ErrorKind::Internal => "internal",
        }
    }

    /// Whether the failure is the requester's to fix rather than a defect.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidRequest | ErrorKind::InvalidName | ErrorKind::UnsupportedCombination
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur while generating or assembling manifests.
#[derive(Error, Debug)]
pub enum IacError {
    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error("Unsupported combination for {kind}: '{field}' {reason}")]
    UnsupportedCombination {
        kind: String,
        field: String,
        reason: String,
    },

    #[error("Path collision: {path} is produced by more than one document")]
    PathCollision { path: String },

    #[error("Duplicate document identity {id} (second copy at {path})")]
    DuplicateIdentity { id: DocumentId, path: String },

    #[error("Reference integrity violated: {from} references missing {missing}")]
    ReferenceIntegrity { from: DocumentId, missing: DocumentId },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl IacError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IacError::Spec(SpecError::InvalidRequest { .. }) => ErrorKind::InvalidRequest,
            IacError::Spec(SpecError::InvalidName { .. }) => ErrorKind::InvalidName,
            IacError::Spec(SpecError::UnsupportedCombination { .. }) => {
                ErrorKind::UnsupportedCombination
            }
            IacError::Spec(SpecError::Yaml { .. }) => ErrorKind::InvalidRequest,
            IacError::UnsupportedCombination { .. } => ErrorKind::UnsupportedCombination,
            IacError::PathCollision { .. } | IacError::DuplicateIdentity { .. } => {
                ErrorKind::PathCollision
            }
            IacError::ReferenceIntegrity { .. } => ErrorKind::ReferenceIntegrity,
            IacError::Yaml(_) => ErrorKind::Internal,
        }
    }

    /// Field paths that caused the failure, if the failure is tied to input.
    pub fn fields(&self) -> Vec<String> {
        match self {
            IacError::Spec(e) => e.fields().into_iter().map(str::to_string).collect(),
            IacError::UnsupportedCombination { field, .. } => vec![field.clone()],
            IacError::PathCollision { path } | IacError::DuplicateIdentity { path, .. } => {
                vec![path.clone()]
            }
            IacError::ReferenceIntegrity { missing, .. } => vec![missing.to_string()],
            IacError::Yaml(_) => Vec::new(),
        }
    }
}
