//! Error types for request validation.

use thiserror::Error;

/// Result type alias for spec operations.
pub type SpecResult<T> = Result<T, SpecError>;

/// A single offending field in a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that can occur while reading or validating a request.
#[derive(Error, Debug)]
pub enum SpecError {
    #[error("Invalid request: {}", join_issues(.issues))]
    InvalidRequest { issues: Vec<FieldIssue> },

    #[error("Invalid name '{value}': {reason}")]
    InvalidName { value: String, reason: String },

    #[error("Unsupported combination for {kind}: '{field}' {reason}")]
    UnsupportedCombination {
        kind: String,
        field: String,
        reason: String,
    },

    #[error("YAML parsing error: {source}")]
    Yaml {
        /// Top-level request field the parser stopped at, when known.
        field: Option<String>,
        source: serde_yaml::Error,
    },
}

impl From<serde_yaml::Error> for SpecError {
    fn from(source: serde_yaml::Error) -> Self {
        SpecError::Yaml {
            field: yaml_error_field(&source.to_string()),
            source,
        }
    }
}

/// First mapping key in the path serde_yaml prefixes to its messages,
/// e.g. `security` for `[0].security: invalid type: ...`.
fn yaml_error_field(message: &str) -> Option<String> {
    let (path, _) = message.split_once(": ")?;
    if path.is_empty() || path.contains(char::is_whitespace) {
        return None;
    }
    path.split('.')
        .filter_map(|segment| segment.split('[').next())
        .find(|key| !key.is_empty())
        .map(str::to_string)
}

impl SpecError {
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        SpecError::InvalidRequest {
            issues: vec![FieldIssue::new(field, message)],
        }
    }

    /// Field paths responsible for the failure, for clarifying follow-ups.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            SpecError::InvalidRequest { issues } => {
                issues.iter().map(|i| i.field.as_str()).collect()
            }
            SpecError::InvalidName { .. } => vec!["name"],
            SpecError::UnsupportedCombination { field, .. } => vec![field.as_str()],
            SpecError::Yaml { field, .. } => field.iter().map(String::as_str).collect(),
        }
    }
}
