//! Error types for request parsing.

use std::fmt;

/// Request parsing errors
#[derive(Debug)]
pub enum ChatError {
    /// No LLM credentials in the environment
    LlmNotConfigured,
    /// LLM request failed
    LlmError(String),
    /// The completion contained no text
    EmptyCompletion,
    /// The completion was not the expected JSON shape
    InvalidCompletion(String),
    /// Serialization error
    SerializationError(String),
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LlmNotConfigured => write!(
                f,
                "LLM not configured. Set OPENAI_API_KEY or ANTHROPIC_API_KEY"
            ),
            Self::LlmError(msg) => write!(f, "LLM error: {}", msg),
            Self::EmptyCompletion => write!(f, "LLM returned an empty completion"),
            Self::InvalidCompletion(msg) => write!(f, "Could not read the completion: {}", msg),
            Self::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for ChatError {}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Result type for parsing operations
pub type ChatResult<T> = Result<T, ChatError>;
