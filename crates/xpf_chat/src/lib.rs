//! # xpf_chat
//!
//! Natural-language front end for xpFactory.
//!
//! A [`RequestParser`] sends free text to a [`CompletionClient`] (normally an
//! [`LlmAdapter`] configured from the environment) and turns the JSON it gets
//! back into [`RawRequest`](xpf_spec::RawRequest) values. Nothing produced
//! here is trusted: callers still run descriptor validation.

pub mod error;
pub mod llm;
pub mod parser;

pub use error::{ChatError, ChatResult};
pub use llm::{CompletionClient, LlmAdapter, LlmProvider};
pub use parser::{coerce, extract_json, RequestParser, SYSTEM_PROMPT};
