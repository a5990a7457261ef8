//! The publishing boundary.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use xpf_iac::ManifestSet;

use crate::error::PublishResult;

/// Where a manifest set ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishOutcome {
    /// Human-readable destination (a directory or a branch).
    pub destination: String,
    /// Files written, in emission order.
    pub files: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

impl PublishOutcome {
    pub fn new(destination: impl Into<String>, files: Vec<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            files,
            branch: None,
            commit: None,
        }
    }

    pub fn with_commit(mut self, branch: impl Into<String>, commit: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self.commit = Some(commit.into());
        self
    }
}

/// Receives a finished manifest set and stores it somewhere reviewable.
///
/// Implementations write every body verbatim and either publish the whole
/// set or report failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, set: &ManifestSet) -> PublishResult<PublishOutcome>;
}
