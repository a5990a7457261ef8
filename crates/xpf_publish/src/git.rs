//! Publishing to a fresh branch of a local git repository.
//!
//! The branch is committed locally; pushing it and opening the pull request
//! are left to the user's own tooling.

use std::path::{Path, PathBuf};
use std::process::Command;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};
use xpf_iac::{ManifestSet, ManifestSummary};

use crate::directory::{write_set, DEFAULT_PREFIX};
use crate::draft::PullRequestDraft;
use crate::error::{PublishError, PublishResult};
use crate::publisher::{PublishOutcome, Publisher};

/// Branch name for a set: `<kind>-<environment>/<name>-<YYYYmmddHHMMSS>`.
pub fn branch_name(summary: &ManifestSummary, at: DateTime<Utc>) -> String {
    format!(
        "{}-{}/{}-{}",
        summary.kind,
        summary.environment,
        summary.name,
        at.format("%Y%m%d%H%M%S")
    )
}

#[derive(Debug, Clone)]
struct Author {
    name: String,
    email: String,
}

/// Thin wrapper over the `git` binary for one repository.
#[derive(Debug, Clone)]
struct GitRepo {
    path: PathBuf,
    author: Option<Author>,
}

impl GitRepo {
    fn run(&self, args: &[&str]) -> PublishResult<String> {
        let mut command = Command::new("git");
        if let Some(author) = &self.author {
            command
                .arg("-c")
                .arg(format!("user.name={}", author.name))
                .arg("-c")
                .arg(format!("user.email={}", author.email));
        }
        let output = command
            .args(args)
            .current_dir(&self.path)
            .output()
            .map_err(|e| PublishError::Git(format!("Failed to run git {}: {}", args[0], e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PublishError::Git(format!(
                "git {} failed: {}",
                args[0],
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn ensure_repository(&self) -> PublishResult<()> {
        if !self.path.join(".git").exists() {
            return Err(PublishError::Git(format!(
                "{} is not a git repository",
                self.path.display()
            )));
        }
        Ok(())
    }
}

/// Commits manifests to a new local branch.
#[derive(Debug, Clone)]
pub struct GitBranchPublisher {
    repo: GitRepo,
    prefix: String,
    base_branch: Option<String>,
}

impl GitBranchPublisher {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo: GitRepo {
                path: repo_path.into(),
                author: None,
            },
            prefix: DEFAULT_PREFIX.to_string(),
            base_branch: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Branch to start from; the current branch when unset.
    pub fn with_base_branch(mut self, branch: impl Into<String>) -> Self {
        self.base_branch = Some(branch.into());
        self
    }

    /// Commit identity, for repositories without a configured user.
    pub fn with_author(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.repo.author = Some(Author {
            name: name.into(),
            email: email.into(),
        });
        self
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo.path
    }

    fn publish_blocking(
        &self,
        set: &ManifestSet,
        at: DateTime<Utc>,
    ) -> PublishResult<PublishOutcome> {
        self.repo.ensure_repository()?;
        let summary = set.primary().ok_or(PublishError::EmptySet)?;
        let branch = branch_name(summary, at);

        if let Some(base) = &self.base_branch {
            self.repo.run(&["checkout", base])?;
        }
        self.repo.run(&["checkout", "-b", &branch])?;
        debug!("Created branch {}", branch);

        let files = write_set(&self.repo.path, &self.prefix, set)?;
        let relative: Vec<String> = files
            .iter()
            .filter_map(|f| f.strip_prefix(&self.repo.path).ok())
            .map(|f| f.to_string_lossy().into_owned())
            .collect();
        let mut add = vec!["add", "--"];
        add.extend(relative.iter().map(String::as_str));
        self.repo.run(&add)?;

        // Only the written files; anything else already staged stays out.
        let message = PullRequestDraft::from_set(set).commit_message();
        let mut commit_args = vec!["commit", "-m", message.as_str(), "--"];
        commit_args.extend(relative.iter().map(String::as_str));
        self.repo.run(&commit_args)?;
        let commit = self.repo.run(&["rev-parse", "HEAD"])?;

        info!("Committed {} manifests to {} ({})", files.len(), branch, commit);
        Ok(PublishOutcome::new(self.repo.path.display().to_string(), files)
            .with_commit(branch, commit))
    }
}

#[async_trait]
impl Publisher for GitBranchPublisher {
    async fn publish(&self, set: &ManifestSet) -> PublishResult<PublishOutcome> {
        let publisher = self.clone();
        let set = set.clone();
        let at = Utc::now();
        tokio::task::spawn_blocking(move || publisher.publish_blocking(&set, at))
            .await
            .map_err(|e| PublishError::Task(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use xpf_spec::RawRequest;

    #[test]
    fn test_branch_name() {
        let set = xpf_iac::generate(
            &RawRequest::new("eks", "data-platform").with_environment("production"),
        )
        .unwrap();
        let at = Utc.with_ymd_and_hms(2026, 10, 15, 9, 5, 3).unwrap();
        assert_eq!(
            branch_name(set.primary().unwrap(), at),
            "eks-production/data-platform-20261015090503"
        );
    }

    #[test]
    fn test_not_a_repository() {
        let dir = tempfile::tempdir().unwrap();
        let set = xpf_iac::generate(&RawRequest::new("vpc", "net1")).unwrap();
        let err = GitBranchPublisher::new(dir.path())
            .publish_blocking(&set, Utc::now())
            .unwrap_err();
        assert!(matches!(err, PublishError::Git(_)));
    }
}
