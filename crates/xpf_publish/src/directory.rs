//! Publishing to a directory on disk.

use std::fs;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};
use xpf_iac::ManifestSet;

use crate::error::{PublishError, PublishResult};
use crate::publisher::{PublishOutcome, Publisher};

pub const DEFAULT_PREFIX: &str = "crossplane";

/// Resolve a manifest path under `root/prefix`, rejecting escapes.
pub(crate) fn target_path(root: &Path, prefix: &str, relative: &str) -> PublishResult<PathBuf> {
    let relative_path = Path::new(relative);
    let escapes = relative_path
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if relative.is_empty() || escapes {
        return Err(PublishError::InvalidPath(relative.to_string()));
    }
    let mut target = root.to_path_buf();
    if !prefix.is_empty() {
        target.push(prefix);
    }
    Ok(target.join(relative_path))
}

/// Write every body of the set verbatim; returns the paths written.
///
/// All targets are resolved before anything is written so an invalid path
/// leaves the directory untouched.
pub(crate) fn write_set(
    root: &Path,
    prefix: &str,
    set: &ManifestSet,
) -> PublishResult<Vec<PathBuf>> {
    if set.is_empty() {
        return Err(PublishError::EmptySet);
    }

    let targets = set
        .files()
        .map(|(path, body)| Ok((target_path(root, prefix, path)?, body)))
        .collect::<PublishResult<Vec<_>>>()?;

    let mut written = Vec::with_capacity(targets.len());
    for (target, body) in targets {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, body)?;
        debug!("Wrote {}", target.display());
        written.push(target);
    }
    Ok(written)
}

/// Writes manifests under `<root>/<prefix>/<environment>/...`.
#[derive(Debug, Clone)]
pub struct DirectoryPublisher {
    root: PathBuf,
    prefix: String,
}

impl DirectoryPublisher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where a manifest path would be written.
    pub fn target(&self, relative: &str) -> PublishResult<PathBuf> {
        target_path(&self.root, &self.prefix, relative)
    }
}

#[async_trait]
impl Publisher for DirectoryPublisher {
    async fn publish(&self, set: &ManifestSet) -> PublishResult<PublishOutcome> {
        let root = self.root.clone();
        let prefix = self.prefix.clone();
        let set = set.clone();
        let files = tokio::task::spawn_blocking(move || write_set(&root, &prefix, &set))
            .await
            .map_err(|e| PublishError::Task(e.to_string()))??;

        info!("Published {} manifests to {}", files.len(), self.root.display());
        Ok(PublishOutcome::new(self.root.display().to_string(), files))
    }
}
