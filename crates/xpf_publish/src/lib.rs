//! # xpf_publish
//!
//! Publishing adapters for xpFactory manifest sets.
//!
//! Every [`Publisher`] receives a complete, already validated
//! [`ManifestSet`](xpf_iac::ManifestSet) and writes each body verbatim:
//!
//! - [`DirectoryPublisher`] writes under `<root>/crossplane/<environment>/`
//! - [`GitBranchPublisher`] commits the same layout to a new local branch
//!
//! [`PullRequestDraft`] composes the title and description a reviewer sees.

pub mod directory;
pub mod draft;
pub mod error;
pub mod git;
pub mod publisher;

pub use directory::{DirectoryPublisher, DEFAULT_PREFIX};
pub use draft::PullRequestDraft;
pub use error::{PublishError, PublishResult};
pub use git::{branch_name, GitBranchPublisher};
pub use publisher::{PublishOutcome, Publisher};
