//! # xpf_iac
//!
//! Crossplane manifest generation for xpFactory.
//!
//! A validated [`ResourceDescriptor`](xpf_spec::ResourceDescriptor) is
//! rendered by the [`TemplateEngine`] for its kind into typed documents,
//! which the [`ManifestAssembler`] places at stable paths and checks for
//! dangling references. Nothing here performs I/O.
//!
//! ## Example
//!
//! ```rust
//! use xpf_iac::{generate, DocumentKind};
//! use xpf_spec::RawRequest;
//!
//! let raw = RawRequest::new("eks", "data-platform")
//!     .with_environment("production")
//!     .with_region("us-west-2")
//!     .with_node_count(5);
//!
//! let set = generate(&raw).unwrap();
//! assert_eq!(set.len(), 5);
//! assert!(set
//!     .files()
//!     .any(|(path, _)| path == "production/data-platform-cluster.yaml"));
//! assert_eq!(set.by_kind(DocumentKind::NodeGroup).count(), 1);
//! ```

pub mod advisor;
pub mod assembler;
pub mod crossplane;
pub mod document;
pub mod engines;
pub mod error;
pub mod pipeline;

pub use assembler::{document_path, ManifestAssembler, ManifestSet, ManifestSummary};
pub use document::{DocumentId, DocumentKind, ManifestDocument};
pub use engines::{engine_for, TemplateEngine};
pub use error::{ErrorKind, IacError, IacResult};
pub use pipeline::{generate, generate_batch, generate_descriptor};
