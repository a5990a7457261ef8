//! # xpf_spec
//!
//! Resource request model and descriptor validation for xpFactory.
//!
//! The parsing collaborator produces a loosely typed [`RawRequest`]; the
//! [`DescriptorValidator`] normalizes it into an immutable
//! [`ResourceDescriptor`] or reports exactly which field is wrong so the
//! front end can ask a follow-up question.
//!
//! ## Example
//!
//! ```rust
//! use xpf_spec::{DescriptorValidator, RawRequest, ResourceKind};
//!
//! let raw = RawRequest::new("eks", "data-platform")
//!     .with_environment("prod")
//!     .with_region("us-west-2");
//!
//! let descriptor = DescriptorValidator::validate(&raw).unwrap();
//! assert_eq!(descriptor.kind(), ResourceKind::Eks);
//! assert_eq!(descriptor.node_count(), Some(5));
//! ```

pub mod error;
pub mod models;
pub mod validator;

pub use error::{FieldIssue, SpecError, SpecResult};
pub use models::{DatabaseEngine, RawRequest, ResourceDescriptor, ResourceKind, SecurityFlag};
pub use validator::{
    DescriptorValidator, DEFAULT_REGION, MAX_ALLOCATED_STORAGE_GIB, MAX_NODE_COUNT,
};
pub use xpf_policy::{Environment, Size};
