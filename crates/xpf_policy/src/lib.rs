//! # xpf_policy
//!
//! Environment policy table for xpFactory.
//!
//! Every template engine consults the same table to decide sizing,
//! availability and security defaults, so the defaults for a given
//! environment never diverge between resource kinds.
//!
//! ## Example
//!
//! ```rust
//! use xpf_policy::{policy_for, Environment};
//!
//! let prod = policy_for(Environment::Production);
//! assert!(prod.multi_az);
//! assert!(prod.encryption_default);
//! assert_eq!(prod.replica_count, 5);
//! ```

pub mod environment;
pub mod error;
pub mod table;

pub use environment::{Environment, Size, SubnetTier};
pub use error::{PolicyError, PolicyResult};
pub use table::{policy_for, PolicyTable, PolicyValues, SizeOverrides};
