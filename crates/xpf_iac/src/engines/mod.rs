//! Template engines, one per resource kind.

mod eks;
mod rds;
mod s3;
mod vpc;

pub use eks::{EksEngine, DEFAULT_KUBERNETES_VERSION};
pub use rds::RdsEngine;
pub use s3::{blocks_public_access, encryption_enabled, versioning_enabled, S3Engine};
pub use vpc::{VpcEngine, DEFAULT_CIDR_BLOCK};

use xpf_policy::PolicyValues;
use xpf_spec::{ResourceDescriptor, ResourceKind};

use crate::document::ManifestDocument;
use crate::error::{IacError, IacResult};

/// Turns a validated descriptor and its environment policy into documents.
///
/// Engines are pure: the same inputs always yield the same documents in
/// the same order with byte-identical bodies.
pub trait TemplateEngine: Send + Sync {
    fn kind(&self) -> ResourceKind;

    fn generate(
        &self,
        descriptor: &ResourceDescriptor,
        policy: &PolicyValues,
    ) -> IacResult<Vec<ManifestDocument>>;
}

/// Get the engine for a resource kind.
pub fn engine_for(kind: ResourceKind) -> &'static dyn TemplateEngine {
    match kind {
        ResourceKind::Eks => &EksEngine,
        ResourceKind::S3 => &S3Engine,
        ResourceKind::Rds => &RdsEngine,
        ResourceKind::Vpc => &VpcEngine,
    }
}

/// Reject descriptors routed to the wrong engine.
///
/// Kind-specific fields are already tied to their kind by the validator, and
/// a descriptor can only be built through it, so the kind is all that is left
/// to check here.
pub(crate) fn ensure_compatible(
    engine: ResourceKind,
    descriptor: &ResourceDescriptor,
) -> IacResult<()> {
    if descriptor.kind() != engine {
        return Err(IacError::UnsupportedCombination {
            kind: descriptor.kind().to_string(),
            field: "kind".to_string(),
            reason: format!("cannot be rendered by the {} engine", engine),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use xpf_policy::policy_for;
    use xpf_spec::{DescriptorValidator, RawRequest};

    #[test]
    fn test_engine_for_matches_kind() {
        for kind in ResourceKind::all() {
            assert_eq!(engine_for(kind).kind(), kind);
        }
    }

    #[test]
    fn test_wrong_engine_is_unsupported() {
        let descriptor = DescriptorValidator::validate(&RawRequest::new("vpc", "net1")).unwrap();
        let err = engine_for(ResourceKind::S3)
            .generate(&descriptor, policy_for(descriptor.environment()))
            .unwrap_err();
        assert!(
            matches!(err, IacError::UnsupportedCombination { ref field, .. } if field == "kind")
        );
    }

    #[test]
    fn test_kind_specific_fields_only_reach_their_engine() {
        let descriptor = DescriptorValidator::validate(
            &RawRequest::new("rds", "orders").with_engine("postgres"),
        )
        .unwrap();
        assert!(ensure_compatible(ResourceKind::Rds, &descriptor).is_ok());
        let err = ensure_compatible(ResourceKind::Eks, &descriptor).unwrap_err();
        assert_eq!(err.fields(), vec!["kind".to_string()]);

        // The validator refuses the same field on another kind, so no
        // descriptor can carry it to the EKS engine.
        let err = DescriptorValidator::validate(
            &RawRequest::new("eks", "orders").with_engine("postgres"),
        )
        .unwrap_err();
        assert_eq!(err.fields(), vec!["engine"]);
    }
}
