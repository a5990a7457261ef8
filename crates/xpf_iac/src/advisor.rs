//! Review suggestions attached to a generated manifest set.

use xpf_policy::policy_for;
use xpf_spec::{ResourceDescriptor, ResourceKind};

use crate::engines::{encryption_enabled, versioning_enabled};

const MIN_HA_NODES: u32 = 3;

/// Suggestions for a reviewer, in a stable order.
pub fn suggestions(descriptor: &ResourceDescriptor) -> Vec<String> {
    let mut out = Vec::new();
    let env = descriptor.environment();

    match descriptor.kind() {
        ResourceKind::Eks => {
            if descriptor.node_count().is_some_and(|n| n < MIN_HA_NODES) {
                out.push(format!(
                    "Consider using at least {} nodes for high availability",
                    MIN_HA_NODES
                ));
            }
            if env.is_production() && descriptor.size().is_none() {
                out.push(
                    "For production, consider specifying a size to pin the node instance types"
                        .to_string(),
                );
            }
            let tagged = descriptor
                .tags()
                .keys()
                .any(|k| {
                    k.eq_ignore_ascii_case("cost-center") || k.eq_ignore_ascii_case("cost_center")
                });
            if !tagged {
                out.push("Consider adding a cost-center tag for billing tracking".to_string());
            }
        }
        ResourceKind::S3 => {
            if !encryption_enabled(descriptor, policy_for(env)) {
                out.push("Consider enabling encryption for security".to_string());
            }
            if !versioning_enabled(descriptor) {
                out.push("Consider enabling versioning for data protection".to_string());
            }
        }
        ResourceKind::Rds | ResourceKind::Vpc => {}
    }

    if env.is_production() {
        out.push("Ensure backup and disaster recovery plans are in place".to_string());
        out.push("Consider implementing monitoring and alerting".to_string());
    }

    out
}
