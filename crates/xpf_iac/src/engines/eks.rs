//! EKS cluster manifests: provider config, cluster, node group and
//! production addons.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;
use xpf_policy::{PolicyValues, SizeOverrides, SubnetTier};
use xpf_spec::{ResourceDescriptor, ResourceKind, SecurityFlag};

use crate::crossplane::{
    account_role_arn, placeholder, render, standard_tags, CrossplaneObject, ManagedSpec, NameRef,
    ObjectMeta, SecretKeyRef,
};
use crate::document::{DocumentId, DocumentKind, ManifestDocument};
use crate::engines::{ensure_compatible, TemplateEngine};
use crate::error::IacResult;

pub const DEFAULT_KUBERNETES_VERSION: &str = "1.27";

const AWS_API: &str = "aws.crossplane.io/v1beta1";
const EKS_API: &str = "eks.aws.crossplane.io/v1alpha1";
const CONTROL_PLANE_LOG_TYPES: [&str; 5] =
    ["api", "audit", "authenticator", "controllerManager", "scheduler"];

/// Production-only addons: document kind, addon name, pinned version.
const PRODUCTION_ADDONS: [(DocumentKind, &str, &str); 2] = [
    (
        DocumentKind::LoadBalancerController,
        "aws-load-balancer-controller",
        "v1.6.2-eksbuild.1",
    ),
    (DocumentKind::EbsCsiDriver, "aws-ebs-csi-driver", "v1.24.0-eksbuild.1"),
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProviderConfigSpec {
    credentials: Credentials,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Credentials {
    source: &'static str,
    secret_ref: SecretKeyRef,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClusterParameters {
    region: String,
    role_arn: String,
    version: String,
    resources_vpc_config: VpcConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    encryption_config: Option<Vec<EncryptionConfig>>,
    logging: Logging,
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VpcConfig {
    security_group_ids: Vec<String>,
    subnet_ids: Vec<String>,
    endpoint_private_access: bool,
    endpoint_public_access: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EncryptionConfig {
    resources: Vec<&'static str>,
    provider: KeyProvider,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct KeyProvider {
    key_arn: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Logging {
    cluster_logging: Vec<LogSetup>,
}

#[derive(Debug, Serialize)]
struct LogSetup {
    types: Vec<&'static str>,
    enabled: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeGroupParameters {
    region: String,
    cluster_name_ref: NameRef,
    node_role: String,
    subnets: Vec<String>,
    instance_types: Vec<String>,
    scaling_config: ScalingConfig,
    update_config: UpdateConfig,
    labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    taints: Vec<Taint>,
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScalingConfig {
    min_size: u32,
    max_size: u32,
    desired_size: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateConfig {
    max_unavailable: u32,
}

#[derive(Debug, Serialize)]
struct Taint {
    key: &'static str,
    value: &'static str,
    effect: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddonParameters {
    region: String,
    cluster_name_ref: NameRef,
    addon_name: &'static str,
    addon_version: &'static str,
    resolve_conflicts: &'static str,
}

/// Node group scaling bounds around the desired count.
fn scaling(desired: u32) -> ScalingConfig {
    ScalingConfig {
        min_size: desired.saturating_sub(1).max(1),
        max_size: desired.saturating_mul(2),
        desired_size: desired,
    }
}

/// Generator for EKS clusters.
pub struct EksEngine;

impl EksEngine {
    pub fn provider_config_name(descriptor: &ResourceDescriptor) -> String {
        format!("{}-provider-config", descriptor.name())
    }

    pub fn node_group_name(descriptor: &ResourceDescriptor) -> String {
        format!("{}-node-group", descriptor.name())
    }

    /// Whether the API server endpoint is reachable from inside the VPC only.
    pub fn private_endpoint(descriptor: &ResourceDescriptor) -> bool {
        descriptor.has_flag(SecurityFlag::Private) || descriptor.environment().is_production()
    }

    fn subnet_ids(descriptor: &ResourceDescriptor, policy: &PolicyValues) -> Vec<String> {
        let tier = if descriptor.has_flag(SecurityFlag::Private) {
            SubnetTier::Private
        } else {
            policy.subnet_tier
        };
        (1..=2)
            .map(|i| placeholder(descriptor, &format!("{}Subnet{}Id", tier, i)))
            .collect()
    }

    fn provider_config(&self, descriptor: &ResourceDescriptor) -> IacResult<ManifestDocument> {
        let name = Self::provider_config_name(descriptor);
        let object = CrossplaneObject {
            api_version: AWS_API,
            kind: "ProviderConfig",
            metadata: ObjectMeta::labelled(name.clone(), descriptor),
            spec: ProviderConfigSpec {
                credentials: Credentials {
                    source: "Secret",
                    secret_ref: SecretKeyRef::in_crossplane("aws-secret", "credentials"),
                },
            },
        };
        Ok(ManifestDocument::new(
            DocumentKind::ProviderConfig,
            name,
            descriptor.name(),
            render(descriptor, &object)?,
        ))
    }

    fn cluster(
        &self,
        descriptor: &ResourceDescriptor,
        policy: &PolicyValues,
    ) -> IacResult<ManifestDocument> {
        let env = descriptor.environment();
        let private = Self::private_endpoint(descriptor);
        let encrypted = descriptor.has_flag(SecurityFlag::Encrypted) || policy.encryption_default;
        let provider_config = Self::provider_config_name(descriptor);

        let parameters = ClusterParameters {
            region: descriptor.region().to_string(),
            role_arn: account_role_arn(&format!("eks-cluster-role-{}", env)),
            version: descriptor
                .kubernetes_version()
                .unwrap_or(DEFAULT_KUBERNETES_VERSION)
                .to_string(),
            resources_vpc_config: VpcConfig {
                security_group_ids: vec![placeholder(descriptor, "clusterSecurityGroupId")],
                subnet_ids: Self::subnet_ids(descriptor, policy),
                endpoint_private_access: private,
                endpoint_public_access: !private || descriptor.has_flag(SecurityFlag::Public),
            },
            encryption_config: encrypted.then(|| {
                vec![EncryptionConfig {
                    resources: vec!["secrets"],
                    provider: KeyProvider {
                        key_arn: placeholder(descriptor, "kmsKeyArn"),
                    },
                }]
            }),
            logging: Logging {
                cluster_logging: vec![LogSetup {
                    types: CONTROL_PLANE_LOG_TYPES.to_vec(),
                    enabled: true,
                }],
            },
            tags: standard_tags(descriptor),
        };

        let object = CrossplaneObject {
            api_version: EKS_API,
            kind: "Cluster",
            metadata: ObjectMeta::labelled(descriptor.name(), descriptor)
                .label("region", descriptor.region())
                .annotation("crossplane.io/external-name", descriptor.name()),
            spec: ManagedSpec::new(parameters, provider_config.clone()),
        };

        Ok(ManifestDocument::new(
            DocumentKind::Cluster,
            descriptor.name(),
            descriptor.name(),
            render(descriptor, &object)?,
        )
        .referencing(DocumentId::new(DocumentKind::ProviderConfig, provider_config)))
    }

    fn node_group(
        &self,
        descriptor: &ResourceDescriptor,
        policy: &PolicyValues,
    ) -> IacResult<ManifestDocument> {
        let env = descriptor.environment();
        let name = Self::node_group_name(descriptor);
        let provider_config = Self::provider_config_name(descriptor);
        let desired = descriptor.node_count().unwrap_or(policy.replica_count);

        let instance_types = match descriptor.size() {
            Some(size) => vec![SizeOverrides::eks_instance_class(size).to_string()],
            None => policy.instance_types.iter().map(|t| t.to_string()).collect(),
        };

        let mut labels = BTreeMap::new();
        labels.insert("environment".to_string(), env.to_string());
        labels.insert("node.kubernetes.io/role".to_string(), "application".to_string());

        let mut tags = standard_tags(descriptor);
        tags.insert("Cluster".to_string(), descriptor.name().to_string());
        tags.insert("NodeGroup".to_string(), name.clone());

        let parameters = NodeGroupParameters {
            region: descriptor.region().to_string(),
            cluster_name_ref: NameRef::new(descriptor.name()),
            node_role: account_role_arn(&format!("eks-node-group-role-{}", env)),
            subnets: Self::subnet_ids(descriptor, policy),
            instance_types,
            scaling_config: scaling(desired),
            update_config: UpdateConfig {
                max_unavailable: if desired > 2 { 1 } else { 0 },
            },
            labels,
            taints: if env.is_production() {
                vec![Taint {
                    key: "node.kubernetes.io/production",
                    value: "true",
                    effect: "NO_SCHEDULE",
                }]
            } else {
                Vec::new()
            },
            tags,
        };

        let object = CrossplaneObject {
            api_version: EKS_API,
            kind: "NodeGroup",
            metadata: ObjectMeta::labelled(name.clone(), descriptor)
                .label("cluster", descriptor.name()),
            spec: ManagedSpec::new(parameters, provider_config.clone()),
        };

        Ok(ManifestDocument::new(
            DocumentKind::NodeGroup,
            name,
            descriptor.name(),
            render(descriptor, &object)?,
        )
        .referencing(DocumentId::new(DocumentKind::Cluster, descriptor.name()))
        .referencing(DocumentId::new(DocumentKind::ProviderConfig, provider_config)))
    }

    fn addon(
        &self,
        descriptor: &ResourceDescriptor,
        kind: DocumentKind,
        addon_name: &'static str,
        addon_version: &'static str,
    ) -> IacResult<ManifestDocument> {
        let name = format!("{}-{}", descriptor.name(), addon_name);
        let provider_config = Self::provider_config_name(descriptor);

        let object = CrossplaneObject {
            api_version: EKS_API,
            kind: "Addon",
            metadata: ObjectMeta::labelled(name.clone(), descriptor)
                .label("cluster", descriptor.name()),
            spec: ManagedSpec::new(
                AddonParameters {
                    region: descriptor.region().to_string(),
                    cluster_name_ref: NameRef::new(descriptor.name()),
                    addon_name,
                    addon_version,
                    resolve_conflicts: "OVERWRITE",
                },
                provider_config.clone(),
            ),
        };

        Ok(ManifestDocument::new(kind, name, descriptor.name(), render(descriptor, &object)?)
            .referencing(DocumentId::new(DocumentKind::Cluster, descriptor.name()))
            .referencing(DocumentId::new(DocumentKind::ProviderConfig, provider_config)))
    }
}

impl TemplateEngine for EksEngine {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Eks
    }

    fn generate(
        &self,
        descriptor: &ResourceDescriptor,
        policy: &PolicyValues,
    ) -> IacResult<Vec<ManifestDocument>> {
        ensure_compatible(self.kind(), descriptor)?;

        let mut documents = vec![
            self.provider_config(descriptor)?,
            self.cluster(descriptor, policy)?,
            self.node_group(descriptor, policy)?,
        ];

        if descriptor.environment().is_production() {
            for (kind, addon_name, version) in PRODUCTION_ADDONS {
                documents.push(self.addon(descriptor, kind, addon_name, version)?);
            }
        }

        debug!(
            "Generated {} EKS documents for '{}'",
            documents.len(),
            descriptor.name()
        );
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xpf_policy::policy_for;
    use xpf_spec::{DescriptorValidator, RawRequest};

    fn generate(raw: RawRequest) -> Vec<ManifestDocument> {
        let descriptor = DescriptorValidator::validate(&raw).unwrap();
        EksEngine
            .generate(&descriptor, policy_for(descriptor.environment()))
            .unwrap()
    }

    fn body(documents: &[ManifestDocument], kind: DocumentKind) -> &str {
        &documents.iter().find(|d| d.kind == kind).unwrap().body
    }

    #[test]
    fn test_scaling_bounds() {
        let s = scaling(5);
        assert_eq!((s.min_size, s.desired_size, s.max_size), (4, 5, 10));
        let s = scaling(1);
        assert_eq!((s.min_size, s.desired_size, s.max_size), (1, 1, 2));
    }

    #[test]
    fn test_dev_cluster_has_no_addons() {
        let documents = generate(RawRequest::new("eks", "sandbox"));
        let kinds: Vec<DocumentKind> = documents.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DocumentKind::ProviderConfig,
                DocumentKind::Cluster,
                DocumentKind::NodeGroup
            ]
        );
        let cluster = body(&documents, DocumentKind::Cluster);
        assert!(cluster.contains("endpointPrivateAccess: false"));
        assert!(cluster.contains("endpointPublicAccess: true"));
        assert!(cluster.contains("version: '1.27'"));
        assert!(!cluster.contains("encryptionConfig"));
        assert!(cluster.contains("{{ .Values.dev.publicSubnet1Id }}"));
    }

    #[test]
    fn test_private_flag_closes_public_endpoint() {
        let documents = generate(RawRequest::new("eks", "internal").with_security("private"));
        let cluster = body(&documents, DocumentKind::Cluster);
        assert!(cluster.contains("endpointPrivateAccess: true"));
        assert!(cluster.contains("endpointPublicAccess: false"));
        assert!(cluster.contains("{{ .Values.dev.privateSubnet1Id }}"));
    }

    #[test]
    fn test_encrypted_flag_adds_secrets_encryption_in_dev() {
        let documents = generate(RawRequest::new("eks", "vault").with_security("encrypted"));
        let cluster = body(&documents, DocumentKind::Cluster);
        assert!(cluster.contains("encryptionConfig"));
        assert!(cluster.contains("{{ .Values.dev.kmsKeyArn }}"));
    }

    #[test]
    fn test_size_overrides_instance_types() {
        let documents = generate(
            RawRequest::new("eks", "batch")
                .with_environment("staging")
                .with_size("large"),
        );
        let node_group = body(&documents, DocumentKind::NodeGroup);
        assert!(node_group.contains("- m6i.xlarge"));
        assert!(!node_group.contains("t3.large"));
        assert!(node_group.contains("desiredSize: 4"));
    }

    #[test]
    fn test_kubernetes_version_override() {
        let documents = generate(RawRequest::new("eks", "edge").with_kubernetes_version("1.29"));
        assert!(body(&documents, DocumentKind::Cluster).contains("version: '1.29'"));
    }

    #[test]
    fn test_production_node_group_is_tainted() {
        let documents = generate(RawRequest::new("eks", "core").with_environment("prod"));
        let node_group = body(&documents, DocumentKind::NodeGroup);
        assert!(node_group.contains("node.kubernetes.io/production"));
        assert!(node_group.contains("NO_SCHEDULE"));
        let addon = body(&documents, DocumentKind::EbsCsiDriver);
        assert!(addon.contains("addonName: aws-ebs-csi-driver"));
        assert!(addon.contains("addonVersion: v1.24.0-eksbuild.1"));
    }
}
