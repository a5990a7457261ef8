//! S3 bucket manifest.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;
use xpf_policy::{Environment, PolicyValues};
use xpf_spec::{ResourceDescriptor, ResourceKind, SecurityFlag};

use crate::crossplane::{
    placeholder, render, standard_tags, CrossplaneObject, ManagedSpec, ObjectMeta,
    DEFAULT_PROVIDER_CONFIG,
};
use crate::document::{DocumentKind, ManifestDocument};
use crate::engines::{ensure_compatible, TemplateEngine};
use crate::error::IacResult;

const S3_API: &str = "s3.aws.crossplane.io/v1beta1";

/// Versioning is on outside dev, or when durability was asked for.
pub fn versioning_enabled(descriptor: &ResourceDescriptor) -> bool {
    descriptor.environment() != Environment::Development
        || descriptor.has_flag(SecurityFlag::Encrypted)
        || descriptor.has_flag(SecurityFlag::HighlyAvailable)
}

pub fn encryption_enabled(descriptor: &ResourceDescriptor, policy: &PolicyValues) -> bool {
    descriptor.has_flag(SecurityFlag::Encrypted) || policy.encryption_default
}

pub fn blocks_public_access(descriptor: &ResourceDescriptor) -> bool {
    !descriptor.has_flag(SecurityFlag::Public)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BucketParameters {
    location_constraint: String,
    acl: &'static str,
    versioning_configuration: Versioning,
    #[serde(skip_serializing_if = "Option::is_none")]
    server_side_encryption_configuration: Option<EncryptionConfiguration>,
    public_access_block_configuration: PublicAccessBlock,
    lifecycle_configuration: LifecycleConfiguration,
    tag_set: Vec<Tag>,
}

#[derive(Debug, Serialize)]
struct Versioning {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct EncryptionConfiguration {
    rules: Vec<EncryptionRule>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EncryptionRule {
    apply_server_side_encryption_by_default: EncryptionDefault,
    bucket_key_enabled: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EncryptionDefault {
    sse_algorithm: &'static str,
    #[serde(rename = "kmsMasterKeyID")]
    kms_master_key_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicAccessBlock {
    block_public_acls: bool,
    block_public_policy: bool,
    ignore_public_acls: bool,
    restrict_public_buckets: bool,
}

impl PublicAccessBlock {
    fn all(enabled: bool) -> Self {
        Self {
            block_public_acls: enabled,
            block_public_policy: enabled,
            ignore_public_acls: enabled,
            restrict_public_buckets: enabled,
        }
    }
}

#[derive(Debug, Serialize)]
struct LifecycleConfiguration {
    rules: Vec<LifecycleRule>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LifecycleRule {
    id: &'static str,
    status: &'static str,
    filter: Prefix,
    #[serde(skip_serializing_if = "Option::is_none")]
    abort_incomplete_multipart_upload: Option<AbortUpload>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    transitions: Vec<Transition>,
}

#[derive(Debug, Serialize)]
struct Prefix {
    prefix: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AbortUpload {
    days_after_initiation: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Transition {
    days: u32,
    storage_class: &'static str,
}

#[derive(Debug, Serialize)]
struct Tag {
    key: String,
    value: String,
}

fn lifecycle_rules() -> Vec<LifecycleRule> {
    vec![
        LifecycleRule {
            id: "DeleteIncompleteMultipartUploads",
            status: "Enabled",
            filter: Prefix { prefix: "" },
            abort_incomplete_multipart_upload: Some(AbortUpload {
                days_after_initiation: 7,
            }),
            transitions: Vec::new(),
        },
        LifecycleRule {
            id: "TransitionToInfrequentAccess",
            status: "Enabled",
            filter: Prefix { prefix: "" },
            abort_incomplete_multipart_upload: None,
            transitions: vec![
                Transition {
                    days: 30,
                    storage_class: "STANDARD_IA",
                },
                Transition {
                    days: 90,
                    storage_class: "GLACIER",
                },
            ],
        },
    ]
}

/// Generator for S3 buckets.
pub struct S3Engine;

impl TemplateEngine for S3Engine {
    fn kind(&self) -> ResourceKind {
        ResourceKind::S3
    }

    fn generate(
        &self,
        descriptor: &ResourceDescriptor,
        policy: &PolicyValues,
    ) -> IacResult<Vec<ManifestDocument>> {
        ensure_compatible(self.kind(), descriptor)?;

        let encryption = encryption_enabled(descriptor, policy).then(|| EncryptionConfiguration {
            rules: vec![EncryptionRule {
                apply_server_side_encryption_by_default: EncryptionDefault {
                    sse_algorithm: "aws:kms",
                    kms_master_key_id: placeholder(descriptor, "kmsKeyArn"),
                },
                bucket_key_enabled: true,
            }],
        });

        let tags: BTreeMap<String, String> = standard_tags(descriptor);
        let parameters = BucketParameters {
            location_constraint: descriptor.region().to_string(),
            acl: if blocks_public_access(descriptor) {
                "private"
            } else {
                "public-read"
            },
            versioning_configuration: Versioning {
                status: if versioning_enabled(descriptor) {
                    "Enabled"
                } else {
                    "Suspended"
                },
            },
            server_side_encryption_configuration: encryption,
            public_access_block_configuration: PublicAccessBlock::all(blocks_public_access(
                descriptor,
            )),
            lifecycle_configuration: LifecycleConfiguration {
                rules: lifecycle_rules(),
            },
            tag_set: tags
                .into_iter()
                .map(|(key, value)| Tag { key, value })
                .collect(),
        };

        let object = CrossplaneObject {
            api_version: S3_API,
            kind: "Bucket",
            metadata: ObjectMeta::labelled(descriptor.name(), descriptor)
                .label("region", descriptor.region())
                .annotation("crossplane.io/external-name", descriptor.name()),
            spec: ManagedSpec::new(parameters, DEFAULT_PROVIDER_CONFIG),
        };

        debug!("Generated S3 bucket document for '{}'", descriptor.name());
        Ok(vec![ManifestDocument::new(
            DocumentKind::Bucket,
            descriptor.name(),
            descriptor.name(),
            render(descriptor, &object)?,
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crossplane::lookup;
    use xpf_policy::policy_for;
    use xpf_spec::{DescriptorValidator, RawRequest};

    const VERSIONING: &[&str] = &["spec", "forProvider", "versioningConfiguration", "status"];
    const ENCRYPTION: &[&str] = &["spec", "forProvider", "serverSideEncryptionConfiguration"];

    fn bucket(raw: RawRequest) -> String {
        let descriptor = DescriptorValidator::validate(&raw).unwrap();
        let mut documents = S3Engine
            .generate(&descriptor, policy_for(descriptor.environment()))
            .unwrap();
        assert_eq!(documents.len(), 1);
        documents.remove(0).body
    }

    #[test]
    fn test_dev_bucket_defaults() {
        let body = bucket(RawRequest::new("s3", "scratch"));
        assert_eq!(lookup(&body, VERSIONING).as_str(), Some("Suspended"));
        assert!(lookup(&body, ENCRYPTION).is_null());
        assert!(body.contains("blockPublicAcls: true"));
        assert!(body.contains("acl: private"));
        assert!(body.contains("daysAfterInitiation: 7"));
        assert!(body.contains("storageClass: GLACIER"));
    }

    #[test]
    fn test_encrypted_flag_in_dev() {
        let body = bucket(RawRequest::new("s3", "secrets").with_security("encrypted"));
        assert_eq!(lookup(&body, VERSIONING).as_str(), Some("Enabled"));
        assert!(body.contains("aws:kms"));
        assert!(body.contains("kmsMasterKeyID"));
    }

    #[test]
    fn test_highly_available_enables_versioning_only() {
        let body = bucket(RawRequest::new("s3", "assets").with_security("highly-available"));
        assert_eq!(lookup(&body, VERSIONING).as_str(), Some("Enabled"));
        assert!(lookup(&body, ENCRYPTION).is_null());
    }

    #[test]
    fn test_public_flag_lifts_access_block() {
        let body = bucket(RawRequest::new("s3", "website").with_security("public"));
        assert!(body.contains("blockPublicAcls: false"));
        assert!(body.contains("restrictPublicBuckets: false"));
        assert!(body.contains("acl: public-read"));
    }

    #[test]
    fn test_staging_bucket_is_versioned_and_encrypted() {
        let body = bucket(RawRequest::new("s3", "reports").with_environment("stage"));
        assert_eq!(lookup(&body, VERSIONING).as_str(), Some("Enabled"));
        assert!(body.contains("{{ .Values.staging.kmsKeyArn }}"));
    }
}
