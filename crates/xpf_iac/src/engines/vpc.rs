//! VPC manifest.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;
use xpf_policy::PolicyValues;
use xpf_spec::{ResourceDescriptor, ResourceKind};

use crate::crossplane::{
    render, CrossplaneObject, ManagedSpec, ObjectMeta, DEFAULT_PROVIDER_CONFIG, MANAGED_BY,
};
use crate::document::{DocumentKind, ManifestDocument};
use crate::engines::{ensure_compatible, TemplateEngine};
use crate::error::IacResult;

pub const DEFAULT_CIDR_BLOCK: &str = "10.0.0.0/16";

const EC2_API: &str = "ec2.aws.crossplane.io/v1beta1";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VpcParameters {
    region: String,
    cidr_block: String,
    enable_dns_support: bool,
    enable_dns_host_names: bool,
    instance_tenancy: &'static str,
    tags: Vec<Tag>,
}

#[derive(Debug, Serialize)]
struct Tag {
    key: String,
    value: String,
}

/// Generator for VPCs.
pub struct VpcEngine;

impl VpcEngine {
    fn tags(descriptor: &ResourceDescriptor) -> Vec<Tag> {
        let mut tags: BTreeMap<String, String> = descriptor.tags().clone();
        tags.insert("Name".to_string(), descriptor.name().to_string());
        tags.insert("environment".to_string(), descriptor.environment().to_string());
        tags.insert("managed-by".to_string(), MANAGED_BY.to_string());
        tags.into_iter().map(|(key, value)| Tag { key, value }).collect()
    }
}

impl TemplateEngine for VpcEngine {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Vpc
    }

    fn generate(
        &self,
        descriptor: &ResourceDescriptor,
        _policy: &PolicyValues,
    ) -> IacResult<Vec<ManifestDocument>> {
        ensure_compatible(self.kind(), descriptor)?;

        let parameters = VpcParameters {
            region: descriptor.region().to_string(),
            cidr_block: descriptor
                .cidr_block()
                .unwrap_or(DEFAULT_CIDR_BLOCK)
                .to_string(),
            enable_dns_support: true,
            enable_dns_host_names: true,
            instance_tenancy: "default",
            tags: Self::tags(descriptor),
        };

        let object = CrossplaneObject {
            api_version: EC2_API,
            kind: "VPC",
            metadata: ObjectMeta::labelled(descriptor.name(), descriptor),
            spec: ManagedSpec::new(parameters, DEFAULT_PROVIDER_CONFIG),
        };

        debug!("Generated VPC document for '{}'", descriptor.name());
        Ok(vec![ManifestDocument::new(
            DocumentKind::Vpc,
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

    fn vpc(raw: RawRequest) -> String {
        let descriptor = DescriptorValidator::validate(&raw).unwrap();
        let documents = VpcEngine
            .generate(&descriptor, policy_for(descriptor.environment()))
            .unwrap();
        assert_eq!(documents.len(), 1);
        assert!(documents[0].references.is_empty());
        documents[0].body.clone()
    }

    fn tag(body: &str, key: &str) -> Option<String> {
        let tags = lookup(body, &["spec", "forProvider", "tags"]);
        tags.as_sequence()?
            .iter()
            .find(|t| t["key"].as_str() == Some(key))
            .and_then(|t| t["value"].as_str().map(str::to_string))
    }

    #[test]
    fn test_cidr_override() {
        let body = vpc(RawRequest::new("vpc", "edge").with_cidr_block("172.20.0.0/20"));
        assert_eq!(
            lookup(&body, &["spec", "forProvider", "cidrBlock"]).as_str(),
            Some("172.20.0.0/20")
        );
    }

    #[test]
    fn test_dns_and_tags() {
        let body = vpc(
            RawRequest::new("vpc", "shared")
                .with_environment("staging")
                .with_tag("team", "network"),
        );
        assert_eq!(
            lookup(&body, &["spec", "forProvider", "enableDnsSupport"]).as_bool(),
            Some(true)
        );
        assert_eq!(
            lookup(&body, &["spec", "forProvider", "enableDnsHostNames"]).as_bool(),
            Some(true)
        );
        assert_eq!(tag(&body, "Name").as_deref(), Some("shared"));
        assert_eq!(tag(&body, "environment").as_deref(), Some("staging"));
        assert_eq!(tag(&body, "managed-by").as_deref(), Some("crossplane-automation"));
        assert_eq!(tag(&body, "team").as_deref(), Some("network"));
    }
}
