//! Typed Crossplane object envelope and YAML rendering.
//!
//! Bodies are serialized from structs with fixed field order and
//! `BTreeMap` maps, so identical inputs always render identical text.

use std::collections::BTreeMap;

use serde::Serialize;
use xpf_spec::ResourceDescriptor;

use crate::error::IacResult;

pub const MANAGED_BY: &str = "crossplane-automation";
pub const CROSSPLANE_NAMESPACE: &str = "crossplane-system";
/// ProviderConfig installed alongside Crossplane, used by single-document kinds.
pub const DEFAULT_PROVIDER_CONFIG: &str = "default";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossplaneObject<S> {
    pub api_version: &'static str,
    pub kind: &'static str,
    pub metadata: ObjectMeta,
    pub spec: S,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl ObjectMeta {
    /// Metadata with the standard `environment` and `managed-by` labels.
    pub fn labelled(name: impl Into<String>, descriptor: &ResourceDescriptor) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert("environment".to_string(), descriptor.environment().to_string());
        labels.insert("managed-by".to_string(), MANAGED_BY.to_string());
        Self {
            name: name.into(),
            labels,
            annotations: BTreeMap::new(),
        }
    }

    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }
}

/// `spec` of a managed resource.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedSpec<P> {
    pub for_provider: P,
    pub provider_config_ref: NameRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_connection_secret_to_ref: Option<SecretRef>,
}

impl<P> ManagedSpec<P> {
    pub fn new(for_provider: P, provider_config: impl Into<String>) -> Self {
        Self {
            for_provider,
            provider_config_ref: NameRef::new(provider_config),
            write_connection_secret_to_ref: None,
        }
    }

    pub fn with_connection_secret(mut self, secret: SecretRef) -> Self {
        self.write_connection_secret_to_ref = Some(secret);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameRef {
    pub name: String,
}

impl NameRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretRef {
    pub name: String,
    pub namespace: String,
}

impl SecretRef {
    pub fn in_crossplane(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: CROSSPLANE_NAMESPACE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretKeyRef {
    pub name: String,
    pub namespace: String,
    pub key: String,
}

impl SecretKeyRef {
    pub fn in_crossplane(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: CROSSPLANE_NAMESPACE.to_string(),
            key: key.into(),
        }
    }
}

/// Value placeholder resolved by the deployment tooling, e.g.
/// `{{ .Values.production.kmsKeyArn }}`.
pub fn placeholder(descriptor: &ResourceDescriptor, key: &str) -> String {
    format!("{{{{ .Values.{}.{} }}}}", descriptor.environment(), key)
}

pub fn account_role_arn(role: &str) -> String {
    format!("arn:aws:iam::{{{{ .Values.awsAccountId }}}}:role/{}", role)
}

/// AWS tags shared by every resource, plus the request's own tags.
///
/// Request tag keys are normalized to Title-Case with hyphens
/// (`cost_center` becomes `Cost-Center`). `Environment` and `CreatedBy`
/// always carry the generated values, whatever the request says.
pub fn standard_tags(descriptor: &ResourceDescriptor) -> BTreeMap<String, String> {
    let mut tags: BTreeMap<String, String> = descriptor
        .tags()
        .iter()
        .map(|(key, value)| (title_case_key(key), value.clone()))
        .collect();
    tags.insert("Environment".to_string(), descriptor.environment().to_string());
    tags.insert("CreatedBy".to_string(), MANAGED_BY.to_string());
    tags
}

fn title_case_key(key: &str) -> String {
    key.replace('_', "-")
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join("-")
}

/// Render an object with the generated-file header.
pub fn render<T: Serialize>(descriptor: &ResourceDescriptor, object: &T) -> IacResult<String> {
    let description = descriptor
        .description()
        .map(|d| d.replace(['\r', '\n'], " "))
        .unwrap_or_else(|| "No description provided".to_string());

    let mut body = format!(
        "# Generated by xpFactory\n\
         # Resource: {}\n\
         # Name: {}\n\
         # Environment: {}\n\
         # Description: {}\n\n",
        descriptor.kind().display_name(),
        descriptor.name(),
        descriptor.environment(),
        description
    );
    body.push_str(&serde_yaml::to_string(object)?);
    Ok(body)
}

/// Walk a rendered body by mapping keys; `Null` when any key is absent.
#[cfg(test)]
pub(crate) fn lookup(body: &str, path: &[&str]) -> serde_yaml::Value {
    let mut value: serde_yaml::Value = serde_yaml::from_str(body).expect("rendered body parses");
    for key in path {
        value = value.get(*key).cloned().unwrap_or(serde_yaml::Value::Null);
    }
    value
}
