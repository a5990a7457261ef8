//! Request and descriptor models.
//!
//! A [`RawRequest`] is what the parsing collaborator hands over: loosely
//! typed, possibly incomplete. A [`ResourceDescriptor`] is the normalized,
//! validated form consumed by the template engines; it can only be obtained
//! through [`crate::DescriptorValidator`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};
use xpf_policy::{Environment, Size};

use crate::error::SpecResult;

/// Resource families that can be generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Eks,
    S3,
    Rds,
    Vpc,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Eks => "eks",
            ResourceKind::S3 => "s3",
            ResourceKind::Rds => "rds",
            ResourceKind::Vpc => "vpc",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "eks" | "eks_cluster" => Some(ResourceKind::Eks),
            "s3" | "s3_bucket" | "bucket" => Some(ResourceKind::S3),
            "rds" | "rds_database" | "rds_instance" | "database" => Some(ResourceKind::Rds),
            "vpc" | "network" => Some(ResourceKind::Vpc),
            _ => None,
        }
    }

    pub fn all() -> Vec<Self> {
        vec![
            ResourceKind::Eks,
            ResourceKind::S3,
            ResourceKind::Rds,
            ResourceKind::Vpc,
        ]
    }

    /// Human-readable name used in summaries.
    pub fn display_name(&self) -> &'static str {
        match self {
            ResourceKind::Eks => "EKS Cluster",
            ResourceKind::S3 => "S3 Bucket",
            ResourceKind::Rds => "RDS Database",
            ResourceKind::Vpc => "VPC",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Supported RDS engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseEngine {
    Mysql,
    Postgres,
    Mariadb,
}

impl Default for DatabaseEngine {
    fn default() -> Self {
        Self::Mysql
    }
}

impl DatabaseEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseEngine::Mysql => "mysql",
            DatabaseEngine::Postgres => "postgres",
            DatabaseEngine::Mariadb => "mariadb",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "mysql" => Some(DatabaseEngine::Mysql),
            "postgres" | "postgresql" => Some(DatabaseEngine::Postgres),
            "mariadb" => Some(DatabaseEngine::Mariadb),
            _ => None,
        }
    }

    /// Pinned engine version.
    pub fn version(&self) -> &'static str {
        match self {
            DatabaseEngine::Mysql => "8.0.35",
            DatabaseEngine::Postgres => "15.4",
            DatabaseEngine::Mariadb => "10.11.5",
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            DatabaseEngine::Mysql | DatabaseEngine::Mariadb => 3306,
            DatabaseEngine::Postgres => 5432,
        }
    }
}

impl std::fmt::Display for DatabaseEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Closed set of security and availability hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecurityFlag {
    Encrypted,
    Private,
    Public,
    HighlyAvailable,
}

impl SecurityFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityFlag::Encrypted => "encrypted",
            SecurityFlag::Private => "private",
            SecurityFlag::Public => "public",
            SecurityFlag::HighlyAvailable => "highly-available",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "encrypted" => Some(SecurityFlag::Encrypted),
            "private" => Some(SecurityFlag::Private),
            "public" => Some(SecurityFlag::Public),
            "highly-available" => Some(SecurityFlag::HighlyAvailable),
            _ => None,
        }
    }
}

impl std::fmt::Display for SecurityFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unvalidated request as produced by the parsing collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRequest {
    #[serde(alias = "resource_type", alias = "type")]
    pub kind: Option<String>,
    pub name: Option<String>,
    pub environment: Option<String>,
    pub region: Option<String>,
    pub size: Option<String>,
    #[serde(alias = "nodeCount")]
    pub node_count: Option<i64>,
    pub engine: Option<String>,
    #[serde(deserialize_with = "security_list")]
    pub security: Vec<String>,
    #[serde(alias = "kubernetesVersion")]
    pub kubernetes_version: Option<String>,
    #[serde(alias = "cidrBlock")]
    pub cidr_block: Option<String>,
    #[serde(alias = "allocatedStorage")]
    pub allocated_storage: Option<i64>,
    pub tags: BTreeMap<String, String>,
    pub description: Option<String>,
}

/// `security` as written by hand: a list, a single flag, a map of flag to
/// bool, or nothing at all.
fn security_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Security {
        Many(Vec<String>),
        One(String),
        Switches(BTreeMap<String, bool>),
    }

    Ok(match Option::<Security>::deserialize(deserializer)? {
        Some(Security::Many(flags)) => flags,
        Some(Security::One(flag)) => vec![flag],
        Some(Security::Switches(switches)) => switches
            .into_iter()
            .filter_map(|(flag, on)| on.then_some(flag))
            .collect(),
        None => Vec::new(),
    })
}

impl RawRequest {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_environment(mut self, env: impl Into<String>) -> Self {
        self.environment = Some(env.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn with_node_count(mut self, count: i64) -> Self {
        self.node_count = Some(count);
        self
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    pub fn with_security(mut self, flag: impl Into<String>) -> Self {
        self.security.push(flag.into());
        self
    }

    pub fn with_kubernetes_version(mut self, version: impl Into<String>) -> Self {
        self.kubernetes_version = Some(version.into());
        self
    }

    pub fn with_cidr_block(mut self, cidr: impl Into<String>) -> Self {
        self.cidr_block = Some(cidr.into());
        self
    }

    pub fn with_allocated_storage(mut self, gib: i64) -> Self {
        self.allocated_storage = Some(gib);
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Parse a single request from YAML (or JSON, which is valid YAML).
    pub fn from_yaml(content: &str) -> SpecResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Parse either a single request or a list of requests.
    pub fn many_from_yaml(content: &str) -> SpecResult<Vec<Self>> {
        // Deserialize from the text, not the value, so errors keep their field path.
        match serde_yaml::from_str::<serde_yaml::Value>(content)? {
            serde_yaml::Value::Sequence(_) => Ok(serde_yaml::from_str(content)?),
            _ => Ok(vec![serde_yaml::from_str(content)?]),
        }
    }
}

/// Validated, immutable description of one infrastructure request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDescriptor {
    kind: ResourceKind,
    name: String,
    environment: Environment,
    region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<Size>,
    #[serde(skip_serializing_if = "Option::is_none")]
    node_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    engine: Option<DatabaseEngine>,
    security: BTreeSet<SecurityFlag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kubernetes_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cidr_block: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    allocated_storage: Option<u32>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    tags: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

/// Field values that passed validation; assembled into a descriptor.
#[derive(Debug, Default)]
pub(crate) struct DescriptorParts {
    pub size: Option<Size>,
    pub node_count: Option<u32>,
    pub engine: Option<DatabaseEngine>,
    pub security: BTreeSet<SecurityFlag>,
    pub kubernetes_version: Option<String>,
    pub cidr_block: Option<String>,
    pub allocated_storage: Option<u32>,
    pub tags: BTreeMap<String, String>,
    pub description: Option<String>,
}

impl ResourceDescriptor {
    pub(crate) fn from_parts(
        kind: ResourceKind,
        name: String,
        environment: Environment,
        region: String,
        parts: DescriptorParts,
    ) -> Self {
        Self {
            kind,
            name,
            environment,
            region,
            size: parts.size,
            node_count: parts.node_count,
            engine: parts.engine,
            security: parts.security,
            kubernetes_version: parts.kubernetes_version,
            cidr_block: parts.cidr_block,
            allocated_storage: parts.allocated_storage,
            tags: parts.tags,
            description: parts.description,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn size(&self) -> Option<Size> {
        self.size
    }

    /// EKS node count; always set for EKS descriptors.
    pub fn node_count(&self) -> Option<u32> {
        self.node_count
    }

    pub fn engine(&self) -> Option<DatabaseEngine> {
        self.engine
    }

    pub fn security(&self) -> &BTreeSet<SecurityFlag> {
        &self.security
    }

    pub fn has_flag(&self, flag: SecurityFlag) -> bool {
        self.security.contains(&flag)
    }

    pub fn kubernetes_version(&self) -> Option<&str> {
        self.kubernetes_version.as_deref()
    }

    pub fn cidr_block(&self) -> Option<&str> {
        self.cidr_block.as_deref()
    }

    pub fn allocated_storage(&self) -> Option<u32> {
        self.allocated_storage
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpecError;

    #[test]
    fn test_resource_kind_synonyms() {
        assert_eq!(ResourceKind::from_str("eks_cluster"), Some(ResourceKind::Eks));
        assert_eq!(ResourceKind::from_str("S3-Bucket"), Some(ResourceKind::S3));
        assert_eq!(ResourceKind::from_str("rds_database"), Some(ResourceKind::Rds));
        assert_eq!(ResourceKind::from_str("VPC"), Some(ResourceKind::Vpc));
        assert_eq!(ResourceKind::from_str("lambda"), None);
    }

    #[test]
    fn test_security_flag_normalization() {
        assert_eq!(
            SecurityFlag::from_str("highly_available"),
            Some(SecurityFlag::HighlyAvailable)
        );
        assert_eq!(SecurityFlag::from_str("secure"), None);
    }

    #[test]
    fn test_raw_request_accepts_parser_field_names() {
        let raw = RawRequest::from_yaml(
            r#"
resource_type: eks_cluster
name: analytics
nodeCount: 5
tags:
  team: data
"#,
        )
        .unwrap();
        assert_eq!(raw.kind.as_deref(), Some("eks_cluster"));
        assert_eq!(raw.node_count, Some(5));
        assert_eq!(raw.tags.get("team").map(String::as_str), Some("data"));
    }

    #[test]
    fn test_many_from_yaml_single_and_list() {
        let one = RawRequest::many_from_yaml("kind: vpc\nname: net1\n").unwrap();
        assert_eq!(one.len(), 1);

        let many = RawRequest::many_from_yaml(
            "- kind: vpc\n  name: net1\n- kind: s3\n  name: logs\n",
        )
        .unwrap();
        assert_eq!(many.len(), 2);
        assert_eq!(many[1].name.as_deref(), Some("logs"));
    }

    #[test]
    fn test_security_accepts_loose_shapes() {
        let empty = RawRequest::from_yaml("kind: s3\nname: logs\nsecurity: {}\n").unwrap();
        assert!(empty.security.is_empty());

        let null = RawRequest::from_yaml("kind: s3\nname: logs\nsecurity:\n").unwrap();
        assert!(null.security.is_empty());

        let scalar = RawRequest::from_yaml("kind: s3\nname: logs\nsecurity: encrypted\n").unwrap();
        assert_eq!(scalar.security, vec!["encrypted"]);

        let switches = RawRequest::from_yaml(
            "kind: s3\nname: logs\nsecurity:\n  encrypted: true\n  public: false\n",
        )
        .unwrap();
        assert_eq!(switches.security, vec!["encrypted"]);
    }

    #[test]
    fn test_yaml_error_names_the_field() {
        let err = RawRequest::from_yaml("kind: eks\nname: data\nnode_count: lots\n").unwrap_err();
        assert!(matches!(err, SpecError::Yaml { .. }));
        assert_eq!(err.fields(), vec!["node_count"]);

        let err = RawRequest::many_from_yaml("- kind: vpc\n  name: net1\n  tags: [a, b]\n")
            .unwrap_err();
        assert_eq!(err.fields(), vec!["tags"]);

        let err = RawRequest::from_yaml("kind: [vpc").unwrap_err();
        assert!(err.fields().is_empty());
    }

    #[test]
    fn test_engine_defaults() {
        assert_eq!(DatabaseEngine::default(), DatabaseEngine::Mysql);
        assert_eq!(DatabaseEngine::Postgres.port(), 5432);
        assert_eq!(DatabaseEngine::from_str("postgresql"), Some(DatabaseEngine::Postgres));
    }
}
