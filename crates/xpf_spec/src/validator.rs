//! Descriptor validation.
//!
//! Turns a [`RawRequest`] into a [`ResourceDescriptor`], normalizing
//! synonyms and filling defaults. Values outside a recognized enumeration
//! are dropped with a warning unless they make the request unusable
//! (unknown kind, unknown engine).

use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};
use xpf_policy::{policy_for, Environment, Size};

use crate::error::{FieldIssue, SpecError, SpecResult};
use crate::models::{
    DatabaseEngine, DescriptorParts, RawRequest, ResourceDescriptor, ResourceKind, SecurityFlag,
};

pub const DEFAULT_REGION: &str = "us-east-1";
pub const MAX_NAME_LENGTH: usize = 63;
pub const MIN_ALLOCATED_STORAGE_GIB: i64 = 20;
/// Larger node groups need a capacity review before they are requested.
pub const MAX_NODE_COUNT: i64 = 20;
/// RDS gp3 upper limit (64 TiB).
pub const MAX_ALLOCATED_STORAGE_GIB: i64 = 65_536;

fn dns_label() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$").expect("static regex"))
}

fn aws_region() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z]{2}(-gov)?-[a-z]+-\d$").expect("static regex"))
}

fn kubernetes_version() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.\d+(\.\d+)?$").expect("static regex"))
}

/// Validator for raw resource requests.
pub struct DescriptorValidator;

impl DescriptorValidator {
    /// Validate and normalize a raw request.
    pub fn validate(raw: &RawRequest) -> SpecResult<ResourceDescriptor> {
        let mut issues = Vec::new();

        let kind = match raw.kind.as_deref().map(str::trim) {
            None | Some("") => {
                issues.push(FieldIssue::new("kind", "resource kind is required"));
                None
            }
            Some(value) => {
                let kind = ResourceKind::from_str(value);
                if kind.is_none() {
                    issues.push(FieldIssue::new(
                        "kind",
                        format!("unknown resource kind '{}' (expected eks, s3, rds or vpc)", value),
                    ));
                }
                kind
            }
        };

        let name = match raw.name.as_deref().map(str::trim) {
            None | Some("") => {
                issues.push(FieldIssue::new("name", "resource name is required"));
                None
            }
            Some(value) => {
                Self::check_name(value)?;
                Some(value.to_string())
            }
        };

        let environment = Self::environment(raw.environment.as_deref());
        let region = Self::region(raw.region.as_deref(), &mut issues);
        let size = Self::size(raw.size.as_deref());
        let engine = Self::engine(raw.engine.as_deref(), &mut issues);
        let security = Self::security(&raw.security);

        let node_count = match raw.node_count {
            Some(n) if n < 1 => {
                issues.push(FieldIssue::new(
                    "node_count",
                    format!("must be at least 1, got {}", n),
                ));
                None
            }
            Some(n) if n > MAX_NODE_COUNT => {
                issues.push(FieldIssue::new(
                    "node_count",
                    format!(
                        "must not exceed {} without special consideration, got {}",
                        MAX_NODE_COUNT, n
                    ),
                ));
                None
            }
            Some(n) => u32::try_from(n).ok(),
            None => None,
        };

        if let Some(version) = raw.kubernetes_version.as_deref() {
            if !kubernetes_version().is_match(version.trim()) {
                issues.push(FieldIssue::new(
                    "kubernetes_version",
                    "must be in format X.Y or X.Y.Z",
                ));
            }
        }

        if let Some(cidr) = raw.cidr_block.as_deref() {
            if let Err(message) = Self::check_cidr(cidr.trim()) {
                issues.push(FieldIssue::new("cidr_block", message));
            }
        }

        let allocated_storage = match raw.allocated_storage {
            Some(gib) if gib < MIN_ALLOCATED_STORAGE_GIB => {
                issues.push(FieldIssue::new(
                    "allocated_storage",
                    format!("must be at least {} GiB, got {}", MIN_ALLOCATED_STORAGE_GIB, gib),
                ));
                None
            }
            Some(gib) if gib > MAX_ALLOCATED_STORAGE_GIB => {
                issues.push(FieldIssue::new(
                    "allocated_storage",
                    format!("must not exceed {} GiB, got {}", MAX_ALLOCATED_STORAGE_GIB, gib),
                ));
                None
            }
            Some(gib) => u32::try_from(gib).ok(),
            None => None,
        };

        if !issues.is_empty() {
            return Err(SpecError::InvalidRequest { issues });
        }

        // Both are present once no issues were recorded.
        let (Some(kind), Some(name)) = (kind, name) else {
            return Err(SpecError::invalid_field("kind", "resource kind is required"));
        };

        Self::check_combinations(kind, raw, &security)?;

        let node_count = match kind {
            ResourceKind::Eks => Some(node_count.unwrap_or(policy_for(environment).replica_count)),
            _ => None,
        };

        let descriptor = ResourceDescriptor::from_parts(
            kind,
            name,
            environment,
            region,
            DescriptorParts {
                size,
                node_count,
                engine: match kind {
                    ResourceKind::Rds => Some(engine.unwrap_or_default()),
                    _ => None,
                },
                security,
                kubernetes_version: raw.kubernetes_version.as_ref().map(|v| v.trim().to_string()),
                cidr_block: raw.cidr_block.as_ref().map(|c| c.trim().to_string()),
                allocated_storage,
                tags: raw.tags.clone(),
                description: raw
                    .description
                    .as_ref()
                    .map(|d| d.trim().to_string())
                    .filter(|d| !d.is_empty()),
            },
        );

        debug!(
            "Validated {} request '{}' for {}",
            descriptor.kind(),
            descriptor.name(),
            descriptor.environment()
        );
        Ok(descriptor)
    }

    /// Check a resource name against DNS-label rules.
    pub fn check_name(name: &str) -> SpecResult<()> {
        if name.len() > MAX_NAME_LENGTH {
            return Err(SpecError::InvalidName {
                value: name.to_string(),
                reason: format!("must be at most {} characters", MAX_NAME_LENGTH),
            });
        }
        if !dns_label().is_match(name) {
            return Err(SpecError::InvalidName {
                value: name.to_string(),
                reason: "must contain only lowercase letters, digits and hyphens, \
                         and start and end with a letter or digit"
                    .to_string(),
            });
        }
        Ok(())
    }

    fn environment(value: Option<&str>) -> Environment {
        match value {
            None => Environment::default(),
            Some(v) => Environment::from_str(v).unwrap_or_else(|| {
                warn!("Ignoring unrecognized environment '{}', using dev", v);
                Environment::default()
            }),
        }
    }

    fn region(value: Option<&str>, issues: &mut Vec<FieldIssue>) -> String {
        match value.map(str::trim) {
            None | Some("") => DEFAULT_REGION.to_string(),
            Some(v) => {
                let v = v.to_lowercase();
                if !aws_region().is_match(&v) {
                    issues.push(FieldIssue::new(
                        "region",
                        format!("'{}' is not an AWS region code", v),
                    ));
                }
                v
            }
        }
    }

    fn size(value: Option<&str>) -> Option<Size> {
        let v = value?;
        let size = Size::from_str(v);
        if size.is_none() {
            warn!("Ignoring unrecognized size '{}'", v);
        }
        size
    }

    fn engine(value: Option<&str>, issues: &mut Vec<FieldIssue>) -> Option<DatabaseEngine> {
        let v = value?;
        let engine = DatabaseEngine::from_str(v);
        if engine.is_none() {
            issues.push(FieldIssue::new(
                "engine",
                format!("unsupported engine '{}' (expected mysql, postgres or mariadb)", v),
            ));
        }
        engine
    }

    fn security(values: &[String]) -> BTreeSet<SecurityFlag> {
        values
            .iter()
            .filter_map(|v| {
                let flag = SecurityFlag::from_str(v);
                if flag.is_none() {
                    warn!("Ignoring unrecognized security flag '{}'", v);
                }
                flag
            })
            .collect()
    }

    fn check_cidr(cidr: &str) -> Result<(), String> {
        let (addr, prefix) = cidr
            .split_once('/')
            .ok_or_else(|| format!("'{}' is not in address/prefix form", cidr))?;
        addr.parse::<Ipv4Addr>()
            .map_err(|_| format!("'{}' is not an IPv4 address", addr))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| format!("'{}' is not a prefix length", prefix))?;
        if !(16..=28).contains(&prefix) {
            return Err(format!("prefix /{} must be between /16 and /28", prefix));
        }
        Ok(())
    }

    /// Reject fields that make no sense for the requested kind.
    fn check_combinations(
        kind: ResourceKind,
        raw: &RawRequest,
        security: &BTreeSet<SecurityFlag>,
    ) -> SpecResult<()> {
        let unsupported = |field: &str, reason: &str| SpecError::UnsupportedCombination {
            kind: kind.to_string(),
            field: field.to_string(),
            reason: reason.to_string(),
        };

        if kind != ResourceKind::Rds && raw.engine.is_some() {
            return Err(unsupported("engine", "only applies to rds requests"));
        }
        if kind != ResourceKind::Rds && raw.allocated_storage.is_some() {
            return Err(unsupported("allocated_storage", "only applies to rds requests"));
        }
        if kind != ResourceKind::Eks && raw.node_count.is_some() {
            return Err(unsupported("node_count", "only applies to eks requests"));
        }
        if kind != ResourceKind::Eks && raw.kubernetes_version.is_some() {
            return Err(unsupported("kubernetes_version", "only applies to eks requests"));
        }
        if kind != ResourceKind::Vpc && raw.cidr_block.is_some() {
            return Err(unsupported("cidr_block", "only applies to vpc requests"));
        }
        if security.contains(&SecurityFlag::Public) && security.contains(&SecurityFlag::Private) {
            return Err(unsupported("security", "cannot request both public and private"));
        }
        if kind == ResourceKind::Rds && security.contains(&SecurityFlag::Public) {
            return Err(unsupported("security", "rds instances are never publicly accessible"));
        }
        Ok(())
    }
}
