//! The environment policy table.
//!
//! Values are static and read-only; lookups never fail and can be shared
//! freely across concurrent generation runs.

use serde::Serialize;

use crate::environment::{Environment, Size, SubnetTier};
use crate::error::{PolicyError, PolicyResult};

/// Sizing, availability and security defaults for one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyValues {
    /// Primary EKS worker instance class.
    pub instance_class: &'static str,
    /// Instance type mix offered to the node group.
    pub instance_types: &'static [&'static str],
    /// Default EKS node count.
    pub replica_count: u32,
    pub multi_az: bool,
    pub encryption_default: bool,
    pub subnet_tier: SubnetTier,
    /// Default RDS instance class.
    pub db_instance_class: &'static str,
    pub backup_retention_days: u32,
    pub deletion_protection: bool,
}

static DEVELOPMENT: PolicyValues = PolicyValues {
    instance_class: "t3.medium",
    instance_types: &["t3.medium"],
    replica_count: 3,
    multi_az: false,
    encryption_default: false,
    subnet_tier: SubnetTier::Public,
    db_instance_class: "db.t3.micro",
    backup_retention_days: 1,
    deletion_protection: false,
};

static STAGING: PolicyValues = PolicyValues {
    instance_class: "m5.large",
    instance_types: &["m5.large", "m6i.large", "t3.large"],
    replica_count: 4,
    multi_az: false,
    encryption_default: true,
    subnet_tier: SubnetTier::Private,
    db_instance_class: "db.t3.small",
    backup_retention_days: 3,
    deletion_protection: false,
};

static PRODUCTION: PolicyValues = PolicyValues {
    instance_class: "m6i.large",
    instance_types: &["m6i.large"],
    replica_count: 5,
    multi_az: true,
    encryption_default: true,
    subnet_tier: SubnetTier::Private,
    db_instance_class: "db.t3.medium",
    backup_retention_days: 7,
    deletion_protection: true,
};

/// Look up the policy for an environment.
pub fn policy_for(environment: Environment) -> &'static PolicyValues {
    match environment {
        Environment::Development => &DEVELOPMENT,
        Environment::Staging => &STAGING,
        Environment::Production => &PRODUCTION,
    }
}

impl PolicyValues {
    /// Number of strictness toggles switched on. Higher means stricter.
    pub fn strictness_rank(&self) -> u32 {
        [
            self.multi_az,
            self.encryption_default,
            self.subnet_tier == SubnetTier::Private,
            self.deletion_protection,
        ]
        .iter()
        .filter(|on| **on)
        .count() as u32
    }
}

/// Explicit size hints override the environment defaults.
pub struct SizeOverrides;

impl SizeOverrides {
    pub fn eks_instance_class(size: Size) -> &'static str {
        match size {
            Size::Small => "t3.medium",
            Size::Medium => "m5.large",
            Size::Large => "m6i.xlarge",
        }
    }

    pub fn db_instance_class(size: Size) -> &'static str {
        match size {
            Size::Small => "db.t3.micro",
            Size::Medium => "db.t3.medium",
            Size::Large => "db.m6i.large",
        }
    }

    /// Allocated RDS storage in GiB.
    pub fn db_storage_gib(size: Option<Size>) -> u32 {
        match size {
            None | Some(Size::Small) => 20,
            Some(Size::Medium) => 100,
            Some(Size::Large) => 500,
        }
    }
}

/// Serializable view of the whole table, used by `xpf policy`.
#[derive(Debug, Serialize)]
pub struct PolicyTable {
    pub entries: Vec<PolicyTableEntry>,
}

#[derive(Debug, Serialize)]
pub struct PolicyTableEntry {
    pub environment: Environment,
    #[serde(flatten)]
    pub values: &'static PolicyValues,
}

impl PolicyTable {
    pub fn all() -> Self {
        Self::for_environments(&Environment::all())
    }

    pub fn for_environments(environments: &[Environment]) -> Self {
        Self {
            entries: environments
                .iter()
                .map(|env| PolicyTableEntry {
                    environment: *env,
                    values: policy_for(*env),
                })
                .collect(),
        }
    }

    pub fn to_yaml(&self) -> PolicyResult<String> {
        serde_yaml::to_string(self).map_err(PolicyError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_is_strict() {
        let prod = policy_for(Environment::Production);
        assert!(prod.encryption_default);
        assert!(prod.multi_az);
        assert_eq!(prod.instance_class, "m6i.large");
        assert_eq!(prod.replica_count, 5);
    }

    #[test]
    fn test_dev_is_single_az() {
        let dev = policy_for(Environment::Development);
        assert!(!dev.multi_az);
        assert!(!dev.encryption_default);
        assert_eq!(dev.instance_class, "t3.medium");
        assert_eq!(dev.replica_count, 3);
    }

    #[test]
    fn test_staging_mixed_instances() {
        let staging = policy_for(Environment::Staging);
        assert_eq!(staging.instance_class, "m5.large");
        assert!(staging.instance_types.len() > 1);
        assert_eq!(staging.instance_types[0], staging.instance_class);
        assert_eq!(staging.replica_count, 4);
        assert!(staging.encryption_default);
        assert!(!staging.multi_az);
    }

    #[test]
    fn test_strictness_is_monotonic() {
        let ranks: Vec<u32> = Environment::all()
            .into_iter()
            .map(|env| policy_for(env).strictness_rank())
            .collect();
        assert!(ranks.windows(2).all(|w| w[0] <= w[1]), "ranks: {:?}", ranks);
    }

    #[test]
    fn test_lookup_is_idempotent() {
        for env in Environment::all() {
            assert_eq!(policy_for(env), policy_for(env));
        }
    }

    #[test]
    fn test_table_yaml_lists_every_environment() {
        let yaml = PolicyTable::all().to_yaml().unwrap();
        assert!(yaml.contains("environment: dev"));
        assert!(yaml.contains("environment: staging"));
        assert!(yaml.contains("environment: production"));
        assert!(yaml.contains("instance_class: m6i.large"));
    }

    #[test]
    fn test_size_overrides() {
        assert_eq!(SizeOverrides::eks_instance_class(Size::Large), "m6i.xlarge");
        assert_eq!(SizeOverrides::db_storage_gib(None), 20);
        assert_eq!(SizeOverrides::db_storage_gib(Some(Size::Medium)), 100);
    }
}
