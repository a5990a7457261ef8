//! RDS manifests: subnet group, security group and database instance.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;
use xpf_policy::{PolicyValues, SizeOverrides};
use xpf_spec::{DatabaseEngine, ResourceDescriptor, ResourceKind, SecurityFlag};

use crate::crossplane::{
    placeholder, render, standard_tags, CrossplaneObject, ManagedSpec, NameRef, ObjectMeta,
    SecretKeyRef, SecretRef, DEFAULT_PROVIDER_CONFIG,
};
use crate::document::{DocumentId, DocumentKind, ManifestDocument};
use crate::engines::{ensure_compatible, TemplateEngine};
use crate::error::IacResult;

const DATABASE_API: &str = "database.aws.crossplane.io/v1beta1";
const EC2_API: &str = "ec2.aws.crossplane.io/v1beta1";
const MASTER_USERNAME: &str = "dbadmin";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubnetGroupParameters {
    region: String,
    description: String,
    subnet_ids: Vec<String>,
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SecurityGroupParameters {
    region: String,
    group_name: String,
    description: String,
    vpc_id: String,
    ingress: Vec<IngressRule>,
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IngressRule {
    ip_protocol: &'static str,
    from_port: u16,
    to_port: u16,
    ip_ranges: Vec<IpRange>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IpRange {
    cidr_ip: String,
    description: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InstanceParameters {
    region: String,
    db_instance_class: String,
    engine: &'static str,
    engine_version: &'static str,
    allocated_storage: u32,
    storage_type: &'static str,
    storage_encrypted: bool,
    #[serde(rename = "multiAZ")]
    multi_az: bool,
    publicly_accessible: bool,
    master_username: &'static str,
    master_user_password_secret_ref: SecretKeyRef,
    db_subnet_group_name_ref: NameRef,
    vpc_security_group_id_refs: Vec<NameRef>,
    backup_retention_period: u32,
    preferred_backup_window: &'static str,
    preferred_maintenance_window: &'static str,
    auto_minor_version_upgrade: bool,
    deletion_protection: bool,
    skip_final_snapshot_before_deletion: bool,
    tags: BTreeMap<String, String>,
}

/// Generator for RDS databases.
pub struct RdsEngine;

impl RdsEngine {
    pub fn subnet_group_name(descriptor: &ResourceDescriptor) -> String {
        format!("{}-subnet-group", descriptor.name())
    }

    pub fn security_group_name(descriptor: &ResourceDescriptor) -> String {
        format!("{}-security-group", descriptor.name())
    }

    /// Externally managed secret holding the master password.
    pub fn credentials_secret(descriptor: &ResourceDescriptor) -> String {
        format!("{}-credentials", descriptor.name())
    }

    pub fn connection_secret(descriptor: &ResourceDescriptor) -> String {
        format!("{}-db-connection", descriptor.name())
    }

    pub fn multi_az(descriptor: &ResourceDescriptor, policy: &PolicyValues) -> bool {
        policy.multi_az || descriptor.has_flag(SecurityFlag::HighlyAvailable)
    }

    pub fn storage_encrypted(descriptor: &ResourceDescriptor, policy: &PolicyValues) -> bool {
        policy.encryption_default || descriptor.has_flag(SecurityFlag::Encrypted)
    }

    fn subnet_group(&self, descriptor: &ResourceDescriptor) -> IacResult<ManifestDocument> {
        let name = Self::subnet_group_name(descriptor);
        let object = CrossplaneObject {
            api_version: DATABASE_API,
            kind: "DBSubnetGroup",
            metadata: ObjectMeta::labelled(name.clone(), descriptor),
            spec: ManagedSpec::new(
                SubnetGroupParameters {
                    region: descriptor.region().to_string(),
                    description: format!("Private subnets for {}", descriptor.name()),
                    subnet_ids: (1..=2)
                        .map(|i| placeholder(descriptor, &format!("privateSubnet{}Id", i)))
                        .collect(),
                    tags: standard_tags(descriptor),
                },
                DEFAULT_PROVIDER_CONFIG,
            ),
        };
        Ok(ManifestDocument::new(
            DocumentKind::SubnetGroup,
            name,
            descriptor.name(),
            render(descriptor, &object)?,
        ))
    }

    fn security_group(
        &self,
        descriptor: &ResourceDescriptor,
        engine: DatabaseEngine,
    ) -> IacResult<ManifestDocument> {
        let name = Self::security_group_name(descriptor);
        let port = engine.port();
        let object = CrossplaneObject {
            api_version: EC2_API,
            kind: "SecurityGroup",
            metadata: ObjectMeta::labelled(name.clone(), descriptor),
            spec: ManagedSpec::new(
                SecurityGroupParameters {
                    region: descriptor.region().to_string(),
                    group_name: name.clone(),
                    description: format!("{} access for {}", engine, descriptor.name()),
                    vpc_id: placeholder(descriptor, "vpcId"),
                    ingress: vec![IngressRule {
                        ip_protocol: "tcp",
                        from_port: port,
                        to_port: port,
                        ip_ranges: vec![IpRange {
                            cidr_ip: placeholder(descriptor, "vpcCidr"),
                            description: "VPC-internal database traffic",
                        }],
                    }],
                    tags: standard_tags(descriptor),
                },
                DEFAULT_PROVIDER_CONFIG,
            ),
        };
        Ok(ManifestDocument::new(
            DocumentKind::SecurityGroup,
            name,
            descriptor.name(),
            render(descriptor, &object)?,
        ))
    }

    fn instance(
        &self,
        descriptor: &ResourceDescriptor,
        policy: &PolicyValues,
        engine: DatabaseEngine,
    ) -> IacResult<ManifestDocument> {
        let env = descriptor.environment();
        let subnet_group = Self::subnet_group_name(descriptor);
        let security_group = Self::security_group_name(descriptor);

        let db_instance_class = descriptor
            .size()
            .map(SizeOverrides::db_instance_class)
            .unwrap_or(policy.db_instance_class);
        let allocated_storage = descriptor
            .allocated_storage()
            .unwrap_or_else(|| SizeOverrides::db_storage_gib(descriptor.size()));

        let mut tags = standard_tags(descriptor);
        tags.insert("Engine".to_string(), engine.to_string());

        let parameters = InstanceParameters {
            region: descriptor.region().to_string(),
            db_instance_class: db_instance_class.to_string(),
            engine: engine.as_str(),
            engine_version: engine.version(),
            allocated_storage,
            storage_type: "gp3",
            storage_encrypted: Self::storage_encrypted(descriptor, policy),
            multi_az: Self::multi_az(descriptor, policy),
            publicly_accessible: false,
            master_username: MASTER_USERNAME,
            master_user_password_secret_ref: SecretKeyRef::in_crossplane(
                Self::credentials_secret(descriptor),
                "password",
            ),
            db_subnet_group_name_ref: NameRef::new(subnet_group.clone()),
            vpc_security_group_id_refs: vec![NameRef::new(security_group.clone())],
            backup_retention_period: policy.backup_retention_days,
            preferred_backup_window: "03:00-04:00",
            preferred_maintenance_window: "sun:04:00-sun:05:00",
            auto_minor_version_upgrade: !env.is_production(),
            deletion_protection: policy.deletion_protection,
            skip_final_snapshot_before_deletion: !policy.deletion_protection,
            tags,
        };

        let object = CrossplaneObject {
            api_version: DATABASE_API,
            kind: "RDSInstance",
            metadata: ObjectMeta::labelled(descriptor.name(), descriptor)
                .label("engine", engine.as_str()),
            spec: ManagedSpec::new(parameters, DEFAULT_PROVIDER_CONFIG).with_connection_secret(
                SecretRef::in_crossplane(Self::connection_secret(descriptor)),
            ),
        };

        Ok(ManifestDocument::new(
            DocumentKind::Instance,
            descriptor.name(),
            descriptor.name(),
            render(descriptor, &object)?,
        )
        .referencing(DocumentId::new(DocumentKind::SubnetGroup, subnet_group))
        .referencing(DocumentId::new(DocumentKind::SecurityGroup, security_group)))
    }
}

impl TemplateEngine for RdsEngine {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Rds
    }

    fn generate(
        &self,
        descriptor: &ResourceDescriptor,
        policy: &PolicyValues,
    ) -> IacResult<Vec<ManifestDocument>> {
        ensure_compatible(self.kind(), descriptor)?;
        let engine = descriptor.engine().unwrap_or_default();

        let documents = vec![
            self.subnet_group(descriptor)?,
            self.security_group(descriptor, engine)?,
            self.instance(descriptor, policy, engine)?,
        ];

        debug!(
            "Generated {} RDS documents for '{}' ({})",
            documents.len(),
            descriptor.name(),
            engine
        );
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crossplane::lookup;
    use xpf_policy::policy_for;
    use xpf_spec::{DescriptorValidator, RawRequest};

    fn generate(raw: RawRequest) -> Vec<ManifestDocument> {
        let descriptor = DescriptorValidator::validate(&raw).unwrap();
        RdsEngine
            .generate(&descriptor, policy_for(descriptor.environment()))
            .unwrap()
    }

    fn parameter(
        documents: &[ManifestDocument],
        kind: DocumentKind,
        key: &str,
    ) -> serde_yaml::Value {
        let document = documents.iter().find(|d| d.kind == kind).unwrap();
        lookup(&document.body, &["spec", "forProvider", key])
    }

    #[test]
    fn test_dev_mysql_defaults() {
        let documents = generate(RawRequest::new("rds", "orders"));
        assert_eq!(documents.len(), 3);
        let get = |key: &str| parameter(&documents, DocumentKind::Instance, key);
        assert_eq!(get("engine").as_str(), Some("mysql"));
        assert_eq!(get("engineVersion").as_str(), Some("8.0.35"));
        assert_eq!(get("dbInstanceClass").as_str(), Some("db.t3.micro"));
        assert_eq!(get("allocatedStorage").as_u64(), Some(20));
        assert_eq!(get("multiAZ").as_bool(), Some(false));
        assert_eq!(get("storageEncrypted").as_bool(), Some(false));
        assert_eq!(get("publiclyAccessible").as_bool(), Some(false));
    }

    #[test]
    fn test_postgres_security_group_port() {
        let documents = generate(RawRequest::new("rds", "ledger").with_engine("postgresql"));
        let ingress = parameter(&documents, DocumentKind::SecurityGroup, "ingress");
        assert_eq!(ingress[0]["fromPort"].as_u64(), Some(5432));
        assert_eq!(ingress[0]["toPort"].as_u64(), Some(5432));
    }

    #[test]
    fn test_credentials_are_secret_references() {
        let documents = generate(RawRequest::new("rds", "orders").with_environment("production"));
        let instance = documents.iter().find(|d| d.kind == DocumentKind::Instance).unwrap();
        assert!(!instance.body.contains("masterUserPassword:"));
        let secret = lookup(
            &instance.body,
            &["spec", "forProvider", "masterUserPasswordSecretRef", "name"],
        );
        assert_eq!(secret.as_str(), Some("orders-credentials"));
        let connection = lookup(&instance.body, &["spec", "writeConnectionSecretToRef", "name"]);
        assert_eq!(connection.as_str(), Some("orders-db-connection"));
    }

    #[test]
    fn test_highly_available_and_encrypted_flags_override_dev_policy() {
        let documents = generate(
            RawRequest::new("rds", "orders")
                .with_security("highly-available")
                .with_security("encrypted"),
        );
        let get = |key: &str| parameter(&documents, DocumentKind::Instance, key);
        assert_eq!(get("multiAZ").as_bool(), Some(true));
        assert_eq!(get("storageEncrypted").as_bool(), Some(true));
    }

    #[test]
    fn test_size_and_storage_overrides() {
        let documents = generate(
            RawRequest::new("rds", "warehouse")
                .with_size("large")
                .with_allocated_storage(750),
        );
        let get = |key: &str| parameter(&documents, DocumentKind::Instance, key);
        assert_eq!(get("dbInstanceClass").as_str(), Some("db.m6i.large"));
        assert_eq!(get("allocatedStorage").as_u64(), Some(750));
    }

    #[test]
    fn test_instance_references_network_documents() {
        let documents = generate(RawRequest::new("rds", "orders"));
        let instance = documents.iter().find(|d| d.kind == DocumentKind::Instance).unwrap();
        assert!(instance.depends_on(&DocumentId::new(
            DocumentKind::SubnetGroup,
            "orders-subnet-group"
        )));
        assert!(instance.depends_on(&DocumentId::new(
            DocumentKind::SecurityGroup,
            "orders-security-group"
        )));
        assert_eq!(instance.references.len(), 2);
    }

    #[test]
    fn test_production_protection() {
        let documents = generate(RawRequest::new("rds", "orders").with_environment("prod"));
        let get = |key: &str| parameter(&documents, DocumentKind::Instance, key);
        assert_eq!(get("deletionProtection").as_bool(), Some(true));
        assert_eq!(get("backupRetentionPeriod").as_u64(), Some(7));
        assert_eq!(get("autoMinorVersionUpgrade").as_bool(), Some(false));
        assert_eq!(get("dbInstanceClass").as_str(), Some("db.t3.medium"));
    }
}
