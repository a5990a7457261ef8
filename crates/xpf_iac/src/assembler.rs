//! Manifest assembly: path assignment, integrity checks and summaries.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;
use tracing::{debug, error};
use xpf_policy::{policy_for, Environment};
use xpf_spec::{ResourceDescriptor, ResourceKind, SecurityFlag};

use crate::advisor;
use crate::document::{DocumentId, DocumentKind, ManifestDocument};
use crate::engines::{encryption_enabled, EksEngine, RdsEngine};
use crate::error::{IacError, IacResult};

/// Repository-relative path of a document.
pub fn document_path(environment: Environment, resource: &str, kind: DocumentKind) -> String {
    format!("{}/{}-{}.yaml", environment, resource, kind)
}

/// Data handed to the publisher alongside the files of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestSummary {
    pub kind: ResourceKind,
    pub name: String,
    pub environment: Environment,
    pub region: String,
    pub document_count: usize,
    pub document_kinds: Vec<DocumentKind>,
    /// Flags requested explicitly.
    pub security_flags: Vec<SecurityFlag>,
    /// Whether data at rest ends up encrypted, by flag or by policy.
    pub encrypted: bool,
    /// Whether the resource is private to the VPC.
    pub private: bool,
    pub paths: Vec<String>,
    pub suggestions: Vec<String>,
}

impl ManifestSummary {
    fn build(descriptor: &ResourceDescriptor, documents: &[ManifestDocument]) -> Self {
        let policy = policy_for(descriptor.environment());
        let encrypted = match descriptor.kind() {
            ResourceKind::Rds => RdsEngine::storage_encrypted(descriptor, policy),
            ResourceKind::Vpc => false,
            _ => encryption_enabled(descriptor, policy),
        };
        let private = match descriptor.kind() {
            ResourceKind::Eks => EksEngine::private_endpoint(descriptor),
            ResourceKind::Rds | ResourceKind::Vpc => true,
            ResourceKind::S3 => !descriptor.has_flag(SecurityFlag::Public),
        };

        Self {
            kind: descriptor.kind(),
            name: descriptor.name().to_string(),
            environment: descriptor.environment(),
            region: descriptor.region().to_string(),
            document_count: documents.len(),
            document_kinds: documents.iter().map(|d| d.kind).collect(),
            security_flags: descriptor.security().iter().copied().collect(),
            encrypted,
            private,
            paths: documents.iter().map(|d| d.path.clone()).collect(),
            suggestions: advisor::suggestions(descriptor),
        }
    }
}

/// Documents of one or more resources, ready to publish.
///
/// Paths are unique and every reference resolves within the set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestSet {
    documents: Vec<ManifestDocument>,
    summaries: Vec<ManifestSummary>,
}

impl ManifestSet {
    pub fn documents(&self) -> &[ManifestDocument] {
        &self.documents
    }

    pub fn summaries(&self) -> &[ManifestSummary] {
        &self.summaries
    }

    /// Summary of the first resource; every set has at least one.
    pub fn primary(&self) -> Option<&ManifestSummary> {
        self.summaries.first()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// `(path, body)` pairs in emission order.
    pub fn files(&self) -> impl Iterator<Item = (&str, &str)> {
        self.documents
            .iter()
            .map(|d| (d.path.as_str(), d.body.as_str()))
    }

    pub fn get(&self, id: &DocumentId) -> Option<&ManifestDocument> {
        self.documents.iter().find(|d| &d.id() == id)
    }

    pub fn by_kind(&self, kind: DocumentKind) -> impl Iterator<Item = &ManifestDocument> {
        self.documents.iter().filter(move |d| d.kind == kind)
    }

    /// Combine independently assembled sets into one.
    ///
    /// Uniqueness and integrity are re-checked over the union; sets never
    /// reference each other.
    pub fn merge(sets: impl IntoIterator<Item = ManifestSet>) -> IacResult<ManifestSet> {
        let mut documents = Vec::new();
        let mut summaries = Vec::new();
        for set in sets {
            documents.extend(set.documents);
            summaries.extend(set.summaries);
        }
        check_unique(&documents)?;
        check_integrity(&documents)?;
        debug!(
            "Merged {} resources into {} documents",
            summaries.len(),
            documents.len()
        );
        Ok(ManifestSet {
            documents,
            summaries,
        })
    }
}

/// Assembler for the documents of one resource.
pub struct ManifestAssembler;

impl ManifestAssembler {
    /// Place documents at their paths and check the set is self-contained.
    ///
    /// Either every document is placed or the whole set is rejected.
    pub fn assemble(
        descriptor: &ResourceDescriptor,
        documents: Vec<ManifestDocument>,
    ) -> IacResult<ManifestSet> {
        let documents: Vec<ManifestDocument> = documents
            .into_iter()
            .map(|doc| {
                let path = document_path(descriptor.environment(), &doc.resource, doc.kind);
                doc.placed_at(path)
            })
            .collect();

        check_unique(&documents)?;
        check_integrity(&documents)?;

        let summary = ManifestSummary::build(descriptor, &documents);
        debug!(
            "Assembled {} documents for '{}'",
            documents.len(),
            descriptor.name()
        );
        Ok(ManifestSet {
            documents,
            summaries: vec![summary],
        })
    }
}

fn check_unique(documents: &[ManifestDocument]) -> IacResult<()> {
    let mut paths = HashSet::new();
    let mut ids = HashSet::new();
    for doc in documents {
        if !paths.insert(doc.path.as_str()) {
            return Err(IacError::PathCollision {
                path: doc.path.clone(),
            });
        }
        if !ids.insert(doc.id()) {
            return Err(IacError::DuplicateIdentity {
                id: doc.id(),
                path: doc.path.clone(),
            });
        }
    }
    Ok(())
}

/// Every reference must name another document in the set.
fn check_integrity(documents: &[ManifestDocument]) -> IacResult<()> {
    let ids: BTreeSet<DocumentId> = documents.iter().map(ManifestDocument::id).collect();
    for doc in documents {
        for reference in &doc.references {
            if !ids.contains(reference) || *reference == doc.id() {
                error!(
                    "Dangling reference from {} to {}; this is a generator defect",
                    doc.id(),
                    reference
                );
                return Err(IacError::ReferenceIntegrity {
                    from: doc.id(),
                    missing: reference.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use xpf_spec::{DescriptorValidator, RawRequest};

    fn descriptor() -> ResourceDescriptor {
        DescriptorValidator::validate(&RawRequest::new("eks", "demo")).unwrap()
    }

    fn doc(kind: DocumentKind, name: &str) -> ManifestDocument {
        ManifestDocument::new(kind, name, "demo", format!("# {}\n", name))
    }

    #[test]
    fn test_document_path() {
        assert_eq!(
            document_path(Environment::Production, "data-platform", DocumentKind::NodeGroup),
            "production/data-platform-node-group.yaml"
        );
    }

    #[test]
    fn test_assemble_places_documents_in_order() {
        let set = ManifestAssembler::assemble(
            &descriptor(),
            vec![
                doc(DocumentKind::Cluster, "demo")
                    .referencing(DocumentId::new(DocumentKind::ProviderConfig, "demo-pc")),
                doc(DocumentKind::ProviderConfig, "demo-pc"),
            ],
        )
        .unwrap();
        let paths: Vec<&str> = set.files().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["dev/demo-cluster.yaml", "dev/demo-provider-config.yaml"]);
        let summary = set.primary().unwrap();
        assert_eq!(summary.document_count, 2);
        assert_eq!(summary.paths.len(), 2);
    }

    #[test]
    fn test_dangling_reference_is_rejected() {
        let err = ManifestAssembler::assemble(
            &descriptor(),
            vec![doc(DocumentKind::NodeGroup, "demo-node-group")
                .referencing(DocumentId::new(DocumentKind::Cluster, "demo"))],
        )
        .unwrap_err();
        match err {
            IacError::ReferenceIntegrity { from, missing } => {
                assert_eq!(from.to_string(), "node-group/demo-node-group");
                assert_eq!(missing.to_string(), "cluster/demo");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_self_reference_is_rejected() {
        let err = ManifestAssembler::assemble(
            &descriptor(),
            vec![doc(DocumentKind::Cluster, "demo")
                .referencing(DocumentId::new(DocumentKind::Cluster, "demo"))],
        )
        .unwrap_err();
        assert!(matches!(err, IacError::ReferenceIntegrity { .. }));
    }

    #[test]
    fn test_same_kind_twice_collides() {
        let err = ManifestAssembler::assemble(
            &descriptor(),
            vec![
                doc(DocumentKind::Cluster, "demo"),
                doc(DocumentKind::Cluster, "demo-two"),
            ],
        )
        .unwrap_err();
        assert!(
            matches!(err, IacError::PathCollision { ref path } if path == "dev/demo-cluster.yaml")
        );
    }

    #[test]
    fn test_assemble_is_idempotent() {
        let build = || {
            ManifestAssembler::assemble(
                &descriptor(),
                vec![
                    doc(DocumentKind::ProviderConfig, "demo-pc"),
                    doc(DocumentKind::Cluster, "demo"),
                ],
            )
            .unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_merge_rejects_overlapping_sets() {
        let set = || {
            ManifestAssembler::assemble(&descriptor(), vec![doc(DocumentKind::Cluster, "demo")])
                .unwrap()
        };
        let err = ManifestSet::merge([set(), set()]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::PathCollision);
    }
}
