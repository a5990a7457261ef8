//! Manifest documents and their identities.

use std::collections::BTreeSet;

use serde::Serialize;

/// The role a document plays within one resource's manifest set.
///
/// The kebab-case form is used as the file-name suffix, so it must stay
/// stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    ProviderConfig,
    Cluster,
    NodeGroup,
    LoadBalancerController,
    EbsCsiDriver,
    Bucket,
    SubnetGroup,
    SecurityGroup,
    Instance,
    Vpc,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::ProviderConfig => "provider-config",
            DocumentKind::Cluster => "cluster",
            DocumentKind::NodeGroup => "node-group",
            DocumentKind::LoadBalancerController => "load-balancer-controller",
            DocumentKind::EbsCsiDriver => "ebs-csi-driver",
            DocumentKind::Bucket => "bucket",
            DocumentKind::SubnetGroup => "subnet-group",
            DocumentKind::SecurityGroup => "security-group",
            DocumentKind::Instance => "instance",
            DocumentKind::Vpc => "vpc",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `(kind, name)` identity of a document; the target of references.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DocumentId {
    pub kind: DocumentKind,
    pub name: String,
}

impl DocumentId {
    pub fn new(kind: DocumentKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// One generated configuration file plus the documents it depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestDocument {
    /// Repository-relative path; empty until the assembler places it.
    pub path: String,
    pub kind: DocumentKind,
    /// `metadata.name` of the object in the body.
    pub name: String,
    /// Name of the requested resource this document belongs to.
    pub resource: String,
    pub body: String,
    pub references: BTreeSet<DocumentId>,
}

impl ManifestDocument {
    pub fn new(
        kind: DocumentKind,
        name: impl Into<String>,
        resource: impl Into<String>,
        body: String,
    ) -> Self {
        Self {
            path: String::new(),
            kind,
            name: name.into(),
            resource: resource.into(),
            body,
            references: BTreeSet::new(),
        }
    }

    pub fn referencing(mut self, id: DocumentId) -> Self {
        self.references.insert(id);
        self
    }

    pub fn id(&self) -> DocumentId {
        DocumentId::new(self.kind, self.name.clone())
    }

    pub fn depends_on(&self, id: &DocumentId) -> bool {
        self.references.contains(id)
    }

    pub(crate) fn placed_at(self, path: String) -> Self {
        Self { path, ..self }
    }
}
