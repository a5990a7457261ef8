//! Pull request text for a manifest set.

use std::fmt::Write as _;

use serde::Serialize;
use xpf_iac::{ManifestSet, ManifestSummary};

const REVIEW_CHECKLIST: [&str; 6] = [
    "Resource naming follows organizational conventions",
    "Security configuration is appropriate for the target environment",
    "Sizing and scaling parameters are reasonable",
    "Required tags and labels are set",
    "Environment-specific configuration is correct",
    "Cost implications have been considered",
];

/// Title, commit message and markdown body describing a manifest set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestDraft {
    pub title: String,
    pub body: String,
}

impl PullRequestDraft {
    pub fn from_set(set: &ManifestSet) -> Self {
        Self {
            title: title(set.summaries()),
            body: body(set),
        }
    }

    /// One-line commit message; the title doubles as the subject.
    pub fn commit_message(&self) -> String {
        self.title.clone()
    }
}

fn title(summaries: &[ManifestSummary]) -> String {
    match summaries {
        [] => "Add Crossplane manifests".to_string(),
        [only] => format!("Add {}: {} ({})", only.kind.display_name(), only.name, only.environment),
        many => {
            let names: Vec<&str> = many.iter().map(|s| s.name.as_str()).collect();
            format!("Add {} resources: {}", many.len(), names.join(", "))
        }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "yes"
    } else {
        "no"
    }
}

fn body(set: &ManifestSet) -> String {
    let mut out = String::new();
    out.push_str("## Infrastructure request\n");

    for summary in set.summaries() {
        let _ = write!(
            out,
            "\n### {} `{}`\n\n\
             - Environment: `{}`\n\
             - Region: `{}`\n\
             - Documents: {}\n\
             - Encrypted at rest: {}\n\
             - Private: {}\n",
            summary.kind.display_name(),
            summary.name,
            summary.environment,
            summary.region,
            summary.document_count,
            on_off(summary.encrypted),
            on_off(summary.private),
        );
        if !summary.security_flags.is_empty() {
            let flags: Vec<&str> = summary.security_flags.iter().map(|f| f.as_str()).collect();
            let _ = writeln!(out, "- Requested flags: {}", flags.join(", "));
        }
        if !summary.suggestions.is_empty() {
            out.push_str("\nSuggestions:\n\n");
            for suggestion in &summary.suggestions {
                let _ = writeln!(out, "- {}", suggestion);
            }
        }
    }

    out.push_str("\n## Files\n\n");
    for (path, _) in set.files() {
        let _ = writeln!(out, "- `{}`", path);
    }

    out.push_str("\n## Review checklist\n\n");
    for item in REVIEW_CHECKLIST {
        let _ = writeln!(out, "- [ ] {}", item);
    }

    out.push_str(
        "\nMerging creates real AWS resources once Crossplane reconciles them.\n",
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use xpf_spec::RawRequest;

    #[test]
    fn test_single_resource_draft() {
        let set = xpf_iac::generate(
            &RawRequest::new("eks", "data-platform").with_environment("production"),
        )
        .unwrap();
        let draft = PullRequestDraft::from_set(&set);

        assert_eq!(draft.title, "Add EKS Cluster: data-platform (production)");
        assert_eq!(draft.commit_message(), draft.title);
        assert!(draft.body.contains("- `production/data-platform-cluster.yaml`"));
        assert!(draft.body.contains("- Documents: 5"));
        assert!(draft.body.contains("monitoring and alerting"));
        assert!(draft.body.contains("- [ ] Cost implications have been considered"));
    }

    #[test]
    fn test_stack_draft_title() {
        let sets = vec![
            xpf_iac::generate(&RawRequest::new("vpc", "shop-net")).unwrap(),
            xpf_iac::generate(&RawRequest::new("s3", "shop-assets")).unwrap(),
        ];
        let merged = ManifestSet::merge(sets).unwrap();
        let draft = PullRequestDraft::from_set(&merged);
        assert_eq!(draft.title, "Add 2 resources: shop-net, shop-assets");
        assert!(draft.body.contains("### VPC `shop-net`"));
        assert!(draft.body.contains("### S3 Bucket `shop-assets`"));
    }
}
