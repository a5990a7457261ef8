//! CLI command definitions.
//!
//! Each subcommand maps to one way of getting a request into the pipeline.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use xpf_iac::{IacResult, ManifestSet};
use xpf_spec::RawRequest;

pub mod generate;
pub mod policy;
pub mod request;
pub mod validate;

/// xpFactory - Crossplane manifests from infrastructure requests
#[derive(Parser)]
#[command(name = "xpf")]
#[command(version, about = "xpFactory - Crossplane manifests from infrastructure requests")]
#[command(long_about = r#"
xpFactory turns infrastructure requests into reviewable Crossplane manifests
for EKS clusters, S3 buckets, RDS databases and VPCs.

COMMANDS:
  generate  → Generate manifests from a YAML or JSON request file
  request   → Describe what you need in plain language (requires an LLM key)
  validate  → Check a request file without generating anything
  policy    → Show the per-environment defaults

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Validation failure
  4 - Generation defect
  5 - Publish error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to .xpf/config.yaml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate manifests from a request file
    Generate(generate::GenerateArgs),

    /// Generate manifests from a plain-language request
    Request(request::RequestArgs),

    /// Validate a request file
    Validate(validate::ValidateArgs),

    /// Print the environment policy table
    Policy(policy::PolicyArgs),
}

/// Label used when reporting on one request of a batch.
fn request_label(index: usize, raw: &RawRequest) -> String {
    match (&raw.kind, &raw.name) {
        (Some(kind), Some(name)) => format!("{} '{}'", kind, name),
        (None, Some(name)) => format!("'{}'", name),
        _ => format!("request #{}", index + 1),
    }
}

/// Report every failed request, then merge the successful sets.
///
/// A single failure fails the whole batch so nothing partial is published.
pub(crate) fn collect_sets(
    requests: &[RawRequest],
    results: Vec<IacResult<ManifestSet>>,
) -> Result<ManifestSet> {
    if requests.is_empty() {
        anyhow::bail!("No resource requests found in the input");
    }

    let mut sets = Vec::new();
    let mut first_error = None;
    let mut failed = 0;

    for (index, (raw, result)) in requests.iter().zip(results).enumerate() {
        match result {
            Ok(set) => sets.push(set),
            Err(e) => {
                failed += 1;
                eprintln!("   ❌ {}: {} [{}]", request_label(index, raw), e, e.kind());
                let fields = e.fields();
                if e.kind().is_user_error() && !fields.is_empty() {
                    eprintln!("      Please check: {}", fields.join(", "));
                }
                first_error.get_or_insert(e);
            }
        }
    }

    if let Some(e) = first_error {
        return Err(anyhow::Error::new(e).context(format!(
            "{} of {} requests failed",
            failed,
            requests.len()
        )));
    }

    Ok(ManifestSet::merge(sets)?)
}

/// Multi-document YAML stream of every manifest in the set.
pub(crate) fn manifest_stream(set: &ManifestSet) -> String {
    set.files()
        .map(|(_, body)| body)
        .collect::<Vec<_>>()
        .join("---\n")
}

/// Human-readable listing of a generated set.
pub(crate) fn print_summary(set: &ManifestSet) {
    for summary in set.summaries() {
        println!(
            "📦 {} '{}' ({}, {})",
            summary.kind.display_name(),
            summary.name,
            summary.environment,
            summary.region
        );
        for suggestion in &summary.suggestions {
            println!("   💡 {}", suggestion);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_sets_fails_whole_batch() {
        let requests = vec![
            RawRequest::new("vpc", "net1"),
            RawRequest::new("rds", "db").with_engine("oracle"),
        ];
        let results = xpf_iac::generate_batch(&requests);
        let err = collect_sets(&requests, results).unwrap_err();
        assert!(err.to_string().contains("1 of 2 requests failed"));
        assert!(err.downcast_ref::<xpf_iac::IacError>().is_some());
    }

    #[test]
    fn test_manifest_stream_separates_documents() {
        let requests = vec![RawRequest::new("rds", "orders")];
        let set = collect_sets(&requests, xpf_iac::generate_batch(&requests)).unwrap();
        let stream = manifest_stream(&set);
        assert_eq!(stream.matches("---\n").count(), set.len() - 1);
    }

    #[test]
    fn test_request_label() {
        assert_eq!(request_label(0, &RawRequest::new("s3", "logs")), "s3 'logs'");
        assert_eq!(request_label(2, &RawRequest::default()), "request #3");
    }
}
