//! Generate command - Manifests from a request file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;
use tracing::info;

use xpf_iac::generate_batch;
use xpf_publish::{DirectoryPublisher, Publisher};
use xpf_spec::RawRequest;

use super::{collect_sets, manifest_stream, print_summary};
use crate::config::XpfConfig;

#[derive(Args)]
pub struct GenerateArgs {
    /// Request file (YAML or JSON, one request or a list)
    #[arg(short, long)]
    file: PathBuf,

    /// Output root (defaults to the configured output_dir, then .)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print manifests instead of writing them
    #[arg(long)]
    dry_run: bool,

    /// Print machine-readable JSON
    #[arg(long)]
    json: bool,
}

pub async fn execute(args: GenerateArgs, config: &XpfConfig) -> Result<()> {
    if !args.file.exists() {
        anyhow::bail!("Request file not found: {}", args.file.display());
    }
    let content = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let requests = RawRequest::many_from_yaml(&content).context("Failed to parse request file")?;
    info!("Generating manifests for {} request(s)", requests.len());

    let results = generate_batch(&requests);
    let set = collect_sets(&requests, results)?;

    if args.dry_run {
        if args.json {
            println!("{}", serde_json::to_string_pretty(&set)?);
        } else {
            print!("{}", manifest_stream(&set));
        }
        return Ok(());
    }

    let publisher =
        DirectoryPublisher::new(config.output_root(args.output)).with_prefix(config.prefix());
    let outcome = publisher.publish(&set).await?;

    if args.json {
        let report = json!({
            "summaries": set.summaries(),
            "outcome": outcome,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&set);
        println!("✅ Wrote {} manifest(s) to {}", outcome.files.len(), outcome.destination);
        for file in &outcome.files {
            println!("   {}", file.display());
        }
    }

    Ok(())
}
