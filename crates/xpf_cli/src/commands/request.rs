//! Request command - Manifests from a plain-language request.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use xpf_chat::{LlmAdapter, RequestParser};
use xpf_iac::generate_batch;
use xpf_publish::{
    DirectoryPublisher, GitBranchPublisher, PublishOutcome, Publisher, PullRequestDraft,
};

use super::{collect_sets, manifest_stream, print_summary};
use crate::config::XpfConfig;

#[derive(Args)]
pub struct RequestArgs {
    /// What you need, e.g. "encrypted S3 bucket for production backups"
    text: String,

    /// Output root for directory publishing
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Commit to a new branch of a local git repository instead
    #[arg(long)]
    git: bool,

    /// Repository for --git (defaults to the configured repo_path, then .)
    #[arg(long)]
    repo: Option<PathBuf>,

    /// Print manifests and the pull request draft without writing
    #[arg(long)]
    dry_run: bool,
}

pub async fn execute(args: RequestArgs, config: &XpfConfig) -> Result<()> {
    let adapter = LlmAdapter::from_env_with(config.llm_provider()?, config.llm.model.clone())?;
    info!("Parsing request with {} ({})", adapter.provider(), adapter.model());

    let parser = RequestParser::new(adapter);
    let requests = parser
        .parse_stack(&args.text)
        .await
        .context("Failed to understand the request")?;

    let results = generate_batch(&requests);
    let set = collect_sets(&requests, results)?;
    let draft = PullRequestDraft::from_set(&set);

    if args.dry_run {
        print!("{}", manifest_stream(&set));
        println!("\n# {}\n\n{}", draft.title, draft.body);
        return Ok(());
    }

    let publisher: Box<dyn Publisher> = if args.git {
        let repo = args
            .repo
            .or_else(|| config.git.repo_path.clone())
            .unwrap_or_else(|| PathBuf::from("."));
        let mut git = GitBranchPublisher::new(repo).with_prefix(config.prefix());
        if let Some(base) = &config.git.base_branch {
            git = git.with_base_branch(base.clone());
        }
        Box::new(git)
    } else {
        Box::new(
            DirectoryPublisher::new(config.output_root(args.output)).with_prefix(config.prefix()),
        )
    };

    let outcome = publisher.publish(&set).await?;
    print_summary(&set);
    print_outcome(&outcome);
    println!("\n# {}\n\n{}", draft.title, draft.body);
    Ok(())
}

fn print_outcome(outcome: &PublishOutcome) {
    match (&outcome.branch, &outcome.commit) {
        (Some(branch), Some(commit)) => println!(
            "✅ Committed {} manifest(s) to branch {} ({})",
            outcome.files.len(),
            branch,
            commit
        ),
        _ => println!(
            "✅ Wrote {} manifest(s) to {}",
            outcome.files.len(),
            outcome.destination
        ),
    }
}
