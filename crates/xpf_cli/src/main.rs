//! xpFactory CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Validation failure
//! - 4: Generation defect
//! - 5: Publish error

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use xpf_iac::IacError;
use xpf_publish::PublishError;
use xpf_spec::SpecError;

mod commands;
mod config;

use commands::{Cli, Commands};
use config::XpfConfig;

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const GENERATION_DEFECT: u8 = 4;
    pub const PUBLISH_ERROR: u8 = 5;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so dry-run output on stdout stays pipeable.
    let default_level = if cli.verbose { "xpf=debug" } else { "xpf=info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},warn", default_level)));
    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let result = match XpfConfig::load(cli.config.as_deref()) {
        Ok(config) => match cli.command {
            Commands::Generate(args) => commands::generate::execute(args, &config).await,
            Commands::Request(args) => commands::request::execute(args, &config).await,
            Commands::Validate(args) => commands::validate::execute(args).await,
            Commands::Policy(args) => commands::policy::execute(args).await,
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    if let Some(err) = e.downcast_ref::<IacError>() {
        return if err.kind().is_user_error() {
            ExitCodes::VALIDATION_FAILURE
        } else {
            ExitCodes::GENERATION_DEFECT
        };
    }
    if e.downcast_ref::<SpecError>().is_some() {
        return ExitCodes::VALIDATION_FAILURE;
    }
    if e.downcast_ref::<PublishError>().is_some() {
        return ExitCodes::PUBLISH_ERROR;
    }

    let msg = e.to_string().to_lowercase();
    if msg.contains("argument") || msg.contains("not found") {
        ExitCodes::INVALID_ARGS
    } else {
        ExitCodes::GENERAL_ERROR
    }
}
