//! Policy command - Print environment defaults.

use anyhow::Result;
use clap::Args;

use xpf_policy::{Environment, PolicyTable};

#[derive(Args)]
pub struct PolicyArgs {
    /// Only show one environment (dev, staging, production)
    #[arg(short, long, value_parser = parse_environment)]
    environment: Option<Environment>,
}

fn parse_environment(value: &str) -> Result<Environment, String> {
    Environment::from_str(value).ok_or_else(|| format!("unknown environment '{}'", value))
}

pub async fn execute(args: PolicyArgs) -> Result<()> {
    let table = match args.environment {
        Some(env) => PolicyTable::for_environments(&[env]),
        None => PolicyTable::all(),
    };
    print!("{}", table.to_yaml()?);
    Ok(())
}
