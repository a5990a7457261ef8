//! Validate command - Check a request file without generating.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use xpf_spec::{DescriptorValidator, RawRequest};

#[derive(Args)]
pub struct ValidateArgs {
    /// Request file (YAML or JSON, one request or a list)
    #[arg(short, long)]
    file: PathBuf,
}

pub async fn execute(args: ValidateArgs) -> Result<()> {
    if !args.file.exists() {
        anyhow::bail!("Request file not found: {}", args.file.display());
    }
    let content = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let requests = RawRequest::many_from_yaml(&content).context("Failed to parse request file")?;
    info!("Validating {} request(s)", requests.len());

    let mut first_error = None;
    for raw in &requests {
        match DescriptorValidator::validate(raw) {
            Ok(descriptor) => {
                println!("✅ {} '{}'", descriptor.kind().display_name(), descriptor.name());
                print!("{}", serde_yaml::to_string(&descriptor)?);
            }
            Err(e) => {
                println!("❌ {}", e);
                for field in e.fields() {
                    println!("   - {}", field);
                }
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(anyhow::Error::new(e).context("Validation failed")),
        None => Ok(()),
    }
}
