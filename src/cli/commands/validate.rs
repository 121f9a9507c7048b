use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::load_report;
use crate::cli::Output;
use crate::validate;

#[derive(Args)]
pub struct ValidateArgs {
    /// Report definition (TOML, JSON or YAML)
    pub report: PathBuf,
}

pub async fn execute(args: ValidateArgs, output: &Output) -> Result<()> {
    let config = load_report(&args.report)?;

    match validate::validate(&config) {
        Ok(()) => {
            output.success(&format!(
                "Report '{}' v{} is valid ({} field(s), {} destination(s))",
                config.id,
                config.version,
                config.fields.len(),
                config.destinations.len()
            ));
            Ok(())
        }
        Err(errors) => {
            for error in errors.errors() {
                output.error(&error.to_string());
            }
            anyhow::bail!(
                "{} configuration error(s) in {}",
                errors.errors().len(),
                args.report.display()
            )
        }
    }
}
