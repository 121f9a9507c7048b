use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::cli::Output;
use crate::model::template::{ReportTemplate, TEMPLATES};

#[derive(Args)]
pub struct InitArgs {
    /// Template name; lists the templates when omitted
    pub template: Option<String>,

    /// Where to write the definition (defaults to <template>.yaml)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Overwrite an existing file
    #[arg(short, long)]
    pub force: bool,
}

pub async fn execute(args: InitArgs, output: &Output) -> Result<()> {
    let Some(name) = args.template else {
        output.header("Templates");
        for template in TEMPLATES {
            output.table_row(template.name, template.description);
        }
        return Ok(());
    };

    let template = ReportTemplate::find(&name).with_context(|| {
        let known: Vec<&str> = TEMPLATES.iter().map(|t| t.name).collect();
        format!("Unknown template '{}' (available: {})", name, known.join(", "))
    })?;

    let path = args.output.unwrap_or_else(|| PathBuf::from(format!("{}.yaml", template.name)));
    if path.exists() && !args.force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    tokio::fs::write(&path, template.source())
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    output.success(&format!("Created {} from template '{}'", path.display(), template.name));
    Ok(())
}
