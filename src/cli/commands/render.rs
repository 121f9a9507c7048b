use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use std::path::PathBuf;

use super::load_report;
use crate::cli::Output;
use crate::config::{EngineSettings, SettingsOverrides};
use crate::error::{EngineError, RenderError};
use crate::model::record::RecordSet;
use crate::run::{self, RunContext};

#[derive(Args)]
pub struct RenderArgs {
    /// Report definition (TOML, JSON or YAML)
    pub report: PathBuf,

    /// JSON array of records
    #[arg(short, long, value_name = "FILE")]
    pub records: PathBuf,

    /// Output directory (overrides [output] directory)
    #[arg(short, long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Run instant in RFC 3339 (defaults to the current time)
    #[arg(long, value_name = "RFC3339")]
    pub now: Option<DateTime<Utc>>,

    /// Fail on the first record that violates a field constraint
    #[arg(long)]
    pub strict: bool,

    /// List the files without writing them
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn execute(args: RenderArgs, custom_config: Option<&str>, output: &Output) -> Result<()> {
    let overrides = SettingsOverrides {
        strict: args.strict.then_some(true),
        output_directory: args.out.clone(),
        ..SettingsOverrides::default()
    };
    let settings = EngineSettings::load(custom_config, Some(&overrides))?;
    let config = load_report(&args.report)?;

    let text = tokio::fs::read_to_string(&args.records)
        .await
        .with_context(|| format!("Failed to read records from {}", args.records.display()))?;
    let records = RecordSet::from_json_str(&text)
        .with_context(|| format!("Records file {} is not a JSON array of objects", args.records.display()))?;

    let context = RunContext::new(args.now.unwrap_or_else(Utc::now))
        .strict(settings.render.strict)
        .with_parallel(settings.parallel.clone());

    let result = match run::run(&config, records.records(), &context) {
        Ok(result) => result,
        Err(EngineError::Validation(errors)) => {
            for error in errors.errors() {
                output.error(&error.to_string());
            }
            anyhow::bail!("{} configuration error(s) in {}", errors.errors().len(), args.report.display());
        }
        Err(EngineError::Render(RenderError::Rejected { issues })) => {
            for issue in &issues {
                output.error(&issue.to_string());
            }
            anyhow::bail!("Rejected: {} constraint violation(s) in strict mode", issues.len());
        }
        Err(e) => return Err(e.into()),
    };

    for file in &result.files {
        for issue in &file.issues {
            output.warning(&format!("{}: excluded {}", file.filename, issue));
        }
    }

    if args.dry_run {
        output.header("Files (dry run)");
        for file in &result.files {
            output.table_row(
                &file.filename,
                &format!("{} record(s), {} bytes", file.record_count, file.payload.len()),
            );
        }
        return Ok(());
    }

    let directory = &settings.output.directory;
    output.verbose(&format!("Writing {} file(s) to {}", result.files.len(), directory.display()));
    tokio::fs::create_dir_all(directory)
        .await
        .with_context(|| format!("Failed to create output directory {}", directory.display()))?;

    for file in &result.files {
        let path = directory.join(&file.filename);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        tokio::fs::write(&path, &file.payload.bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        output.success(&format!("Wrote {} ({} record(s))", path.display(), file.record_count));
    }

    output.info(&format!(
        "{} file(s), {} record(s), {} issue(s)",
        result.files.len(),
        result.record_count(),
        result.issue_count()
    ));
    Ok(())
}
