use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use clap::Args;
use std::path::PathBuf;

use super::load_report;
use crate::cli::Output;
use crate::config::EngineSettings;
use crate::delivery;
use crate::schedule::{self, ScheduleEvaluator};

#[derive(Args)]
pub struct ScheduleArgs {
    /// Report definition (TOML, JSON or YAML)
    pub report: PathBuf,

    /// List occurrences strictly after this instant, RFC 3339 (defaults to now)
    #[arg(long, value_name = "RFC3339")]
    pub after: Option<DateTime<Utc>>,

    /// Number of occurrences (defaults to [schedule] preview_count)
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Use this destination's effective schedule instead of the report's
    #[arg(short, long, value_name = "ID")]
    pub destination: Option<String>,
}

pub async fn execute(args: ScheduleArgs, custom_config: Option<&str>, output: &Output) -> Result<()> {
    let settings = EngineSettings::load(custom_config, None)?;
    let config = load_report(&args.report)?;

    let spec = match &args.destination {
        Some(id) => {
            let binding = config
                .destinations
                .iter()
                .find(|b| &b.destination_id == id)
                .with_context(|| format!("Report '{}' has no destination '{}'", config.id, id))?;
            delivery::effective_schedule(&config, binding)
        }
        None => config.schedule.clone(),
    };

    let display_tz = schedule::parse_timezone(&settings.schedule.default_timezone)
        .context("Invalid [schedule] default_timezone")?;
    let evaluator = ScheduleEvaluator::new(settings.schedule.max_lookahead_years);
    let count = args.count.unwrap_or(settings.schedule.preview_count);
    let after = args.after.unwrap_or_else(Utc::now);

    if !spec.enabled {
        output.warning("Schedule is disabled");
        return Ok(());
    }

    let occurrences = evaluator.upcoming(&spec, after, count)?;
    if occurrences.is_empty() {
        output.info(&format!(
            "No occurrence within {} year(s) after {}",
            evaluator.max_lookahead_years,
            after.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
        return Ok(());
    }

    for at in occurrences {
        println!(
            "{}  {}",
            at.to_rfc3339_opts(SecondsFormat::Secs, true),
            at.with_timezone(&display_tz).format("%a %Y-%m-%d %H:%M %Z")
        );
    }
    Ok(())
}
