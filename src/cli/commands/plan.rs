use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use clap::{Args, ValueEnum};
use std::path::PathBuf;

use super::load_report;
use crate::cli::Output;
use crate::config::EngineSettings;
use crate::delivery::{self, DeliveryPlan, PlanContext};
use crate::schedule::{Occurrence, ScheduleEvaluator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlanFormat {
    Text,
    Json,
}

#[derive(Args)]
pub struct PlanArgs {
    /// Report definition (TOML, JSON or YAML)
    pub report: PathBuf,

    /// Plan from this instant, RFC 3339 (defaults to the current time)
    #[arg(long, value_name = "RFC3339")]
    pub now: Option<DateTime<Utc>>,

    #[arg(short, long, value_enum, default_value = "text")]
    pub format: PlanFormat,
}

pub async fn execute(args: PlanArgs, custom_config: Option<&str>, output: &Output) -> Result<()> {
    let settings = EngineSettings::load(custom_config, None)?;
    let config = load_report(&args.report)?;

    let context = PlanContext::new(args.now.unwrap_or_else(Utc::now))
        .with_evaluator(ScheduleEvaluator::new(settings.schedule.max_lookahead_years))
        .with_parallel(settings.parallel.clone());
    let plans = delivery::plan(&config, &context)?;

    match args.format {
        PlanFormat::Json => println!("{}", serde_json::to_string_pretty(&plans)?),
        PlanFormat::Text => {
            if plans.is_empty() {
                output.info(&format!("Report '{}' has no enabled destinations", config.id));
            }
            for plan in &plans {
                print_plan(plan, output);
            }
        }
    }
    Ok(())
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn print_plan(plan: &DeliveryPlan, output: &Output) {
    output.header(&plan.destination_id);
    let occurrence = match plan.occurrence {
        Occurrence::At(at) => rfc3339(at),
        Occurrence::Disabled => "disabled".to_string(),
        Occurrence::NotFound { searched_until } => format!("none before {}", rfc3339(searched_until)),
    };
    output.table_row("next run", &occurrence);
    if let Some(at) = plan.deliver_at {
        output.table_row("deliver at", &format!("{} (+{} min)", rfc3339(at), plan.delay_minutes));
    }
    output.table_row("timezone", &plan.schedule.timezone);
    output.table_row("filename", &plan.filename);
    if let Some(subdirectory) = &plan.subdirectory {
        output.table_row("subdirectory", subdirectory);
    }
    if plan.retry.enabled {
        output.table_row(
            "retry",
            &format!("{} x every {} min", plan.retry.max_retries, plan.retry.retry_delay_minutes),
        );
    }
}
