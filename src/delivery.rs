//! Delivery planning
//!
//! For every enabled destination binding, in binding order: the schedule
//! that applies to it, when it next fires, when the file is handed over
//! (occurrence plus delay) and what the file and its folder are called.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::config::ParallelSettings;
use crate::error::Result;
use crate::filename::{self, FilenameContext};
use crate::model::destination::{DestinationBinding, TransportOverrides};
use crate::model::naming::FilenamePattern;
use crate::model::report::ReportConfig;
use crate::model::schedule::{RetryPolicy, ScheduleSpec};
use crate::parallel::ExecutionStrategy;
use crate::schedule::{self, Occurrence, ScheduleEvaluator};

/// Inputs shared by every destination of one planning run
#[derive(Debug, Clone)]
pub struct PlanContext {
    pub now: DateTime<Utc>,
    pub evaluator: ScheduleEvaluator,
    pub parallel: ParallelSettings,
}

impl PlanContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            evaluator: ScheduleEvaluator::default(),
            parallel: ParallelSettings::default(),
        }
    }

    pub fn with_evaluator(mut self, evaluator: ScheduleEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_parallel(mut self, parallel: ParallelSettings) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Everything needed to deliver the next run to one destination
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryPlan {
    pub destination_id: String,
    /// Report schedule, or the binding's custom schedule over the defaults
    pub schedule: ScheduleSpec,
    pub occurrence: Occurrence,
    /// Occurrence plus delay; `None` when nothing fires
    pub deliver_at: Option<DateTime<Utc>>,
    pub delay_minutes: u32,
    pub filename_template: String,
    pub filename: String,
    pub subdirectory: Option<String>,
    pub retry: RetryPolicy,
    pub overrides: Option<TransportOverrides>,
}

/// The schedule a binding runs on
pub fn effective_schedule(config: &ReportConfig, binding: &DestinationBinding) -> ScheduleSpec {
    match (&binding.custom_schedule, binding.use_default_schedule) {
        (Some(custom), false) => custom.merge_over(ScheduleSpec::default()),
        (None, false) => {
            tracing::debug!(
                "Destination '{}' opts out of the default schedule without a custom one",
                binding.destination_id
            );
            ScheduleSpec::default()
        }
        (_, true) => config.schedule.clone(),
    }
}

/// Plan every enabled destination of `config`
pub fn plan(config: &ReportConfig, context: &PlanContext) -> Result<Vec<DeliveryPlan>> {
    let bindings: Vec<&DestinationBinding> = config.destinations.iter().filter(|b| b.enabled).collect();
    let skipped = config.destinations.len() - bindings.len();
    if skipped > 0 {
        tracing::debug!("Skipping {} disabled destination(s)", skipped);
    }

    let strategy = ExecutionStrategy::for_settings(bindings.len(), &context.parallel);
    let plans = strategy
        .execute(&bindings, |binding| plan_destination(config, binding, context))
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

    tracing::info!("Planned {} destination(s) for '{}'", plans.len(), config.name);
    Ok(plans)
}

/// Plan a single binding, enabled or not
pub fn plan_destination(
    config: &ReportConfig,
    binding: &DestinationBinding,
    context: &PlanContext,
) -> Result<DeliveryPlan> {
    let schedule = effective_schedule(config, binding);
    let occurrence = context.evaluator.next_occurrence(&schedule, context.now)?;
    let delay_minutes = binding.delay_minutes.unwrap_or(0);
    let deliver_at = occurrence
        .instant()
        .map(|at| at + Duration::minutes(i64::from(delay_minutes)));

    let mut naming = FilenameContext::for_report(config, occurrence.instant().unwrap_or(context.now));
    if let Ok(tz) = schedule::parse_timezone(&schedule.timezone) {
        naming = naming.with_timezone(tz);
    }

    let pattern = match binding.pattern_override() {
        Some(custom) => config.filename.with_pattern(custom),
        None => config.filename.clone(),
    };
    let filename = filename::resolve(&pattern, &naming);
    let subdirectory = binding
        .subdirectory
        .as_deref()
        .map(|template| filename::resolve_str(template, &config.filename, &naming));
    let overrides = binding
        .overrides
        .as_ref()
        .map(|overrides| resolve_overrides(overrides, &config.filename, &naming));

    tracing::debug!(
        "Destination '{}': {:?}, deliver at {:?}, file '{}'",
        binding.destination_id,
        occurrence,
        deliver_at,
        filename
    );

    Ok(DeliveryPlan {
        destination_id: binding.destination_id.clone(),
        retry: schedule.retry.clone(),
        schedule,
        occurrence,
        deliver_at,
        delay_minutes,
        filename_template: pattern.pattern,
        filename,
        subdirectory,
        overrides,
    })
}

fn resolve_overrides(
    overrides: &TransportOverrides,
    pattern: &FilenamePattern,
    naming: &FilenameContext,
) -> TransportOverrides {
    match overrides {
        TransportOverrides::Email { subject, cc, bcc } => TransportOverrides::Email {
            subject: subject.as_deref().map(|s| filename::resolve_str(s, pattern, naming)),
            cc: cc.clone(),
            bcc: bcc.clone(),
        },
        TransportOverrides::S3 {
            key_prefix,
            storage_class,
        } => TransportOverrides::S3 {
            key_prefix: key_prefix.as_deref().map(|s| filename::resolve_str(s, pattern, naming)),
            storage_class: storage_class.clone(),
        },
        TransportOverrides::Sftp { .. } => overrides.clone(),
    }
}
