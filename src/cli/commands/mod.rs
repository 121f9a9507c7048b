use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::Path;

use crate::cli::Output;
use crate::model::report::ReportConfig;

pub mod config;
pub mod init;
pub mod plan;
pub mod render;
pub mod schedule;
pub mod validate;

#[derive(Parser)]
#[command(
    name = "reportwright",
    version = env!("CARGO_PKG_VERSION"),
    about = "Render, name, split and schedule regulatory report files",
    long_about = "reportwright validates report definitions, renders records to XML, CSV or JSON, \
                  resolves filenames and split units, and plans when each destination receives the next run."
)]
pub struct Cli {
    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use custom engine settings file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check a report definition and list every configuration error
    Validate(validate::ValidateArgs),
    /// Render records into the report's output files
    Render(render::RenderArgs),
    /// Show the delivery plan for every enabled destination
    Plan(plan::PlanArgs),
    /// List upcoming schedule occurrences
    Schedule(schedule::ScheduleArgs),
    /// Write a report definition from a built-in template
    Init(init::InitArgs),
    /// Engine settings
    Config(config::ConfigArgs),
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        setup_logging(self.verbose, self.quiet);
        let output = Output::new(self.verbose > 0, self.quiet);
        let custom_config = self.config.as_deref();

        match self.command {
            Some(Commands::Validate(args)) => validate::execute(args, &output).await,
            Some(Commands::Render(args)) => render::execute(args, custom_config, &output).await,
            Some(Commands::Plan(args)) => plan::execute(args, custom_config, &output).await,
            Some(Commands::Schedule(args)) => schedule::execute(args, custom_config, &output).await,
            Some(Commands::Init(args)) => init::execute(args, &output).await,
            Some(Commands::Config(args)) => config::execute(args, custom_config).await,
            None => {
                Cli::command().print_help()?;
                Ok(())
            }
        }
    }
}

/// Load a report definition for a command
pub(crate) fn load_report(path: &Path) -> Result<ReportConfig> {
    let config = ReportConfig::load(path)?;
    tracing::info!("Loaded report '{}' from {}", config.id, path.display());
    Ok(config)
}

fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => tracing_subscriber::EnvFilter::new("warn"),
        1 => tracing_subscriber::EnvFilter::new("info"),
        2 => tracing_subscriber::EnvFilter::new("debug"),
        _ => tracing_subscriber::EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
