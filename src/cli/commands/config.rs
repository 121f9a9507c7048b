use anyhow::Result;
use clap::{Args, Subcommand};

use crate::config::{ConfigFormat, EngineSettings};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Display the merged engine settings
    Show {
        #[arg(short, long, value_enum, default_value = "toml")]
        format: ConfigFormat,
    },
}

pub async fn execute(args: ConfigArgs, custom_config: Option<&str>) -> Result<()> {
    match args.command {
        ConfigCommand::Show { format } => {
            let settings = EngineSettings::load(custom_config, None)?;
            println!("{}", settings.export_config(format)?.trim_end());
        }
    }
    Ok(())
}
