use anyhow::Result;
use clap::ValueEnum;

use super::core::EngineSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Json,
    Toml,
    Yaml,
}

impl EngineSettings {
    /// Serialize the merged settings in `format`
    pub fn export_config(&self, format: ConfigFormat) -> Result<String> {
        let output = match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
            ConfigFormat::Yaml => serde_yml::to_string(self)?,
        };
        Ok(output)
    }
}
