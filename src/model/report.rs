//! The report definition aggregate

use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::destination::DestinationBinding;
use super::field::FieldSpec;
use super::naming::FilenamePattern;
use super::output::OutputSettings;
use super::schedule::ScheduleSpec;
use super::split::SplitConfig;
use crate::config::smart_load;
use crate::error::{EngineError, Result};

fn default_version() -> u32 {
    1
}

/// A complete report definition. The engine treats it as an immutable snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub id: String,
    pub name: String,

    /// Regulation code, e.g. `EMIR`
    #[serde(default)]
    pub regulation: String,

    #[serde(default = "default_version")]
    pub version: u32,

    pub fields: Vec<FieldSpec>,

    #[serde(default)]
    pub output: OutputSettings,

    #[serde(default)]
    pub filename: FilenamePattern,

    #[serde(default)]
    pub split: SplitConfig,

    #[serde(default)]
    pub schedule: ScheduleSpec,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub destinations: Vec<DestinationBinding>,
}

impl ReportConfig {
    /// An empty report with default output, naming, split and schedule
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            regulation: String::new(),
            version: default_version(),
            fields: Vec::new(),
            output: OutputSettings::default(),
            filename: FilenamePattern::default(),
            split: SplitConfig::default(),
            schedule: ScheduleSpec::default(),
            destinations: Vec::new(),
        }
    }

    /// Load a definition from TOML, JSON or YAML, chosen by file extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let load_error = |message: String| EngineError::Load {
            what: "report definition",
            path: path.display().to_string(),
            message,
        };

        if !path.is_file() {
            return Err(load_error("file not found".to_string()));
        }

        let config: ReportConfig = Figment::new()
            .merge(smart_load::auto(path))
            .extract()
            .map_err(|e| load_error(e.to_string()))?;

        tracing::debug!(
            "Loaded report '{}' v{} with {} field(s) from {}",
            config.id,
            config.version,
            config.fields.len(),
            path.display()
        );
        Ok(config)
    }

    pub fn field(&self, id: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn with_fields(mut self, fields: Vec<FieldSpec>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_output(mut self, output: impl Into<OutputSettings>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_filename(mut self, filename: FilenamePattern) -> Self {
        self.filename = filename;
        self
    }

    pub fn with_split(mut self, split: SplitConfig) -> Self {
        self.split = split;
        self
    }

    pub fn with_schedule(mut self, schedule: ScheduleSpec) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_destination(mut self, binding: DestinationBinding) -> Self {
        self.destinations.push(binding);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::output::FormatKind;
    use std::fs;
    use tempfile::TempDir;

    const TOML_REPORT: &str = r#"
id = "daily-trades"
name = "Daily Trades"
regulation = "EMIR"

[[fields]]
id = "trade_id"
output_tag = "TradeId"
requirement = "mandatory"

[[fields]]
id = "notional"
data_type = "number"

[output]
format = "json"

[output.json]
pretty_print = false

[filename]
pattern = "{regulation}_{date}.{ext}"
date_format = "YYYY-MM-DD"

[schedule]
type = "cron"
cron_expression = "0 6 * * 1-5"
timezone = "Europe/London"
"#;

    #[test]
    fn test_load_toml_definition() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("report.toml");
        fs::write(&path, TOML_REPORT).unwrap();

        let config = ReportConfig::load(&path).unwrap();
        assert_eq!(config.id, "daily-trades");
        assert_eq!(config.version, 1);
        assert_eq!(config.fields.len(), 2);
        assert_eq!(config.output.format, FormatKind::Json);
        assert_eq!(config.schedule.cron_expression.as_deref(), Some("0 6 * * 1-5"));
        assert!(config.field("notional").is_some());
        assert!(config.field("missing").is_none());
    }

    #[test]
    fn test_load_yaml_definition() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("report.yaml");
        fs::write(
            &path,
            "id: r1\nname: R1\nfields:\n  - id: a\noutput:\n  format: xml\n",
        )
        .unwrap();

        let config = ReportConfig::load(&path).unwrap();
        assert_eq!(config.output.format, FormatKind::Xml);
        assert_eq!(config.fields[0].tag(), "a");
    }

    #[test]
    fn test_load_missing_file() {
        let err = ReportConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_load_rejects_unknown_format() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("report.json");
        fs::write(&path, r#"{"id": "r", "name": "R", "fields": [], "output": {"format": "docx"}}"#).unwrap();

        let err = ReportConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("docx"), "{err}");
    }
}
