use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::smart_load;

// Embed the default settings at compile time
const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

/// Environment variable prefix; nested keys are separated by `__`
pub const ENV_PREFIX: &str = "REPORTWRIGHT_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Reject the whole render on the first constraint violation
    pub strict: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self { strict: false }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    pub max_lookahead_years: u32,
    pub preview_count: usize,
    pub default_timezone: String,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            max_lookahead_years: crate::schedule::DEFAULT_LOOKAHEAD_YEARS,
            preview_count: 5,
            default_timezone: "UTC".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelSettings {
    /// Hard cap on worker threads, 0 for none
    pub max_threads: usize,
    pub thread_percentage: u8,
    pub min_items_for_parallel: usize,
}

impl Default for ParallelSettings {
    fn default() -> Self {
        Self {
            max_threads: 0,
            thread_percentage: 75,
            min_items_for_parallel: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputDirSettings {
    pub directory: PathBuf,
}

impl Default for OutputDirSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("out"),
        }
    }
}

/// Merged engine settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub render: RenderSettings,
    pub schedule: ScheduleSettings,
    pub parallel: ParallelSettings,
    pub output: OutputDirSettings,
}

/// Values given on the command line; `None` leaves the lower layers alone
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub strict: Option<bool>,
    pub output_directory: Option<PathBuf>,
    pub max_lookahead_years: Option<u32>,
    pub max_threads: Option<usize>,
}

impl SettingsOverrides {
    fn merge_into(&self, mut figment: Figment) -> Figment {
        if let Some(strict) = self.strict {
            figment = figment.merge(Serialized::default("render.strict", strict));
        }
        if let Some(directory) = &self.output_directory {
            figment = figment.merge(Serialized::default("output.directory", directory));
        }
        if let Some(years) = self.max_lookahead_years {
            figment = figment.merge(Serialized::default("schedule.max_lookahead_years", years));
        }
        if let Some(threads) = self.max_threads {
            figment = figment.merge(Serialized::default("parallel.max_threads", threads));
        }
        figment
    }
}

/// Extension-less base paths the user and repository settings are looked up at
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsPaths {
    pub user: Option<PathBuf>,
    pub repository: PathBuf,
}

impl Default for SettingsPaths {
    /// `$HOME/.config/reportwright/config` and `./reportwright`
    fn default() -> Self {
        Self {
            user: std::env::var_os("HOME").map(|home| Self::user_base(Path::new(&home))),
            repository: PathBuf::from("reportwright"),
        }
    }
}

impl SettingsPaths {
    /// Lookup rooted at an explicit home and repository directory
    pub fn in_dirs(home: &Path, repository_dir: &Path) -> Self {
        Self {
            user: Some(Self::user_base(home)),
            repository: repository_dir.join("reportwright"),
        }
    }

    fn user_base(home: &Path) -> PathBuf {
        home.join(".config/reportwright/config")
    }
}

impl EngineSettings {
    /// Layer defaults, user config, repo config, `custom_config`, environment and CLI overrides
    pub fn load(custom_config: Option<&str>, cli_overrides: Option<&SettingsOverrides>) -> Result<Self> {
        Self::load_from(&SettingsPaths::default(), custom_config, cli_overrides)
    }

    /// [`EngineSettings::load`] with explicit lookup paths
    pub fn load_from(
        paths: &SettingsPaths,
        custom_config: Option<&str>,
        cli_overrides: Option<&SettingsOverrides>,
    ) -> Result<Self> {
        tracing::trace!("CONFIG LOAD: Starting");
        let figment = Self::figment_from(paths, custom_config, cli_overrides)?;
        let settings: EngineSettings = figment.extract().context("Failed to read engine settings")?;
        tracing::trace!("CONFIG LOAD: {:?}", settings);
        Ok(settings)
    }

    /// The layered provider chain, before extraction
    pub fn figment(custom_config: Option<&str>, cli_overrides: Option<&SettingsOverrides>) -> Result<Figment> {
        Self::figment_from(&SettingsPaths::default(), custom_config, cli_overrides)
    }

    fn figment_from(
        paths: &SettingsPaths,
        custom_config: Option<&str>,
        cli_overrides: Option<&SettingsOverrides>,
    ) -> Result<Figment> {
        let mut figment = Figment::new().merge(Toml::string(DEFAULT_CONFIG));

        if let Some(path) = paths.user.as_deref().and_then(smart_load::find_with_extensions) {
            tracing::debug!("Using user settings {}", path.display());
            figment = figment.merge(smart_load::auto(path));
        }

        if let Some(path) = smart_load::find_with_extensions(&paths.repository) {
            tracing::debug!("Using repository settings {}", path.display());
            figment = figment.merge(smart_load::auto(path));
        }

        if let Some(path) = custom_config {
            if !Path::new(path).is_file() {
                anyhow::bail!("Settings file not found: {}", path);
            }
            tracing::debug!("Using custom settings {}", path);
            figment = figment.merge(smart_load::auto(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        if let Some(overrides) = cli_overrides {
            tracing::trace!("CONFIG LOAD: Applying CLI overrides");
            figment = overrides.merge_into(figment);
        }

        Ok(figment)
    }
}
