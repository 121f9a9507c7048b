//! Engine settings
//!
//! Layered with figment, lowest to highest priority: the embedded
//! `default-config.toml`, `~/.config/reportwright/config.*`,
//! `./reportwright.*`, a `--config` file, `REPORTWRIGHT_*` environment
//! variables and command-line flags.

pub mod core;
pub mod formats;
pub mod smart_load;

pub use self::core::{
    EngineSettings, OutputDirSettings, ParallelSettings, RenderSettings, ScheduleSettings, SettingsOverrides, SettingsPaths,
};
pub use formats::ConfigFormat;
