//! # reportwright - Report output and delivery configuration engine
//!
//! Turns a regulatory report definition and a stream of records into
//! delivered-ready files: rendered payloads, their filenames and split
//! units, and the next time each destination should receive them.
//!
//! ## Features
//!
//! - **Rendering**: XML, CSV and JSON writers with per-field constraint checks
//! - **Naming**: `{token}` filename patterns with date formats and business-day bases
//! - **Splitting**: by record count or by field value, with numeric, alpha or dated labels
//! - **Scheduling**: cron and calendar rules evaluated in IANA timezones with blackout dates
//! - **Delivery planning**: per-destination schedule overrides, delays and transport settings
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use reportwright::model::{FieldSpec, Record, ReportConfig};
//! use reportwright::run::{run, RunContext};
//!
//! let config = ReportConfig::new("trades", "Trades")
//!     .with_fields(vec![FieldSpec::new("id"), FieldSpec::new("ccy")]);
//! let records = vec![Record::new().with("id", "T1").with("ccy", "EUR")];
//!
//! let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
//! let output = run(&config, &records, &RunContext::new(now)).unwrap();
//! assert_eq!(output.files[0].filename, "Trades_20240115_001.csv");
//! assert_eq!(output.files[0].payload.as_text(), Some("id,ccy\nT1,EUR\n"));
//! ```

pub mod cli;
pub mod config;
pub mod delivery;
pub mod error;
pub mod filename;
pub mod model;
pub mod parallel;
pub mod render;
pub mod run;
pub mod schedule;
pub mod split;
pub mod validate;

pub use cli::{Cli, Output};
pub use config::EngineSettings;
pub use error::{ConfigError, EngineError, RenderError, ScheduleError, ValidationErrors};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
