//! Report configuration model
//!
//! Everything an operator stores about a report: its fields, output format,
//! naming, split, schedule and destinations.

pub mod destination;
pub mod field;
pub mod naming;
pub mod output;
pub mod record;
pub mod report;
pub mod schedule;
pub mod split;
pub mod template;
pub mod version;

pub use destination::{DestinationBinding, TransportOverrides};
pub use field::{DataType, FieldConstraints, FieldSpec, Requirement};
pub use naming::{DateBasis, DateFormat, FilenamePattern};
pub use output::{FormatKind, OutputFormatConfig, OutputSettings};
pub use record::{Record, RecordSet};
pub use report::ReportConfig;
pub use schedule::{CalendarRule, Frequency, RetryPolicy, ScheduleOverride, ScheduleSpec, ScheduleType, TimeOfDay};
pub use split::{Numbering, NumberingScheme, SplitConfig, SplitMode};
pub use template::ReportTemplate;
pub use version::{ReportVersion, VersionHistory};
