//! Split configuration: how one run is partitioned into several files

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How records are partitioned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    #[default]
    None,
    Records,
    Field,
}

/// How split units are labeled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NumberingScheme {
    #[default]
    Numeric,
    Alpha,
    DateSeq,
}

fn default_start() -> usize {
    1
}

fn default_pad_width() -> usize {
    3
}

/// Numbering of split units, independent of the split mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Numbering {
    #[serde(default)]
    pub scheme: NumberingScheme,
    #[serde(default = "default_start")]
    pub start: usize,
    #[serde(default = "default_pad_width")]
    pub pad_width: usize,
}

impl Default for Numbering {
    fn default() -> Self {
        Self {
            scheme: NumberingScheme::Numeric,
            start: default_start(),
            pad_width: default_pad_width(),
        }
    }
}

impl Numbering {
    /// Label for the unit at `ordinal` (0-based)
    pub fn label(&self, ordinal: usize, run_date: NaiveDate) -> String {
        let n = self.start.saturating_add(ordinal);
        let width = self.pad_width;
        match self.scheme {
            NumberingScheme::Numeric => format!("{:0width$}", n),
            NumberingScheme::Alpha => alpha_label(n.max(1)),
            NumberingScheme::DateSeq => format!("{}_{:0width$}", run_date.format("%Y%m%d"), n),
        }
    }
}

/// Bijective base-26: 1 → A, 26 → Z, 27 → AA
fn alpha_label(mut n: usize) -> String {
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Split settings as stored with a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SplitConfig {
    #[serde(default)]
    pub mode: SplitMode,

    /// Required in `records` mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records_per_file: Option<usize>,

    /// Required in `field` mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_field: Option<String>,

    /// Field mode only: label units by the field value instead of numbering
    #[serde(default)]
    pub include_field_in_filename: bool,

    #[serde(default)]
    pub numbering: Numbering,
}

impl SplitConfig {
    pub fn by_records(per_file: usize) -> Self {
        Self {
            mode: SplitMode::Records,
            records_per_file: Some(per_file),
            ..Self::default()
        }
    }

    pub fn by_field(field: impl Into<String>, include_field_in_filename: bool) -> Self {
        Self {
            mode: SplitMode::Field,
            split_field: Some(field.into()),
            include_field_in_filename,
            ..Self::default()
        }
    }

    pub fn with_numbering(mut self, numbering: Numbering) -> Self {
        self.numbering = numbering;
        self
    }
}
