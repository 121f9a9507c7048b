//! Split planning
//!
//! Partitions a record stream into output units. A [`SplitPlan`] is a lazy,
//! finite iterator; cloning it (or calling [`SplitPlan::rewind`]) restarts
//! the sequence from the first unit.

use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::ConfigError;
use crate::model::record::Record;
use crate::model::split::{Numbering, SplitConfig, SplitMode};

/// Label for units whose split field is null or missing
pub const UNKNOWN_LABEL: &str = "UNKNOWN";

/// Resolved split mode with exactly the payload it needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitStrategy {
    None,
    Records { per_file: usize },
    Field { field: String, label_by_value: bool },
}

impl SplitStrategy {
    pub fn from_config(config: &SplitConfig) -> Result<Self, ConfigError> {
        let has_count = config.records_per_file.is_some();
        let has_field = config.split_field.is_some();

        match config.mode {
            SplitMode::None => {
                if has_count || has_field {
                    return Err(ConfigError::NonExclusive {
                        what: "split mode 'none'",
                        first: "mode",
                        second: if has_count { "records_per_file" } else { "split_field" },
                    });
                }
                Ok(SplitStrategy::None)
            }
            SplitMode::Records => {
                if has_field {
                    return Err(ConfigError::NonExclusive {
                        what: "split mode 'records'",
                        first: "records_per_file",
                        second: "split_field",
                    });
                }
                let per_file = config.records_per_file.ok_or(ConfigError::MissingPayload {
                    what: "split mode 'records'",
                    missing: "records_per_file",
                })?;
                if per_file == 0 {
                    return Err(ConfigError::RecordsPerFileTooSmall { min: 1, actual: 0 });
                }
                Ok(SplitStrategy::Records { per_file })
            }
            SplitMode::Field => {
                if has_count {
                    return Err(ConfigError::NonExclusive {
                        what: "split mode 'field'",
                        first: "split_field",
                        second: "records_per_file",
                    });
                }
                let field = config
                    .split_field
                    .clone()
                    .filter(|f| !f.is_empty())
                    .ok_or(ConfigError::MissingPayload {
                        what: "split mode 'field'",
                        missing: "split_field",
                    })?;
                Ok(SplitStrategy::Field {
                    field,
                    label_by_value: config.include_field_in_filename,
                })
            }
        }
    }
}

/// One output unit
#[derive(Debug, Clone, PartialEq)]
pub struct SplitUnit<'a> {
    /// 0-based position in the plan
    pub ordinal: usize,
    pub label: String,
    /// Field mode only: the group's value, `None` for null/missing
    pub field_value: Option<String>,
    pub records: Vec<&'a Record>,
    /// Input index of each record in `records`
    pub positions: Vec<usize>,
}

#[derive(Debug, Clone)]
struct Group {
    value: Option<String>,
    indices: Vec<usize>,
}

#[derive(Debug, Clone)]
enum Layout {
    Single,
    Chunks { size: usize },
    Groups { groups: Vec<Group>, label_by_value: bool },
}

/// Lazy sequence of split units over borrowed records
#[derive(Debug, Clone)]
pub struct SplitPlan<'a> {
    records: &'a [Record],
    layout: Layout,
    numbering: Numbering,
    run_date: NaiveDate,
    next: usize,
}

/// Plan the split units for `records`
pub fn plan<'a>(
    records: &'a [Record],
    config: &SplitConfig,
    run_date: NaiveDate,
) -> Result<SplitPlan<'a>, ConfigError> {
    let layout = match SplitStrategy::from_config(config)? {
        SplitStrategy::None => Layout::Single,
        SplitStrategy::Records { per_file } => Layout::Chunks { size: per_file },
        SplitStrategy::Field { field, label_by_value } => Layout::Groups {
            groups: group_by_field(records, &field),
            label_by_value,
        },
    };

    let plan = SplitPlan {
        records,
        layout,
        numbering: config.numbering.clone(),
        run_date,
        next: 0,
    };
    tracing::debug!("Planned {} split unit(s) for {} record(s)", plan.unit_count(), records.len());
    Ok(plan)
}

fn group_key(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

/// Groups in first-seen order of distinct values
fn group_by_field(records: &[Record], field: &str) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut positions: HashMap<Option<String>, usize> = HashMap::new();

    for (index, record) in records.iter().enumerate() {
        let key = group_key(record.get(field));
        let position = *positions.entry(key.clone()).or_insert_with(|| {
            groups.push(Group {
                value: key,
                indices: Vec::new(),
            });
            groups.len() - 1
        });
        groups[position].indices.push(index);
    }
    groups
}

impl<'a> SplitPlan<'a> {
    /// Total number of units, independent of iteration progress
    pub fn unit_count(&self) -> usize {
        match &self.layout {
            Layout::Single => 1,
            Layout::Chunks { size } => self.records.len().div_ceil(*size),
            Layout::Groups { groups, .. } => groups.len(),
        }
    }

    /// Restart from the first unit
    pub fn rewind(&mut self) {
        self.next = 0;
    }

    fn unit(&self, ordinal: usize) -> SplitUnit<'a> {
        let records: &'a [Record] = self.records;
        let numbered = || self.numbering.label(ordinal, self.run_date);
        match &self.layout {
            Layout::Single => SplitUnit {
                ordinal,
                label: numbered(),
                field_value: None,
                records: records.iter().collect(),
                positions: (0..records.len()).collect(),
            },
            Layout::Chunks { size } => {
                let start = ordinal * size;
                let end = (start + size).min(records.len());
                SplitUnit {
                    ordinal,
                    label: numbered(),
                    field_value: None,
                    records: records[start..end].iter().collect(),
                    positions: (start..end).collect(),
                }
            }
            Layout::Groups { groups, label_by_value } => {
                let group = &groups[ordinal];
                let label = if *label_by_value {
                    group.value.clone().unwrap_or_else(|| UNKNOWN_LABEL.to_string())
                } else {
                    numbered()
                };
                SplitUnit {
                    ordinal,
                    label,
                    field_value: group.value.clone(),
                    records: group.indices.iter().map(|&i| &records[i]).collect(),
                    positions: group.indices.clone(),
                }
            }
        }
    }
}

impl<'a> Iterator for SplitPlan<'a> {
    type Item = SplitUnit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.unit_count() {
            return None;
        }
        let unit = self.unit(self.next);
        self.next += 1;
        Some(unit)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.unit_count().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SplitPlan<'_> {}
