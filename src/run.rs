//! Report runs
//!
//! One run turns a report snapshot and its records into named files: the
//! report is validated, the records are split into units, each unit is
//! rendered and its filename resolved with `{sequence}` set to the unit label.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::config::ParallelSettings;
use crate::error::{EngineError, RenderError, Result};
use crate::filename::{self, FilenameContext};
use crate::model::record::Record;
use crate::model::report::ReportConfig;
use crate::parallel::ExecutionStrategy;
use crate::render::{self, Payload, RecordIssue, RenderContext};
use crate::split::{self, SplitUnit};
use crate::validate;

/// Run-wide inputs
#[derive(Debug, Clone)]
pub struct RunContext {
    pub now: DateTime<Utc>,
    pub strict: bool,
    pub parallel: ParallelSettings,
}

impl RunContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            strict: false,
            parallel: ParallelSettings::default(),
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_parallel(mut self, parallel: ParallelSettings) -> Self {
        self.parallel = parallel;
        self
    }
}

/// One rendered file
#[derive(Debug, Clone)]
pub struct OutputFile {
    pub filename: String,
    /// The split unit's label
    pub label: String,
    pub record_count: usize,
    pub payload: Payload,
    /// Records excluded from this file and why; indices point into the run's input
    pub issues: Vec<RecordIssue>,
}

#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    /// In split-unit order
    pub files: Vec<OutputFile>,
}

impl RunOutput {
    pub fn record_count(&self) -> usize {
        self.files.iter().map(|f| f.record_count).sum()
    }

    pub fn issue_count(&self) -> usize {
        self.files.iter().map(|f| f.issues.len()).sum()
    }
}

/// Validate, split, render and name every output file of one run
pub fn run(config: &ReportConfig, records: &[Record], context: &RunContext) -> Result<RunOutput> {
    validate::validate(config)?;

    let format = config.output.resolve();
    if !format.kind().is_text() {
        return Err(RenderError::BinaryFormat(format.kind()).into());
    }

    let naming = FilenameContext::for_report(config, context.now);
    let run_date = context.now.with_timezone(&naming.timezone).date_naive();
    let units: Vec<SplitUnit<'_>> = split::plan(records, &config.split, run_date)?.collect();
    tracing::debug!("Split {} record(s) into {} unit(s)", records.len(), units.len());

    let render_context = RenderContext::new(config.name.clone(), context.now).strict(context.strict);
    let strategy = ExecutionStrategy::for_settings(units.len(), &context.parallel);

    let files = strategy
        .execute(&units, |unit| {
            let output = render::render(&unit.records, &config.fields, &format, &render_context)
                .map_err(|e| match e {
                    RenderError::Rejected { issues } => RenderError::Rejected {
                        issues: to_input_positions(issues, &unit.positions),
                    },
                    other => other,
                })?;
            let filename = filename::resolve(&config.filename, &naming.clone().with_sequence(unit.label.clone()));
            tracing::trace!("Unit {} -> '{}' ({} record(s))", unit.ordinal, filename, output.record_count);
            Ok::<_, EngineError>(OutputFile {
                filename,
                label: unit.label.clone(),
                record_count: output.record_count,
                payload: output.payload,
                issues: to_input_positions(output.issues, &unit.positions),
            })
        })
        .into_iter()
        .collect::<Result<Vec<_>>>()?;
    check_unique_filenames(&files)?;

    let output = RunOutput { files };
    tracing::info!(
        "Rendered '{}': {} file(s), {} record(s), {} issue(s)",
        config.name,
        output.files.len(),
        output.record_count(),
        output.issue_count()
    );
    Ok(output)
}

/// Rewrite unit-relative record indices as input indices
fn to_input_positions(mut issues: Vec<RecordIssue>, positions: &[usize]) -> Vec<RecordIssue> {
    for issue in &mut issues {
        if let Some(&position) = positions.get(issue.record_index) {
            issue.record_index = position;
        }
    }
    issues
}

fn check_unique_filenames(files: &[OutputFile]) -> Result<()> {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    for file in files {
        if let Some(first) = seen.insert(&file.filename, &file.label) {
            return Err(EngineError::DuplicateFilename {
                filename: file.filename.clone(),
                first: first.to_string(),
                second: file.label.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, ValidationErrors};
    use crate::model::field::{FieldConstraints, FieldSpec};
    use crate::model::naming::FilenamePattern;
    use crate::model::output::{CsvConfig, Delimiter, FormatKind, OutputFormatConfig, XlsxConfig};
    use crate::model::split::SplitConfig;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
    }

    fn report() -> ReportConfig {
        ReportConfig::new("trades", "Trades")
            .with_fields(vec![
                FieldSpec::new("id"),
                FieldSpec::new("desk"),
                FieldSpec::new("ccy").with_constraints(FieldConstraints {
                    max_length: Some(3),
                    ..Default::default()
                }),
            ])
            .with_output(OutputFormatConfig::Csv(CsvConfig {
                delimiter: Delimiter::Semicolon,
                ..CsvConfig::default()
            }))
    }

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| {
                Record::new()
                    .with("id", format!("T{i}"))
                    .with("desk", if i % 2 == 0 { "rates" } else { "fx" })
                    .with("ccy", "EUR")
            })
            .collect()
    }

    #[test]
    fn test_single_file() {
        let output = run(&report(), &records(2), &RunContext::new(now())).unwrap();
        assert_eq!(output.files.len(), 1);
        let file = &output.files[0];
        assert_eq!(file.filename, "Trades_20240115_001.csv");
        assert_eq!(file.payload.format, FormatKind::Csv);
        assert_eq!(
            file.payload.as_text(),
            Some("id;desk;ccy\nT0;rates;EUR\nT1;fx;EUR\n")
        );
    }

    #[test]
    fn test_record_split_names_each_unit() {
        let config = report().with_split(SplitConfig::by_records(100));
        let output = run(&config, &records(250), &RunContext::new(now())).unwrap();

        let names: Vec<&str> = output.files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(
            names,
            vec!["Trades_20240115_001.csv", "Trades_20240115_002.csv", "Trades_20240115_003.csv"]
        );
        assert_eq!(output.record_count(), 250);
        assert_eq!(output.files[2].record_count, 50);
    }

    #[test]
    fn test_field_split_labels_by_value() {
        let config = report().with_split(SplitConfig::by_field("desk", true));
        let output = run(&config, &records(5), &RunContext::new(now())).unwrap();

        let labels: Vec<&str> = output.files.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["rates", "fx"]);
        assert_eq!(output.files[0].filename, "Trades_20240115_rates.csv");
        assert_eq!(output.files[0].record_count, 3);
    }

    #[test]
    fn test_parallel_rendering_keeps_unit_order() {
        let config = report().with_split(SplitConfig::by_records(100));
        let parallel = ParallelSettings {
            max_threads: 4,
            thread_percentage: 100,
            min_items_for_parallel: 1,
        };
        let sequential = run(&config, &records(1000), &RunContext::new(now())).unwrap();
        let concurrent = run(&config, &records(1000), &RunContext::new(now()).with_parallel(parallel)).unwrap();

        assert_eq!(concurrent.files.len(), 10);
        for (a, b) in sequential.files.iter().zip(&concurrent.files) {
            assert_eq!(a.filename, b.filename);
            assert_eq!(a.payload, b.payload);
        }
    }

    #[test]
    fn test_violations_excluded_or_rejected() {
        let mut rows = records(3);
        rows[1].insert("ccy", "EURO");

        let output = run(&report(), &rows, &RunContext::new(now())).unwrap();
        assert_eq!(output.record_count(), 2);
        assert_eq!(output.issue_count(), 1);

        let err = run(&report(), &rows, &RunContext::new(now()).strict(true)).unwrap_err();
        assert!(matches!(err, EngineError::Render(RenderError::Rejected { .. })));
    }

    #[test]
    fn test_issues_point_at_input_records() {
        let desks = ["a", "b", "a", "b"];
        let mut rows: Vec<Record> = desks
            .iter()
            .enumerate()
            .map(|(i, desk)| Record::new().with("id", format!("T{i}")).with("desk", *desk).with("ccy", "EUR"))
            .collect();
        rows[3].insert("ccy", "EURO");
        let config = report().with_split(SplitConfig::by_field("desk", true));

        let output = run(&config, &rows, &RunContext::new(now())).unwrap();
        assert!(output.files[0].issues.is_empty());
        assert_eq!(output.files[1].filename, "Trades_20240115_b.csv");
        assert_eq!(output.files[1].issues.len(), 1);
        assert_eq!(output.files[1].issues[0].record_index, 3);
        assert_eq!(output.files[1].issues[0].field_id, "ccy");

        match run(&config, &rows, &RunContext::new(now()).strict(true)).unwrap_err() {
            EngineError::Render(RenderError::Rejected { issues }) => assert_eq!(issues[0].record_index, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_colliding_filenames_are_an_error() {
        // "A/B" and "A:B" sanitize to the same label text
        let rows = vec![
            Record::new().with("id", "T1").with("desk", "A/B"),
            Record::new().with("id", "T2").with("desk", "A:B"),
        ];
        let config = report().with_split(SplitConfig::by_field("desk", true));
        match run(&config, &rows, &RunContext::new(now())).unwrap_err() {
            EngineError::DuplicateFilename { filename, first, second } => {
                assert_eq!(filename, "Trades_20240115_A_B.csv");
                assert_eq!(first, "A/B");
                assert_eq!(second, "A:B");
            }
            other => panic!("unexpected error: {other}"),
        }

        // a literal UNKNOWN value meets the null group
        let rows = vec![
            Record::new().with("id", "T1").with("desk", "UNKNOWN"),
            Record::new().with("id", "T2"),
        ];
        assert!(matches!(
            run(&config, &rows, &RunContext::new(now())).unwrap_err(),
            EngineError::DuplicateFilename { .. }
        ));
    }

    #[test]
    fn test_split_without_sequence_fails_validation() {
        let config = report()
            .with_filename(FilenamePattern::new("{report_name}_{date}.{ext}"))
            .with_split(SplitConfig::by_records(100));
        let err = run(&config, &records(250), &RunContext::new(now())).unwrap_err();
        match err {
            EngineError::Validation(errors) => {
                assert!(errors.contains(&ConfigError::SplitWithoutSequence("records")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_config_fails_before_rendering() {
        let config = report().with_filename(FilenamePattern::new(""));
        let err = run(&config, &records(1), &RunContext::new(now())).unwrap_err();
        assert!(matches!(err, EngineError::Validation(ValidationErrors(_))));
    }

    #[test]
    fn test_binary_format_is_not_rendered() {
        let config = report().with_output(OutputFormatConfig::Xlsx(XlsxConfig::default()));
        let err = run(&config, &records(1), &RunContext::new(now())).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Render(RenderError::BinaryFormat(FormatKind::Xlsx))
        ));
    }
}
