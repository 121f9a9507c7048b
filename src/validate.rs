//! Report validation
//!
//! Collects every configuration error of a report, rather than stopping at
//! the first, so an operator can fix a definition in one pass.

use std::collections::HashSet;

use crate::error::{ConfigError, ValidationErrors};
use crate::model::output::{CsvConfig, OutputFormatConfig, TextEncoding, XmlConfig};
use crate::model::report::ReportConfig;
use crate::model::schedule::ScheduleSpec;
use crate::render::value::FieldChecker;
use crate::render::xml::is_valid_name;
use crate::schedule;
use crate::split::SplitStrategy;

/// Smallest `records_per_file` accepted for a stored report
pub const MIN_RECORDS_PER_FILE: usize = 100;

const SEQUENCE_TOKEN: &str = "{sequence}";

/// Allowed numbering pad widths
pub const PAD_WIDTH_RANGE: std::ops::RangeInclusive<usize> = 1..=12;

/// Every configuration error in `config`, in definition order
pub fn validate(config: &ReportConfig) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();

    check_fields(config, &mut errors);
    match config.output.resolve() {
        OutputFormatConfig::Xml(xml) => check_xml(config, &xml, &mut errors),
        OutputFormatConfig::Csv(csv) => check_csv(&csv, &mut errors),
        OutputFormatConfig::Json(_) | OutputFormatConfig::Xlsx(_) | OutputFormatConfig::Pdf(_) => {}
    }
    if config.filename.pattern.trim().is_empty() {
        errors.push(ConfigError::EmptyFilenamePattern);
    }
    check_split(config, &mut errors);
    check_schedule(&config.schedule, &mut errors);
    check_destinations(config, &mut errors);

    if errors.is_empty() {
        tracing::debug!("Report '{}' is valid", config.id);
        Ok(())
    } else {
        tracing::debug!("Report '{}' has {} configuration error(s)", config.id, errors.len());
        Err(ValidationErrors(errors))
    }
}

fn check_fields(config: &ReportConfig, errors: &mut Vec<ConfigError>) {
    let mut seen = HashSet::new();
    for (position, field) in config.fields.iter().enumerate() {
        if field.id.trim().is_empty() {
            errors.push(ConfigError::EmptyFieldId(position));
            continue;
        }
        if !seen.insert(field.id.as_str()) {
            errors.push(ConfigError::DuplicateField(field.id.clone()));
        }
        if let Err(e) = FieldChecker::new(field) {
            errors.push(e);
        }
    }
}

fn check_encoding(label: &str, errors: &mut Vec<ConfigError>) {
    if let Err(e) = TextEncoding::parse(label) {
        errors.push(e);
    }
}

fn check_xml(config: &ReportConfig, xml: &XmlConfig, errors: &mut Vec<ConfigError>) {
    check_encoding(&xml.encoding, errors);
    if !is_valid_name(&xml.root_element) {
        errors.push(ConfigError::InvalidXmlName(xml.root_element.clone()));
    }
    for field in &config.fields {
        if !field.id.trim().is_empty() && !is_valid_name(field.tag()) {
            errors.push(ConfigError::InvalidXmlName(field.tag().to_string()));
        }
    }
    for id in &xml.cdata_fields {
        if config.field(id).is_none() {
            errors.push(ConfigError::UnknownField {
                context: "cdata_fields",
                field: id.clone(),
            });
        }
    }
}

fn check_csv(csv: &CsvConfig, errors: &mut Vec<ConfigError>) {
    check_encoding(&csv.encoding, errors);
    match csv.quote_byte() {
        Some(quote) if char::from(quote) != csv.delimiter.as_char() => {}
        _ => errors.push(ConfigError::InvalidQuoteChar(csv.quote_char.clone())),
    }
}

fn check_split(config: &ReportConfig, errors: &mut Vec<ConfigError>) {
    let split = &config.split;
    let strategy = SplitStrategy::from_config(split);
    match &strategy {
        Ok(SplitStrategy::Records { per_file }) if *per_file < MIN_RECORDS_PER_FILE => {
            errors.push(ConfigError::RecordsPerFileTooSmall {
                min: MIN_RECORDS_PER_FILE,
                actual: *per_file,
            });
        }
        Ok(SplitStrategy::Field { field, .. }) if config.field(field).is_none() => {
            errors.push(ConfigError::UnknownField {
                context: "split_field",
                field: field.clone(),
            });
        }
        Ok(_) => {}
        Err(ConfigError::RecordsPerFileTooSmall { actual, .. }) => {
            errors.push(ConfigError::RecordsPerFileTooSmall {
                min: MIN_RECORDS_PER_FILE,
                actual: *actual,
            });
        }
        Err(e) => errors.push(e.clone()),
    }

    // every unit of a split run needs its own filename
    let pattern = &config.filename.pattern;
    let mode = match strategy {
        Ok(SplitStrategy::Records { .. }) => Some("records"),
        Ok(SplitStrategy::Field { .. }) => Some("field"),
        _ => None,
    };
    if let Some(mode) = mode {
        if !pattern.trim().is_empty() && !pattern.contains(SEQUENCE_TOKEN) {
            errors.push(ConfigError::SplitWithoutSequence(mode));
        }
    }

    if !PAD_WIDTH_RANGE.contains(&split.numbering.pad_width) {
        errors.push(ConfigError::InvalidPadWidth(split.numbering.pad_width));
    }
}

fn check_schedule(spec: &ScheduleSpec, errors: &mut Vec<ConfigError>) {
    if let Err(e) = schedule::check(spec) {
        errors.push(e);
    }
}

fn check_destinations(config: &ReportConfig, errors: &mut Vec<ConfigError>) {
    let mut seen = HashSet::new();
    for binding in &config.destinations {
        if !seen.insert(binding.destination_id.as_str()) {
            errors.push(ConfigError::DuplicateDestination(binding.destination_id.clone()));
        }
        if let (Some(custom), false) = (&binding.custom_schedule, binding.use_default_schedule) {
            check_schedule(&custom.merge_over(ScheduleSpec::default()), errors);
        }
    }
}
