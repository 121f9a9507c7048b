//! Format rendering
//!
//! Serializes records into the configured output format. Every record is
//! checked against its fields' constraints first; violating records are
//! reported as [`RecordIssue`]s and left out of the payload (or reject the
//! whole render in strict mode). XLSX and PDF are produced by external
//! writers and are not rendered here.

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

use crate::error::RenderError;
use crate::model::field::{DataType, FieldSpec};
use crate::model::output::{FormatKind, OutputFormatConfig, TextEncoding};
use crate::model::record::Record;

pub mod csv;
pub mod json;
pub mod value;
pub mod xml;

pub use self::csv::CsvRenderer;
pub use self::json::JsonRenderer;
pub use self::xml::XmlRenderer;
use self::value::FieldChecker;

/// A single constraint violation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintViolation {
    #[error("value has {actual} characters, maximum is {max}")]
    TooLong { max: usize, actual: usize },

    #[error("value '{value}' does not match pattern '{pattern}'")]
    PatternMismatch { value: String, pattern: String },

    #[error("value '{value}' is not an allowed value")]
    NotAllowed { value: String },

    #[error("value '{value}' is not a valid {expected:?}")]
    TypeMismatch { expected: DataType, value: String },
}

/// A record excluded from the payload, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordIssue {
    /// Index into the records handed to the renderer
    pub record_index: usize,
    pub field_id: String,
    pub violation: ConstraintViolation,
}

impl fmt::Display for RecordIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record {} field '{}': {}", self.record_index, self.field_id, self.violation)
    }
}

/// Per-render values that are not part of the report configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
    pub report_name: String,
    pub generated_at: DateTime<Utc>,
    /// Reject the whole render on any record issue
    pub strict: bool,
}

impl RenderContext {
    pub fn new(report_name: impl Into<String>, generated_at: DateTime<Utc>) -> Self {
        Self {
            report_name: report_name.into(),
            generated_at,
            strict: false,
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Rendered bytes in their target encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub format: FormatKind,
    pub bytes: Vec<u8>,
}

impl Payload {
    /// The payload as text, when it is valid UTF-8
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutput {
    pub payload: Payload,
    /// Records actually written
    pub record_count: usize,
    pub issues: Vec<RecordIssue>,
}

/// A text format serializer. Records handed in have already passed the constraint checks.
pub trait Renderer {
    fn render(
        &self,
        fields: &[FieldSpec],
        records: &[&Record],
        context: &RenderContext,
    ) -> Result<Vec<u8>, RenderError>;
}

/// Renderer for a resolved format, or `BinaryFormat` for XLSX/PDF
pub fn renderer_for(format: &OutputFormatConfig) -> Result<Box<dyn Renderer + '_>, RenderError> {
    match format {
        OutputFormatConfig::Xml(config) => Ok(Box::new(XmlRenderer::new(config))),
        OutputFormatConfig::Csv(config) => Ok(Box::new(CsvRenderer::new(config))),
        OutputFormatConfig::Json(config) => Ok(Box::new(JsonRenderer::new(config))),
        OutputFormatConfig::Xlsx(_) | OutputFormatConfig::Pdf(_) => Err(RenderError::BinaryFormat(format.kind())),
    }
}

/// Check and render `records` in field order
pub fn render(
    records: &[&Record],
    fields: &[FieldSpec],
    format: &OutputFormatConfig,
    context: &RenderContext,
) -> Result<RenderOutput, RenderError> {
    let renderer = renderer_for(format)?;
    let checkers = fields.iter().map(FieldChecker::new).collect::<Result<Vec<_>, _>>()?;

    let mut issues = Vec::new();
    let mut accepted = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let before = issues.len();
        for checker in &checkers {
            // only values carried by the record are checked, never defaults
            let Some(value) = record.get(&checker.field.id) else {
                continue;
            };
            if let Some(violation) = checker.check(value) {
                tracing::trace!("Record {} field '{}': {}", index, checker.field.id, violation);
                issues.push(RecordIssue {
                    record_index: index,
                    field_id: checker.field.id.clone(),
                    violation,
                });
            }
        }
        if issues.len() == before {
            accepted.push(*record);
        }
    }

    if !issues.is_empty() {
        if context.strict {
            return Err(RenderError::Rejected { issues });
        }
        tracing::warn!(
            "{} record(s) excluded from '{}' ({} issue(s))",
            records.len() - accepted.len(),
            context.report_name,
            issues.len()
        );
    }

    let bytes = renderer.render(fields, &accepted, context)?;
    tracing::debug!(
        "Rendered {} record(s) as {} ({} bytes)",
        accepted.len(),
        format.kind(),
        bytes.len()
    );

    Ok(RenderOutput {
        payload: Payload {
            format: format.kind(),
            bytes,
        },
        record_count: accepted.len(),
        issues,
    })
}

/// Encode rendered text, logging characters the encoding cannot represent
pub(crate) fn encode_text(text: &str, encoding: TextEncoding) -> Vec<u8> {
    let (bytes, replaced) = encoding.encode(text);
    if replaced > 0 {
        tracing::warn!(
            "{} character(s) not representable in {} were replaced with '?'",
            replaced,
            encoding.label()
        );
    }
    bytes
}
