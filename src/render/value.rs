//! Scalar formatting and per-value constraint checks

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use regex::Regex;
use serde_json::Value;

use super::ConstraintViolation;
use crate::error::ConfigError;
use crate::model::field::{DataType, FieldSpec};

/// RFC 3339 UTC with second precision, e.g. `2024-01-15T10:30:00Z`
pub fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Text form of a value for XML/CSV. `None` for null or absent values.
pub fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// A field's constraints, with its pattern compiled once per render
#[derive(Debug)]
pub struct FieldChecker<'a> {
    pub field: &'a FieldSpec,
    pattern: Option<Regex>,
}

impl<'a> FieldChecker<'a> {
    pub fn new(field: &'a FieldSpec) -> Result<Self, ConfigError> {
        let pattern = match &field.constraints.pattern {
            Some(pattern) => Some(Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
                ConfigError::InvalidPattern {
                    field: field.id.clone(),
                    reason: e.to_string(),
                }
            })?),
            None => None,
        };
        Ok(Self { field, pattern })
    }

    /// First violation of this field's constraints by `value`.
    /// Null values are never violations.
    pub fn check(&self, value: &Value) -> Option<ConstraintViolation> {
        if value.is_null() {
            return None;
        }
        if let Some(violation) = self.check_type(value) {
            return Some(violation);
        }

        let text = scalar_text(Some(value)).unwrap_or_default();
        let constraints = &self.field.constraints;

        if !constraints.enum_values.is_empty() && !constraints.enum_values.iter().any(|v| *v == text) {
            return Some(ConstraintViolation::NotAllowed { value: text });
        }
        if let Some(max) = constraints.max_length {
            let actual = text.chars().count();
            if actual > max {
                return Some(ConstraintViolation::TooLong { max, actual });
            }
        }
        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(&text) {
                return Some(ConstraintViolation::PatternMismatch {
                    value: text,
                    pattern: constraints.pattern.clone().unwrap_or_default(),
                });
            }
        }
        None
    }

    fn check_type(&self, value: &Value) -> Option<ConstraintViolation> {
        let expected = self.field.data_type;
        let conforms = match (expected, value) {
            (_, Value::Array(_) | Value::Object(_)) => false,
            (DataType::String | DataType::Enum, _) => true,
            (DataType::Number, Value::Number(_)) => true,
            (DataType::Number, Value::String(s)) => s.trim().parse::<f64>().is_ok_and(f64::is_finite),
            (DataType::Boolean, Value::Bool(_)) => true,
            (DataType::Boolean, Value::String(s)) => s == "true" || s == "false",
            (DataType::Date, Value::String(s)) => is_date(s),
            _ => false,
        };

        if conforms {
            None
        } else {
            Some(ConstraintViolation::TypeMismatch {
                expected,
                value: scalar_text(Some(value)).unwrap_or_default(),
            })
        }
    }
}

fn is_date(s: &str) -> bool {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() || DateTime::parse_from_rfc3339(s).is_ok()
}
