//! Field specifications: the columns/elements a report emits

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Data type of a report field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    #[default]
    String,
    Number,
    Date,
    Boolean,
    Enum,
}

/// How strongly a regulator requires a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    Mandatory,
    Conditional,
    #[default]
    Optional,
}

/// Value constraints checked at render time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FieldConstraints {
    /// Maximum length in characters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    /// Regex the rendered value must match in full
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Allowed values (also the domain of `DataType::Enum`)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
}

impl FieldConstraints {
    pub fn is_empty(&self) -> bool {
        self.max_length.is_none() && self.pattern.is_none() && self.enum_values.is_empty()
    }
}

/// One report field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Identifier, unique within a report; records are keyed by it
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub data_type: DataType,

    #[serde(default)]
    pub requirement: Requirement,

    /// XML element / CSV column / JSON key. Falls back to `id` when empty.
    #[serde(default)]
    pub output_tag: String,

    #[serde(default, skip_serializing_if = "FieldConstraints::is_empty")]
    pub constraints: FieldConstraints,

    /// Binding into the source data model, resolved by the data-mapping collaborator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Value used when a record carries none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl FieldSpec {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            data_type: DataType::String,
            requirement: Requirement::Optional,
            output_tag: String::new(),
            constraints: FieldConstraints::default(),
            source: None,
            default: None,
        }
    }

    pub fn with_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.output_tag = tag.into();
        self
    }

    pub fn with_requirement(mut self, requirement: Requirement) -> Self {
        self.requirement = requirement;
        self
    }

    pub fn with_constraints(mut self, constraints: FieldConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// The name used on the wire
    pub fn tag(&self) -> &str {
        if self.output_tag.is_empty() {
            &self.id
        } else {
            &self.output_tag
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_falls_back_to_id() {
        let field = FieldSpec::new("trade_id");
        assert_eq!(field.tag(), "trade_id");

        let field = field.with_tag("TradeId");
        assert_eq!(field.tag(), "TradeId");
    }

    #[test]
    fn test_deserialize_minimal_field() {
        let field: FieldSpec = serde_json::from_str(r#"{"id": "ccy"}"#).unwrap();
        assert_eq!(field.data_type, DataType::String);
        assert_eq!(field.requirement, Requirement::Optional);
        assert!(field.constraints.is_empty());
    }

    #[test]
    fn test_unknown_requirement_is_rejected() {
        let result: Result<FieldSpec, _> =
            serde_json::from_str(r#"{"id": "x", "requirement": "sometimes"}"#);
        assert!(result.is_err());
    }
}
