//! Records: the data rows a report renders
//!
//! Records arrive from the data-source collaborator already mapped to field
//! identifiers. Values are JSON scalars; nested arrays/objects are accepted on
//! input but fail type checks at render time.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::field::FieldSpec;

/// A single record keyed by field identifier
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn with(mut self, field_id: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field_id.into(), value.into());
        self
    }

    pub fn insert(&mut self, field_id: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field_id.into(), value.into());
    }

    /// Raw value as carried by the record
    pub fn get(&self, field_id: &str) -> Option<&Value> {
        self.0.get(field_id)
    }

    /// Value for a field, falling back to the field's declared default when the
    /// record has no value or an explicit null
    pub fn value_for<'a>(&'a self, field: &'a FieldSpec) -> Option<&'a Value> {
        match self.0.get(&field.id) {
            Some(Value::Null) | None => field.default.as_ref().or(self.0.get(&field.id)),
            Some(value) => Some(value),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Value> for Record {
    type Error = serde_json::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        serde_json::from_value(value)
    }
}

/// An ordered sequence of records
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordSet(Vec<Record>);

impl RecordSet {
    pub fn new(records: Vec<Record>) -> Self {
        Self(records)
    }

    /// Parse a JSON array of objects
    pub fn from_json_str(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    pub fn records(&self) -> &[Record] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Record>> for RecordSet {
    fn from(records: Vec<Record>) -> Self {
        Self(records)
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_for_uses_default_for_missing_and_null() {
        let field = FieldSpec::new("ccy").with_default(json!("EUR"));

        let missing = Record::new();
        assert_eq!(missing.value_for(&field), Some(&json!("EUR")));

        let null = Record::new().with("ccy", Value::Null);
        assert_eq!(null.value_for(&field), Some(&json!("EUR")));

        let present = Record::new().with("ccy", "USD");
        assert_eq!(present.value_for(&field), Some(&json!("USD")));
    }

    #[test]
    fn test_value_for_without_default_keeps_null() {
        let field = FieldSpec::new("ccy");
        let null = Record::new().with("ccy", Value::Null);
        assert_eq!(null.value_for(&field), Some(&Value::Null));
        assert_eq!(Record::new().value_for(&field), None);
    }

    #[test]
    fn test_record_set_from_json() {
        let set = RecordSet::from_json_str(r#"[{"id": "T1"}, {"id": "T2", "amount": 20}]"#).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.records()[1].get("amount"), Some(&json!(20)));
    }

    #[test]
    fn test_record_set_rejects_non_objects() {
        assert!(RecordSet::from_json_str(r#"[1, 2]"#).is_err());
    }
}
