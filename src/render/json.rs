//! JSON rendering

use serde_json::{Map, Value, json};

use super::value::timestamp;
use super::{RenderContext, Renderer};
use crate::error::RenderError;
use crate::model::field::FieldSpec;
use crate::model::output::{JsonConfig, NullHandling};
use crate::model::record::Record;

pub struct JsonRenderer<'a> {
    config: &'a JsonConfig,
}

impl<'a> JsonRenderer<'a> {
    pub fn new(config: &'a JsonConfig) -> Self {
        Self { config }
    }

    /// One record as an object keyed by output tag, in field order
    fn object(&self, fields: &[FieldSpec], record: &Record) -> Value {
        let mut object = Map::new();
        for field in fields {
            match record.value_for(field) {
                Some(Value::Null) | None => match self.config.null_handling {
                    NullHandling::Include => {
                        object.insert(field.tag().to_string(), Value::Null);
                    }
                    NullHandling::EmptyString => {
                        object.insert(field.tag().to_string(), Value::String(String::new()));
                    }
                    NullHandling::Omit => {}
                },
                Some(value) => {
                    object.insert(field.tag().to_string(), value.clone());
                }
            }
        }
        Value::Object(object)
    }
}

impl Renderer for JsonRenderer<'_> {
    fn render(
        &self,
        fields: &[FieldSpec],
        records: &[&Record],
        context: &RenderContext,
    ) -> Result<Vec<u8>, RenderError> {
        let rows: Vec<Value> = records.iter().map(|record| self.object(fields, record)).collect();

        let document = if self.config.wrap_in_object {
            let mut document = Map::new();
            if self.config.include_metadata {
                document.insert(
                    "metadata".to_string(),
                    json!({
                        "report_name": context.report_name,
                        "generated_at": timestamp(&context.generated_at),
                        "record_count": records.len(),
                    }),
                );
            }
            document.insert("records".to_string(), Value::Array(rows));
            Value::Object(document)
        } else {
            Value::Array(rows)
        };

        let bytes = if self.config.pretty_print {
            serde_json::to_vec_pretty(&document)?
        } else {
            serde_json::to_vec(&document)?
        };
        Ok(bytes)
    }
}
