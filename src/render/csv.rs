//! Delimited text rendering

use ::csv::{QuoteStyle, Terminator, WriterBuilder};

use super::value::{scalar_text, timestamp};
use super::{RenderContext, Renderer, encode_text};
use crate::error::{ConfigError, RenderError};
use crate::model::field::FieldSpec;
use crate::model::output::{CsvConfig, LineEnding, TextEncoding};
use crate::model::record::Record;

const BOM: &str = "\u{FEFF}";

pub struct CsvRenderer<'a> {
    config: &'a CsvConfig,
}

impl<'a> CsvRenderer<'a> {
    pub fn new(config: &'a CsvConfig) -> Self {
        Self { config }
    }

    fn trailer(&self, record_count: usize, context: &RenderContext) -> String {
        let config = self.config;
        let generated_at = timestamp(&context.generated_at);
        match &config.trailer_text {
            Some(text) => text
                .replace("{record_count}", &record_count.to_string())
                .replace("{timestamp}", &generated_at),
            None => {
                let mut parts = vec!["END".to_string()];
                if config.trailer_record_count {
                    parts.push(record_count.to_string());
                }
                if config.trailer_timestamp {
                    parts.push(generated_at);
                }
                parts.join(&config.delimiter.as_char().to_string())
            }
        }
    }
}

impl Renderer for CsvRenderer<'_> {
    fn render(
        &self,
        fields: &[FieldSpec],
        records: &[&Record],
        context: &RenderContext,
    ) -> Result<Vec<u8>, RenderError> {
        let config = self.config;
        let encoding = TextEncoding::parse(&config.encoding)?;
        let quote = config
            .quote_byte()
            .ok_or_else(|| ConfigError::InvalidQuoteChar(config.quote_char.clone()))?;
        let line_ending = config.line_ending.as_str();

        let mut writer = WriterBuilder::new()
            .delimiter(config.delimiter.as_char() as u8)
            .quote(quote)
            .quote_style(if config.quote_all {
                QuoteStyle::Always
            } else {
                QuoteStyle::Necessary
            })
            .terminator(match config.line_ending {
                LineEnding::Crlf => Terminator::CRLF,
                LineEnding::Lf => Terminator::Any(b'\n'),
            })
            .has_headers(false)
            .from_writer(vec![]);

        let mut head = String::new();
        if config.include_bom && encoding == TextEncoding::Utf8 {
            head.push_str(BOM);
        }
        if config.include_header {
            match &config.custom_header {
                Some(header) => {
                    head.push_str(header);
                    head.push_str(line_ending);
                }
                None => writer.write_record(fields.iter().map(FieldSpec::tag))?,
            }
        }

        for record in records {
            let row: Vec<String> = fields
                .iter()
                .map(|field| scalar_text(record.value_for(field)).unwrap_or_default())
                .collect();
            writer.write_record(&row)?;
        }

        let body = writer
            .into_inner()
            .map_err(|e| RenderError::Csv(e.into_error().into()))?;

        let mut text = head;
        text.push_str(&String::from_utf8_lossy(&body));
        if config.include_trailer {
            text.push_str(&self.trailer(records.len(), context));
            text.push_str(line_ending);
        }

        Ok(encode_text(&text, encoding))
    }
}
