//! XML rendering
//!
//! Layout:
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <Root xmlns="..." xmlns:xsi="..." xsi:schemaLocation="...">
//!   <CreationTimestamp>2024-01-15T10:30:00Z</CreationTimestamp>
//!   <RecordCount>2</RecordCount>
//!   <Records>
//!     <Record>
//!       <Tag>value</Tag>
//!     </Record>
//!   </Records>
//! </Root>
//! ```
//!
//! Indentation is written by hand so that compact output contains no
//! whitespace between elements at all.

use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use super::value::{scalar_text, timestamp};
use super::{RenderContext, Renderer, encode_text};
use crate::error::RenderError;
use crate::model::field::FieldSpec;
use crate::model::output::{TextEncoding, XmlConfig};
use crate::model::record::Record;

pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

const INDENT: &[u8] = b"  ";

/// Whether `name` can be used as an element name
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

pub struct XmlRenderer<'a> {
    config: &'a XmlConfig,
}

impl<'a> XmlRenderer<'a> {
    pub fn new(config: &'a XmlConfig) -> Self {
        Self { config }
    }
}

struct XmlOut {
    writer: Writer<Vec<u8>>,
    pretty: bool,
}

impl XmlOut {
    fn event(&mut self, event: Event<'_>) -> Result<(), RenderError> {
        self.writer
            .write_event(event)
            .map_err(|e| RenderError::Xml(e.to_string()))
    }

    fn newline(&mut self, depth: usize) {
        if self.pretty {
            let out = self.writer.get_mut();
            out.push(b'\n');
            for _ in 0..depth {
                out.extend_from_slice(INDENT);
            }
        }
    }

    fn start(&mut self, element: BytesStart<'_>, depth: usize) -> Result<(), RenderError> {
        if depth > 0 {
            self.newline(depth);
        }
        self.event(Event::Start(element))
    }

    fn end(&mut self, name: &str, depth: usize, had_children: bool) -> Result<(), RenderError> {
        if had_children {
            self.newline(depth);
        }
        self.event(Event::End(BytesEnd::new(name)))
    }

    /// `<name>text</name>` on its own line
    fn leaf(&mut self, name: &str, content: Content<'_>, depth: usize) -> Result<(), RenderError> {
        self.start(BytesStart::new(name), depth)?;
        match content {
            Content::Empty => {}
            Content::Text(text) => self.event(Event::Text(BytesText::new(text)))?,
            Content::Raw(text) => self.event(Event::Text(BytesText::from_escaped(text)))?,
            Content::CData(text) => {
                for section in cdata_sections(text) {
                    self.event(Event::CData(BytesCData::new(section)))?;
                }
            }
        }
        self.end(name, depth, false)
    }
}

enum Content<'t> {
    Empty,
    Text(&'t str),
    Raw(&'t str),
    CData(&'t str),
}

/// Split text so no section contains `]]>`
fn cdata_sections(text: &str) -> Vec<String> {
    let pieces: Vec<&str> = text.split("]]>").collect();
    let last = pieces.len() - 1;
    pieces
        .iter()
        .enumerate()
        .map(|(i, piece)| {
            let mut section = String::new();
            if i > 0 {
                section.push('>');
            }
            section.push_str(piece);
            if i < last {
                section.push_str("]]");
            }
            section
        })
        .collect()
}

impl Renderer for XmlRenderer<'_> {
    fn render(
        &self,
        fields: &[FieldSpec],
        records: &[&Record],
        context: &RenderContext,
    ) -> Result<Vec<u8>, RenderError> {
        let config = self.config;
        let encoding = TextEncoding::parse(&config.encoding)?;
        let mut out = XmlOut {
            writer: Writer::new(Vec::new()),
            pretty: config.pretty_print,
        };

        if config.include_declaration {
            out.event(Event::Decl(BytesDecl::new(
                &config.xml_version,
                Some(encoding.label()),
                None,
            )))?;
            out.newline(0);
        }

        let mut root = BytesStart::new(config.root_element.as_str());
        if let Some(namespace) = &config.namespace {
            root.push_attribute(("xmlns", namespace.as_str()));
        }
        if let Some(location) = &config.schema_location {
            root.push_attribute(("xmlns:xsi", XSI_NAMESPACE));
            match &config.namespace {
                Some(namespace) => {
                    let value = format!("{} {}", namespace, location);
                    root.push_attribute(("xsi:schemaLocation", value.as_str()));
                }
                None => root.push_attribute(("xsi:noNamespaceSchemaLocation", location.as_str())),
            }
        }
        out.start(root, 0)?;

        if config.include_timestamp {
            let generated_at = timestamp(&context.generated_at);
            out.leaf("CreationTimestamp", Content::Text(&generated_at), 1)?;
        }
        if config.include_record_count {
            let count = records.len().to_string();
            out.leaf("RecordCount", Content::Text(&count), 1)?;
        }

        out.start(BytesStart::new("Records"), 1)?;
        for record in records {
            out.start(BytesStart::new("Record"), 2)?;
            for field in fields {
                let text = scalar_text(record.value_for(field));
                let content = match text.as_deref() {
                    None => Content::Empty,
                    Some(text) if config.cdata_fields.iter().any(|id| *id == field.id) => Content::CData(text),
                    Some(text) if config.escape_special_chars => Content::Text(text),
                    Some(text) => Content::Raw(text),
                };
                out.leaf(field.tag(), content, 3)?;
            }
            out.end("Record", 2, !fields.is_empty())?;
        }
        out.end("Records", 1, !records.is_empty())?;
        out.end(&config.root_element, 0, true)?;
        if config.pretty_print {
            out.writer.get_mut().push(b'\n');
        }

        let text = String::from_utf8(out.writer.into_inner()).map_err(|e| RenderError::Xml(e.to_string()))?;
        Ok(encode_text(&text, encoding))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn context() -> RenderContext {
        RenderContext::new("Trades", Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap())
    }

    fn fields() -> Vec<FieldSpec> {
        vec![FieldSpec::new("id").with_tag("TradeId"), FieldSpec::new("note")]
    }

    fn render(config: &XmlConfig, records: &[Record]) -> String {
        let refs: Vec<&Record> = records.iter().collect();
        let bytes = XmlRenderer::new(config).render(&fields(), &refs, &context()).unwrap();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_pretty_layout() {
        let config = XmlConfig {
            root_element: "Trades".to_string(),
            include_timestamp: true,
            include_record_count: true,
            ..XmlConfig::default()
        };
        let xml = render(&config, &[Record::new().with("id", "T1")]);
        let expected = concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
            "<Trades>\n",
            "  <CreationTimestamp>2024-01-15T10:30:00Z</CreationTimestamp>\n",
            "  <RecordCount>1</RecordCount>\n",
            "  <Records>\n",
            "    <Record>\n",
            "      <TradeId>T1</TradeId>\n",
            "      <note></note>\n",
            "    </Record>\n",
            "  </Records>\n",
            "</Trades>\n",
        );
        assert_eq!(xml, expected);
    }

    #[test]
    fn test_compact_has_no_newlines() {
        let config = XmlConfig {
            root_element: "Root".to_string(),
            include_declaration: false,
            pretty_print: false,
            ..XmlConfig::default()
        };
        let xml = render(&config, &[Record::new().with("id", "T1"), Record::new().with("id", "T2")]);
        assert!(!xml.starts_with("<?xml"));
        assert!(!xml.contains('\n'));
        assert_eq!(
            xml,
            "<Root><Records><Record><TradeId>T1</TradeId><note></note></Record>\
             <Record><TradeId>T2</TradeId><note></note></Record></Records></Root>"
        );
    }

    #[test]
    fn test_empty_records_element() {
        let config = XmlConfig {
            include_declaration: false,
            ..XmlConfig::default()
        };
        assert_eq!(render(&config, &[]), "<Report>\n  <Records></Records>\n</Report>\n");
    }

    #[test]
    fn test_namespace_attributes() {
        let config = XmlConfig {
            namespace: Some("urn:test".to_string()),
            schema_location: Some("report.xsd".to_string()),
            pretty_print: false,
            include_declaration: false,
            ..XmlConfig::default()
        };
        let xml = render(&config, &[]);
        assert!(xml.starts_with(
            "<Report xmlns=\"urn:test\" xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
             xsi:schemaLocation=\"urn:test report.xsd\">"
        ));

        let config = XmlConfig {
            namespace: None,
            ..config
        };
        assert!(render(&config, &[]).contains("xsi:noNamespaceSchemaLocation=\"report.xsd\""));
    }

    #[test]
    fn test_escaping_and_cdata() {
        let records = [Record::new().with("id", "A&B").with("note", "x]]>y <z>")];

        let config = XmlConfig {
            pretty_print: false,
            include_declaration: false,
            cdata_fields: vec!["note".to_string()],
            ..XmlConfig::default()
        };
        let xml = render(&config, &records);
        assert!(xml.contains("<TradeId>A&amp;B</TradeId>"));
        assert!(xml.contains("<note><![CDATA[x]]]]><![CDATA[>y <z>]]></note>"));

        let config = XmlConfig {
            escape_special_chars: false,
            cdata_fields: Vec::new(),
            ..config
        };
        let xml = render(&config, &records);
        assert!(xml.contains("<TradeId>A&B</TradeId>"));
    }

    #[test]
    fn test_latin1_encoding() {
        let config = XmlConfig {
            encoding: "ISO-8859-1".to_string(),
            pretty_print: false,
            ..XmlConfig::default()
        };
        let refs_source = [Record::new().with("id", "é")];
        let refs: Vec<&Record> = refs_source.iter().collect();
        let bytes = XmlRenderer::new(&config).render(&fields(), &refs, &context()).unwrap();
        assert!(bytes.starts_with(b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>"));
        assert!(bytes.windows(3).any(|w| w == [b'>', 0xE9, b'<']));
    }

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("TradeId"));
        assert!(is_valid_name("_x.y-z1"));
        assert!(!is_valid_name("1abc"));
        assert!(!is_valid_name("has space"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("a<b"));
    }
}
