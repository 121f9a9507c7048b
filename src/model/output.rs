//! Output format configuration
//!
//! Operators switch formats back and forth, so the stored settings keep one
//! optional block per format next to the selected `format`. Only the block that
//! matches the selection is meaningful; [`OutputSettings::resolve`] turns the
//! stored shape into the tagged [`OutputFormatConfig`] the renderers consume.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FormatKind {
    Xml,
    Csv,
    Json,
    Xlsx,
    Pdf,
}

impl FormatKind {
    pub fn extension(&self) -> &'static str {
        match self {
            FormatKind::Xml => "xml",
            FormatKind::Csv => "csv",
            FormatKind::Json => "json",
            FormatKind::Xlsx => "xlsx",
            FormatKind::Pdf => "pdf",
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            FormatKind::Xml => "application/xml",
            FormatKind::Csv => "text/csv",
            FormatKind::Json => "application/json",
            FormatKind::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            FormatKind::Pdf => "application/pdf",
        }
    }

    /// Whether the engine renders this format itself
    pub fn is_text(&self) -> bool {
        matches!(self, FormatKind::Xml | FormatKind::Csv | FormatKind::Json)
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for FormatKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xml" => Ok(FormatKind::Xml),
            "csv" => Ok(FormatKind::Csv),
            "json" => Ok(FormatKind::Json),
            "xlsx" => Ok(FormatKind::Xlsx),
            "pdf" => Ok(FormatKind::Pdf),
            _ => Err(ConfigError::UnknownFormat(s.to_string())),
        }
    }
}

impl TryFrom<String> for FormatKind {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FormatKind> for String {
    fn from(kind: FormatKind) -> Self {
        kind.extension().to_string()
    }
}

/// Character encodings the text renderers can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Latin1,
    Ascii,
}

impl TextEncoding {
    pub fn parse(label: &str) -> Result<Self, ConfigError> {
        let normalized = label.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" => Ok(TextEncoding::Latin1),
            "us-ascii" | "ascii" => Ok(TextEncoding::Ascii),
            _ => Err(ConfigError::UnsupportedEncoding(label.to_string())),
        }
    }

    /// Canonical label, as written into an XML declaration
    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "UTF-8",
            TextEncoding::Latin1 => "ISO-8859-1",
            TextEncoding::Ascii => "US-ASCII",
        }
    }

    /// Encode text, replacing unrepresentable characters with `?`.
    /// Returns the bytes and the number of replaced characters.
    pub fn encode(&self, text: &str) -> (Vec<u8>, usize) {
        let limit = match self {
            TextEncoding::Utf8 => return (text.as_bytes().to_vec(), 0),
            TextEncoding::Latin1 => 0xFF,
            TextEncoding::Ascii => 0x7F,
        };

        let mut replaced = 0;
        let bytes = text
            .chars()
            .map(|c| {
                let code = c as u32;
                if code <= limit {
                    code as u8
                } else {
                    replaced += 1;
                    b'?'
                }
            })
            .collect();
        (bytes, replaced)
    }
}

fn default_utf8() -> String {
    "UTF-8".to_string()
}

/// XML format settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XmlConfig {
    pub encoding: String,
    pub xml_version: String,
    pub root_element: String,
    pub namespace: Option<String>,
    pub schema_location: Option<String>,
    pub include_declaration: bool,
    pub pretty_print: bool,
    pub include_timestamp: bool,
    pub include_record_count: bool,
    pub escape_special_chars: bool,
    /// Field identifiers whose values are wrapped in CDATA sections
    pub cdata_fields: Vec<String>,
}

impl Default for XmlConfig {
    fn default() -> Self {
        Self {
            encoding: default_utf8(),
            xml_version: "1.0".to_string(),
            root_element: "Report".to_string(),
            namespace: None,
            schema_location: None,
            include_declaration: true,
            pretty_print: true,
            include_timestamp: false,
            include_record_count: false,
            escape_special_chars: true,
            cdata_fields: Vec::new(),
        }
    }
}

/// CSV field delimiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Delimiter {
    #[default]
    #[serde(rename = ",", alias = "comma")]
    Comma,
    #[serde(rename = ";", alias = "semicolon")]
    Semicolon,
    #[serde(rename = "\t", alias = "tab")]
    Tab,
    #[serde(rename = "|", alias = "pipe")]
    Pipe,
}

impl Delimiter {
    pub fn as_char(&self) -> char {
        match self {
            Delimiter::Comma => ',',
            Delimiter::Semicolon => ';',
            Delimiter::Tab => '\t',
            Delimiter::Pipe => '|',
        }
    }
}

/// CSV line terminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LineEnding {
    #[serde(rename = "CRLF", alias = "crlf")]
    Crlf,
    #[default]
    #[serde(rename = "LF", alias = "lf")]
    Lf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Crlf => "\r\n",
            LineEnding::Lf => "\n",
        }
    }
}

/// CSV format settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvConfig {
    pub delimiter: Delimiter,
    /// Single ASCII character
    pub quote_char: String,
    pub quote_all: bool,
    pub line_ending: LineEnding,
    pub encoding: String,
    pub include_bom: bool,
    pub include_header: bool,
    pub custom_header: Option<String>,
    pub include_trailer: bool,
    /// Literal trailer; `{record_count}` and `{timestamp}` are substituted
    pub trailer_text: Option<String>,
    pub trailer_record_count: bool,
    pub trailer_timestamp: bool,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: Delimiter::Comma,
            quote_char: "\"".to_string(),
            quote_all: false,
            line_ending: LineEnding::Lf,
            encoding: default_utf8(),
            include_bom: false,
            include_header: true,
            custom_header: None,
            include_trailer: false,
            trailer_text: None,
            trailer_record_count: true,
            trailer_timestamp: false,
        }
    }
}

impl CsvConfig {
    /// The quote character as a byte, if it is a single ASCII character
    pub fn quote_byte(&self) -> Option<u8> {
        let mut chars = self.quote_char.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii() => Some(c as u8),
            _ => None,
        }
    }
}

/// How JSON output treats null values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NullHandling {
    #[default]
    Include,
    Omit,
    EmptyString,
}

/// JSON format settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonConfig {
    pub pretty_print: bool,
    pub wrap_in_object: bool,
    pub include_metadata: bool,
    pub null_handling: NullHandling,
}

impl Default for JsonConfig {
    fn default() -> Self {
        Self {
            pretty_print: true,
            wrap_in_object: true,
            include_metadata: true,
            null_handling: NullHandling::Include,
        }
    }
}

/// Spreadsheet settings, consumed by the external XLSX writer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XlsxConfig {
    pub sheet_name: String,
    pub include_header: bool,
}

impl Default for XlsxConfig {
    fn default() -> Self {
        Self {
            sheet_name: "Report".to_string(),
            include_header: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PageOrientation {
    #[default]
    Portrait,
    Landscape,
}

/// Document settings, consumed by the external PDF writer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    pub page_size: String,
    pub orientation: PageOrientation,
    pub title: Option<String>,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            page_size: "A4".to_string(),
            orientation: PageOrientation::Portrait,
            title: None,
        }
    }
}

/// Resolved, format-specific configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum OutputFormatConfig {
    Xml(XmlConfig),
    Csv(CsvConfig),
    Json(JsonConfig),
    Xlsx(XlsxConfig),
    Pdf(PdfConfig),
}

impl OutputFormatConfig {
    pub fn kind(&self) -> FormatKind {
        match self {
            OutputFormatConfig::Xml(_) => FormatKind::Xml,
            OutputFormatConfig::Csv(_) => FormatKind::Csv,
            OutputFormatConfig::Json(_) => FormatKind::Json,
            OutputFormatConfig::Xlsx(_) => FormatKind::Xlsx,
            OutputFormatConfig::Pdf(_) => FormatKind::Pdf,
        }
    }
}

/// Output settings as stored with a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSettings {
    pub format: FormatKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xml: Option<XmlConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv: Option<CsvConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<JsonConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xlsx: Option<XlsxConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf: Option<PdfConfig>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self::from(OutputFormatConfig::Csv(CsvConfig::default()))
    }
}

impl From<OutputFormatConfig> for OutputSettings {
    fn from(config: OutputFormatConfig) -> Self {
        let mut settings = OutputSettings {
            format: config.kind(),
            xml: None,
            csv: None,
            json: None,
            xlsx: None,
            pdf: None,
        };
        match config {
            OutputFormatConfig::Xml(c) => settings.xml = Some(c),
            OutputFormatConfig::Csv(c) => settings.csv = Some(c),
            OutputFormatConfig::Json(c) => settings.json = Some(c),
            OutputFormatConfig::Xlsx(c) => settings.xlsx = Some(c),
            OutputFormatConfig::Pdf(c) => settings.pdf = Some(c),
        }
        settings
    }
}

impl OutputSettings {
    /// Select the block matching `format`, ignoring stale blocks
    pub fn resolve(&self) -> OutputFormatConfig {
        let stale: Vec<&str> = [
            (FormatKind::Xml, self.xml.is_some()),
            (FormatKind::Csv, self.csv.is_some()),
            (FormatKind::Json, self.json.is_some()),
            (FormatKind::Xlsx, self.xlsx.is_some()),
            (FormatKind::Pdf, self.pdf.is_some()),
        ]
        .into_iter()
        .filter(|(kind, present)| *present && *kind != self.format)
        .map(|(kind, _)| kind.extension())
        .collect();
        if !stale.is_empty() {
            tracing::debug!("Ignoring stale format blocks {:?} (selected: {})", stale, self.format);
        }

        match self.format {
            FormatKind::Xml => OutputFormatConfig::Xml(self.xml.clone().unwrap_or_default()),
            FormatKind::Csv => OutputFormatConfig::Csv(self.csv.clone().unwrap_or_default()),
            FormatKind::Json => OutputFormatConfig::Json(self.json.clone().unwrap_or_default()),
            FormatKind::Xlsx => OutputFormatConfig::Xlsx(self.xlsx.clone().unwrap_or_default()),
            FormatKind::Pdf => OutputFormatConfig::Pdf(self.pdf.clone().unwrap_or_default()),
        }
    }
}
