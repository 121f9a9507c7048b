//! Filename resolution
//!
//! Substitutes `{token}` placeholders in a pattern in a single pass. Unknown
//! tokens are left verbatim; known tokens without a value in the context
//! resolve to the empty string. Substituted values are sanitized so they
//! cannot introduce path separators or characters illegal in filenames;
//! literal pattern text is left alone.

use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::model::naming::FilenamePattern;
use crate::model::report::ReportConfig;

lazy_static! {
    static ref TOKEN_REGEX: Regex =
        Regex::new(r"\{([A-Za-z_]+)\}").expect("Failed to compile filename token regex");
}

/// Tokens the resolver understands
pub const TOKENS: &[&str] = &[
    "report_name",
    "regulation",
    "date",
    "datetime",
    "year",
    "month",
    "day",
    "version",
    "sequence",
    "ext",
];

/// Values available to a pattern
#[derive(Debug, Clone, PartialEq)]
pub struct FilenameContext {
    pub report_name: String,
    pub regulation: String,
    pub now: DateTime<Utc>,
    /// Dates are rendered as local dates in this timezone
    pub timezone: Tz,
    pub version: Option<u32>,
    pub sequence: Option<String>,
    pub ext: Option<String>,
}

impl FilenameContext {
    pub fn new(report_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            report_name: report_name.into(),
            regulation: String::new(),
            now,
            timezone: Tz::UTC,
            version: None,
            sequence: None,
            ext: None,
        }
    }

    /// Context carrying a report's name, regulation, version, extension and schedule timezone
    pub fn for_report(config: &ReportConfig, now: DateTime<Utc>) -> Self {
        let timezone = config.schedule.timezone.parse::<Tz>().unwrap_or_else(|_| {
            tracing::debug!(
                "Unknown timezone '{}' for filename dates, using UTC",
                config.schedule.timezone
            );
            Tz::UTC
        });
        Self {
            report_name: config.name.clone(),
            regulation: config.regulation.clone(),
            now,
            timezone,
            version: Some(config.version),
            sequence: None,
            ext: Some(config.output.format.extension().to_string()),
        }
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn with_sequence(mut self, sequence: impl Into<String>) -> Self {
        self.sequence = Some(sequence.into());
        self
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }
}

/// Resolve a filename pattern against a context
pub fn resolve(pattern: &FilenamePattern, context: &FilenameContext) -> String {
    let local = context.now.with_timezone(&context.timezone);
    let date = pattern.date_basis.apply(local.date_naive());

    let resolved = TOKEN_REGEX.replace_all(&pattern.pattern, |caps: &Captures| {
        let value = match &caps[1] {
            "report_name" => context.report_name.clone(),
            "regulation" => context.regulation.clone(),
            "date" => date.format(pattern.date_format.strftime()).to_string(),
            "datetime" => format!(
                "{}_{}",
                local.date_naive().format(pattern.date_format.strftime()),
                local.format("%H%M%S")
            ),
            "year" => format!("{:04}", date.year()),
            "month" => format!("{:02}", date.month()),
            "day" => format!("{:02}", date.day()),
            "version" => context.version.map(|v| v.to_string()).unwrap_or_default(),
            "sequence" => context.sequence.clone().unwrap_or_default(),
            "ext" => context.ext.clone().unwrap_or_default(),
            _ => return caps[0].to_string(),
        };
        sanitize(&value)
    });

    tracing::trace!("Resolved '{}' to '{}'", pattern.pattern, resolved);
    resolved.into_owned()
}

/// Resolve a bare template string with the report's date settings
pub fn resolve_str(template: &str, pattern: &FilenamePattern, context: &FilenameContext) -> String {
    resolve(&pattern.with_pattern(template), context)
}

/// Replace characters that are illegal in filenames with `_`
pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::naming::{DateBasis, DateFormat};
    use chrono::TimeZone;

    fn context() -> FilenameContext {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 45).unwrap();
        let mut context = FilenameContext::new("Daily Trades", now);
        context.regulation = "EMIR".to_string();
        context.version = Some(3);
        context.ext = Some("xml".to_string());
        context
    }

    #[test]
    fn test_all_tokens() {
        let pattern = FilenamePattern::new(
            "{regulation}-{report_name}-{date}-{datetime}-{year}{month}{day}-v{version}-{sequence}.{ext}",
        );
        let resolved = resolve(&pattern, &context().with_sequence("001"));
        assert_eq!(
            resolved,
            "EMIR-Daily Trades-20240115-20240115_103045-20240115-v3-001.xml"
        );
    }

    #[test]
    fn test_unknown_tokens_are_verbatim() {
        let pattern = FilenamePattern::new("{report_name}_{branch}_{date}");
        assert_eq!(resolve(&pattern, &context()), "Daily Trades_{branch}_20240115");
    }

    #[test]
    fn test_missing_sequence_is_empty() {
        let pattern = FilenamePattern::new("{report_name}_{sequence}.{ext}");
        assert_eq!(resolve(&pattern, &context()), "Daily Trades_.xml");
    }

    #[test]
    fn test_token_free_pattern_is_unchanged() {
        let pattern = FilenamePattern::new("static/report.csv");
        let once = resolve(&pattern, &context());
        assert_eq!(once, "static/report.csv");
        assert_eq!(resolve(&FilenamePattern::new(once.clone()), &context()), once);
    }

    #[test]
    fn test_sequences_yield_distinct_names() {
        let pattern = FilenamePattern::default();
        let first = resolve(&pattern, &context().with_sequence("001"));
        let second = resolve(&pattern, &context().with_sequence("002"));
        assert_ne!(first, second);
    }

    #[test]
    fn test_date_formats() {
        let context = context();
        let cases = [
            (DateFormat::Compact, "20240115"),
            (DateFormat::Iso, "2024-01-15"),
            (DateFormat::DayFirst, "15012024"),
            (DateFormat::DayFirstDashed, "15-01-2024"),
            (DateFormat::MonthFirst, "01152024"),
        ];
        for (format, expected) in cases {
            let pattern = FilenamePattern::new("{date}").with_date_format(format);
            assert_eq!(resolve(&pattern, &context), expected);
        }
    }

    #[test]
    fn test_previous_business_day_basis() {
        // 2024-01-15 is a Monday
        let mut pattern = FilenamePattern::new("{date}_{day}");
        pattern.date_basis = DateBasis::PreviousBusinessDay;
        assert_eq!(resolve(&pattern, &context()), "20240112_12");
    }

    #[test]
    fn test_dates_use_local_timezone() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 23, 30, 0).unwrap();
        let context = FilenameContext::new("r", now).with_timezone(chrono_tz::Asia::Tokyo);
        assert_eq!(resolve(&FilenamePattern::new("{date}"), &context), "20240116");
    }

    #[test]
    fn test_substituted_values_are_sanitized() {
        let mut context = context();
        context.report_name = "Trades: EU/UK?".to_string();
        let pattern = FilenamePattern::new("out/{report_name}.{ext}");
        assert_eq!(resolve(&pattern, &context), "out/Trades_ EU_UK_.xml");
    }

    #[test]
    fn test_substitution_is_single_pass() {
        let mut context = context();
        context.report_name = "{date}".to_string();
        let pattern = FilenamePattern::new("{report_name}");
        assert_eq!(resolve(&pattern, &context), "{date}");
    }
}
