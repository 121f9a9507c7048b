//! Filename pattern settings

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Date rendering used by the `{date}` and `{datetime}` tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DateFormat {
    #[default]
    #[serde(rename = "YYYYMMDD")]
    Compact,
    #[serde(rename = "YYYY-MM-DD")]
    Iso,
    #[serde(rename = "DDMMYYYY")]
    DayFirst,
    #[serde(rename = "DD-MM-YYYY")]
    DayFirstDashed,
    #[serde(rename = "MMDDYYYY")]
    MonthFirst,
}

impl DateFormat {
    /// chrono format string
    pub fn strftime(&self) -> &'static str {
        match self {
            DateFormat::Compact => "%Y%m%d",
            DateFormat::Iso => "%Y-%m-%d",
            DateFormat::DayFirst => "%d%m%Y",
            DateFormat::DayFirstDashed => "%d-%m-%Y",
            DateFormat::MonthFirst => "%m%d%Y",
        }
    }
}

/// Which calendar date the date-bearing tokens describe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DateBasis {
    #[default]
    RunDate,
    /// T-1, skipping Saturdays and Sundays
    PreviousBusinessDay,
}

impl DateBasis {
    pub fn apply(&self, run_date: NaiveDate) -> NaiveDate {
        match self {
            DateBasis::RunDate => run_date,
            DateBasis::PreviousBusinessDay => {
                let mut date = run_date;
                loop {
                    date = match date.pred_opt() {
                        Some(previous) => previous,
                        None => return date,
                    };
                    if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                        return date;
                    }
                }
            }
        }
    }
}

pub const DEFAULT_FILENAME_PATTERN: &str = "{report_name}_{date}_{sequence}.{ext}";

fn default_pattern() -> String {
    DEFAULT_FILENAME_PATTERN.to_string()
}

/// Filename template plus its date settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilenamePattern {
    #[serde(default = "default_pattern")]
    pub pattern: String,
    #[serde(default)]
    pub date_format: DateFormat,
    #[serde(default)]
    pub date_basis: DateBasis,
}

impl Default for FilenamePattern {
    fn default() -> Self {
        Self {
            pattern: default_pattern(),
            date_format: DateFormat::default(),
            date_basis: DateBasis::default(),
        }
    }
}

impl FilenamePattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Self::default()
        }
    }

    pub fn with_date_format(mut self, date_format: DateFormat) -> Self {
        self.date_format = date_format;
        self
    }

    /// Same date settings, different template
    pub fn with_pattern(&self, pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_previous_business_day_skips_weekend() {
        let monday = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let friday = NaiveDate::from_ymd_opt(2024, 1, 12).unwrap();
        assert_eq!(DateBasis::PreviousBusinessDay.apply(monday), friday);

        let wednesday = NaiveDate::from_ymd_opt(2024, 1, 17).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
        assert_eq!(DateBasis::PreviousBusinessDay.apply(wednesday), tuesday);
        assert_eq!(DateBasis::RunDate.apply(wednesday), wednesday);
    }

    #[test]
    fn test_date_format_names() {
        let pattern: FilenamePattern =
            serde_json::from_str(r#"{"pattern": "{date}.{ext}", "date_format": "DD-MM-YYYY"}"#).unwrap();
        assert_eq!(pattern.date_format, DateFormat::DayFirstDashed);
        assert!(serde_json::from_str::<DateFormat>(r#""YYMMDD""#).is_err());
    }
}
