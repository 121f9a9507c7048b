//! Five-field cron expressions
//!
//! `minute hour day-of-month month day-of-week`, with `*`, lists, ranges,
//! steps, month and weekday names, `7` as Sunday and the `@daily`-style
//! macros. When both day fields are restricted a day matches if either
//! matches; a field counts as restricted unless it starts with `*`.

use chrono::{Datelike, NaiveDate, NaiveTime};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

const MONTH_NAMES: &[&str] = &["JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC"];
const DAY_NAMES: &[&str] = &["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// A parsed cron expression. Each field is a bitset of allowed values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpression {
    source: String,
    minutes: u64,
    hours: u64,
    days_of_month: u64,
    months: u64,
    days_of_week: u64,
    dom_restricted: bool,
    dow_restricted: bool,
}

struct CronField {
    name: &'static str,
    min: u32,
    max: u32,
    names: Option<(&'static [&'static str], u32)>,
}

const MINUTE: CronField = CronField { name: "minute", min: 0, max: 59, names: None };
const HOUR: CronField = CronField { name: "hour", min: 0, max: 23, names: None };
const DAY_OF_MONTH: CronField = CronField { name: "day-of-month", min: 1, max: 31, names: None };
const MONTH: CronField = CronField { name: "month", min: 1, max: 12, names: Some((MONTH_NAMES, 1)) };
// 7 is accepted as Sunday and folded onto 0
const DAY_OF_WEEK: CronField = CronField { name: "day-of-week", min: 0, max: 7, names: Some((DAY_NAMES, 0)) };

fn expand_macro(expression: &str) -> Option<&'static str> {
    match expression.to_ascii_lowercase().as_str() {
        "@yearly" | "@annually" => Some("0 0 1 1 *"),
        "@monthly" => Some("0 0 1 * *"),
        "@weekly" => Some("0 0 * * 0"),
        "@daily" | "@midnight" => Some("0 0 * * *"),
        "@hourly" => Some("0 * * * *"),
        _ => None,
    }
}

impl CronExpression {
    pub fn parse(expression: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidCron {
            expression: expression.to_string(),
            reason,
        };

        let trimmed = expression.trim();
        let body = if trimmed.starts_with('@') {
            expand_macro(trimmed).ok_or_else(|| invalid(format!("unknown macro '{}'", trimmed)))?
        } else {
            trimmed
        };

        let parts: Vec<&str> = body.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(invalid(format!("expected 5 fields, found {}", parts.len())));
        }

        let mut days_of_week = parse_field(parts[4], &DAY_OF_WEEK).map_err(&invalid)?;
        if days_of_week & (1 << 7) != 0 {
            days_of_week = (days_of_week & !(1 << 7)) | 1;
        }

        Ok(Self {
            source: trimmed.to_string(),
            minutes: parse_field(parts[0], &MINUTE).map_err(&invalid)?,
            hours: parse_field(parts[1], &HOUR).map_err(&invalid)?,
            days_of_month: parse_field(parts[2], &DAY_OF_MONTH).map_err(&invalid)?,
            months: parse_field(parts[3], &MONTH).map_err(&invalid)?,
            days_of_week,
            dom_restricted: !parts[2].starts_with('*'),
            dow_restricted: !parts[4].starts_with('*'),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether any time on `date` can match
    pub fn matches_date(&self, date: NaiveDate) -> bool {
        if !bit(self.months, date.month()) {
            return false;
        }
        let dom = bit(self.days_of_month, date.day());
        let dow = bit(self.days_of_week, date.weekday().num_days_from_sunday());
        if self.dom_restricted && self.dow_restricted {
            dom || dow
        } else {
            dom && dow
        }
    }

    /// Matching wall-clock times on `date`, ascending
    pub fn times_on(&self, date: NaiveDate) -> Vec<NaiveTime> {
        if !self.matches_date(date) {
            return Vec::new();
        }
        let (hours, minutes) = (self.hours, self.minutes);
        (0..24)
            .filter(move |h| bit(hours, *h))
            .flat_map(move |h| {
                (0..60)
                    .filter(move |m| bit(minutes, *m))
                    .filter_map(move |m| NaiveTime::from_hms_opt(h, m, 0))
            })
            .collect()
    }
}

impl FromStr for CronExpression {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CronExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn bit(set: u64, value: u32) -> bool {
    value < 64 && set & (1 << value) != 0
}

fn parse_field(field: &str, spec: &CronField) -> Result<u64, String> {
    let mut set = 0u64;
    for part in field.split(',') {
        if part.is_empty() {
            return Err(format!("empty list entry in {} field", spec.name));
        }

        let (range, step) = match part.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step
                    .parse()
                    .map_err(|_| format!("invalid step '{}' in {} field", step, spec.name))?;
                if step == 0 {
                    return Err(format!("step must be positive in {} field", spec.name));
                }
                (range, Some(step))
            }
            None => (part, None),
        };

        let (start, end) = if range == "*" {
            (spec.min, spec.max)
        } else if let Some((a, b)) = range.split_once('-') {
            (parse_value(a, spec)?, parse_value(b, spec)?)
        } else {
            let value = parse_value(range, spec)?;
            // `a/n` runs from a to the end of the field
            (value, if step.is_some() { spec.max } else { value })
        };

        if start > end {
            return Err(format!("range {}-{} is reversed in {} field", start, end, spec.name));
        }

        let step = step.unwrap_or(1) as usize;
        for value in (start..=end).step_by(step) {
            set |= 1 << value;
        }
    }
    Ok(set)
}

fn parse_value(token: &str, spec: &CronField) -> Result<u32, String> {
    if let Some((names, offset)) = spec.names {
        let upper = token.to_ascii_uppercase();
        if let Some(index) = names.iter().position(|n| *n == upper) {
            return Ok(index as u32 + offset);
        }
    }
    let value: u32 = token
        .parse()
        .map_err(|_| format!("invalid value '{}' in {} field", token, spec.name))?;
    if value < spec.min || value > spec.max {
        return Err(format!(
            "value {} out of range {}-{} in {} field",
            value, spec.min, spec.max, spec.name
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_times_on_matching_day() {
        let cron = CronExpression::parse("15,45 6-7 * * *").unwrap();
        assert_eq!(
            cron.times_on(date(2024, 1, 15)),
            vec![time(6, 15), time(6, 45), time(7, 15), time(7, 45)]
        );
    }

    #[test]
    fn test_steps() {
        let cron = CronExpression::parse("*/20 0 * * *").unwrap();
        assert_eq!(cron.times_on(date(2024, 1, 15)), vec![time(0, 0), time(0, 20), time(0, 40)]);

        let cron = CronExpression::parse("5/30 0 * * *").unwrap();
        assert_eq!(cron.times_on(date(2024, 1, 15)), vec![time(0, 5), time(0, 35)]);

        let cron = CronExpression::parse("0 8-18/5 * * *").unwrap();
        assert_eq!(
            cron.times_on(date(2024, 1, 15)),
            vec![time(8, 0), time(13, 0), time(18, 0)]
        );
    }

    #[test]
    fn test_names_and_sunday_seven() {
        let cron = CronExpression::parse("0 6 * JAN-MAR MON-FRI").unwrap();
        assert!(cron.matches_date(date(2024, 1, 15))); // Monday
        assert!(!cron.matches_date(date(2024, 1, 14))); // Sunday
        assert!(!cron.matches_date(date(2024, 4, 15)));

        let sunday = CronExpression::parse("0 0 * * 7").unwrap();
        assert!(sunday.matches_date(date(2024, 1, 14)));
        assert_eq!(sunday, CronExpression { source: "0 0 * * 7".into(), ..CronExpression::parse("0 0 * * 0").unwrap() });
    }

    #[test]
    fn test_dom_dow_or_when_both_restricted() {
        let cron = CronExpression::parse("0 0 1 * MON").unwrap();
        assert!(cron.matches_date(date(2024, 2, 1))); // Thursday, 1st
        assert!(cron.matches_date(date(2024, 2, 5))); // Monday
        assert!(!cron.matches_date(date(2024, 2, 6)));
    }

    #[test]
    fn test_dom_dow_and_when_one_starts_with_star() {
        let cron = CronExpression::parse("0 0 */2 * MON").unwrap();
        assert!(cron.matches_date(date(2024, 1, 1))); // Monday, odd day
        assert!(!cron.matches_date(date(2024, 1, 8))); // Monday, even day
        assert!(!cron.matches_date(date(2024, 1, 3)));
    }

    #[test]
    fn test_macros() {
        assert_eq!(
            CronExpression::parse("@daily").unwrap().times_on(date(2024, 5, 5)),
            vec![time(0, 0)]
        );
        assert_eq!(CronExpression::parse("@hourly").unwrap().times_on(date(2024, 5, 5)).len(), 24);
        assert!(CronExpression::parse("@monthly").unwrap().matches_date(date(2024, 5, 1)));
        assert!(!CronExpression::parse("@yearly").unwrap().matches_date(date(2024, 5, 1)));
        assert!(CronExpression::parse("@reboot").is_err());
    }

    #[test]
    fn test_malformed_expressions() {
        for expression in [
            "",
            "* * * *",
            "* * * * * *",
            "60 * * * *",
            "* 24 * * *",
            "* * 0 * *",
            "* * * 13 *",
            "* * * * 8",
            "*/0 * * * *",
            "5-1 * * * *",
            "a * * * *",
            "1,,2 * * * *",
            "* * * FOO *",
        ] {
            assert!(
                matches!(CronExpression::parse(expression), Err(ConfigError::InvalidCron { .. })),
                "{expression:?} should be rejected"
            );
        }
    }
}
