//! Schedule specifications as stored with a report
//!
//! A schedule is either a cron expression or a calendar rule. The stored shape
//! carries both optional payloads next to a `type` discriminator; the
//! evaluator normalizes it into a single rule (see `schedule::ScheduleRule`).

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

fn default_true() -> bool {
    true
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// Which payload of a schedule is authoritative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleType {
    Cron,
    Calendar,
}

/// Recurrence frequency of a calendar rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

/// Wall-clock time slot, written as `HH:MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u32,
    minute: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Result<Self, ConfigError> {
        if hour > 23 || minute > 59 {
            return Err(ConfigError::InvalidTimeOfDay(format!("{:02}:{:02}", hour, minute)));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn to_naive_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl FromStr for TimeOfDay {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidTimeOfDay(s.to_string());
        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
            return Err(invalid());
        }
        let hour: u32 = hour.parse().map_err(|_| invalid())?;
        let minute: u32 = minute.parse().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(time: TimeOfDay) -> Self {
        time.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Day-of-month sentinel meaning "last calendar day of the month"
pub const LAST_DAY_OF_MONTH: i32 = -1;

/// Calendar-based recurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarRule {
    pub frequency: Frequency,

    /// Days of the week (weekly)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weekdays: Vec<Weekday>,

    /// Day of month, 1-31 or -1 for the last day (monthly, quarterly, yearly)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<i32>,

    /// Month of the year, 1-12 (yearly)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,

    /// Month within each quarter, 1-3 (quarterly)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month_of_quarter: Option<u32>,

    /// One or more time-of-day slots
    pub times: Vec<TimeOfDay>,

    /// Daily rules only: skip Saturdays and Sundays
    #[serde(default)]
    pub skip_weekends: bool,
}

impl CalendarRule {
    pub fn daily(times: Vec<TimeOfDay>) -> Self {
        Self {
            frequency: Frequency::Daily,
            weekdays: Vec::new(),
            day_of_month: None,
            month: None,
            month_of_quarter: None,
            times,
            skip_weekends: false,
        }
    }

    pub fn weekly(weekdays: Vec<Weekday>, times: Vec<TimeOfDay>) -> Self {
        Self {
            frequency: Frequency::Weekly,
            weekdays,
            ..Self::daily(times)
        }
    }

    pub fn monthly(day_of_month: i32, times: Vec<TimeOfDay>) -> Self {
        Self {
            frequency: Frequency::Monthly,
            day_of_month: Some(day_of_month),
            ..Self::daily(times)
        }
    }
}

/// Retry bookkeeping handed to the transport collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub enabled: bool,
    pub max_retries: u32,
    pub retry_delay_minutes: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            max_retries: 3,
            retry_delay_minutes: 15,
        }
    }
}

/// A recurring schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSpec {
    /// When false the report only runs manually
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(rename = "type")]
    pub schedule_type: ScheduleType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_expression: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar: Option<CalendarRule>,

    /// IANA timezone identifier
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Local calendar dates on which nothing fires
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blackout_dates: Vec<NaiveDate>,

    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for ScheduleSpec {
    /// Daily at midnight UTC
    fn default() -> Self {
        Self {
            enabled: true,
            schedule_type: ScheduleType::Calendar,
            cron_expression: None,
            calendar: Some(CalendarRule::daily(vec![TimeOfDay { hour: 0, minute: 0 }])),
            timezone: default_timezone(),
            blackout_dates: Vec::new(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ScheduleSpec {
    pub fn cron(expression: impl Into<String>) -> Self {
        Self {
            schedule_type: ScheduleType::Cron,
            cron_expression: Some(expression.into()),
            calendar: None,
            ..Self::default()
        }
    }

    pub fn calendar(rule: CalendarRule) -> Self {
        Self {
            schedule_type: ScheduleType::Calendar,
            cron_expression: None,
            calendar: Some(rule),
            ..Self::default()
        }
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    pub fn with_blackouts(mut self, dates: Vec<NaiveDate>) -> Self {
        self.blackout_dates = dates;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Partial schedule used by a destination that does not inherit the report schedule.
/// Missing fields come from `ScheduleSpec::default()`, never from the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScheduleOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schedule_type: Option<ScheduleType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron_expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar: Option<CalendarRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blackout_dates: Option<Vec<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryPolicy>,
}

impl ScheduleOverride {
    /// Overlay this override on `base`
    pub fn merge_over(&self, base: ScheduleSpec) -> ScheduleSpec {
        let mut merged = base;

        let inferred = match (&self.cron_expression, &self.calendar) {
            (Some(_), None) => Some(ScheduleType::Cron),
            (None, Some(_)) => Some(ScheduleType::Calendar),
            _ => None,
        };
        if let Some(schedule_type) = self.schedule_type.or(inferred) {
            if schedule_type != merged.schedule_type {
                merged.cron_expression = None;
                merged.calendar = None;
            }
            merged.schedule_type = schedule_type;
        }
        if let Some(expression) = &self.cron_expression {
            merged.cron_expression = Some(expression.clone());
        }
        if let Some(calendar) = &self.calendar {
            merged.calendar = Some(calendar.clone());
        }
        if let Some(enabled) = self.enabled {
            merged.enabled = enabled;
        }
        if let Some(timezone) = &self.timezone {
            merged.timezone = timezone.clone();
        }
        if let Some(dates) = &self.blackout_dates {
            merged.blackout_dates = dates.clone();
        }
        if let Some(retry) = &self.retry {
            merged.retry = retry.clone();
        }
        merged
    }
}
