//! Calendar-rule schedules

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};

use crate::error::ConfigError;
use crate::model::schedule::{CalendarRule, Frequency, LAST_DAY_OF_MONTH};

/// Day selector within a month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayOfMonth {
    Day(u32),
    Last,
}

impl DayOfMonth {
    fn parse(value: Option<i32>, frequency: &str) -> Result<Self, ConfigError> {
        match value {
            Some(LAST_DAY_OF_MONTH) => Ok(DayOfMonth::Last),
            Some(day @ 1..=31) => Ok(DayOfMonth::Day(day as u32)),
            Some(day) => Err(ConfigError::InvalidCalendar(format!(
                "day_of_month must be 1-31 or -1, got {}",
                day
            ))),
            None => Err(ConfigError::InvalidCalendar(format!(
                "{} rules require day_of_month",
                frequency
            ))),
        }
    }

    /// Explicit days past the end of a month never match in that month
    fn matches(&self, date: NaiveDate) -> bool {
        match self {
            DayOfMonth::Day(day) => date.day() == *day,
            DayOfMonth::Last => is_last_day_of_month(date),
        }
    }
}

fn is_last_day_of_month(date: NaiveDate) -> bool {
    date.succ_opt().is_none_or(|next| next.month() != date.month())
}

fn days_in_month(month: u32) -> u32 {
    match month {
        2 => 29,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Recurrence {
    Daily { skip_weekends: bool },
    Weekly { weekdays: Vec<Weekday> },
    Monthly { day: DayOfMonth },
    Quarterly { month_of_quarter: u32, day: DayOfMonth },
    Yearly { month: u32, day: DayOfMonth },
}

/// A validated calendar rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarSchedule {
    recurrence: Recurrence,
    /// Sorted, without duplicates
    times: Vec<NaiveTime>,
}

impl CalendarSchedule {
    pub fn new(rule: &CalendarRule) -> Result<Self, ConfigError> {
        if rule.times.is_empty() {
            return Err(ConfigError::InvalidCalendar("at least one time slot is required".to_string()));
        }
        let mut times: Vec<NaiveTime> = rule.times.iter().map(|t| t.to_naive_time()).collect();
        times.sort();
        times.dedup();

        let recurrence = match rule.frequency {
            Frequency::Daily => Recurrence::Daily {
                skip_weekends: rule.skip_weekends,
            },
            Frequency::Weekly => {
                if rule.weekdays.is_empty() {
                    return Err(ConfigError::InvalidCalendar(
                        "weekly rules require at least one weekday".to_string(),
                    ));
                }
                let mut weekdays = rule.weekdays.clone();
                weekdays.sort_by_key(|d| d.num_days_from_monday());
                weekdays.dedup();
                Recurrence::Weekly { weekdays }
            }
            Frequency::Monthly => Recurrence::Monthly {
                day: DayOfMonth::parse(rule.day_of_month, "monthly")?,
            },
            Frequency::Quarterly => {
                let month_of_quarter = rule.month_of_quarter.unwrap_or(1);
                if !(1..=3).contains(&month_of_quarter) {
                    return Err(ConfigError::InvalidCalendar(format!(
                        "month_of_quarter must be 1-3, got {}",
                        month_of_quarter
                    )));
                }
                Recurrence::Quarterly {
                    month_of_quarter,
                    day: DayOfMonth::parse(rule.day_of_month, "quarterly")?,
                }
            }
            Frequency::Yearly => {
                let month = rule.month.unwrap_or(1);
                if !(1..=12).contains(&month) {
                    return Err(ConfigError::InvalidCalendar(format!("month must be 1-12, got {}", month)));
                }
                let day = DayOfMonth::parse(rule.day_of_month, "yearly")?;
                if let DayOfMonth::Day(d) = day {
                    if d > days_in_month(month) {
                        return Err(ConfigError::InvalidCalendar(format!(
                            "day {} never occurs in month {}",
                            d, month
                        )));
                    }
                }
                Recurrence::Yearly { month, day }
            }
        };

        Ok(Self { recurrence, times })
    }

    pub fn matches_date(&self, date: NaiveDate) -> bool {
        match &self.recurrence {
            Recurrence::Daily { skip_weekends } => {
                !skip_weekends || !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
            }
            Recurrence::Weekly { weekdays } => weekdays.contains(&date.weekday()),
            Recurrence::Monthly { day } => day.matches(date),
            Recurrence::Quarterly { month_of_quarter, day } => {
                (date.month() - 1) % 3 + 1 == *month_of_quarter && day.matches(date)
            }
            Recurrence::Yearly { month, day } => date.month() == *month && day.matches(date),
        }
    }

    /// Time slots on `date`, ascending
    pub fn times_on(&self, date: NaiveDate) -> Vec<NaiveTime> {
        if self.matches_date(date) {
            self.times.clone()
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::schedule::TimeOfDay;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn slots(times: &[&str]) -> Vec<TimeOfDay> {
        times.iter().map(|t| t.parse().unwrap()).collect()
    }

    #[test]
    fn test_times_are_sorted_and_deduplicated() {
        let schedule = CalendarSchedule::new(&CalendarRule::daily(slots(&["18:00", "06:00", "18:00"]))).unwrap();
        let times = schedule.times_on(date(2024, 1, 15));
        assert_eq!(times.len(), 2);
        assert!(times[0] < times[1]);
    }

    #[test]
    fn test_last_day_of_month() {
        let schedule = CalendarSchedule::new(&CalendarRule::monthly(-1, slots(&["23:00"]))).unwrap();
        assert!(schedule.matches_date(date(2024, 2, 29)));
        assert!(!schedule.matches_date(date(2024, 2, 28)));
        assert!(schedule.matches_date(date(2023, 2, 28)));
        assert!(schedule.matches_date(date(2024, 4, 30)));
        assert!(schedule.matches_date(date(2024, 12, 31)));
    }

    #[test]
    fn test_day_31_skips_short_months() {
        let schedule = CalendarSchedule::new(&CalendarRule::monthly(31, slots(&["09:00"]))).unwrap();
        assert!(schedule.matches_date(date(2024, 1, 31)));
        assert!(!schedule.matches_date(date(2024, 4, 30)));
    }

    #[test]
    fn test_quarterly_and_yearly() {
        let mut rule = CalendarRule::monthly(15, slots(&["09:00"]));
        rule.frequency = Frequency::Quarterly;
        rule.month_of_quarter = Some(2);
        let schedule = CalendarSchedule::new(&rule).unwrap();
        assert!(schedule.matches_date(date(2024, 2, 15)));
        assert!(schedule.matches_date(date(2024, 11, 15)));
        assert!(!schedule.matches_date(date(2024, 1, 15)));

        let mut rule = CalendarRule::monthly(1, slots(&["00:00"]));
        rule.frequency = Frequency::Yearly;
        rule.month = Some(4);
        let schedule = CalendarSchedule::new(&rule).unwrap();
        assert!(schedule.matches_date(date(2025, 4, 1)));
        assert!(!schedule.matches_date(date(2025, 5, 1)));
    }

    #[test]
    fn test_skip_weekends() {
        let mut rule = CalendarRule::daily(slots(&["06:00"]));
        rule.skip_weekends = true;
        let schedule = CalendarSchedule::new(&rule).unwrap();
        assert!(schedule.matches_date(date(2024, 1, 12)));
        assert!(!schedule.matches_date(date(2024, 1, 13)));
        assert!(!schedule.matches_date(date(2024, 1, 14)));
    }

    #[test]
    fn test_invalid_rules() {
        assert!(CalendarSchedule::new(&CalendarRule::daily(Vec::new())).is_err());
        assert!(CalendarSchedule::new(&CalendarRule::weekly(Vec::new(), slots(&["06:00"]))).is_err());
        assert!(CalendarSchedule::new(&CalendarRule::monthly(0, slots(&["06:00"]))).is_err());
        assert!(CalendarSchedule::new(&CalendarRule::monthly(32, slots(&["06:00"]))).is_err());
        assert!(CalendarSchedule::new(&CalendarRule::monthly(-2, slots(&["06:00"]))).is_err());

        let mut rule = CalendarRule::monthly(30, slots(&["06:00"]));
        rule.frequency = Frequency::Yearly;
        rule.month = Some(2);
        assert!(matches!(CalendarSchedule::new(&rule), Err(ConfigError::InvalidCalendar(_))));

        let mut rule = CalendarRule::monthly(1, slots(&["06:00"]));
        rule.frequency = Frequency::Quarterly;
        rule.month_of_quarter = Some(4);
        assert!(CalendarSchedule::new(&rule).is_err());

        let mut rule = CalendarRule::monthly(1, slots(&["06:00"]));
        rule.day_of_month = None;
        assert!(CalendarSchedule::new(&rule).is_err());
    }
}
