//! Schedule evaluation
//!
//! Finds the next instant a schedule fires strictly after a reference
//! instant. Both rule kinds reduce to "which wall-clock times match on this
//! local date", so a single day-by-day search in the schedule's timezone
//! serves cron and calendar rules alike:
//!
//! - ambiguous local times (DST fall-back) resolve to the earliest instant
//! - local times inside a DST gap resolve to the first valid instant after it
//! - blackout dates are matched against the local calendar date
//! - the search gives up after a bounded lookahead and reports `NotFound`

use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::HashSet;

use crate::error::{ConfigError, ScheduleError};
use crate::model::schedule::{ScheduleSpec, ScheduleType};

pub mod calendar;
pub mod cron;

pub use calendar::CalendarSchedule;
pub use cron::CronExpression;

pub const DEFAULT_LOOKAHEAD_YEARS: u32 = 5;

/// Result of a next-occurrence search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Occurrence {
    At(DateTime<Utc>),
    /// The schedule is switched off
    Disabled,
    /// Nothing fires before `searched_until`
    NotFound { searched_until: DateTime<Utc> },
}

impl Occurrence {
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Occurrence::At(at) => Some(*at),
            _ => None,
        }
    }
}

/// A schedule's rule with exactly one payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleRule {
    Cron(CronExpression),
    Calendar(CalendarSchedule),
}

impl ScheduleRule {
    pub fn from_spec(spec: &ScheduleSpec) -> Result<Self, ConfigError> {
        match spec.schedule_type {
            ScheduleType::Cron => {
                if spec.calendar.is_some() {
                    return Err(ConfigError::NonExclusive {
                        what: "cron schedule",
                        first: "cron_expression",
                        second: "calendar",
                    });
                }
                let expression = spec.cron_expression.as_deref().ok_or(ConfigError::MissingPayload {
                    what: "cron schedule",
                    missing: "cron_expression",
                })?;
                Ok(ScheduleRule::Cron(CronExpression::parse(expression)?))
            }
            ScheduleType::Calendar => {
                if spec.cron_expression.is_some() {
                    return Err(ConfigError::NonExclusive {
                        what: "calendar schedule",
                        first: "calendar",
                        second: "cron_expression",
                    });
                }
                let rule = spec.calendar.as_ref().ok_or(ConfigError::MissingPayload {
                    what: "calendar schedule",
                    missing: "calendar",
                })?;
                Ok(ScheduleRule::Calendar(CalendarSchedule::new(rule)?))
            }
        }
    }

    fn times_on(&self, date: NaiveDate) -> Vec<NaiveTime> {
        match self {
            ScheduleRule::Cron(cron) => cron.times_on(date),
            ScheduleRule::Calendar(calendar) => calendar.times_on(date),
        }
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz, ConfigError> {
    name.parse::<Tz>()
        .map_err(|_| ConfigError::InvalidTimezone(name.to_string()))
}

/// Check a schedule's rule and timezone without evaluating it
pub fn check(spec: &ScheduleSpec) -> Result<(), ConfigError> {
    ScheduleRule::from_spec(spec)?;
    parse_timezone(&spec.timezone)?;
    Ok(())
}

/// Map a local wall-clock time to an instant
fn resolve_local(tz: Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    if let Some(at) = tz.from_local_datetime(&local).earliest() {
        return Some(at.with_timezone(&Utc));
    }
    // inside a DST gap: step to the first wall-clock minute that exists
    let mut probe = local;
    for _ in 0..(24 * 60) {
        probe += Duration::minutes(1);
        if let Some(at) = tz.from_local_datetime(&probe).earliest() {
            return Some(at.with_timezone(&Utc));
        }
    }
    None
}

/// Evaluator with a configurable lookahead bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleEvaluator {
    pub max_lookahead_years: u32,
}

impl Default for ScheduleEvaluator {
    fn default() -> Self {
        Self {
            max_lookahead_years: DEFAULT_LOOKAHEAD_YEARS,
        }
    }
}

impl ScheduleEvaluator {
    pub fn new(max_lookahead_years: u32) -> Self {
        Self {
            max_lookahead_years: max_lookahead_years.max(1),
        }
    }

    /// First occurrence strictly after `after`
    pub fn next_occurrence(&self, spec: &ScheduleSpec, after: DateTime<Utc>) -> Result<Occurrence, ScheduleError> {
        if !spec.enabled {
            return Ok(Occurrence::Disabled);
        }
        let rule = ScheduleRule::from_spec(spec)?;
        let tz = parse_timezone(&spec.timezone)?;
        let blackouts: HashSet<NaiveDate> = spec.blackout_dates.iter().copied().collect();

        let months = self.max_lookahead_years.checked_mul(12).ok_or(ScheduleError::Overflow)?;
        let searched_until = after
            .checked_add_months(Months::new(months))
            .ok_or(ScheduleError::Overflow)?;
        let last_date = searched_until.with_timezone(&tz).date_naive();

        let mut date = after.with_timezone(&tz).date_naive();
        while date <= last_date {
            if blackouts.contains(&date) {
                tracing::trace!("Skipping blackout date {}", date);
            } else {
                for time in rule.times_on(date) {
                    let Some(at) = resolve_local(tz, date.and_time(time)) else {
                        continue;
                    };
                    if at > searched_until {
                        break;
                    }
                    if at > after {
                        tracing::trace!("Next occurrence {} ({} {} {})", at, date, time, tz);
                        return Ok(Occurrence::At(at));
                    }
                }
            }
            date = date.succ_opt().ok_or(ScheduleError::Overflow)?;
        }

        tracing::debug!("No occurrence before {}", searched_until);
        Ok(Occurrence::NotFound { searched_until })
    }

    /// Up to `count` consecutive occurrences after `after`
    pub fn upcoming(
        &self,
        spec: &ScheduleSpec,
        after: DateTime<Utc>,
        count: usize,
    ) -> Result<Vec<DateTime<Utc>>, ScheduleError> {
        let mut occurrences = Vec::with_capacity(count);
        let mut cursor = after;
        while occurrences.len() < count {
            match self.next_occurrence(spec, cursor)? {
                Occurrence::At(at) => {
                    occurrences.push(at);
                    cursor = at;
                }
                Occurrence::Disabled | Occurrence::NotFound { .. } => break,
            }
        }
        Ok(occurrences)
    }
}

/// [`ScheduleEvaluator::next_occurrence`] with the default lookahead
pub fn next_occurrence(spec: &ScheduleSpec, after: DateTime<Utc>) -> Result<Occurrence, ScheduleError> {
    ScheduleEvaluator::default().next_occurrence(spec, after)
}

/// [`ScheduleEvaluator::upcoming`] with the default lookahead
pub fn upcoming(spec: &ScheduleSpec, after: DateTime<Utc>, count: usize) -> Result<Vec<DateTime<Utc>>, ScheduleError> {
    ScheduleEvaluator::default().upcoming(spec, after, count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::schedule::{CalendarRule, TimeOfDay};
    use chrono::Weekday;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn slots(times: &[&str]) -> Vec<TimeOfDay> {
        times.iter().map(|t| t.parse().unwrap()).collect()
    }

    fn at(occurrence: Occurrence) -> DateTime<Utc> {
        occurrence.instant().expect("expected an occurrence")
    }

    #[test]
    fn test_weekly_monday_after_sunday() {
        let spec = ScheduleSpec::calendar(CalendarRule::weekly(vec![Weekday::Mon], slots(&["06:00"])));
        let sunday = utc(2024, 1, 14, 12, 0);
        assert_eq!(at(next_occurrence(&spec, sunday).unwrap()), utc(2024, 1, 15, 6, 0));
    }

    #[test]
    fn test_blackout_skips_to_following_week() {
        let spec = ScheduleSpec::calendar(CalendarRule::weekly(vec![Weekday::Mon], slots(&["06:00"])))
            .with_blackouts(vec![NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()]);
        let sunday = utc(2024, 1, 14, 12, 0);
        assert_eq!(at(next_occurrence(&spec, sunday).unwrap()), utc(2024, 1, 22, 6, 0));
    }

    #[test]
    fn test_strictly_after_reference() {
        let spec = ScheduleSpec::cron("0 6 * * *");
        let six = utc(2024, 1, 15, 6, 0);
        assert_eq!(at(next_occurrence(&spec, six).unwrap()), utc(2024, 1, 16, 6, 0));
    }

    #[test]
    fn test_multiple_slots_are_distinct_occurrences() {
        let spec = ScheduleSpec::calendar(CalendarRule::daily(slots(&["06:00", "18:00"])));
        let list = upcoming(&spec, utc(2024, 1, 15, 0, 0), 3).unwrap();
        assert_eq!(
            list,
            vec![utc(2024, 1, 15, 6, 0), utc(2024, 1, 15, 18, 0), utc(2024, 1, 16, 6, 0)]
        );
    }

    #[test]
    fn test_timezone_conversion() {
        let spec = ScheduleSpec::cron("30 9 * * *").with_timezone("America/New_York");
        // 09:30 EST is 14:30 UTC
        assert_eq!(
            at(next_occurrence(&spec, utc(2024, 1, 15, 0, 0)).unwrap()),
            utc(2024, 1, 15, 14, 30)
        );
    }

    #[test]
    fn test_blackout_uses_local_date() {
        // 08:00 in Tokyo on the 16th is 23:00 UTC on the 15th
        let spec = ScheduleSpec::cron("0 8 * * *")
            .with_timezone("Asia/Tokyo")
            .with_blackouts(vec![NaiveDate::from_ymd_opt(2024, 1, 16).unwrap()]);
        assert_eq!(
            at(next_occurrence(&spec, utc(2024, 1, 15, 12, 0)).unwrap()),
            utc(2024, 1, 16, 23, 0)
        );
    }

    #[test]
    fn test_dst_gap_moves_to_first_valid_instant() {
        // 2024-03-31 02:00 -> 03:00 in Europe/Berlin
        let spec = ScheduleSpec::cron("30 2 * * *").with_timezone("Europe/Berlin");
        assert_eq!(
            at(next_occurrence(&spec, utc(2024, 3, 30, 12, 0)).unwrap()),
            utc(2024, 3, 31, 1, 0)
        );
    }

    #[test]
    fn test_dst_ambiguity_takes_earliest() {
        // 2024-10-27 03:00 -> 02:00 in Europe/Berlin, 02:30 happens twice
        let spec = ScheduleSpec::cron("30 2 * * *").with_timezone("Europe/Berlin");
        let first = at(next_occurrence(&spec, utc(2024, 10, 26, 12, 0)).unwrap());
        assert_eq!(first, utc(2024, 10, 27, 0, 30));
        // the repeated wall-clock time does not fire a second time
        assert_eq!(at(next_occurrence(&spec, first).unwrap()), utc(2024, 10, 28, 1, 30));
    }

    #[test]
    fn test_disabled() {
        let spec = ScheduleSpec::cron("not even parsed").disabled();
        assert_eq!(next_occurrence(&spec, utc(2024, 1, 1, 0, 0)).unwrap(), Occurrence::Disabled);
        assert!(upcoming(&spec, utc(2024, 1, 1, 0, 0), 5).unwrap().is_empty());
    }

    #[test]
    fn test_lookahead_exhaustion() {
        let spec = ScheduleSpec::cron("0 0 * * *").with_blackouts(
            (0..400)
                .filter_map(|i| NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().checked_add_days(chrono::Days::new(i)))
                .collect(),
        );
        let evaluator = ScheduleEvaluator::new(1);
        let after = utc(2024, 1, 1, 0, 0);
        assert_eq!(
            evaluator.next_occurrence(&spec, after).unwrap(),
            Occurrence::NotFound {
                searched_until: utc(2025, 1, 1, 0, 0)
            }
        );
    }

    #[test]
    fn test_huge_lookahead_is_an_overflow_error() {
        let spec = ScheduleSpec::cron("0 0 * * *");
        let after = utc(2024, 1, 1, 0, 0);
        for years in [400_000_000, u32::MAX] {
            assert_eq!(
                ScheduleEvaluator::new(years).next_occurrence(&spec, after),
                Err(ScheduleError::Overflow)
            );
        }
    }

    #[test]
    fn test_day_31_never_found_in_february_only_schedule() {
        let spec = ScheduleSpec::cron("0 0 31 2 *");
        assert!(matches!(
            next_occurrence(&spec, utc(2024, 1, 1, 0, 0)).unwrap(),
            Occurrence::NotFound { .. }
        ));
    }

    #[test]
    fn test_last_day_of_month_schedule() {
        let spec = ScheduleSpec::calendar(CalendarRule::monthly(-1, slots(&["23:00"])));
        let list = upcoming(&spec, utc(2024, 1, 31, 23, 0), 2).unwrap();
        assert_eq!(list, vec![utc(2024, 2, 29, 23, 0), utc(2024, 3, 31, 23, 0)]);
    }

    #[test]
    fn test_configuration_errors() {
        let bad_cron = ScheduleSpec::cron("61 * * * *");
        assert!(matches!(
            next_occurrence(&bad_cron, utc(2024, 1, 1, 0, 0)),
            Err(ScheduleError::Config(ConfigError::InvalidCron { .. }))
        ));

        let bad_tz = ScheduleSpec::cron("0 * * * *").with_timezone("Mars/Olympus");
        assert!(matches!(
            next_occurrence(&bad_tz, utc(2024, 1, 1, 0, 0)),
            Err(ScheduleError::Config(ConfigError::InvalidTimezone(_)))
        ));

        let mut both = ScheduleSpec::cron("0 * * * *");
        both.calendar = Some(CalendarRule::daily(slots(&["06:00"])));
        assert!(matches!(
            next_occurrence(&both, utc(2024, 1, 1, 0, 0)),
            Err(ScheduleError::Config(ConfigError::NonExclusive { .. }))
        ));

        let mut neither = ScheduleSpec::default();
        neither.calendar = None;
        assert!(matches!(
            next_occurrence(&neither, utc(2024, 1, 1, 0, 0)),
            Err(ScheduleError::Config(ConfigError::MissingPayload { .. }))
        ));
    }

    #[test]
    fn test_default_schedule_is_daily_midnight_utc() {
        let next = next_occurrence(&ScheduleSpec::default(), utc(2024, 1, 15, 10, 0)).unwrap();
        assert_eq!(at(next), utc(2024, 1, 16, 0, 0));
    }
}
