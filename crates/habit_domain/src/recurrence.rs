//! A small RFC 5545 recurrence evaluator.
//!
//! Supported rule parts are FREQ, INTERVAL, BYDAY, BYMONTHDAY, UNTIL, COUNT and
//! `WKST=MO`. Any other part is rejected rather than ignored.
//!
//! Rules are stored as text (`DTSTART:20130107` followed by an `RRULE:` line) and
//! evaluated in naive local time. Callers holding UTC instants use the `*_in`
//! methods, which convert through the goal owner's timezone.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::timezone::localize;

/// Upper bound on how many rule periods are scanned before giving up. Only
/// reached by rules that can never match, e.g. `BYMONTHDAY=31;INTERVAL=12`
/// anchored in February.
const MAX_PERIODS: usize = 2_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn is_sub_daily(self) -> bool {
        matches!(self, Self::Secondly | Self::Minutely | Self::Hourly)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Secondly => "secondly",
            Self::Minutely => "minutely",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    /// Singular noun for the period, as used in "every other week".
    pub fn unit(self) -> &'static str {
        match self {
            Self::Secondly => "second",
            Self::Minutely => "minute",
            Self::Hourly => "hour",
            Self::Daily => "day",
            Self::Weekly => "week",
            Self::Monthly => "month",
            Self::Yearly => "year",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = RuleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "secondly" => Ok(Self::Secondly),
            "minutely" => Ok(Self::Minutely),
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(RuleError::UnknownFrequency(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("rule has no DTSTART line")]
    MissingStart,
    #[error("rule has no FREQ")]
    MissingFrequency,
    #[error("unknown frequency `{0}`")]
    UnknownFrequency(String),
    #[error("{0} rules are not supported")]
    SubDaily(Frequency),
    #[error("invalid date `{0}`")]
    InvalidDate(String),
    #[error("invalid interval `{0}`")]
    InvalidInterval(String),
    #[error("invalid weekday `{0}`")]
    InvalidWeekday(String),
    #[error("invalid month day `{0}`")]
    InvalidMonthDay(String),
    #[error("BYDAY is not supported for yearly rules")]
    YearlyByDay,
    #[error("invalid count `{0}`")]
    InvalidCount(String),
    #[error("COUNT and UNTIL cannot both be set")]
    CountWithUntil,
    #[error("unsupported rule part `{0}`")]
    UnsupportedPart(String),
}

pub fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

pub fn parse_weekday_code(code: &str) -> Option<Weekday> {
    match code.trim().to_ascii_uppercase().as_str() {
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        "SU" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Formats a by-day set the way it is stored on a goal, e.g. `MO,WE,FR`.
pub fn format_by_day(days: &[Weekday]) -> String {
    days.iter()
        .map(|day| weekday_code(*day))
        .collect::<Vec<_>>()
        .join(",")
}

/// `YYYYMMDD`, the date form used in DTSTART and UNTIL.
pub fn format_rule_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

pub fn parse_rule_date(value: &str) -> Result<NaiveDateTime, RuleError> {
    let trimmed = value.trim().trim_end_matches('Z');
    if trimmed.contains('T') {
        return NaiveDateTime::parse_from_str(trimmed, "%Y%m%dT%H%M%S")
            .map_err(|_| RuleError::InvalidDate(value.to_string()));
    }
    if trimmed.len() != 8 {
        return Err(RuleError::InvalidDate(value.to_string()));
    }
    NaiveDate::parse_from_str(trimmed, "%Y%m%d")
        .map(|date| date.and_time(Default::default()))
        .map_err(|_| RuleError::InvalidDate(value.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    dtstart: NaiveDateTime,
    freq: Frequency,
    interval: u32,
    by_day: Vec<Weekday>,
    by_month_day: Vec<i32>,
    until: Option<NaiveDateTime>,
    count: Option<u32>,
}

impl RecurrenceRule {
    pub fn parse(text: &str) -> Result<Self, RuleError> {
        let mut dtstart = None;
        let mut freq = None;
        let mut interval = 1;
        let mut by_day = Vec::new();
        let mut by_month_day = Vec::new();
        let mut until = None;
        let mut count = None;

        for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
            let upper = line.to_ascii_uppercase();
            if upper.starts_with("DTSTART") {
                // DTSTART;TZID=...:20130107 carries the value after the last colon.
                let value = line.rsplit(':').next().unwrap_or_default();
                dtstart = Some(parse_rule_date(value)?);
                continue;
            }
            let body = upper.strip_prefix("RRULE:").unwrap_or(&upper);
            if !body.contains("FREQ=") {
                continue;
            }
            for part in body.split(';').filter(|part| !part.is_empty()) {
                let Some((key, value)) = part.split_once('=') else {
                    return Err(RuleError::UnsupportedPart(part.to_string()));
                };
                match key.trim() {
                    "FREQ" => freq = Some(value.parse::<Frequency>()?),
                    "INTERVAL" => {
                        interval = value
                            .trim()
                            .parse::<u32>()
                            .ok()
                            .filter(|n| *n > 0)
                            .ok_or_else(|| RuleError::InvalidInterval(value.to_string()))?;
                    }
                    "BYDAY" => {
                        by_day = value
                            .split(',')
                            .map(|code| {
                                parse_weekday_code(code)
                                    .ok_or_else(|| RuleError::InvalidWeekday(code.to_string()))
                            })
                            .collect::<Result<Vec<_>, _>>()?;
                    }
                    "BYMONTHDAY" => {
                        by_month_day = value
                            .split(',')
                            .map(|day| {
                                day.trim()
                                    .parse::<i32>()
                                    .ok()
                                    .filter(|n| *n != 0 && (-31..=31).contains(n))
                                    .ok_or_else(|| RuleError::InvalidMonthDay(day.to_string()))
                            })
                            .collect::<Result<Vec<_>, _>>()?;
                    }
                    "UNTIL" => until = Some(parse_rule_date(value)?),
                    "COUNT" => {
                        count = Some(
                            value
                                .trim()
                                .parse::<u32>()
                                .ok()
                                .filter(|n| *n > 0)
                                .ok_or_else(|| RuleError::InvalidCount(value.to_string()))?,
                        );
                    }
                    // Weeks already start on Monday.
                    "WKST" if value.trim() == "MO" => {}
                    _ => return Err(RuleError::UnsupportedPart(part.to_string())),
                }
            }
        }

        let dtstart = dtstart.ok_or(RuleError::MissingStart)?;
        let freq = freq.ok_or(RuleError::MissingFrequency)?;
        if freq.is_sub_daily() {
            return Err(RuleError::SubDaily(freq));
        }
        if freq == Frequency::Yearly && !by_day.is_empty() {
            return Err(RuleError::YearlyByDay);
        }
        if count.is_some() && until.is_some() {
            return Err(RuleError::CountWithUntil);
        }

        Ok(Self {
            dtstart,
            freq,
            interval,
            by_day,
            by_month_day,
            until,
            count,
        })
    }

    pub fn dtstart(&self) -> NaiveDateTime {
        self.dtstart
    }

    pub fn frequency(&self) -> Frequency {
        self.freq
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn by_day(&self) -> &[Weekday] {
        &self.by_day
    }

    pub fn by_month_day(&self) -> &[i32] {
        &self.by_month_day
    }

    pub fn until(&self) -> Option<NaiveDateTime> {
        self.until
    }

    pub fn count(&self) -> Option<u32> {
        self.count
    }

    /// Weekly or monthly rules restricted to particular weekdays. Their
    /// instances expire the day after they occur rather than at the next match.
    pub fn has_by_day_schedule(&self) -> bool {
        matches!(self.freq, Frequency::Weekly | Frequency::Monthly) && !self.by_day.is_empty()
    }

    /// First occurrence strictly after `after`, in naive local time.
    pub fn next_after(&self, after: NaiveDateTime) -> Option<NaiveDateTime> {
        let Some(count) = self.count else {
            return self.next_match_after(after);
        };
        // Counted rules are walked from the start so the limit is honoured.
        let mut cursor = self.dtstart - Duration::seconds(1);
        for _ in 0..count {
            let next = self.next_match_after(cursor)?;
            if next > after {
                return Some(next);
            }
            cursor = next;
        }
        None
    }

    fn next_match_after(&self, after: NaiveDateTime) -> Option<NaiveDateTime> {
        let interval = i64::from(self.interval);
        let elapsed = self.period_of(after.date()).max(0);
        let mut period = elapsed - elapsed % interval;

        for _ in 0..MAX_PERIODS {
            for date in self.dates_in_period(period) {
                let candidate = date.and_time(self.dtstart.time());
                if candidate < self.dtstart || candidate <= after {
                    continue;
                }
                if self.until.is_some_and(|until| candidate > until) {
                    return None;
                }
                return Some(candidate);
            }
            period += interval;
        }
        None
    }

    /// [`Self::next_after`] for a UTC instant, evaluated in `tz`.
    pub fn next_after_in(&self, after: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        let local = after.with_timezone(&tz).naive_local();
        self.next_after(local).map(|next| localize(tz, next))
    }

    /// The instant at which `occurrence` counts as missed.
    ///
    /// By-day weekly and monthly rules expire one local day after the
    /// occurrence. Everything else expires at the next match, or one day later
    /// when the rule has run out.
    pub fn due_date_in(&self, occurrence: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
        let local = occurrence.with_timezone(&tz).naive_local();
        let next_day = || localize(tz, local + Duration::days(1));
        if self.has_by_day_schedule() {
            return next_day();
        }
        self.next_after(local)
            .map(|next| localize(tz, next))
            .unwrap_or_else(next_day)
    }

    fn period_of(&self, at: NaiveDate) -> i64 {
        let start = self.dtstart.date();
        match self.freq {
            Frequency::Daily => (at - start).num_days(),
            Frequency::Weekly => (monday_of(at) - monday_of(start)).num_days() / 7,
            Frequency::Monthly => {
                i64::from(at.year() - start.year()) * 12 + i64::from(at.month())
                    - i64::from(start.month())
            }
            Frequency::Yearly => i64::from(at.year() - start.year()),
            _ => 0,
        }
    }

    fn dates_in_period(&self, period: i64) -> Vec<NaiveDate> {
        let start = self.dtstart.date();
        match self.freq {
            Frequency::Daily => start
                .checked_add_signed(Duration::days(period))
                .filter(|date| self.matches_by_day(*date))
                .into_iter()
                .collect(),
            Frequency::Weekly => {
                if self.by_day.is_empty() {
                    return start
                        .checked_add_signed(Duration::weeks(period))
                        .into_iter()
                        .collect();
                }
                let week_start = monday_of(start) + Duration::weeks(period);
                let mut offsets: Vec<i64> = self
                    .by_day
                    .iter()
                    .map(|day| i64::from(day.num_days_from_monday()))
                    .collect();
                offsets.sort_unstable();
                offsets.dedup();
                offsets
                    .into_iter()
                    .map(|offset| week_start + Duration::days(offset))
                    .collect()
            }
            Frequency::Monthly => {
                let Some((year, month)) = add_months(start, period) else {
                    return Vec::new();
                };
                self.days_in(year, month, start.day())
            }
            Frequency::Yearly => {
                let Ok(year) = i32::try_from(i64::from(start.year()) + period) else {
                    return Vec::new();
                };
                self.days_in(year, start.month(), start.day())
            }
            _ => Vec::new(),
        }
    }

    fn days_in(&self, year: i32, month: u32, default_day: u32) -> Vec<NaiveDate> {
        let last = days_in_month(year, month);
        let mut days: Vec<u32> = if !self.by_month_day.is_empty() {
            self.by_month_day
                .iter()
                .filter_map(|day| {
                    let resolved = if *day > 0 {
                        day.unsigned_abs()
                    } else {
                        (last + 1).checked_sub(day.unsigned_abs())?
                    };
                    (1..=last).contains(&resolved).then_some(resolved)
                })
                .collect()
        } else if !self.by_day.is_empty() {
            (1..=last).collect()
        } else if default_day <= last {
            vec![default_day]
        } else {
            Vec::new()
        };
        days.sort_unstable();
        days.dedup();
        days.into_iter()
            .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
            .filter(|date| self.matches_by_day(*date))
            .collect()
    }

    fn matches_by_day(&self, date: NaiveDate) -> bool {
        self.by_day.is_empty() || self.by_day.contains(&date.weekday())
    }
}

fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

fn add_months(start: NaiveDate, months: i64) -> Option<(i32, u32)> {
    let total = i64::from(start.year()) * 12 + i64::from(start.month0()) + months;
    let year = i32::try_from(total.div_euclid(12)).ok()?;
    let month = u32::try_from(total.rem_euclid(12)).ok()? + 1;
    Some((year, month))
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn rule(text: &str) -> RecurrenceRule {
        RecurrenceRule::parse(text).expect("rule parses")
    }

    #[test]
    fn weekly_by_day_walks_the_listed_days() {
        let rule = rule("DTSTART:20130107\nRRULE:FREQ=WEEKLY;INTERVAL=1;BYDAY=MO,WE,FR");
        assert!(rule.has_by_day_schedule());
        assert_eq!(rule.next_after(at(2013, 1, 6)), Some(at(2013, 1, 7)));
        assert_eq!(rule.next_after(at(2013, 1, 7)), Some(at(2013, 1, 9)));
        assert_eq!(rule.next_after(at(2013, 1, 11)), Some(at(2013, 1, 14)));
    }

    #[test]
    fn start_date_bounds_the_first_week() {
        // 2013-01-09 is a Wednesday; Monday of that week is before DTSTART.
        let rule = rule("DTSTART:20130109\nRRULE:FREQ=WEEKLY;BYDAY=MO,WE");
        assert_eq!(rule.next_after(at(2013, 1, 1)), Some(at(2013, 1, 9)));
        assert_eq!(rule.next_after(at(2013, 1, 9)), Some(at(2013, 1, 14)));
    }

    #[test]
    fn intervals_skip_whole_periods() {
        let every_other_day = rule("DTSTART:20240101\nRRULE:FREQ=DAILY;INTERVAL=2");
        assert_eq!(every_other_day.next_after(at(2024, 1, 1)), Some(at(2024, 1, 3)));
        assert_eq!(every_other_day.next_after(at(2024, 1, 2)), Some(at(2024, 1, 3)));

        let fortnightly = rule("DTSTART:20240101\nRRULE:FREQ=WEEKLY;INTERVAL=2;BYDAY=TU");
        assert_eq!(fortnightly.next_after(at(2024, 1, 1)), Some(at(2024, 1, 2)));
        assert_eq!(fortnightly.next_after(at(2024, 1, 2)), Some(at(2024, 1, 16)));
        assert_eq!(fortnightly.next_after(at(2024, 1, 20)), Some(at(2024, 1, 30)));
    }

    #[test]
    fn months_without_the_day_are_skipped() {
        let by_month_day = rule("DTSTART:20240131\nRRULE:FREQ=MONTHLY;BYMONTHDAY=31");
        assert_eq!(by_month_day.next_after(at(2024, 1, 31)), Some(at(2024, 3, 31)));

        let anchored = rule("DTSTART:20240131\nRRULE:FREQ=MONTHLY");
        assert_eq!(anchored.next_after(at(2024, 2, 1)), Some(at(2024, 3, 31)));

        let last_day = rule("DTSTART:20240101\nRRULE:FREQ=MONTHLY;BYMONTHDAY=-1");
        assert_eq!(last_day.next_after(at(2024, 2, 1)), Some(at(2024, 2, 29)));
    }

    #[test]
    fn until_ends_the_rule() {
        let rule = rule("DTSTART:20240101\nRRULE:FREQ=DAILY;UNTIL=20240103");
        assert_eq!(rule.next_after(at(2024, 1, 2)), Some(at(2024, 1, 3)));
        assert_eq!(rule.next_after(at(2024, 1, 3)), None);
    }

    #[test]
    fn count_limits_the_number_of_occurrences() {
        let rule = rule("DTSTART:20130107\nRRULE:FREQ=WEEKLY;BYDAY=MO,FR;COUNT=3");
        assert_eq!(rule.count(), Some(3));
        assert_eq!(rule.next_after(at(2013, 1, 1)), Some(at(2013, 1, 7)));
        assert_eq!(rule.next_after(at(2013, 1, 7)), Some(at(2013, 1, 11)));
        assert_eq!(rule.next_after(at(2013, 1, 11)), Some(at(2013, 1, 14)));
        assert_eq!(rule.next_after(at(2013, 1, 14)), None);
    }

    #[test]
    fn monthly_by_day_matches_every_listed_weekday() {
        // 2024-01-01 is a Monday.
        let mondays = rule("DTSTART:20240101\nRRULE:FREQ=MONTHLY;BYDAY=MO");
        assert!(mondays.has_by_day_schedule());
        assert_eq!(mondays.next_after(at(2024, 1, 1)), Some(at(2024, 1, 8)));
        assert_eq!(mondays.next_after(at(2024, 1, 29)), Some(at(2024, 2, 5)));

        let every_other = rule("DTSTART:20240101\nRRULE:FREQ=MONTHLY;INTERVAL=2;BYDAY=MO");
        assert_eq!(every_other.next_after(at(2024, 1, 29)), Some(at(2024, 3, 4)));
    }

    #[test]
    fn rejects_malformed_rules() {
        assert_eq!(
            RecurrenceRule::parse("RRULE:FREQ=DAILY"),
            Err(RuleError::MissingStart)
        );
        assert_eq!(
            RecurrenceRule::parse("DTSTART:20240101\nRRULE:FREQ=HOURLY"),
            Err(RuleError::SubDaily(Frequency::Hourly))
        );
        assert!(matches!(
            RecurrenceRule::parse("DTSTART:20240101\nRRULE:FREQ=DAILY;INTERVAL=0"),
            Err(RuleError::InvalidInterval(_))
        ));
        assert!(matches!(
            RecurrenceRule::parse("DTSTART:20240101\nRRULE:FREQ=WEEKLY;BYDAY=1MO"),
            Err(RuleError::InvalidWeekday(_))
        ));
        assert!(matches!(
            RecurrenceRule::parse("DTSTART:20240101\nRRULE:FREQ=DAILY;COUNT=0"),
            Err(RuleError::InvalidCount(_))
        ));
        assert_eq!(
            RecurrenceRule::parse("DTSTART:20240101\nRRULE:FREQ=DAILY;COUNT=2;UNTIL=20240110"),
            Err(RuleError::CountWithUntil)
        );
        for part in ["BYSETPOS=-1", "BYMONTH=3", "WKST=SU", "BYHOUR"] {
            let text = format!("DTSTART:20240101\nRRULE:FREQ=MONTHLY;BYDAY=MO;{part}");
            assert_eq!(
                RecurrenceRule::parse(&text),
                Err(RuleError::UnsupportedPart(part.to_string())),
                "{part}"
            );
        }
        assert!(RecurrenceRule::parse("DTSTART:20240101\nRRULE:FREQ=WEEKLY;WKST=MO").is_ok());
    }

    #[test]
    fn evaluates_in_the_owner_timezone_across_dst() {
        let daily = rule("DTSTART:20240301\nRRULE:FREQ=DAILY");
        let tz = America::Los_Angeles;
        // 2024-03-10 00:00 PST; the clocks spring forward later that night.
        let occurrence = Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap();
        assert_eq!(
            daily.next_after_in(occurrence, tz),
            Some(Utc.with_ymd_and_hms(2024, 3, 11, 7, 0, 0).unwrap())
        );
        // 04:00 PST on the 15th of January is still before local midnight of the 16th.
        let after = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(
            daily.next_after_in(after, tz),
            Some(Utc.with_ymd_and_hms(2024, 1, 16, 8, 0, 0).unwrap())
        );
    }

    #[test]
    fn due_dates_follow_the_by_day_override() {
        let tz = America::Los_Angeles;
        let monday = Utc.with_ymd_and_hms(2013, 1, 7, 8, 0, 0).unwrap();

        let by_day = rule("DTSTART:20130107\nRRULE:FREQ=WEEKLY;BYDAY=MO,FR");
        assert_eq!(by_day.due_date_in(monday, tz), monday + Duration::days(1));

        let weekly = rule("DTSTART:20130107\nRRULE:FREQ=WEEKLY");
        assert_eq!(weekly.due_date_in(monday, tz), monday + Duration::days(7));

        let every_three_days = rule("DTSTART:20130107\nRRULE:FREQ=DAILY;INTERVAL=3");
        assert_eq!(
            every_three_days.due_date_in(monday, tz),
            monday + Duration::days(3)
        );

        let ended = rule("DTSTART:20130107\nRRULE:FREQ=WEEKLY;UNTIL=20130107");
        assert_eq!(ended.due_date_in(monday, tz), monday + Duration::days(1));

        let counted = rule("DTSTART:20130107\nRRULE:FREQ=DAILY;COUNT=1");
        assert_eq!(counted.due_date_in(monday, tz), monday + Duration::days(1));
    }

    #[test]
    fn monthly_by_day_instances_are_due_the_next_day() {
        let tz = America::Los_Angeles;
        let mondays = rule("DTSTART:20240101\nRRULE:FREQ=MONTHLY;BYDAY=MO");
        let monday = Utc.with_ymd_and_hms(2024, 1, 8, 8, 0, 0).unwrap();
        assert_eq!(mondays.due_date_in(monday, tz), monday + Duration::days(1));
        // The last Monday of January stays due one day, not until February's first.
        let last = Utc.with_ymd_and_hms(2024, 1, 29, 8, 0, 0).unwrap();
        assert_eq!(mondays.due_date_in(last, tz), last + Duration::days(1));

        let by_month_day = rule("DTSTART:20240101\nRRULE:FREQ=MONTHLY;BYMONTHDAY=1");
        let first = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        assert_eq!(
            by_month_day.due_date_in(first, tz),
            Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap()
        );
    }
}
