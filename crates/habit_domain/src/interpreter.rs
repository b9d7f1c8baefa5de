//! Natural-language recurrence phrases.
//!
//! The goal parser only talks to [`RecurrenceInterpreter`]; [`PhraseInterpreter`]
//! is the built-in English implementation of it.

use chrono::{Datelike, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::incremental::number_word;
use crate::recurrence::{format_by_day, format_rule_date, Frequency};

/// Normalised output of an interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpretedRule {
    pub freq: Frequency,
    pub interval: u32,
    /// Stored form of the by-day set, e.g. `MO,WE,FR`.
    pub by_day: Option<String>,
    /// Explicit start date as `YYYYMMDD`.
    pub dtstart: Option<String>,
    /// RFC 5545 text. Only carries a `DTSTART:` line when a start date was given.
    pub rule_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpretError {
    #[error("`{0}` does not describe a recurrence")]
    NotRecurring(String),
    #[error("unrecognised word `{0}`")]
    UnknownWord(String),
    #[error("unrecognised date `{0}`")]
    InvalidDate(String),
}

pub trait RecurrenceInterpreter: Send + Sync {
    /// `today` is the user's local date, used for relative dates and missing years.
    fn interpret(&self, text: &str, today: NaiveDate) -> Result<InterpretedRule, InterpretError>;
}

static ORDINAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})(?:st|nd|rd|th)$").expect("ordinal pattern"));
static ORDINAL_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})(?:st|nd|rd|th)\b").expect("ordinal suffix pattern"));

const START_WORDS: &[&str] = &["starting", "beginning", "from", "start"];
const END_WORDS: &[&str] = &["until", "till", "through", "ending"];
const FILLER_WORDS: &[&str] = &["and", "&", "on", "the", "of", "a", "at"];
const WEEKDAYS: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

/// Understands phrases like "every other day", "every mon wed and fri starting
/// jan 7 2013" or "every month on the 15th until dec 1".
#[derive(Debug, Clone, Copy, Default)]
pub struct PhraseInterpreter;

impl RecurrenceInterpreter for PhraseInterpreter {
    fn interpret(&self, text: &str, today: NaiveDate) -> Result<InterpretedRule, InterpretError> {
        let normalized = text.to_lowercase().replace([',', '.'], " ");
        let tokens: Vec<&str> = normalized.split_whitespace().collect();
        if tokens.first() != Some(&"every") {
            return Err(InterpretError::NotRecurring(text.to_string()));
        }

        let start_at = tokens.iter().position(|t| START_WORDS.contains(t));
        let end_at = tokens.iter().position(|t| END_WORDS.contains(t));
        let boundaries = [start_at, end_at];
        let segment = |keyword: Option<usize>| {
            keyword.map(|at| {
                let stop = boundaries
                    .iter()
                    .flatten()
                    .copied()
                    .filter(|other| *other > at)
                    .min()
                    .unwrap_or(tokens.len());
                tokens[at + 1..stop].join(" ")
            })
        };
        let cadence_end = boundaries
            .iter()
            .flatten()
            .copied()
            .min()
            .unwrap_or(tokens.len());

        let cadence = Cadence::parse(&tokens[1..cadence_end])
            .ok_or_else(|| InterpretError::NotRecurring(text.to_string()))??;

        let dtstart = segment(start_at)
            .map(|date| parse_date(&date, today).ok_or(InterpretError::InvalidDate(date)))
            .transpose()?;
        let until = segment(end_at)
            .map(|date| parse_date(&date, today).ok_or(InterpretError::InvalidDate(date)))
            .transpose()?;

        let mut rrule = format!(
            "RRULE:FREQ={};INTERVAL={}",
            cadence.freq.as_str().to_ascii_uppercase(),
            cadence.interval
        );
        let by_day = (!cadence.by_day.is_empty()).then(|| format_by_day(&cadence.by_day));
        if let Some(days) = &by_day {
            rrule.push_str(&format!(";BYDAY={days}"));
        }
        if !cadence.by_month_day.is_empty() {
            let days: Vec<String> = cadence.by_month_day.iter().map(u32::to_string).collect();
            rrule.push_str(&format!(";BYMONTHDAY={}", days.join(",")));
        }
        if let Some(until) = until {
            rrule.push_str(&format!(";UNTIL={}", format_rule_date(until)));
        }

        let dtstart = dtstart.map(format_rule_date);
        let rule_text = match &dtstart {
            Some(start) => format!("DTSTART:{start}\n{rrule}"),
            None => rrule,
        };

        Ok(InterpretedRule {
            freq: cadence.freq,
            interval: cadence.interval,
            by_day,
            dtstart,
            rule_text,
        })
    }
}

struct Cadence {
    freq: Frequency,
    interval: u32,
    by_day: Vec<Weekday>,
    by_month_day: Vec<u32>,
}

impl Cadence {
    /// `None` when no frequency could be found at all.
    fn parse(tokens: &[&str]) -> Option<Result<Self, InterpretError>> {
        let mut freq: Option<Frequency> = None;
        let mut interval: Option<u32> = None;
        let mut by_day: Vec<Weekday> = Vec::new();
        let mut by_month_day: Vec<u32> = Vec::new();

        for token in tokens.iter().copied() {
            if FILLER_WORDS.contains(&token) {
                continue;
            }
            if let Some(unit) = unit_word(token) {
                match freq {
                    // "every month on day 15"
                    Some(Frequency::Monthly) if unit == Frequency::Daily => continue,
                    Some(existing) if existing != unit => {
                        return Some(Err(InterpretError::UnknownWord(token.to_string())))
                    }
                    _ => freq = Some(unit),
                }
                continue;
            }
            if let Some(day) = weekday_word(token) {
                by_day.push(day);
                freq.get_or_insert(Frequency::Weekly);
                continue;
            }
            match token {
                "weekday" | "weekdays" => {
                    by_day.extend(WEEKDAYS);
                    freq.get_or_insert(Frequency::Weekly);
                    continue;
                }
                "weekend" | "weekends" => {
                    by_day.extend([Weekday::Sat, Weekday::Sun]);
                    freq.get_or_insert(Frequency::Weekly);
                    continue;
                }
                "other" if interval.is_none() && freq.is_none() => {
                    interval = Some(2);
                    continue;
                }
                _ => {}
            }
            if let Some(caps) = ORDINAL.captures(token) {
                let day = caps[1].parse::<u32>().ok().filter(|d| (1..=31).contains(d));
                let Some(day) = day else {
                    return Some(Err(InterpretError::UnknownWord(token.to_string())));
                };
                by_month_day.push(day);
                freq.get_or_insert(Frequency::Monthly);
                continue;
            }
            let amount = token.parse::<u32>().ok().or_else(|| number_word(token));
            match (amount, freq) {
                (Some(n), None) if interval.is_none() && n > 0 => interval = Some(n),
                (Some(n), Some(Frequency::Monthly)) if (1..=31).contains(&n) => {
                    by_month_day.push(n)
                }
                _ => return Some(Err(InterpretError::UnknownWord(token.to_string()))),
            }
        }

        let freq = freq?;
        if freq == Frequency::Yearly && !by_day.is_empty() {
            return Some(Err(InterpretError::UnknownWord("year".to_string())));
        }
        by_day.sort_by_key(|day| day.num_days_from_monday());
        by_day.dedup();
        by_month_day.sort_unstable();
        by_month_day.dedup();

        Some(Ok(Self {
            freq,
            interval: interval.unwrap_or(1),
            by_day,
            by_month_day,
        }))
    }
}

fn unit_word(token: &str) -> Option<Frequency> {
    match token {
        "day" | "days" | "daily" => Some(Frequency::Daily),
        "week" | "weeks" | "weekly" => Some(Frequency::Weekly),
        "month" | "months" | "monthly" => Some(Frequency::Monthly),
        "year" | "years" | "yearly" | "annually" => Some(Frequency::Yearly),
        "hour" | "hours" | "hourly" => Some(Frequency::Hourly),
        "minute" | "minutes" | "min" | "mins" => Some(Frequency::Minutely),
        "second" | "seconds" | "sec" | "secs" => Some(Frequency::Secondly),
        _ => None,
    }
}

fn weekday_word(token: &str) -> Option<Weekday> {
    let singular = token.strip_suffix('s').filter(|s| s.len() >= 3).unwrap_or(token);
    match singular {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tues" | "tuesday" => Some(Weekday::Tue),
        "wed" | "weds" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thur" | "thurs" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

fn parse_date(segment: &str, today: NaiveDate) -> Option<NaiveDate> {
    let cleaned = ORDINAL_SUFFIX.replace_all(segment, "$1");
    let cleaned = cleaned.trim();
    let cleaned = cleaned.strip_prefix("on ").unwrap_or(cleaned).trim();

    match cleaned {
        "today" => return Some(today),
        "tomorrow" => return today.succ_opt(),
        _ => {}
    }
    for format in ["%Y-%m-%d", "%m/%d/%Y", "%b %d %Y", "%d %b %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(cleaned, format) {
            return Some(date);
        }
    }
    let with_year = format!("{cleaned} {}", today.year());
    ["%b %d %Y", "%d %b %Y", "%m/%d %Y"]
        .into_iter()
        .find_map(|format| NaiveDate::parse_from_str(&with_year, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2013, 1, 1).unwrap()
    }

    fn interpret(text: &str) -> Result<InterpretedRule, InterpretError> {
        PhraseInterpreter.interpret(text, today())
    }

    #[test]
    fn simple_units() {
        let rule = interpret("every day").unwrap();
        assert_eq!(rule.freq, Frequency::Daily);
        assert_eq!(rule.interval, 1);
        assert_eq!(rule.dtstart, None);
        assert_eq!(rule.rule_text, "RRULE:FREQ=DAILY;INTERVAL=1");

        assert_eq!(interpret("every week").unwrap().freq, Frequency::Weekly);
        assert_eq!(interpret("Every Year").unwrap().freq, Frequency::Yearly);
    }

    #[test]
    fn intervals() {
        assert_eq!(interpret("every other day").unwrap().interval, 2);
        assert_eq!(interpret("every 3 days").unwrap().interval, 3);
        let rule = interpret("every three weeks").unwrap();
        assert_eq!((rule.freq, rule.interval), (Frequency::Weekly, 3));
    }

    #[test]
    fn weekday_lists_with_a_start_date() {
        let rule = interpret("every mon wed and fri starting jan 7 2013").unwrap();
        assert_eq!(rule.freq, Frequency::Weekly);
        assert_eq!(rule.by_day.as_deref(), Some("MO,WE,FR"));
        assert_eq!(rule.dtstart.as_deref(), Some("20130107"));
        assert_eq!(
            rule.rule_text,
            "DTSTART:20130107\nRRULE:FREQ=WEEKLY;INTERVAL=1;BYDAY=MO,WE,FR"
        );

        let spelled = interpret("every Friday, Monday and Wednesday").unwrap();
        assert_eq!(spelled.by_day.as_deref(), Some("MO,WE,FR"));

        let other = interpret("every other tuesday").unwrap();
        assert_eq!((other.interval, other.by_day.as_deref()), (2, Some("TU")));
    }

    #[test]
    fn weekdays_and_weekends() {
        assert_eq!(
            interpret("every weekday").unwrap().by_day.as_deref(),
            Some("MO,TU,WE,TH,FR")
        );
        assert_eq!(
            interpret("every weekend").unwrap().by_day.as_deref(),
            Some("SA,SU")
        );
    }

    #[test]
    fn month_days() {
        let rule = interpret("every month on the 1st").unwrap();
        assert_eq!(rule.freq, Frequency::Monthly);
        assert_eq!(rule.rule_text, "RRULE:FREQ=MONTHLY;INTERVAL=1;BYMONTHDAY=1");
        assert!(interpret("every month on day 15")
            .unwrap()
            .rule_text
            .ends_with("BYMONTHDAY=15"));
        assert_eq!(
            interpret("every month on monday").unwrap().rule_text,
            "RRULE:FREQ=MONTHLY;INTERVAL=1;BYDAY=MO"
        );
    }

    #[test]
    fn start_and_end_dates() {
        let rule = interpret("every day starting tomorrow until march 1st, 2013").unwrap();
        assert_eq!(rule.dtstart.as_deref(), Some("20130102"));
        assert!(rule.rule_text.ends_with(";UNTIL=20130301"));

        let no_year = interpret("every week from jan 7").unwrap();
        assert_eq!(no_year.dtstart.as_deref(), Some("20130107"));

        let iso = interpret("every day starting on 2013-02-03").unwrap();
        assert_eq!(iso.dtstart.as_deref(), Some("20130203"));
    }

    #[test]
    fn reports_sub_daily_frequencies() {
        assert_eq!(interpret("every hour").unwrap().freq, Frequency::Hourly);
        assert_eq!(interpret("every 5 minutes").unwrap().freq, Frequency::Minutely);
        assert_eq!(interpret("every second").unwrap().freq, Frequency::Secondly);
    }

    #[test]
    fn rejects_nonsense() {
        assert!(matches!(
            interpret("every banana"),
            Err(InterpretError::UnknownWord(_))
        ));
        assert!(matches!(
            interpret("daily"),
            Err(InterpretError::NotRecurring(_))
        ));
        assert!(matches!(
            interpret("every"),
            Err(InterpretError::NotRecurring(_))
        ));
        assert!(matches!(
            interpret("every day starting someday"),
            Err(InterpretError::InvalidDate(_))
        ));
    }
}
