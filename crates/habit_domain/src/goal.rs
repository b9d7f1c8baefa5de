use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    error::{HabitError, Result},
    incremental::incremental_count,
    interpreter::RecurrenceInterpreter,
    recurrence::{format_rule_date, Frequency, RecurrenceRule},
    timezone::{beginning_of_today, local_midnight, local_today},
};

pub type GoalId = u64;
pub type UserId = u64;

pub const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";

const NOT_RECURRING: &str = "not a recurring rule or not valid input";

static EVERY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bevery\b").expect("every pattern"));

/// The slice of a user's profile the scheduling core reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub user_id: UserId,
    pub timezone: String,
}

impl UserProfile {
    pub fn new(user_id: UserId, timezone: impl Into<String>) -> Self {
        Self {
            user_id,
            timezone: timezone.into(),
        }
    }

    /// The stored IANA zone, or UTC if it does not parse.
    pub fn tz(&self) -> Tz {
        self.timezone.parse::<Tz>().unwrap_or_else(|_| {
            tracing::warn!(
                user_id = self.user_id,
                timezone = %self.timezone,
                "unknown timezone, using UTC"
            );
            Tz::UTC
        })
    }
}

/// A parsed goal that has not been stored yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewGoal {
    pub user_id: UserId,
    pub creation_text: String,
    pub description: String,
    pub rrule: String,
    pub dtstart: DateTime<Utc>,
    pub freq: Option<Frequency>,
    pub byday: Option<String>,
    pub incremental: bool,
    pub goal_amount: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Goal {
    pub id: GoalId,
    pub user_id: UserId,
    pub creation_text: String,
    pub description: String,
    pub rrule: String,
    pub dtstart: DateTime<Utc>,
    pub freq: Option<Frequency>,
    pub byday: Option<String>,
    pub incremental: bool,
    pub goal_amount: u32,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    pub fn from_new(id: GoalId, new: NewGoal, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: new.user_id,
            creation_text: new.creation_text,
            description: new.description,
            rrule: new.rrule,
            dtstart: new.dtstart,
            freq: new.freq,
            byday: new.byday,
            incremental: new.incremental,
            goal_amount: new.goal_amount,
            created_at,
        }
    }

    pub fn rule(&self) -> std::result::Result<RecurrenceRule, crate::recurrence::RuleError> {
        RecurrenceRule::parse(&self.rrule)
    }

    /// Progress events needed before an instance counts as completed.
    pub fn required_progress(&self) -> u32 {
        if self.incremental {
            self.goal_amount.max(1)
        } else {
            1
        }
    }
}

/// Turns free text like "Go to the gym 3 times every week" into a [`NewGoal`].
pub struct GoalParser<'a> {
    interpreter: &'a dyn RecurrenceInterpreter,
}

impl<'a> GoalParser<'a> {
    pub fn new(interpreter: &'a dyn RecurrenceInterpreter) -> Self {
        Self { interpreter }
    }

    pub fn parse(
        &self,
        raw_text: &str,
        profile: &UserProfile,
        now: DateTime<Utc>,
    ) -> Result<NewGoal> {
        let creation_text = raw_text
            .trim()
            .trim_end_matches(|c: char| c.is_ascii_punctuation())
            .trim_end()
            .to_string();

        let every = EVERY
            .find(&creation_text)
            .ok_or_else(|| HabitError::invalid("could not find the word 'every'"))?;
        let description = creation_text[..every.start()].trim().to_string();
        let clause = creation_text[every.start()..].trim();

        let count = incremental_count(&description)?;

        let tz = profile.tz();
        let interpreted = self
            .interpreter
            .interpret(clause, local_today(tz, now))
            .map_err(|err| {
                tracing::debug!(%err, clause, "interpreter rejected recurrence clause");
                HabitError::invalid(NOT_RECURRING)
            })?;
        if interpreted.freq.is_sub_daily() {
            return Err(HabitError::invalid(NOT_RECURRING));
        }

        let dtstart = match interpreted.dtstart.as_deref() {
            Some(raw) => {
                let date = NaiveDate::parse_from_str(raw, "%Y%m%d")
                    .map_err(|_| HabitError::invalid(NOT_RECURRING))?;
                local_midnight(tz, date)
            }
            None => beginning_of_today(tz, now),
        };
        let rrule = with_dtstart(&interpreted.rule_text, dtstart.with_timezone(&tz).date_naive());

        // The stored rule must be one the scheduler can evaluate.
        RecurrenceRule::parse(&rrule).map_err(|err| {
            tracing::debug!(%err, %rrule, "normalised rule does not evaluate");
            HabitError::invalid(NOT_RECURRING)
        })?;

        Ok(NewGoal {
            user_id: profile.user_id,
            creation_text,
            description,
            rrule,
            dtstart,
            freq: Some(interpreted.freq),
            byday: interpreted.by_day,
            incremental: count.is_some(),
            goal_amount: count.unwrap_or(0),
        })
    }
}

fn with_dtstart(rule_text: &str, start: NaiveDate) -> String {
    let trimmed = rule_text.trim();
    if trimmed.to_ascii_uppercase().starts_with("DTSTART") {
        trimmed.to_string()
    } else {
        format!("DTSTART:{}\n{}", format_rule_date(start), trimmed)
    }
}
