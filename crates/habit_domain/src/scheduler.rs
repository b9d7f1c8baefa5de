//! Turns a goal's recurrence rule into stored, dated instances.
//!
//! Scheduling is idempotent: instances are unique per (goal, date) and the
//! store skips dates that are already taken, so overlapping windows can be
//! scheduled any number of times.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tracing::instrument;

use crate::{
    error::{HabitError, Result},
    goal::{Goal, UserId},
    instance::NewInstance,
    recurrence::RecurrenceRule,
    store::GoalStore,
    timezone::localize,
};

pub fn rule_for(goal: &Goal) -> Result<RecurrenceRule> {
    goal.rule().map_err(|err| {
        HabitError::invalid(format!("goal {} has an unusable rule: {err}", goal.id))
    })
}

/// The next `count` occurrences, starting with the first match strictly after
/// `start - 1 day`. An exact match at `start` is therefore the first result.
///
/// The day is subtracted on the owner's wall clock, so a window that starts
/// right after a DST change does not reach back into the previous local day.
/// Fewer dates come back only when the rule ends (UNTIL or COUNT) inside the
/// window.
pub fn generate(
    goal: &Goal,
    tz: Tz,
    start: DateTime<Utc>,
    count: usize,
) -> Result<Vec<DateTime<Utc>>> {
    Ok(occurrences(&rule_for(goal)?, tz, start, count))
}

/// When an occurrence of `goal` stops being completable.
pub fn due_date_for(goal: &Goal, tz: Tz, occurrence: DateTime<Utc>) -> Result<DateTime<Utc>> {
    Ok(rule_for(goal)?.due_date_in(occurrence, tz))
}

fn occurrences(
    rule: &RecurrenceRule,
    tz: Tz,
    start: DateTime<Utc>,
    count: usize,
) -> Vec<DateTime<Utc>> {
    let mut dates = Vec::with_capacity(count);
    let local_start = start.with_timezone(&tz).naive_local();
    let mut cursor = localize(tz, local_start - Duration::days(1));
    while dates.len() < count {
        let Some(next) = rule.next_after_in(cursor, tz) else {
            break;
        };
        dates.push(next);
        cursor = next;
    }
    dates
}

/// Stores the next `count` instances of `goal`. Returns how many were new.
pub fn create_scheduled_instances(
    store: &dyn GoalStore,
    goal: &Goal,
    tz: Tz,
    start: DateTime<Utc>,
    count: usize,
) -> Result<usize> {
    let rule = rule_for(goal)?;
    let instances = occurrences(&rule, tz, start, count)
        .into_iter()
        .map(|date| NewInstance {
            goal_id: goal.id,
            date,
            due_date: rule.due_date_in(date, tz),
        })
        .collect();
    Ok(store.insert_instances(instances)?.len())
}

/// Extends every goal's schedule `count` occurrences past `start`.
///
/// Goals are evaluated in their owner's timezone, `default_tz` for owners
/// without a profile. A goal whose stored rule no longer evaluates is logged
/// and skipped so it cannot stall the batch.
#[instrument(skip(store))]
pub fn create_all_scheduled_instances(
    store: &dyn GoalStore,
    start: DateTime<Utc>,
    count: usize,
    default_tz: Tz,
) -> Result<usize> {
    let mut zones: HashMap<UserId, Tz> = HashMap::new();
    let mut created = 0;
    for goal in store.all_goals()? {
        let tz = match zones.get(&goal.user_id) {
            Some(tz) => *tz,
            None => {
                let tz = store
                    .profile(goal.user_id)?
                    .map(|profile| profile.tz())
                    .unwrap_or(default_tz);
                zones.insert(goal.user_id, tz);
                tz
            }
        };
        match create_scheduled_instances(store, &goal, tz, start, count) {
            Ok(new) => created += new,
            Err(HabitError::InvalidInput(reason)) => {
                tracing::warn!(goal_id = goal.id, %reason, "skipping goal");
            }
            Err(err) => return Err(err),
        }
    }
    tracing::info!(created, "scheduled instances extended");
    Ok(created)
}
