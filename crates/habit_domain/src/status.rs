//! Read-side views over a goal's instance history: what is due today, streaks,
//! missed occurrences and a readable cadence.
//!
//! `today_start` is always the user's local midnight from
//! [`crate::timezone::beginning_of_today`].

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    goal::{Goal, UserId},
    instance::ScheduledInstance,
    store::GoalStore,
};

/// How many past-due instances the catch-up list shows.
pub const MISSED_HISTORY: usize = 7;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GoalInstance {
    pub goal: Goal,
    pub instance: ScheduledInstance,
}

/// Today's instance of each of the user's goals that is (`done = true`) or is
/// not yet (`done = false`) completed. Skipped instances are left out.
pub fn goals_for_today(
    store: &dyn GoalStore,
    user_id: UserId,
    today_start: DateTime<Utc>,
    done: bool,
) -> Result<Vec<GoalInstance>> {
    todays_instances(store, user_id, today_start, |instance| {
        !instance.skipped && instance.completed == done
    })
}

pub fn skipped_goals_for_today(
    store: &dyn GoalStore,
    user_id: UserId,
    today_start: DateTime<Utc>,
) -> Result<Vec<GoalInstance>> {
    todays_instances(store, user_id, today_start, |instance| instance.skipped)
}

fn todays_instances(
    store: &dyn GoalStore,
    user_id: UserId,
    today_start: DateTime<Utc>,
    keep: impl Fn(&ScheduledInstance) -> bool,
) -> Result<Vec<GoalInstance>> {
    let mut entries = Vec::new();
    for goal in store.goals_for_user(user_id)? {
        let instances = store.instances_for_goal(goal.id)?;
        let latest = instances
            .into_iter()
            .rev()
            .find(|instance| instance.covers(today_start) && keep(instance));
        if let Some(instance) = latest {
            entries.push(GoalInstance { goal, instance });
        }
    }
    Ok(entries)
}

/// Consecutive completed instances counting back from today.
///
/// `instances` must be ordered oldest first, as the store returns them.
/// Skipped instances neither count nor break the run. An instance that is
/// still open today does not break it either.
pub fn current_streak(instances: &[ScheduledInstance], today_start: DateTime<Utc>) -> u32 {
    let mut streak = 0;
    for instance in instances
        .iter()
        .rev()
        .filter(|instance| instance.date <= today_start)
    {
        if instance.completed {
            streak += 1;
        } else if instance.skipped {
            continue;
        } else if instance.date < today_start {
            break;
        }
    }
    streak
}

/// The most recent instances whose window has closed, newest first.
pub fn missed_instances(
    instances: &[ScheduledInstance],
    today_start: DateTime<Utc>,
) -> Vec<ScheduledInstance> {
    instances
        .iter()
        .rev()
        .filter(|instance| instance.due_date <= today_start)
        .take(MISSED_HISTORY)
        .cloned()
        .collect()
}

/// Human-readable cadence, e.g. "Every other day" or "Monday, Wednesday, Friday".
/// Empty if the goal's rule cannot be read.
pub fn day_string(goal: &Goal) -> String {
    let Ok(rule) = goal.rule() else {
        return String::new();
    };

    if !rule.by_month_day().is_empty() {
        let days: Vec<String> = rule.by_month_day().iter().map(i32::to_string).collect();
        return format!("Every month (day {})", days.join(", "));
    }

    if rule.by_day().is_empty() {
        let unit = rule.frequency().unit();
        return match rule.interval() {
            1 => format!("Every {unit}"),
            2 => format!("Every other {unit}"),
            n => format!("Every {n} {unit}s"),
        };
    }

    let mut days = rule.by_day().to_vec();
    days.sort_by_key(|day| day.num_days_from_monday());
    days.dedup();
    if days == [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri] {
        return "Weekdays".to_string();
    }
    rule.by_day()
        .iter()
        .map(|day| weekday_name(*day))
        .collect::<Vec<_>>()
        .join(", ")
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::NewGoal;
    use crate::instance::NewInstance;
    use crate::store::InMemoryStore;
    use chrono::{Duration, TimeZone};

    fn today() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, 7, 0, 0).unwrap()
    }

    fn daily(offset: i64) -> ScheduledInstance {
        let date = today() + Duration::days(offset);
        ScheduledInstance::from_new(
            (offset + 100) as u64,
            NewInstance {
                goal_id: 1,
                date,
                due_date: date + Duration::days(1),
            },
        )
    }

    fn done(offset: i64) -> ScheduledInstance {
        let mut instance = daily(offset);
        instance.completed = true;
        instance
    }

    fn skipped(offset: i64) -> ScheduledInstance {
        let mut instance = daily(offset);
        instance.skipped = true;
        instance
    }

    fn goal_with_rule(rrule: &str) -> Goal {
        Goal::from_new(
            1,
            NewGoal {
                user_id: 1,
                creation_text: String::new(),
                description: "Habit".into(),
                rrule: rrule.into(),
                dtstart: today(),
                freq: None,
                byday: None,
                incremental: false,
                goal_amount: 0,
            },
            today(),
        )
    }

    #[test]
    fn streak_counts_today_when_completed() {
        let mut history: Vec<_> = (-5..=-1).map(done).collect();
        history.push(done(0));
        history.push(daily(1));
        assert_eq!(current_streak(&history, today()), 6);
    }

    #[test]
    fn an_open_instance_today_does_not_break_the_streak() {
        let mut history: Vec<_> = (-5..=-1).map(done).collect();
        history.push(daily(0));
        assert_eq!(current_streak(&history, today()), 5);
    }

    #[test]
    fn skips_are_transparent_and_misses_end_the_run() {
        let history = vec![
            done(-6),
            daily(-5),
            done(-4),
            skipped(-3),
            done(-2),
            done(-1),
            done(0),
        ];
        assert_eq!(current_streak(&history, today()), 4);
        assert_eq!(current_streak(&[], today()), 0);
    }

    #[test]
    fn missed_instances_are_the_last_seven_closed_ones() {
        let history: Vec<_> = (-10..=2).map(daily).collect();
        let missed = missed_instances(&history, today());
        assert_eq!(missed.len(), MISSED_HISTORY);
        assert_eq!(missed[0].date, today() - Duration::days(1));
        assert_eq!(missed[6].date, today() - Duration::days(7));
    }

    #[test]
    fn today_lists_split_by_state() {
        let store = InMemoryStore::new();
        let rule = "DTSTART:20240520\nRRULE:FREQ=DAILY;INTERVAL=1";
        let mut ids = Vec::new();
        for description in ["Walk", "Read", "Floss"] {
            let new = NewGoal {
                user_id: 1,
                creation_text: format!("{description} every day"),
                description: description.into(),
                rrule: rule.into(),
                dtstart: today(),
                freq: None,
                byday: None,
                incremental: false,
                goal_amount: 0,
            };
            let stored = store.insert_goal(new, today()).unwrap();
            for offset in [-1, 0, 1] {
                let date = today() + Duration::days(offset);
                store
                    .insert_instance(NewInstance {
                        goal_id: stored.id,
                        date,
                        due_date: date + Duration::days(1),
                    })
                    .unwrap();
            }
            ids.push(stored.id);
        }

        let todays = |goal_id| {
            store
                .instances_for_goal(goal_id)
                .unwrap()
                .into_iter()
                .find(|instance| instance.date == today())
                .unwrap()
        };
        let mut read = todays(ids[1]);
        read.completed = true;
        store.update_instance(&read).unwrap();
        let mut floss = todays(ids[2]);
        floss.skip();
        store.update_instance(&floss).unwrap();

        let pending = goals_for_today(&store, 1, today(), false).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].goal.description, "Walk");
        assert_eq!(pending[0].instance.date, today());

        let completed = goals_for_today(&store, 1, today(), true).unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].goal.description, "Read");

        let skipped = skipped_goals_for_today(&store, 1, today()).unwrap();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].goal.description, "Floss");

        assert!(goals_for_today(&store, 2, today(), false).unwrap().is_empty());
    }

    #[test]
    fn day_strings() {
        let cases = [
            ("DTSTART:20240101\nRRULE:FREQ=WEEKLY;BYDAY=MO,WE,FR", "Monday, Wednesday, Friday"),
            ("DTSTART:20240101\nRRULE:FREQ=WEEKLY;BYDAY=MO,TU,WE,TH,FR", "Weekdays"),
            ("DTSTART:20240101\nRRULE:FREQ=MONTHLY;BYMONTHDAY=1", "Every month (day 1)"),
            ("DTSTART:20240101\nRRULE:FREQ=DAILY;INTERVAL=1", "Every day"),
            ("DTSTART:20240101\nRRULE:FREQ=DAILY;INTERVAL=2", "Every other day"),
            ("DTSTART:20240101\nRRULE:FREQ=DAILY;INTERVAL=3", "Every 3 days"),
            ("DTSTART:20240101\nRRULE:FREQ=WEEKLY;INTERVAL=1", "Every week"),
            ("RRULE:FREQ=DAILY", ""),
            ("garbage", ""),
        ];
        for (rrule, expected) in cases {
            assert_eq!(day_string(&goal_with_rule(rrule)), expected, "{rrule}");
        }
    }
}
