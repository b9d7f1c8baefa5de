use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::goal::{Goal, GoalId};

pub type InstanceId = u64;

/// An occurrence the scheduler wants stored. Unique per (goal, date).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewInstance {
    pub goal_id: GoalId,
    pub date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduledInstance {
    pub id: InstanceId,
    pub goal_id: GoalId,
    pub date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub completed: bool,
    pub current_progress: u32,
    pub skipped: bool,
}

impl ScheduledInstance {
    pub fn from_new(id: InstanceId, new: NewInstance) -> Self {
        Self {
            id,
            goal_id: new.goal_id,
            date: new.date,
            due_date: new.due_date,
            completed: false,
            current_progress: 0,
            skipped: false,
        }
    }

    /// Whether the instance's window `[date, due_date)` contains `instant`.
    pub fn covers(&self, instant: DateTime<Utc>) -> bool {
        self.date <= instant && instant < self.due_date
    }

    /// Records one completion event.
    ///
    /// Progress stops at the goal's amount; calls after completion leave the
    /// instance unchanged. Returns whether anything changed.
    pub fn progress(&mut self, goal: &Goal) -> bool {
        let required = goal.required_progress();
        if self.completed || self.current_progress >= required {
            return false;
        }
        self.current_progress += 1;
        self.completed = self.current_progress == required;
        true
    }

    pub fn skip(&mut self) {
        self.skipped = true;
    }

    /// Directly sets the completion state, as when correcting past history.
    pub fn set_completed(&mut self, goal: &Goal, completed: bool) {
        self.completed = completed;
        self.current_progress = if completed {
            goal.required_progress()
        } else {
            0
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::NewGoal;
    use chrono::{Duration, TimeZone};

    fn goal(incremental: bool, goal_amount: u32) -> Goal {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        Goal::from_new(
            1,
            NewGoal {
                user_id: 1,
                creation_text: "Stretch every day".into(),
                description: "Stretch".into(),
                rrule: "DTSTART:20240101\nRRULE:FREQ=DAILY;INTERVAL=1".into(),
                dtstart: start,
                freq: None,
                byday: None,
                incremental,
                goal_amount,
            },
            start,
        )
    }

    fn instance() -> ScheduledInstance {
        let date = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        ScheduledInstance::from_new(
            10,
            NewInstance {
                goal_id: 1,
                date,
                due_date: date + Duration::days(1),
            },
        )
    }

    #[test]
    fn single_progress_completes_plain_goals() {
        let goal = goal(false, 0);
        let mut instance = instance();
        assert!(instance.progress(&goal));
        assert!(instance.completed);
        assert_eq!(instance.current_progress, 1);
        assert!(!instance.progress(&goal));
        assert_eq!(instance.current_progress, 1);
    }

    #[test]
    fn incremental_goals_complete_at_the_amount_and_clamp() {
        let goal = goal(true, 3);
        let mut instance = instance();
        instance.progress(&goal);
        instance.progress(&goal);
        assert!(!instance.completed);
        assert_eq!(instance.current_progress, 2);
        instance.progress(&goal);
        assert!(instance.completed);
        assert!(!instance.progress(&goal));
        assert_eq!(instance.current_progress, 3);
    }

    #[test]
    fn set_completed_rewrites_progress() {
        let goal = goal(true, 4);
        let mut instance = instance();
        instance.set_completed(&goal, true);
        assert_eq!((instance.completed, instance.current_progress), (true, 4));
        instance.set_completed(&goal, false);
        assert_eq!((instance.completed, instance.current_progress), (false, 0));
    }

    #[test]
    fn window_is_half_open() {
        let instance = instance();
        assert!(instance.covers(instance.date));
        assert!(!instance.covers(instance.due_date));
        assert!(!instance.covers(instance.date - Duration::seconds(1)));
    }
}
