use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::{
    error::{HabitError, Result},
    goal::{Goal, GoalId, GoalParser, UserId, UserProfile, DEFAULT_TIMEZONE},
    instance::{InstanceId, ScheduledInstance},
    interpreter::{PhraseInterpreter, RecurrenceInterpreter},
    scheduler, status,
    status::GoalInstance,
    store::{GoalStore, InMemoryStore},
    timezone::{beginning_of_today, Clock, SystemClock},
};

/// How many occurrences ahead each goal is kept scheduled.
pub const DEFAULT_HORIZON: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GoalStreak {
    pub goal: Goal,
    pub cadence: String,
    pub streak: u32,
}

pub struct HabitService {
    store: Arc<dyn GoalStore>,
    interpreter: Box<dyn RecurrenceInterpreter>,
    clock: Box<dyn Clock>,
    default_tz: Tz,
    horizon: usize,
}

pub struct HabitServiceBuilder {
    store: Option<Arc<dyn GoalStore>>,
    interpreter: Box<dyn RecurrenceInterpreter>,
    clock: Box<dyn Clock>,
    default_tz: Tz,
    horizon: usize,
}

impl Default for HabitServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HabitServiceBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            interpreter: Box::new(PhraseInterpreter),
            clock: Box::new(SystemClock),
            default_tz: DEFAULT_TIMEZONE.parse().unwrap_or(Tz::UTC),
            horizon: DEFAULT_HORIZON,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn GoalStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_interpreter(mut self, interpreter: Box<dyn RecurrenceInterpreter>) -> Self {
        self.interpreter = interpreter;
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Timezone for users that have no stored profile.
    pub fn with_default_timezone(mut self, tz: Tz) -> Self {
        self.default_tz = tz;
        self
    }

    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon.max(1);
        self
    }

    pub fn build(self) -> HabitService {
        HabitService {
            store: self
                .store
                .unwrap_or_else(|| Arc::new(InMemoryStore::new())),
            interpreter: self.interpreter,
            clock: self.clock,
            default_tz: self.default_tz,
            horizon: self.horizon,
        }
    }
}

impl HabitService {
    pub fn builder() -> HabitServiceBuilder {
        HabitServiceBuilder::new()
    }

    pub fn store(&self) -> &Arc<dyn GoalStore> {
        &self.store
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn profile(&self, user_id: UserId) -> Result<UserProfile> {
        Ok(self
            .store
            .profile(user_id)?
            .unwrap_or_else(|| UserProfile::new(user_id, self.default_tz.name())))
    }

    pub fn set_timezone(&self, user_id: UserId, timezone: &str) -> Result<()> {
        timezone
            .parse::<Tz>()
            .map_err(|_| HabitError::invalid(format!("unknown timezone {timezone}")))?;
        self.store
            .save_profile(UserProfile::new(user_id, timezone))?;
        Ok(())
    }

    /// Local midnight of the user's current day, in UTC.
    pub fn today_start(&self, user_id: UserId) -> Result<DateTime<Utc>> {
        Ok(beginning_of_today(self.profile(user_id)?.tz(), self.clock.now()))
    }

    /// Parses `text`, stores the goal and schedules its first occurrences.
    /// Nothing is stored if the text is rejected, and the goal is removed again
    /// if its first occurrences cannot be stored.
    pub fn create_goal(&self, user_id: UserId, text: &str) -> Result<Goal> {
        let profile = self.profile(user_id)?;
        let now = self.clock.now();
        let parsed = GoalParser::new(self.interpreter.as_ref()).parse(text, &profile, now)?;
        let goal = self.store.insert_goal(parsed, now)?;
        let scheduled = scheduler::create_scheduled_instances(
            self.store.as_ref(),
            &goal,
            profile.tz(),
            now,
            self.horizon,
        );
        let created = match scheduled {
            Ok(created) => created,
            Err(err) => {
                if let Err(cleanup) = self.store.delete_goal(goal.id) {
                    tracing::warn!(
                        goal_id = goal.id,
                        %cleanup,
                        "could not remove unscheduled goal"
                    );
                }
                return Err(err);
            }
        };
        tracing::info!(goal_id = goal.id, user_id, created, "goal created");
        Ok(goal)
    }

    pub fn goals(&self, user_id: UserId) -> Result<Vec<Goal>> {
        Ok(self.store.goals_for_user(user_id)?)
    }

    pub fn goals_for_today(&self, user_id: UserId) -> Result<Vec<GoalInstance>> {
        status::goals_for_today(self.store.as_ref(), user_id, self.today_start(user_id)?, false)
    }

    pub fn completed_goals_for_today(&self, user_id: UserId) -> Result<Vec<GoalInstance>> {
        status::goals_for_today(self.store.as_ref(), user_id, self.today_start(user_id)?, true)
    }

    pub fn skipped_goals_for_today(&self, user_id: UserId) -> Result<Vec<GoalInstance>> {
        status::skipped_goals_for_today(self.store.as_ref(), user_id, self.today_start(user_id)?)
    }

    pub fn progress(&self, user_id: UserId, instance_id: InstanceId) -> Result<ScheduledInstance> {
        let (goal, mut instance) = self.owned_instance(user_id, instance_id)?;
        if instance.progress(&goal) {
            self.store.update_instance(&instance)?;
        }
        Ok(instance)
    }

    pub fn skip(&self, user_id: UserId, instance_id: InstanceId) -> Result<ScheduledInstance> {
        let (_, mut instance) = self.owned_instance(user_id, instance_id)?;
        instance.skip();
        self.store.update_instance(&instance)?;
        Ok(instance)
    }

    /// Corrects the history of a single instance.
    pub fn set_completed(
        &self,
        user_id: UserId,
        instance_id: InstanceId,
        completed: bool,
    ) -> Result<ScheduledInstance> {
        let (goal, mut instance) = self.owned_instance(user_id, instance_id)?;
        instance.set_completed(&goal, completed);
        self.store.update_instance(&instance)?;
        Ok(instance)
    }

    pub fn current_streak(&self, user_id: UserId, goal_id: GoalId) -> Result<u32> {
        let goal = self.owned_goal(user_id, goal_id)?;
        let instances = self.store.instances_for_goal(goal.id)?;
        Ok(status::current_streak(&instances, self.today_start(user_id)?))
    }

    pub fn missed_instances(
        &self,
        user_id: UserId,
        goal_id: GoalId,
    ) -> Result<Vec<ScheduledInstance>> {
        let goal = self.owned_goal(user_id, goal_id)?;
        let instances = self.store.instances_for_goal(goal.id)?;
        Ok(status::missed_instances(&instances, self.today_start(user_id)?))
    }

    pub fn day_string(&self, user_id: UserId, goal_id: GoalId) -> Result<String> {
        Ok(status::day_string(&self.owned_goal(user_id, goal_id)?))
    }

    /// Every goal of the user with its cadence and current streak.
    pub fn streaks(&self, user_id: UserId) -> Result<Vec<GoalStreak>> {
        let today_start = self.today_start(user_id)?;
        self.store
            .goals_for_user(user_id)?
            .into_iter()
            .map(|goal| -> Result<GoalStreak> {
                let instances = self.store.instances_for_goal(goal.id)?;
                Ok(GoalStreak {
                    cadence: status::day_string(&goal),
                    streak: status::current_streak(&instances, today_start),
                    goal,
                })
            })
            .collect()
    }

    /// Changes only the description; the recurrence stays as parsed.
    pub fn edit_description(
        &self,
        user_id: UserId,
        goal_id: GoalId,
        description: &str,
    ) -> Result<Goal> {
        let mut goal = self.owned_goal(user_id, goal_id)?;
        goal.description = description.trim().to_string();
        self.store.update_goal(&goal)?;
        Ok(goal)
    }

    pub fn delete_goal(&self, user_id: UserId, goal_id: GoalId) -> Result<()> {
        let goal = self.owned_goal(user_id, goal_id)?;
        self.store.delete_goal(goal.id)?;
        tracing::info!(goal_id, user_id, "goal deleted");
        Ok(())
    }

    /// Keeps every goal scheduled `horizon` occurrences ahead of now.
    pub fn extend_schedules(&self) -> Result<usize> {
        scheduler::create_all_scheduled_instances(
            self.store.as_ref(),
            self.clock.now(),
            self.horizon,
            self.default_tz,
        )
    }
}

impl HabitService {
    fn owned_goal(&self, user_id: UserId, goal_id: GoalId) -> Result<Goal> {
        self.store
            .goal(goal_id)?
            .filter(|goal| goal.user_id == user_id)
            .ok_or(HabitError::UnknownGoal(goal_id))
    }

    fn owned_instance(
        &self,
        user_id: UserId,
        instance_id: InstanceId,
    ) -> Result<(Goal, ScheduledInstance)> {
        let instance = self
            .store
            .instance(instance_id)?
            .ok_or(HabitError::UnknownInstance(instance_id))?;
        let goal = self
            .owned_goal(user_id, instance.goal_id)
            .map_err(|_| HabitError::UnknownInstance(instance_id))?;
        Ok((goal, instance))
    }
}
