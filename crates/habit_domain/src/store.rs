//! Persistence boundary.
//!
//! The scheduling core only needs the capabilities in [`GoalStore`]. Two
//! implementations ship with the crate: [`InMemoryStore`] and [`JsonFileStore`],
//! which keeps the same state in a JSON file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{
    error::StoreError,
    goal::{Goal, GoalId, NewGoal, UserId, UserProfile},
    instance::{InstanceId, NewInstance, ScheduledInstance},
};

pub trait GoalStore: Send + Sync {
    fn all_goals(&self) -> Result<Vec<Goal>, StoreError>;
    /// A user's goals, oldest first.
    fn goals_for_user(&self, user_id: UserId) -> Result<Vec<Goal>, StoreError>;
    fn goal(&self, id: GoalId) -> Result<Option<Goal>, StoreError>;
    fn insert_goal(&self, goal: NewGoal, created_at: DateTime<Utc>) -> Result<Goal, StoreError>;
    fn update_goal(&self, goal: &Goal) -> Result<(), StoreError>;
    /// Removes the goal together with its instances.
    fn delete_goal(&self, id: GoalId) -> Result<bool, StoreError>;

    /// A goal's instances ordered by date, oldest first.
    fn instances_for_goal(&self, goal_id: GoalId) -> Result<Vec<ScheduledInstance>, StoreError>;
    fn instance(&self, id: InstanceId) -> Result<Option<ScheduledInstance>, StoreError>;
    /// Fails with [`StoreError::Duplicate`] if the goal already has an instance on that date.
    fn insert_instance(&self, instance: NewInstance) -> Result<ScheduledInstance, StoreError>;
    /// Stores every instance whose (goal, date) is still free in one write and
    /// returns the ones that were added. Taken dates are skipped.
    fn insert_instances(
        &self,
        instances: Vec<NewInstance>,
    ) -> Result<Vec<ScheduledInstance>, StoreError>;
    fn update_instance(&self, instance: &ScheduledInstance) -> Result<(), StoreError>;

    fn profile(&self, user_id: UserId) -> Result<Option<UserProfile>, StoreError>;
    fn save_profile(&self, profile: UserProfile) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct StoreState {
    next_goal_id: GoalId,
    next_instance_id: InstanceId,
    goals: BTreeMap<GoalId, Goal>,
    instances: BTreeMap<InstanceId, ScheduledInstance>,
    profiles: BTreeMap<UserId, UserProfile>,
}

impl StoreState {
    fn all_goals(&self) -> Vec<Goal> {
        self.goals.values().cloned().collect()
    }

    fn goals_for_user(&self, user_id: UserId) -> Vec<Goal> {
        let mut goals: Vec<Goal> = self
            .goals
            .values()
            .filter(|goal| goal.user_id == user_id)
            .cloned()
            .collect();
        goals.sort_by_key(|goal| (goal.created_at, goal.id));
        goals
    }

    fn insert_goal(&mut self, goal: NewGoal, created_at: DateTime<Utc>) -> Goal {
        self.next_goal_id += 1;
        let goal = Goal::from_new(self.next_goal_id, goal, created_at);
        self.goals.insert(goal.id, goal.clone());
        goal
    }

    fn update_goal(&mut self, goal: &Goal) {
        if let Some(existing) = self.goals.get_mut(&goal.id) {
            *existing = goal.clone();
        }
    }

    fn delete_goal(&mut self, id: GoalId) -> bool {
        if self.goals.remove(&id).is_none() {
            return false;
        }
        self.instances.retain(|_, instance| instance.goal_id != id);
        true
    }

    fn instances_for_goal(&self, goal_id: GoalId) -> Vec<ScheduledInstance> {
        let mut instances: Vec<ScheduledInstance> = self
            .instances
            .values()
            .filter(|instance| instance.goal_id == goal_id)
            .cloned()
            .collect();
        instances.sort_by_key(|instance| instance.date);
        instances
    }

    fn insert_instance(&mut self, new: NewInstance) -> Result<ScheduledInstance, StoreError> {
        let duplicate = self
            .instances
            .values()
            .any(|existing| existing.goal_id == new.goal_id && existing.date == new.date);
        if duplicate {
            return Err(StoreError::Duplicate {
                goal_id: new.goal_id,
                date: new.date,
            });
        }
        self.next_instance_id += 1;
        let instance = ScheduledInstance::from_new(self.next_instance_id, new);
        self.instances.insert(instance.id, instance.clone());
        Ok(instance)
    }

    fn insert_instances(&mut self, instances: Vec<NewInstance>) -> Vec<ScheduledInstance> {
        instances
            .into_iter()
            .filter_map(|new| match self.insert_instance(new) {
                Ok(instance) => Some(instance),
                Err(err) => {
                    tracing::trace!(%err, "instance already scheduled");
                    None
                }
            })
            .collect()
    }

    fn update_instance(&mut self, instance: &ScheduledInstance) {
        if let Some(existing) = self.instances.get_mut(&instance.id) {
            *existing = instance.clone();
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GoalStore for InMemoryStore {
    fn all_goals(&self) -> Result<Vec<Goal>, StoreError> {
        Ok(self.state.read().all_goals())
    }

    fn goals_for_user(&self, user_id: UserId) -> Result<Vec<Goal>, StoreError> {
        Ok(self.state.read().goals_for_user(user_id))
    }

    fn goal(&self, id: GoalId) -> Result<Option<Goal>, StoreError> {
        Ok(self.state.read().goals.get(&id).cloned())
    }

    fn insert_goal(&self, goal: NewGoal, created_at: DateTime<Utc>) -> Result<Goal, StoreError> {
        Ok(self.state.write().insert_goal(goal, created_at))
    }

    fn update_goal(&self, goal: &Goal) -> Result<(), StoreError> {
        self.state.write().update_goal(goal);
        Ok(())
    }

    fn delete_goal(&self, id: GoalId) -> Result<bool, StoreError> {
        Ok(self.state.write().delete_goal(id))
    }

    fn instances_for_goal(&self, goal_id: GoalId) -> Result<Vec<ScheduledInstance>, StoreError> {
        Ok(self.state.read().instances_for_goal(goal_id))
    }

    fn instance(&self, id: InstanceId) -> Result<Option<ScheduledInstance>, StoreError> {
        Ok(self.state.read().instances.get(&id).cloned())
    }

    fn insert_instance(&self, instance: NewInstance) -> Result<ScheduledInstance, StoreError> {
        self.state.write().insert_instance(instance)
    }

    fn insert_instances(
        &self,
        instances: Vec<NewInstance>,
    ) -> Result<Vec<ScheduledInstance>, StoreError> {
        Ok(self.state.write().insert_instances(instances))
    }

    fn update_instance(&self, instance: &ScheduledInstance) -> Result<(), StoreError> {
        self.state.write().update_instance(instance);
        Ok(())
    }

    fn profile(&self, user_id: UserId) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.state.read().profiles.get(&user_id).cloned())
    }

    fn save_profile(&self, profile: UserProfile) -> Result<(), StoreError> {
        self.state.write().profiles.insert(profile.user_id, profile);
        Ok(())
    }
}

/// Store backed by a single JSON document, rewritten after every change.
/// Batched instance inserts are written once per batch.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    state: RwLock<StoreState>,
}

impl JsonFileStore {
    /// Loads `path`, or starts empty if it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                StoreState::default()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            StoreState::default()
        };
        tracing::debug!(path = %path.display(), goals = state.goals.len(), "opened goal store");
        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `change` to a copy of the state and swaps it in once the copy
    /// is on disk. A failed change or write leaves memory and file as they were.
    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut StoreState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut state = self.state.write();
        let mut staged = state.clone();
        let outcome = change(&mut staged)?;
        self.persist(&staged)?;
        *state = staged;
        Ok(outcome)
    }

    fn persist(&self, state: &StoreState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, serde_json::to_vec_pretty(state)?)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

impl GoalStore for JsonFileStore {
    fn all_goals(&self) -> Result<Vec<Goal>, StoreError> {
        Ok(self.state.read().all_goals())
    }

    fn goals_for_user(&self, user_id: UserId) -> Result<Vec<Goal>, StoreError> {
        Ok(self.state.read().goals_for_user(user_id))
    }

    fn goal(&self, id: GoalId) -> Result<Option<Goal>, StoreError> {
        Ok(self.state.read().goals.get(&id).cloned())
    }

    fn insert_goal(&self, goal: NewGoal, created_at: DateTime<Utc>) -> Result<Goal, StoreError> {
        self.mutate(|state| Ok(state.insert_goal(goal, created_at)))
    }

    fn update_goal(&self, goal: &Goal) -> Result<(), StoreError> {
        self.mutate(|state| {
            state.update_goal(goal);
            Ok(())
        })
    }

    fn delete_goal(&self, id: GoalId) -> Result<bool, StoreError> {
        self.mutate(|state| Ok(state.delete_goal(id)))
    }

    fn instances_for_goal(&self, goal_id: GoalId) -> Result<Vec<ScheduledInstance>, StoreError> {
        Ok(self.state.read().instances_for_goal(goal_id))
    }

    fn instance(&self, id: InstanceId) -> Result<Option<ScheduledInstance>, StoreError> {
        Ok(self.state.read().instances.get(&id).cloned())
    }

    fn insert_instance(&self, instance: NewInstance) -> Result<ScheduledInstance, StoreError> {
        self.mutate(|state| state.insert_instance(instance))
    }

    fn insert_instances(
        &self,
        instances: Vec<NewInstance>,
    ) -> Result<Vec<ScheduledInstance>, StoreError> {
        let mut state = self.state.write();
        let mut staged = state.clone();
        let inserted = staged.insert_instances(instances);
        if inserted.is_empty() {
            return Ok(inserted);
        }
        self.persist(&staged)?;
        *state = staged;
        Ok(inserted)
    }

    fn update_instance(&self, instance: &ScheduledInstance) -> Result<(), StoreError> {
        self.mutate(|state| {
            state.update_instance(instance);
            Ok(())
        })
    }

    fn profile(&self, user_id: UserId) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.state.read().profiles.get(&user_id).cloned())
    }

    fn save_profile(&self, profile: UserProfile) -> Result<(), StoreError> {
        self.mutate(|state| {
            state.profiles.insert(profile.user_id, profile);
            Ok(())
        })
    }
}
