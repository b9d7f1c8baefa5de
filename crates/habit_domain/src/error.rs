use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{goal::GoalId, instance::InstanceId};

#[derive(Debug, Error)]
pub enum HabitError {
    /// Rejected goal text. The message is meant to be shown to the user as-is.
    #[error("{0}")]
    InvalidInput(String),
    #[error("goal {0} does not exist")]
    UnknownGoal(GoalId),
    #[error("scheduled instance {0} does not exist")]
    UnknownInstance(InstanceId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl HabitError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("goal {goal_id} already has an instance on {date}")]
    Duplicate { goal_id: GoalId, date: DateTime<Utc> },
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store file is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = HabitError> = std::result::Result<T, E>;
