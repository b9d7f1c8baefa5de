pub mod error;
pub mod goal;
pub mod incremental;
pub mod instance;
pub mod interpreter;
pub mod recurrence;
pub mod scheduler;
pub mod service;
pub mod status;
pub mod store;
pub mod timezone;

pub use crate::error::{HabitError, StoreError};
pub use crate::service::{HabitService, HabitServiceBuilder};
