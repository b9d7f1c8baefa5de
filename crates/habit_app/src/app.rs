use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use habit_domain::{
    goal::DEFAULT_TIMEZONE, service::DEFAULT_HORIZON, store::JsonFileStore, HabitService,
};
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub(crate) store_path: PathBuf,
    pub(crate) horizon: usize,
    pub(crate) default_timezone: Tz,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("habits.json"),
            horizon: DEFAULT_HORIZON,
            default_timezone: DEFAULT_TIMEZONE.parse().unwrap_or(Tz::UTC),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from `HABIT_*` variables; invalid values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(path) = lookup("HABIT_STORE_PATH") {
            if !path.trim().is_empty() {
                config.store_path = PathBuf::from(path.trim());
            }
        }
        if let Some(horizon) = lookup("HABIT_HORIZON") {
            match horizon.trim().parse::<usize>() {
                Ok(value) if value > 0 => config.horizon = value,
                _ => warn!(%horizon, "ignoring invalid HABIT_HORIZON"),
            }
        }
        if let Some(zone) = lookup("HABIT_DEFAULT_TIMEZONE") {
            match zone.trim().parse::<Tz>() {
                Ok(tz) => config.default_timezone = tz,
                Err(_) => warn!(%zone, "ignoring unknown HABIT_DEFAULT_TIMEZONE"),
            }
        }
        config
    }

    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }
}

/// Tops every stored goal back up to the configured horizon. Returns the
/// number of new instances.
pub fn run(config: AppConfig) -> Result<usize> {
    let store = JsonFileStore::open(&config.store_path).with_context(|| {
        format!("unable to open goal store {}", config.store_path.display())
    })?;
    let service = HabitService::builder()
        .with_store(Arc::new(store))
        .with_horizon(config.horizon)
        .with_default_timezone(config.default_timezone)
        .build();

    info!(
        path = %config.store_path.display(),
        horizon = config.horizon,
        "generating additional scheduled instances"
    );
    let created = service
        .extend_schedules()
        .context("failed to extend goal schedules")?;
    info!(created, "done generating scheduled instances");
    Ok(created)
}
