use crate::config::Config;
use crate::error::AppError;
use crate::storage::json_store;
use crate::tasks::TaskStore;
use crate::timer::TimerState;
use std::path::Path;

/// Per-session state handed explicitly to whatever needs it.
#[derive(Debug)]
pub struct SessionContext {
    pub config: Config,
    pub timer: TimerState,
    pub tasks: TaskStore,
}

impl SessionContext {
    pub fn open(config: Config) -> Result<Self, AppError> {
        let path = json_store::store_path(config.store_path.as_deref())?;
        Ok(Self::open_at(config, &path))
    }

    pub fn open_at(config: Config, store_path: &Path) -> Self {
        let timer = TimerState::with_minutes(config.minutes());
        let tasks = TaskStore::load(store_path);
        Self {
            config,
            timer,
            tasks,
        }
    }
}
