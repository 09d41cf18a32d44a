//! Per-run job log.
//!
//! Each batch run builds its own [`RunLog`] from an immutable
//! [`LogConfig`] and passes it to the driver, instead of reconfiguring a
//! process-wide logger for every job.

use std::{fs::OpenOptions, path::PathBuf, sync::Mutex};

use anyhow::Result;
use tracing::{dispatcher, Dispatch, Level};

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log file, opened in append mode. `None` discards job events.
    pub file: Option<PathBuf>,
    pub level: Level,
}

impl LogConfig {
    pub fn to_file(file: PathBuf) -> Self {
        LogConfig {
            file: Some(file),
            level: Level::INFO,
        }
    }

    pub fn disabled() -> Self {
        LogConfig {
            file: None,
            level: Level::INFO,
        }
    }
}

pub struct RunLog {
    dispatch: Dispatch,
}

impl RunLog {
    pub fn new(config: &LogConfig) -> Result<Self> {
        let dispatch = match &config.file {
            Some(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                let subscriber = tracing_subscriber::fmt()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false)
                    .with_max_level(config.level)
                    .finish();
                Dispatch::new(subscriber)
            }
            None => Dispatch::none(),
        };

        Ok(RunLog { dispatch })
    }

    /// Runs `f` with this log as the current subscriber.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        dispatcher::with_default(&self.dispatch, f)
    }
}

// -- Tests -------------------------------------------------------------------
