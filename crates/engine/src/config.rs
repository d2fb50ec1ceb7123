use std::path::PathBuf;
use std::time::Duration;

use assetsync_storage::StoreOptions;

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Everything one batch run needs to know.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Directory scanned for `*.json` snapshot files.
    pub input_dir: PathBuf,
    /// SQLite database file.
    pub database: PathBuf,
    /// How long each connection waits on a locked database.
    pub busy_timeout: Duration,
    /// Create missing target tables before the run.
    pub init_schema: bool,
    /// Files not started before this much time has passed are skipped.
    pub deadline: Option<Duration>,
}

impl ImportConfig {
    pub fn new(input_dir: impl Into<PathBuf>, database: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            database: database.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            init_schema: true,
            deadline: None,
        }
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    pub fn with_init_schema(mut self, init_schema: bool) -> Self {
        self.init_schema = init_schema;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub(crate) fn store_options(&self) -> StoreOptions {
        StoreOptions {
            busy_timeout: self.busy_timeout,
            init_schema: self.init_schema,
        }
    }
}
