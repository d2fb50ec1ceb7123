use std::path::PathBuf;

use assetsync_core::CoreError;
use assetsync_storage::StorageError;
use thiserror::Error;

use crate::pipeline::WriteFailure;

/// Failure of a single snapshot file. Recorded in the batch summary; never
/// stops the run.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("read error: {0}")]
    Read(#[from] std::io::Error),

    #[error("{0}")]
    Core(#[from] CoreError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Write(#[from] WriteFailure),
}

impl ImportError {
    pub fn asset_number(&self) -> Option<&str> {
        match self {
            Self::Core(e) => e.asset_number(),
            _ => None,
        }
    }
}

/// Failure that aborts the whole run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("cannot read input directory {}: {source}", .path.display())]
    InputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot prepare database {}: {source}", .path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: StorageError,
    },
}
