use thiserror::Error;

use crate::catalog::Table;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("core error: {0}")]
    Core(#[from] assetsync_core::CoreError),

    #[error("key column {column} is missing from {table} in the live schema")]
    MissingKeyColumn { table: Table, column: &'static str },

    #[error("column {column} is not part of the {table} catalog")]
    UnknownColumn { table: Table, column: &'static str },

    #[error("hardware row for asset {asset_number} not found after write")]
    HardwareKeyUnavailable { asset_number: String },
}
