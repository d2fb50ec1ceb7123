use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::TempDir;

use assetsync_engine::{
    BatchSummary, Cancellation, ImportConfig, RunError, run_batch, run_batch_with,
};
use assetsync_storage::{SqliteStore, StorageError, StoreOptions, Table};

/// A throwaway database file plus an inbox directory of snapshot files.
pub struct TestStore {
    dir: TempDir,
}

impl TestStore {
    pub fn new() -> std::io::Result<Self> {
        let dir = tempfile::tempdir()?;
        fs::create_dir(dir.path().join("inbox"))?;
        Ok(Self { dir })
    }

    pub fn inbox(&self) -> PathBuf {
        self.dir.path().join("inbox")
    }

    pub fn database(&self) -> PathBuf {
        self.dir.path().join("inventory.db")
    }

    pub fn config(&self) -> ImportConfig {
        ImportConfig::new(self.inbox(), self.database())
    }

    /// Write a snapshot document into the inbox as `name`.
    pub fn drop_snapshot(&self, name: &str, doc: &Value) -> std::io::Result<PathBuf> {
        let body = serde_json::to_vec_pretty(doc)?;
        self.drop_raw(name, &body)
    }

    pub fn drop_raw(&self, name: &str, body: &[u8]) -> std::io::Result<PathBuf> {
        let path = self.inbox().join(name);
        fs::write(&path, body)?;
        Ok(path)
    }

    /// Empty the inbox between runs.
    pub fn clear_inbox(&self) -> std::io::Result<()> {
        for entry in fs::read_dir(self.inbox())? {
            fs::remove_file(entry?.path())?;
        }
        Ok(())
    }

    pub fn run(&self) -> Result<BatchSummary, RunError> {
        run_batch(&self.config())
    }

    pub fn run_with(&self, cancel: &Cancellation) -> Result<BatchSummary, RunError> {
        run_batch_with(&self.config(), cancel)
    }

    /// Open the database as deployed, without creating tables.
    pub fn open(&self) -> Result<SqliteStore, StorageError> {
        let options = StoreOptions {
            init_schema: false,
            ..StoreOptions::default()
        };
        SqliteStore::open_with(self.database(), &options)
    }

    /// Run raw SQL against the database, e.g. to pre-deploy an older table.
    pub fn execute_batch(&self, sql: &str) -> Result<(), StorageError> {
        self.open()?.conn().execute_batch(sql)?;
        Ok(())
    }

    pub fn count(&self, table: Table) -> Result<u64, StorageError> {
        self.open()?.count_rows(table)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
