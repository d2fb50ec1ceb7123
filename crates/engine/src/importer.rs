use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, Utc};
use serde::{Serialize, Serializer};
use tracing::{debug, info, warn};

use assetsync_core::{InventoryRows, SnapshotDocument, validate_snapshot};
use assetsync_storage::{SchemaDescriptor, SqliteStore, SqliteWriter, StorageError, StoreOptions};

use crate::config::ImportConfig;
use crate::error::{ImportError, RunError};
use crate::pipeline::{WriteStage, WriteStats, write_inventory};

/// Where a snapshot got to on its way into the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStage {
    Loaded,
    Validated,
    TransactionOpen,
    Writing(WriteStage),
    Committed,
    RolledBack,
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded => f.write_str("loaded"),
            Self::Validated => f.write_str("validated"),
            Self::TransactionOpen => f.write_str("transaction-open"),
            Self::Writing(stage) => write!(f, "writing-{stage}"),
            Self::Committed => f.write_str("committed"),
            Self::RolledBack => f.write_str("rolled-back"),
        }
    }
}

impl Serialize for ImportStage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug)]
pub enum ImportOutcome {
    Committed {
        asset_number: String,
        stats: WriteStats,
    },
    Failed {
        asset_number: Option<String>,
        /// Stage that was in progress when the error occurred.
        stage: ImportStage,
        error: ImportError,
    },
}

impl ImportOutcome {
    fn failed(asset_number: Option<String>, stage: ImportStage, error: impl Into<ImportError>) -> Self {
        Self::Failed {
            asset_number,
            stage,
            error: error.into(),
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }

    pub fn asset_number(&self) -> Option<&str> {
        match self {
            Self::Committed { asset_number, .. } => Some(asset_number),
            Self::Failed { asset_number, .. } => asset_number.as_deref(),
        }
    }

    /// Terminal state: committed, rolled back, or the pre-transaction stage
    /// that rejected the snapshot.
    pub fn final_stage(&self) -> ImportStage {
        match self {
            Self::Committed { .. } => ImportStage::Committed,
            Self::Failed {
                stage: ImportStage::Writing(_) | ImportStage::Committed,
                ..
            } => ImportStage::RolledBack,
            Self::Failed { stage, .. } => *stage,
        }
    }
}

/// Imports snapshots one at a time, each on its own connection and in its
/// own transaction.
pub struct Importer {
    database: PathBuf,
    options: StoreOptions,
    schema: SchemaDescriptor,
}

impl Importer {
    pub fn new(database: impl Into<PathBuf>, options: StoreOptions, schema: SchemaDescriptor) -> Self {
        Self {
            database: database.into(),
            options,
            schema,
        }
    }

    /// Open the store once, apply the schema if configured, and capture the
    /// live column catalog for the run.
    pub fn prepare(config: &ImportConfig) -> Result<Self, RunError> {
        let store_error = |source| RunError::Store {
            path: config.database.clone(),
            source,
        };
        let store = SqliteStore::open_with(&config.database, &config.store_options())
            .map_err(store_error)?;
        let schema = store.introspect().map_err(store_error)?;
        drop(store);

        let options = StoreOptions {
            init_schema: false,
            ..config.store_options()
        };
        Ok(Self::new(config.database.clone(), options, schema))
    }

    pub fn schema(&self) -> &SchemaDescriptor {
        &self.schema
    }

    pub fn import_file(&self, path: &Path) -> ImportOutcome {
        debug!(file = %path.display(), "loading snapshot");
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => return ImportOutcome::failed(None, ImportStage::Loaded, e),
        };
        let doc = match SnapshotDocument::from_json_slice(&bytes) {
            Ok(doc) => doc,
            Err(e) => {
                let error = ImportError::from(e);
                let asset_number = error.asset_number().map(str::to_string);
                return ImportOutcome::failed(asset_number, ImportStage::Loaded, error);
            }
        };
        self.import_document(&doc, Utc::now().naive_utc())
    }

    /// Validate, map and write one decoded snapshot. Nothing touches the
    /// database unless validation passes.
    pub fn import_document(&self, doc: &SnapshotDocument, scanned_at: NaiveDateTime) -> ImportOutcome {
        let asset_number = doc.asset_number.clone();

        if let Err(e) = validate_snapshot(doc) {
            return ImportOutcome::failed(asset_number, ImportStage::Validated, e);
        }
        let rows = match InventoryRows::from_snapshot(doc, scanned_at) {
            Ok(rows) => rows,
            Err(e) => return ImportOutcome::failed(asset_number, ImportStage::Validated, e),
        };

        match self.write(&rows) {
            Ok(stats) => {
                info!(
                    asset = %rows.system.asset_number,
                    disks = stats.disks.total(),
                    adapters = stats.network.total(),
                    applications = stats.applications.total(),
                    hotfixes = stats.hotfixes.total(),
                    skipped = stats.skipped,
                    "snapshot committed"
                );
                ImportOutcome::Committed {
                    asset_number: rows.system.asset_number,
                    stats,
                }
            }
            Err((stage, error)) => ImportOutcome::failed(asset_number, stage, error),
        }
    }

    fn write(&self, rows: &InventoryRows) -> Result<WriteStats, (ImportStage, ImportError)> {
        let opening = |e: StorageError| -> (ImportStage, ImportError) {
            (ImportStage::TransactionOpen, e.into())
        };
        let mut store = SqliteStore::open_with(&self.database, &self.options).map_err(opening)?;
        let tx = store.transaction().map_err(opening)?;

        let written = {
            let mut writer = SqliteWriter::new(&tx, &self.schema);
            write_inventory(&mut writer, rows)
        };
        match written {
            Ok(stats) => {
                tx.commit()
                    .map_err(|e| (ImportStage::Committed, ImportError::Storage(e.into())))?;
                Ok(stats)
            }
            Err(failure) => {
                if let Err(e) = tx.rollback() {
                    warn!(asset = %rows.system.asset_number, error = %e, "rollback failed");
                }
                Err((ImportStage::Writing(failure.stage), failure.into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_snapshot_never_reaches_the_database() {
        let dir = tempfile::tempdir().unwrap();
        // Parent directory does not exist, so any attempt to open would fail.
        let database = dir.path().join("absent").join("inventory.db");
        let importer = Importer::new(&database, StoreOptions::default(), SchemaDescriptor::full());

        let doc = SnapshotDocument::from_json_slice(br#"{"AssetNumber": "07001010001"}"#).unwrap();
        let outcome = importer.import_document(&doc, Utc::now().naive_utc());

        match &outcome {
            ImportOutcome::Failed { asset_number, stage, error } => {
                assert_eq!(asset_number.as_deref(), Some("07001010001"));
                assert_eq!(*stage, ImportStage::Validated);
                assert!(matches!(error, ImportError::Core(_)));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(outcome.final_stage(), ImportStage::Validated);
        assert!(!database.exists());
    }

    #[test]
    fn undecodable_file_fails_while_loading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, b"{ not json").unwrap();
        let importer = Importer::new(dir.path().join("inv.db"), StoreOptions::default(), SchemaDescriptor::full());

        let outcome = importer.import_file(&path);
        assert!(!outcome.is_committed());
        assert_eq!(outcome.final_stage(), ImportStage::Loaded);
        assert_eq!(outcome.asset_number(), None);
    }
}
