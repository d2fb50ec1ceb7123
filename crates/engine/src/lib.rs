pub mod batch;
pub mod config;
pub mod error;
pub mod importer;
pub mod pipeline;

pub use batch::{BatchSummary, Cancellation, FailedFile, run_batch, run_batch_with, snapshot_files};
pub use config::ImportConfig;
pub use error::{ImportError, RunError};
pub use importer::{ImportOutcome, ImportStage, Importer};
pub use pipeline::{EntityCounts, WriteFailure, WriteStage, WriteStats, write_inventory};
