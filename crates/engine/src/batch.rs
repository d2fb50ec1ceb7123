use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use assetsync_core::RunId;

use crate::config::ImportConfig;
use crate::error::RunError;
use crate::importer::{ImportOutcome, ImportStage, Importer};

/// Cooperative stop signal, checked between files.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    pub file: String,
    pub asset_number: Option<String>,
    pub stage: ImportStage,
    pub error: String,
}

/// Result of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub total_files: usize,
    /// Asset numbers committed, in processing order.
    pub succeeded: Vec<String>,
    pub failed: Vec<FailedFile>,
    /// Files never started because the run was cancelled or ran out of time.
    pub skipped: Vec<String>,
    /// Expected columns absent from the database, as `Table.Column`.
    pub missing_columns: Vec<String>,
}

impl BatchSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Import run {}", self.run_id)?;
        writeln!(f, "  started:   {}", self.started_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(f, "  finished:  {}", self.finished_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(f, "  duration:  {:.2}s", self.duration_ms as f64 / 1000.0)?;
        writeln!(
            f,
            "  files:     {} total, {} succeeded, {} failed, {} skipped",
            self.total_files,
            self.succeeded.len(),
            self.failed.len(),
            self.skipped.len()
        )?;
        if !self.missing_columns.is_empty() {
            writeln!(f, "  missing columns: {}", self.missing_columns.join(", "))?;
        }
        if !self.failed.is_empty() {
            writeln!(f, "Failed:")?;
            for failed in &self.failed {
                writeln!(
                    f,
                    "  {} [{}] at {}: {}",
                    failed.file,
                    failed.asset_number.as_deref().unwrap_or("unknown asset"),
                    failed.stage,
                    failed.error
                )?;
            }
        }
        if !self.skipped.is_empty() {
            writeln!(f, "Skipped:")?;
            for file in &self.skipped {
                writeln!(f, "  {file}")?;
            }
        }
        Ok(())
    }
}

/// Snapshot files in `dir`: regular files with a `.json` extension in any
/// case, sorted by file name.
pub fn snapshot_files(dir: &Path) -> Result<Vec<PathBuf>, RunError> {
    let unreadable = |source| RunError::InputDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(unreadable)? {
        let path = entry.map_err(unreadable)?.path();
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json && path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

pub fn run_batch(config: &ImportConfig) -> Result<BatchSummary, RunError> {
    run_batch_with(config, &Cancellation::new())
}

/// Import every snapshot in the input directory, one file at a time.
///
/// A file that fails is recorded and the run moves on. Only problems with the
/// input directory or the database as a whole end the run early.
pub fn run_batch_with(config: &ImportConfig, cancel: &Cancellation) -> Result<BatchSummary, RunError> {
    let run_id = RunId::new();
    let started_at = Utc::now();
    let clock = Instant::now();

    let files = snapshot_files(&config.input_dir)?;
    info!(
        %run_id,
        input = %config.input_dir.display(),
        database = %config.database.display(),
        files = files.len(),
        "starting import run"
    );

    let importer = Importer::prepare(config)?;
    let missing_columns = importer
        .schema()
        .missing_columns()
        .iter()
        .map(|(table, column)| format!("{table}.{column}"))
        .collect();

    let mut succeeded = Vec::new();
    let mut failed = Vec::new();
    let mut skipped = Vec::new();

    for (index, path) in files.iter().enumerate() {
        let out_of_time = config.deadline.is_some_and(|limit| clock.elapsed() >= limit);
        if cancel.is_cancelled() || out_of_time {
            warn!(
                %run_id,
                remaining = files.len() - index,
                reason = if out_of_time { "deadline" } else { "cancelled" },
                "stopping before remaining files"
            );
            skipped.extend(files[index..].iter().map(|p| display_name(p)));
            break;
        }

        let file = display_name(path);
        match importer.import_file(path) {
            ImportOutcome::Committed { asset_number, .. } => succeeded.push(asset_number),
            ImportOutcome::Failed {
                asset_number,
                stage,
                error,
            } => {
                warn!(
                    %run_id,
                    file = %file,
                    asset = asset_number.as_deref().unwrap_or("unknown"),
                    %stage,
                    error = %error,
                    "snapshot import failed"
                );
                failed.push(FailedFile {
                    file,
                    asset_number,
                    stage,
                    error: error.to_string(),
                });
            }
        }
    }

    let summary = BatchSummary {
        run_id,
        started_at,
        finished_at: Utc::now(),
        duration_ms: clock.elapsed().as_millis() as u64,
        total_files: files.len(),
        succeeded,
        failed,
        skipped,
        missing_columns,
    };
    info!(
        %run_id,
        succeeded = summary.succeeded.len(),
        failed = summary.failed.len(),
        skipped = summary.skipped.len(),
        duration_ms = summary.duration_ms,
        "import run finished"
    );
    Ok(summary)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
