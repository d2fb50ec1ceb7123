//! Ordered entity writes for one snapshot.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use assetsync_core::InventoryRows;
use assetsync_storage::{InventoryWriter, StorageError, UpsertMode};

/// Entity group being written. Groups are written in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum WriteStage {
    System,
    Hardware,
    Disks,
    Network,
    Software,
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::System => "system",
            Self::Hardware => "hardware",
            Self::Disks => "disks",
            Self::Network => "network",
            Self::Software => "software",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
#[error("{stage} write failed: {source}")]
pub struct WriteFailure {
    pub stage: WriteStage,
    #[source]
    pub source: StorageError,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
    pub inserted: usize,
    pub updated: usize,
}

impl EntityCounts {
    fn record(&mut self, mode: UpsertMode) {
        match mode {
            UpsertMode::Insert => self.inserted += 1,
            UpsertMode::Update => self.updated += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.inserted + self.updated
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteStats {
    pub systems: EntityCounts,
    pub hardware: EntityCounts,
    pub disks: EntityCounts,
    pub network: EntityCounts,
    pub applications: EntityCounts,
    pub hotfixes: EntityCounts,
    /// Rows dropped for lacking their key field.
    pub skipped: usize,
}

/// Write every row of one snapshot: system, hardware, disks, network
/// adapters, applications, then hotfixes.
///
/// Stops at the first storage error; the caller owns the transaction and
/// decides what to do with the partial writes.
pub fn write_inventory<W: InventoryWriter + ?Sized>(
    writer: &mut W,
    rows: &InventoryRows,
) -> Result<WriteStats, WriteFailure> {
    let asset = rows.system.asset_number.as_str();
    let mut stats = WriteStats::default();

    let at = |stage: WriteStage| move |source: StorageError| WriteFailure { stage, source };

    debug!(asset, stage = %WriteStage::System, "writing");
    stats
        .systems
        .record(writer.upsert_system(&rows.system).map_err(at(WriteStage::System))?);

    debug!(asset, stage = %WriteStage::Hardware, "writing");
    let (hardware_id, mode) = writer
        .upsert_hardware(&rows.hardware)
        .map_err(at(WriteStage::Hardware))?;
    stats.hardware.record(mode);

    debug!(asset, stage = %WriteStage::Disks, count = rows.disks.len(), "writing");
    for disk in &rows.disks {
        let Some(device_id) = disk.device_id.as_deref() else {
            warn!(asset, "skipping disk without DeviceID");
            stats.skipped += 1;
            continue;
        };
        stats.disks.record(
            writer
                .upsert_disk(hardware_id, device_id, disk)
                .map_err(at(WriteStage::Disks))?,
        );
    }

    debug!(asset, stage = %WriteStage::Network, count = rows.network.len(), "writing");
    for adapter in &rows.network {
        stats
            .network
            .record(writer.upsert_network(adapter).map_err(at(WriteStage::Network))?);
    }

    debug!(
        asset,
        stage = %WriteStage::Software,
        applications = rows.applications.len(),
        hotfixes = rows.hotfixes.len(),
        "writing"
    );
    for app in &rows.applications {
        let Some(name) = app.app_name.as_deref() else {
            warn!(asset, "skipping application without DisplayName");
            stats.skipped += 1;
            continue;
        };
        stats.applications.record(
            writer
                .upsert_application(name, app)
                .map_err(at(WriteStage::Software))?,
        );
    }
    for hotfix in &rows.hotfixes {
        let Some(id) = hotfix.hot_fix_id.as_deref() else {
            warn!(asset, "skipping hotfix without HotFixID");
            stats.skipped += 1;
            continue;
        };
        stats.hotfixes.record(
            writer
                .upsert_hotfix(id, hotfix)
                .map_err(at(WriteStage::Software))?,
        );
    }

    Ok(stats)
}
