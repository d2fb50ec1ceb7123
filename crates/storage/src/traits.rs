use chrono::NaiveDateTime;

use assetsync_core::{
    ApplicationRow, DiskRow, HardwareId, HardwareRow, HotfixRow, NetworkRow, SystemRow,
};

use crate::error::StorageError;
use crate::upsert::UpsertMode;

/// Entity-level writes for one snapshot.
///
/// A `HardwareId` can only be obtained from `upsert_hardware`, so a disk
/// write is unreachable until its parent hardware row has been written.
pub trait InventoryWriter {
    fn upsert_system(&mut self, row: &SystemRow) -> Result<UpsertMode, StorageError>;

    fn upsert_hardware(&mut self, row: &HardwareRow)
    -> Result<(HardwareId, UpsertMode), StorageError>;

    fn upsert_disk(
        &mut self,
        hardware_id: HardwareId,
        device_id: &str,
        row: &DiskRow,
    ) -> Result<UpsertMode, StorageError>;

    fn upsert_network(&mut self, row: &NetworkRow) -> Result<UpsertMode, StorageError>;

    fn upsert_application(
        &mut self,
        app_name: &str,
        row: &ApplicationRow,
    ) -> Result<UpsertMode, StorageError>;

    fn upsert_hotfix(&mut self, hot_fix_id: &str, row: &HotfixRow)
    -> Result<UpsertMode, StorageError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemRecord {
    pub asset_number: String,
    pub host_name: String,
    pub uuid: Option<String>,
    pub serial_number: Option<String>,
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub os_build: Option<String>,
    pub boot_time: Option<NaiveDateTime>,
    pub bios_version: Option<String>,
    pub scan_date: NaiveDateTime,
    pub ps_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HardwareRecord {
    pub hardware_id: HardwareId,
    pub asset_number: String,
    pub cpu_name: Option<String>,
    pub cpu_cores: Option<i64>,
    pub total_ram_gb: Option<f64>,
    pub gpu_name: Option<String>,
    pub gpu_ram_gb: Option<f64>,
    /// `None` also when the deployed table has no such column.
    pub gpu_driver_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiskRecord {
    pub hardware_id: HardwareId,
    pub device_id: String,
    pub volume_name: Option<String>,
    pub size_gb: Option<f64>,
    pub free_gb: Option<f64>,
    pub disk_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkRecord {
    pub asset_number: String,
    pub mac_address: String,
    pub adapter_name: Option<String>,
    pub ip_address: Option<String>,
    pub subnet_mask: Option<String>,
    pub dns_servers: Option<String>,
    pub dhcp_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoftwareKind {
    Application,
    Hotfix,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SoftwareRecord {
    pub asset_number: String,
    pub kind: SoftwareKind,
    /// AppName for applications, HotFixID for hotfixes.
    pub name: String,
    pub version: Option<String>,
    pub installed: Option<NaiveDateTime>,
}
