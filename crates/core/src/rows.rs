//! Mapping from a validated snapshot onto the rows of each target table.

use chrono::NaiveDateTime;

use crate::error::CoreError;
use crate::normalize::{
    cidr_to_dotted, coerce_bool, coerce_f64, coerce_i64, first, first_text, join_list,
    parse_timestamp,
};
use crate::snapshot::{DiskEntry, HotfixEntry, InstalledApp, NetworkAdapter, SnapshotDocument};

#[derive(Debug, Clone, PartialEq)]
pub struct SystemRow {
    pub asset_number: String,
    pub host_name: Option<String>,
    pub uuid: Option<String>,
    pub serial_number: Option<String>,
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub os_architecture: Option<String>,
    pub os_build: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub boot_time: Option<NaiveDateTime>,
    pub bios_version: Option<String>,
    pub scan_date: NaiveDateTime,
    pub ps_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HardwareRow {
    pub asset_number: String,
    pub cpu_name: Option<String>,
    pub cpu_cores: Option<i64>,
    pub cpu_threads: Option<i64>,
    pub cpu_clock_mhz: Option<i64>,
    pub total_ram_gb: Option<f64>,
    pub page_file_gb: Option<f64>,
    pub ram_sticks: Option<i64>,
    pub gpu_name: Option<String>,
    pub gpu_ram_gb: Option<f64>,
    pub gpu_driver_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiskRow {
    pub device_id: Option<String>,
    pub volume_name: Option<String>,
    pub size_gb: Option<f64>,
    pub free_gb: Option<f64>,
    pub disk_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkRow {
    pub asset_number: String,
    pub mac_address: String,
    pub adapter_name: Option<String>,
    pub ip_address: Option<String>,
    pub subnet_mask: Option<String>,
    pub default_gateway: Option<String>,
    pub dns_servers: Option<String>,
    pub dhcp_enabled: bool,
    pub dhcp_server: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationRow {
    pub asset_number: String,
    pub app_name: Option<String>,
    pub app_version: Option<String>,
    pub publisher: Option<String>,
    pub install_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HotfixRow {
    pub asset_number: String,
    pub hot_fix_id: Option<String>,
    pub description: Option<String>,
    pub installed_on: Option<NaiveDateTime>,
}

/// The full write set for one snapshot, in table terms.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryRows {
    pub system: SystemRow,
    pub hardware: HardwareRow,
    pub disks: Vec<DiskRow>,
    pub network: Vec<NetworkRow>,
    pub applications: Vec<ApplicationRow>,
    pub hotfixes: Vec<HotfixRow>,
}

impl InventoryRows {
    /// Map a snapshot onto rows. `scanned_at` becomes the system's scan date.
    ///
    /// Only the asset number and adapter MAC addresses are hard requirements
    /// here; everything else that is absent maps to null.
    pub fn from_snapshot(doc: &SnapshotDocument, scanned_at: NaiveDateTime) -> Result<Self, CoreError> {
        let asset_number = doc
            .asset_number
            .clone()
            .ok_or_else(|| CoreError::MissingFields {
                asset_number: None,
                missing: vec!["AssetNumber".into()],
            })?;

        let system = doc.system.clone().unwrap_or_default();
        let bios = system.bios.clone().unwrap_or_default();
        let hardware = doc.hardware.clone().unwrap_or_default();
        let cpu = hardware.cpu.clone().unwrap_or_default();
        let memory = hardware.memory.clone().unwrap_or_default();
        let gpu = first("Hardware.GPU", hardware.gpu.as_deref()).cloned().unwrap_or_default();

        let system_row = SystemRow {
            asset_number: asset_number.clone(),
            host_name: system.host_name,
            uuid: doc.uuid.clone(),
            serial_number: bios.serial,
            os_name: system.os,
            os_version: system.version,
            os_architecture: system.architecture,
            os_build: system.build,
            manufacturer: system.manufacturer,
            model: system.model,
            boot_time: parse_timestamp("System.BootTime", system.boot_time.as_ref()),
            bios_version: bios.version,
            scan_date: scanned_at,
            ps_version: doc.ps_version.clone(),
        };

        let hardware_row = HardwareRow {
            asset_number: asset_number.clone(),
            cpu_name: cpu.name,
            cpu_cores: coerce_i64("Hardware.CPU.Cores", cpu.cores.as_ref()),
            cpu_threads: coerce_i64("Hardware.CPU.Threads", cpu.threads.as_ref()),
            cpu_clock_mhz: coerce_i64("Hardware.CPU.ClockSpeed", cpu.clock_speed.as_ref()),
            total_ram_gb: coerce_f64("Hardware.Memory.TotalGB", memory.total_gb.as_ref()),
            page_file_gb: coerce_f64("Hardware.Memory.PageFileGB", memory.page_file_gb.as_ref()),
            ram_sticks: coerce_i64("Hardware.Memory.Sticks", memory.sticks.as_ref()),
            gpu_name: gpu.name,
            gpu_ram_gb: coerce_f64("Hardware.GPU.AdapterRAMGB", gpu.adapter_ram_gb.as_ref()),
            gpu_driver_version: gpu.driver_version,
        };

        let disks = hardware
            .disks
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(disk_row)
            .collect();

        let network = doc
            .adapters()
            .iter()
            .map(|adapter| network_row(&asset_number, adapter))
            .collect::<Result<Vec<_>, _>>()?;

        let software = doc.software.clone().unwrap_or_default();
        let applications = software
            .installed_apps
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|app| application_row(&asset_number, app))
            .collect();
        let hotfixes = software
            .hotfixes
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|hotfix| hotfix_row(&asset_number, hotfix))
            .collect();

        Ok(Self {
            system: system_row,
            hardware: hardware_row,
            disks,
            network,
            applications,
            hotfixes,
        })
    }
}

fn disk_row(disk: &DiskEntry) -> DiskRow {
    DiskRow {
        device_id: disk.device_id.clone(),
        volume_name: disk.volume_name.clone(),
        size_gb: coerce_f64("Hardware.Disks.SizeGB", disk.size_gb.as_ref()),
        free_gb: coerce_f64("Hardware.Disks.FreeGB", disk.free_gb.as_ref()),
        disk_type: disk.disk_type.clone(),
    }
}

fn network_row(asset_number: &str, adapter: &NetworkAdapter) -> Result<NetworkRow, CoreError> {
    let mac_address = adapter.mac_address.clone().ok_or_else(|| CoreError::MissingFields {
        asset_number: Some(asset_number.to_string()),
        missing: vec!["Network.MacAddress".into()],
    })?;

    // Collectors report DHCP either as a flag or as an "IPConfigType" label.
    let dhcp_enabled = match &adapter.dhcp_enabled {
        Some(value) if !value.is_null() => coerce_bool("Network.DHCPEnabled", Some(value)),
        _ => adapter
            .ip_config_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("dhcp")),
    };

    Ok(NetworkRow {
        asset_number: asset_number.to_string(),
        mac_address,
        adapter_name: adapter.name.clone(),
        ip_address: join_list("Network.IPAddress", adapter.ip_address.as_ref()),
        subnet_mask: first_text(adapter.subnet_mask.as_ref()).map(|m| cidr_to_dotted(&m)),
        default_gateway: join_list("Network.DefaultGateway", adapter.default_gateway.as_ref()),
        dns_servers: join_list("Network.DNSServers", adapter.dns_servers.as_ref()),
        dhcp_enabled,
        dhcp_server: adapter.dhcp_server.clone(),
    })
}

fn application_row(asset_number: &str, app: &InstalledApp) -> ApplicationRow {
    ApplicationRow {
        asset_number: asset_number.to_string(),
        app_name: app.display_name.clone(),
        app_version: app.display_version.clone(),
        publisher: app.publisher.clone(),
        install_date: parse_timestamp("Software.InstalledApps.InstallDate", app.install_date.as_ref()),
    }
}

fn hotfix_row(asset_number: &str, hotfix: &HotfixEntry) -> HotfixRow {
    HotfixRow {
        asset_number: asset_number.to_string(),
        hot_fix_id: hotfix.hot_fix_id.clone(),
        description: hotfix.description.clone(),
        installed_on: parse_timestamp("Software.Hotfixes.InstalledOn", hotfix.installed_on.as_ref()),
    }
}
