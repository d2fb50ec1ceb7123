//! Decoded form of one inventory snapshot file.
//!
//! Every field is optional at this layer so that validation can report all
//! missing paths at once instead of failing on the first absent key.
//! Numeric, boolean and date fields are kept as raw JSON values and coerced
//! during row mapping.

use serde::Deserialize;
use serde_json::Value;

use crate::error::CoreError;
use crate::normalize::{loose_string, one_or_many};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SnapshotDocument {
    #[serde(default, deserialize_with = "loose_string")]
    pub asset_number: Option<String>,
    #[serde(rename = "UUID", default, deserialize_with = "loose_string")]
    pub uuid: Option<String>,
    #[serde(rename = "PSVersion", default, deserialize_with = "loose_string")]
    pub ps_version: Option<String>,
    pub system: Option<SystemSection>,
    pub hardware: Option<HardwareSection>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub network: Option<Vec<NetworkAdapter>>,
    pub software: Option<SoftwareSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SystemSection {
    #[serde(default, deserialize_with = "loose_string")]
    pub host_name: Option<String>,
    #[serde(rename = "OS", default, deserialize_with = "loose_string")]
    pub os: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub architecture: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub build: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub manufacturer: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub model: Option<String>,
    pub boot_time: Option<Value>,
    #[serde(rename = "BIOS")]
    pub bios: Option<BiosSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BiosSection {
    #[serde(default, deserialize_with = "loose_string")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub serial: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HardwareSection {
    #[serde(rename = "CPU")]
    pub cpu: Option<CpuSection>,
    pub memory: Option<MemorySection>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub disks: Option<Vec<DiskEntry>>,
    #[serde(rename = "GPU", default, deserialize_with = "one_or_many")]
    pub gpu: Option<Vec<GpuEntry>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CpuSection {
    #[serde(default, deserialize_with = "loose_string")]
    pub name: Option<String>,
    pub cores: Option<Value>,
    pub threads: Option<Value>,
    pub clock_speed: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemorySection {
    #[serde(rename = "TotalGB")]
    pub total_gb: Option<Value>,
    #[serde(rename = "PageFileGB")]
    pub page_file_gb: Option<Value>,
    #[serde(rename = "Sticks")]
    pub sticks: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DiskEntry {
    #[serde(rename = "DeviceID", default, deserialize_with = "loose_string")]
    pub device_id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub volume_name: Option<String>,
    #[serde(rename = "SizeGB")]
    pub size_gb: Option<Value>,
    #[serde(rename = "FreeGB")]
    pub free_gb: Option<Value>,
    #[serde(rename = "Type", default, deserialize_with = "loose_string")]
    pub disk_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GpuEntry {
    #[serde(default, deserialize_with = "loose_string")]
    pub name: Option<String>,
    #[serde(rename = "AdapterRAMGB")]
    pub adapter_ram_gb: Option<Value>,
    #[serde(default, deserialize_with = "loose_string")]
    pub driver_version: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkAdapter {
    #[serde(default, deserialize_with = "loose_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub mac_address: Option<String>,
    #[serde(rename = "IPAddress")]
    pub ip_address: Option<Value>,
    pub subnet_mask: Option<Value>,
    pub default_gateway: Option<Value>,
    #[serde(rename = "DNSServers")]
    pub dns_servers: Option<Value>,
    #[serde(rename = "IPConfigType", default, deserialize_with = "loose_string")]
    pub ip_config_type: Option<String>,
    #[serde(rename = "DHCPEnabled")]
    pub dhcp_enabled: Option<Value>,
    #[serde(rename = "DHCPServer", default, deserialize_with = "loose_string")]
    pub dhcp_server: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SoftwareSection {
    #[serde(default, deserialize_with = "one_or_many")]
    pub installed_apps: Option<Vec<InstalledApp>>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub hotfixes: Option<Vec<HotfixEntry>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstalledApp {
    #[serde(default, deserialize_with = "loose_string")]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub display_version: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub publisher: Option<String>,
    pub install_date: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HotfixEntry {
    #[serde(rename = "HotFixID", default, deserialize_with = "loose_string")]
    pub hot_fix_id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub description: Option<String>,
    pub installed_on: Option<Value>,
}

impl SnapshotDocument {
    /// Decode a snapshot file body.
    ///
    /// Collectors running under Windows PowerShell write UTF-8 with a BOM, which
    /// is stripped first. When the JSON parses but does not fit the document
    /// shape, the asset number is still recovered from the raw value so the
    /// failure can be attributed.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let raw: Value = serde_json::from_slice(bytes).map_err(|e| CoreError::Decode {
            asset_number: None,
            message: e.to_string(),
        })?;
        let asset_number = raw.get("AssetNumber").and_then(crate::normalize::scalar_text);
        serde_json::from_value(raw).map_err(|e| CoreError::Decode {
            asset_number,
            message: e.to_string(),
        })
    }

    pub fn adapters(&self) -> &[NetworkAdapter] {
        self.network.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_collector_document() {
        let body = br#"{
            "AssetNumber": "07001010001",
            "UUID": "4C4C4544-0042-3510-8051-B4C04F4D3432",
            "PSVersion": "5.1.19041.4170",
            "System": {
                "HostName": "PT-A1", "OS": "Microsoft Windows 11 Pro", "Version": "10.0.22631",
                "Architecture": "64-bit", "Build": 22631, "Manufacturer": "Dell Inc.",
                "Model": "OptiPlex 7090", "BootTime": "2024-03-01T08:15:00",
                "BIOS": {"Version": "1.21.0", "Serial": "B5Q8M43"}
            },
            "Hardware": {
                "CPU": {"Name": "Intel(R) Core(TM) i7-10700", "Cores": 8, "Threads": 16, "ClockSpeed": 2904},
                "Memory": {"TotalGB": 15.79, "PageFileGB": 2.5, "Sticks": 2},
                "Disks": [{"DeviceID": "C:", "VolumeName": "OS", "SizeGB": 475.8, "FreeGB": 210.3, "Type": "Fixed"}],
                "GPU": {"Name": "Intel(R) UHD Graphics 630", "AdapterRAMGB": 1, "DriverVersion": "31.0.101.2115"}
            },
            "Network": {"Name": "Ethernet", "MacAddress": "AA:BB:CC:DD:EE:01", "DNSServers": ["10.0.0.1", "10.0.0.2"]},
            "Software": {"InstalledApps": [], "Hotfixes": [{"HotFixID": "KB5034441", "InstalledOn": "1/15/2024"}]}
        }"#;
        let doc = SnapshotDocument::from_json_slice(body).unwrap();
        assert_eq!(doc.asset_number.as_deref(), Some("07001010001"));
        let system = doc.system.as_ref().unwrap();
        assert_eq!(system.build.as_deref(), Some("22631"));
        assert_eq!(system.bios.as_ref().unwrap().serial.as_deref(), Some("B5Q8M43"));
        let hardware = doc.hardware.as_ref().unwrap();
        assert_eq!(hardware.gpu.as_ref().unwrap().len(), 1);
        assert_eq!(doc.adapters().len(), 1);
        let software = doc.software.as_ref().unwrap();
        assert!(software.installed_apps.as_ref().unwrap().is_empty());
        assert_eq!(software.hotfixes.as_ref().unwrap()[0].hot_fix_id.as_deref(), Some("KB5034441"));
    }

    #[test]
    fn strips_byte_order_mark() {
        let mut body = UTF8_BOM.to_vec();
        body.extend_from_slice(br#"{"AssetNumber": "A-1"}"#);
        let doc = SnapshotDocument::from_json_slice(&body).unwrap();
        assert_eq!(doc.asset_number.as_deref(), Some("A-1"));
        assert!(doc.system.is_none());
    }

    #[test]
    fn syntax_errors_have_no_asset_number() {
        let err = SnapshotDocument::from_json_slice(b"{\"AssetNumber\": ").unwrap_err();
        assert!(matches!(err, CoreError::Decode { asset_number: None, .. }));
    }

    #[test]
    fn shape_errors_keep_asset_number() {
        let err =
            SnapshotDocument::from_json_slice(br#"{"AssetNumber": "A-9", "System": "oops"}"#)
                .unwrap_err();
        assert_eq!(err.asset_number(), Some("A-9"));
    }

    #[test]
    fn shape_errors_keep_numeric_asset_number() {
        let err =
            SnapshotDocument::from_json_slice(br#"{"AssetNumber": 7001010001, "System": "oops"}"#)
                .unwrap_err();
        assert_eq!(err.asset_number(), Some("7001010001"));

        let blank = SnapshotDocument::from_json_slice(br#"{"AssetNumber": "  ", "System": "oops"}"#)
            .unwrap_err();
        assert_eq!(blank.asset_number(), None);
    }
}
