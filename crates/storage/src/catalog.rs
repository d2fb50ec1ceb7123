use std::fmt;

use assetsync_core::ColumnType;

/// Destination tables, in write order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Table {
    Systems,
    Hardware,
    Disks,
    NetworkAdapters,
    Software,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub ty: ColumnType,
}

const fn col(name: &'static str, ty: ColumnType) -> ColumnSpec {
    ColumnSpec { name, ty }
}

const ASSET_NUMBER: ColumnType = ColumnType::text(50);
const GB_SMALL: ColumnType = ColumnType::decimal(6, 2);
const GB_LARGE: ColumnType = ColumnType::decimal(10, 2);

const SYSTEMS: &[ColumnSpec] = &[
    col("AssetNumber", ASSET_NUMBER),
    col("HostName", ColumnType::text(100)),
    col("UUID", ColumnType::text(50)),
    col("SerialNumber", ColumnType::text(100)),
    col("OSName", ColumnType::text(100)),
    col("OSVersion", ColumnType::text(50)),
    col("OSArchitecture", ColumnType::text(20)),
    col("OSBuild", ColumnType::text(50)),
    col("Manufacturer", ColumnType::text(100)),
    col("Model", ColumnType::text(100)),
    col("BootTime", ColumnType::Timestamp),
    col("BIOSVersion", ColumnType::text(100)),
    col("ScanDate", ColumnType::Timestamp),
    col("PSVersion", ColumnType::text(20)),
];

const HARDWARE: &[ColumnSpec] = &[
    col("HardwareID", ColumnType::Integer),
    col("AssetNumber", ASSET_NUMBER),
    col("CPUName", ColumnType::text(200)),
    col("CPUCores", ColumnType::Integer),
    col("CPUThreads", ColumnType::Integer),
    col("CPUClockSpeedMHz", ColumnType::Integer),
    col("TotalRAMGB", GB_SMALL),
    col("PageFileGB", GB_SMALL),
    col("RAMSticks", ColumnType::Integer),
    col("GPUName", ColumnType::text(200)),
    col("GPURAMGB", GB_SMALL),
    col("GPUDriverVersion", ColumnType::text(50)),
];

const DISKS: &[ColumnSpec] = &[
    col("HardwareID", ColumnType::Integer),
    col("DeviceID", ColumnType::text(10)),
    col("VolumeName", ColumnType::text(100)),
    col("SizeGB", GB_LARGE),
    col("FreeGB", GB_LARGE),
    col("DiskType", ColumnType::text(20)),
];

const NETWORK_ADAPTERS: &[ColumnSpec] = &[
    col("AssetNumber", ASSET_NUMBER),
    col("MacAddress", ColumnType::text(30)),
    col("AdapterName", ColumnType::text(200)),
    col("IPAddress", ColumnType::text(200)),
    col("SubnetMask", ColumnType::text(50)),
    col("DefaultGateway", ColumnType::text(200)),
    col("DNSServers", ColumnType::text(500)),
    col("DHCPEnabled", ColumnType::Boolean),
    col("DHCPServer", ColumnType::text(50)),
];

const SOFTWARE: &[ColumnSpec] = &[
    col("AssetNumber", ASSET_NUMBER),
    col("IsApplication", ColumnType::Boolean),
    col("AppName", ColumnType::text(300)),
    col("AppVersion", ColumnType::text(100)),
    col("Publisher", ColumnType::text(200)),
    col("InstallDate", ColumnType::Timestamp),
    col("HotFixID", ColumnType::text(50)),
    col("HotFixDescription", ColumnType::text(200)),
    col("InstalledOn", ColumnType::Timestamp),
];

impl Table {
    pub const ALL: [Table; 5] = [
        Table::Systems,
        Table::Hardware,
        Table::Disks,
        Table::NetworkAdapters,
        Table::Software,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Systems => "Systems",
            Self::Hardware => "Hardware",
            Self::Disks => "Disks",
            Self::NetworkAdapters => "NetworkAdapters",
            Self::Software => "Software",
        }
    }

    /// Every column the writer knows how to populate or address.
    pub fn columns(&self) -> &'static [ColumnSpec] {
        match self {
            Self::Systems => SYSTEMS,
            Self::Hardware => HARDWARE,
            Self::Disks => DISKS,
            Self::NetworkAdapters => NETWORK_ADAPTERS,
            Self::Software => SOFTWARE,
        }
    }

    /// Columns that address a row. Software rows are further keyed by
    /// `AppName` or `HotFixID` depending on `IsApplication`.
    pub fn key_columns(&self) -> &'static [&'static str] {
        match self {
            Self::Systems | Self::Hardware => &["AssetNumber"],
            Self::Disks => &["HardwareID", "DeviceID"],
            Self::NetworkAdapters => &["AssetNumber", "MacAddress"],
            Self::Software => &["AssetNumber", "IsApplication"],
        }
    }

    pub fn is_key_column(&self, column: &str) -> bool {
        self.key_columns().iter().any(|k| k.eq_ignore_ascii_case(column))
    }

    pub fn column_type(&self, column: &str) -> Option<ColumnType> {
        self.columns()
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(column))
            .map(|c| c.ty)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_are_case_insensitive() {
        assert_eq!(Table::Hardware.column_type("gpuramgb"), Some(GB_SMALL));
        assert_eq!(Table::Systems.column_type("AssetNumber"), Some(ColumnType::text(50)));
        assert_eq!(Table::Disks.column_type("HostName"), None);
    }

    #[test]
    fn column_names_are_unique_per_table() {
        for table in Table::ALL {
            let mut names: Vec<String> =
                table.columns().iter().map(|c| c.name.to_ascii_lowercase()).collect();
            let total = names.len();
            names.sort();
            names.dedup();
            assert_eq!(names.len(), total, "duplicate column in {table}");
        }
    }

    #[test]
    fn key_columns_are_catalogued() {
        for table in Table::ALL {
            for key in table.key_columns() {
                assert!(table.column_type(key).is_some(), "{table}.{key}");
                assert!(table.is_key_column(&key.to_ascii_uppercase()));
            }
        }
        assert!(!Table::Hardware.is_key_column("HardwareID"));
    }
}
