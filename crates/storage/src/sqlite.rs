use std::path::Path;
use std::time::Duration;

use chrono::NaiveDateTime;
use rusqlite::{
    Connection, OptionalExtension, Row, Transaction, TransactionBehavior, params_from_iter,
    types::FromSql,
};

use assetsync_core::{
    ApplicationRow, DiskRow, FieldValue, HardwareId, HardwareRow, HotfixRow, NetworkRow, SystemRow,
    field_value::TIMESTAMP_PARSE_FORMAT,
};

use crate::catalog::Table;
use crate::descriptor::SchemaDescriptor;
use crate::error::StorageError;
use crate::traits::{
    DiskRecord, HardwareRecord, InventoryWriter, NetworkRecord, SoftwareKind, SoftwareRecord,
    SystemRecord,
};
use crate::upsert::{RowWrite, UpsertMode, bind_key_columns, upsert};

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub busy_timeout: Duration,
    /// Create missing target tables on open.
    pub init_schema: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_millis(5000),
            init_schema: true,
        }
    }
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::open_with(path, &StoreOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: &StoreOptions) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        Self::configure(conn, options)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::configure(Connection::open_in_memory()?, &StoreOptions::default())
    }

    fn configure(conn: Connection, options: &StoreOptions) -> Result<Self, StorageError> {
        crate::schema::configure_connection(&conn, options.busy_timeout)?;
        if options.init_schema {
            crate::schema::init_schema(&conn)?;
        }
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn introspect(&self) -> Result<SchemaDescriptor, StorageError> {
        SchemaDescriptor::introspect(&self.conn)
    }

    /// Begin a write transaction, taking the write lock up front.
    pub fn transaction(&mut self) -> Result<Transaction<'_>, StorageError> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }

    pub fn count_rows(&self, table: Table) -> Result<u64, StorageError> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table.name()),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    pub fn get_system(&self, asset_number: &str) -> Result<Option<SystemRecord>, StorageError> {
        let record = self
            .conn
            .query_row(
                "SELECT * FROM Systems WHERE AssetNumber = ?1",
                [asset_number],
                |row| {
                    Ok(SystemRecord {
                        asset_number: row.get("AssetNumber")?,
                        host_name: row.get("HostName")?,
                        uuid: tolerant(row, "UUID")?,
                        serial_number: tolerant(row, "SerialNumber")?,
                        os_name: tolerant(row, "OSName")?,
                        os_version: tolerant(row, "OSVersion")?,
                        os_build: tolerant(row, "OSBuild")?,
                        boot_time: timestamp(row, "BootTime")?,
                        bios_version: tolerant(row, "BIOSVersion")?,
                        scan_date: timestamp(row, "ScanDate")?.ok_or(
                            rusqlite::Error::InvalidColumnType(
                                0,
                                "ScanDate".into(),
                                rusqlite::types::Type::Null,
                            ),
                        )?,
                        ps_version: tolerant(row, "PSVersion")?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    pub fn get_hardware(&self, asset_number: &str) -> Result<Option<HardwareRecord>, StorageError> {
        let record = self
            .conn
            .query_row(
                "SELECT * FROM Hardware WHERE AssetNumber = ?1",
                [asset_number],
                |row| {
                    Ok(HardwareRecord {
                        hardware_id: HardwareId::from_raw(row.get("HardwareID")?),
                        asset_number: row.get("AssetNumber")?,
                        cpu_name: tolerant(row, "CPUName")?,
                        cpu_cores: tolerant(row, "CPUCores")?,
                        total_ram_gb: tolerant(row, "TotalRAMGB")?,
                        gpu_name: tolerant(row, "GPUName")?,
                        gpu_ram_gb: tolerant(row, "GPURAMGB")?,
                        gpu_driver_version: tolerant(row, "GPUDriverVersion")?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    pub fn get_disks(&self, hardware_id: HardwareId) -> Result<Vec<DiskRecord>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM Disks WHERE HardwareID = ?1 ORDER BY DeviceID")?;
        let disks = stmt
            .query_map([hardware_id.get()], |row| {
                Ok(DiskRecord {
                    hardware_id: HardwareId::from_raw(row.get("HardwareID")?),
                    device_id: row.get("DeviceID")?,
                    volume_name: tolerant(row, "VolumeName")?,
                    size_gb: tolerant(row, "SizeGB")?,
                    free_gb: tolerant(row, "FreeGB")?,
                    disk_type: tolerant(row, "DiskType")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(disks)
    }

    pub fn get_network_adapters(
        &self,
        asset_number: &str,
    ) -> Result<Vec<NetworkRecord>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM NetworkAdapters WHERE AssetNumber = ?1 ORDER BY MacAddress")?;
        let adapters = stmt
            .query_map([asset_number], |row| {
                Ok(NetworkRecord {
                    asset_number: row.get("AssetNumber")?,
                    mac_address: row.get("MacAddress")?,
                    adapter_name: tolerant(row, "AdapterName")?,
                    ip_address: tolerant(row, "IPAddress")?,
                    subnet_mask: tolerant(row, "SubnetMask")?,
                    dns_servers: tolerant(row, "DNSServers")?,
                    dhcp_enabled: tolerant::<bool>(row, "DHCPEnabled")?.unwrap_or(false),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(adapters)
    }

    /// Applications first, then hotfixes, each ordered by name.
    pub fn get_software(&self, asset_number: &str) -> Result<Vec<SoftwareRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM Software WHERE AssetNumber = ?1
             ORDER BY IsApplication DESC, COALESCE(AppName, HotFixID)",
        )?;
        let software = stmt
            .query_map([asset_number], |row| {
                let is_application: bool = row.get("IsApplication")?;
                Ok(if is_application {
                    SoftwareRecord {
                        asset_number: row.get("AssetNumber")?,
                        kind: SoftwareKind::Application,
                        name: row.get("AppName")?,
                        version: tolerant(row, "AppVersion")?,
                        installed: timestamp(row, "InstallDate")?,
                    }
                } else {
                    SoftwareRecord {
                        asset_number: row.get("AssetNumber")?,
                        kind: SoftwareKind::Hotfix,
                        name: row.get("HotFixID")?,
                        version: None,
                        installed: timestamp(row, "InstalledOn")?,
                    }
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(software)
    }
}

/// Read a nullable column, treating a column the deployed table lacks as null.
fn tolerant<T: FromSql>(row: &Row, name: &str) -> rusqlite::Result<Option<T>> {
    match row.as_ref().column_index(name) {
        Ok(idx) => row.get(idx),
        Err(_) => Ok(None),
    }
}

fn timestamp(row: &Row, name: &str) -> rusqlite::Result<Option<NaiveDateTime>> {
    match tolerant::<String>(row, name)? {
        Some(text) => NaiveDateTime::parse_from_str(&text, TIMESTAMP_PARSE_FORMAT)
            .map(Some)
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
            }),
        None => Ok(None),
    }
}

/// Entity writer over one open transaction.
pub struct SqliteWriter<'a> {
    conn: &'a Connection,
    schema: &'a SchemaDescriptor,
}

impl<'a> SqliteWriter<'a> {
    /// `conn` is normally a `Transaction`, which derefs to `Connection`.
    pub fn new(conn: &'a Connection, schema: &'a SchemaDescriptor) -> Self {
        Self { conn, schema }
    }

    fn write(&self, row: RowWrite) -> Result<UpsertMode, StorageError> {
        upsert(self.conn, self.schema, row)
    }

    fn hardware_id(&self, asset_number: &str) -> Result<HardwareId, StorageError> {
        let key = [("AssetNumber", FieldValue::text(Some(asset_number)))];
        let params = bind_key_columns(Table::Hardware, &key)?;
        self.conn
            .query_row(
                "SELECT HardwareID FROM Hardware WHERE AssetNumber = ?1",
                params_from_iter(params.iter()),
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .map(HardwareId::from_raw)
            .ok_or_else(|| StorageError::HardwareKeyUnavailable {
                asset_number: asset_number.to_string(),
            })
    }
}

fn text(value: &Option<String>) -> FieldValue {
    FieldValue::text(value.as_deref())
}

impl InventoryWriter for SqliteWriter<'_> {
    fn upsert_system(&mut self, row: &SystemRow) -> Result<UpsertMode, StorageError> {
        self.write(
            RowWrite::new(Table::Systems)
                .key("AssetNumber", FieldValue::Text(row.asset_number.clone()))
                .value("HostName", text(&row.host_name))
                .value("UUID", text(&row.uuid))
                .value("SerialNumber", text(&row.serial_number))
                .value("OSName", text(&row.os_name))
                .value("OSVersion", text(&row.os_version))
                .value("OSArchitecture", text(&row.os_architecture))
                .value("OSBuild", text(&row.os_build))
                .value("Manufacturer", text(&row.manufacturer))
                .value("Model", text(&row.model))
                .value("BootTime", FieldValue::timestamp(row.boot_time))
                .value("BIOSVersion", text(&row.bios_version))
                .value("ScanDate", FieldValue::Timestamp(row.scan_date))
                .value("PSVersion", text(&row.ps_version)),
        )
    }

    fn upsert_hardware(
        &mut self,
        row: &HardwareRow,
    ) -> Result<(HardwareId, UpsertMode), StorageError> {
        let mode = self.write(
            RowWrite::new(Table::Hardware)
                .key("AssetNumber", FieldValue::Text(row.asset_number.clone()))
                .value("CPUName", text(&row.cpu_name))
                .value("CPUCores", FieldValue::integer(row.cpu_cores))
                .value("CPUThreads", FieldValue::integer(row.cpu_threads))
                .value("CPUClockSpeedMHz", FieldValue::integer(row.cpu_clock_mhz))
                .value("TotalRAMGB", FieldValue::decimal(row.total_ram_gb))
                .value("PageFileGB", FieldValue::decimal(row.page_file_gb))
                .value("RAMSticks", FieldValue::integer(row.ram_sticks))
                .value("GPUName", text(&row.gpu_name))
                .value("GPURAMGB", FieldValue::decimal(row.gpu_ram_gb))
                .value("GPUDriverVersion", text(&row.gpu_driver_version)),
        )?;
        Ok((self.hardware_id(&row.asset_number)?, mode))
    }

    fn upsert_disk(
        &mut self,
        hardware_id: HardwareId,
        device_id: &str,
        row: &DiskRow,
    ) -> Result<UpsertMode, StorageError> {
        self.write(
            RowWrite::new(Table::Disks)
                .key("HardwareID", FieldValue::Integer(hardware_id.get()))
                .key("DeviceID", FieldValue::text(Some(device_id)))
                .value("VolumeName", text(&row.volume_name))
                .value("SizeGB", FieldValue::decimal(row.size_gb))
                .value("FreeGB", FieldValue::decimal(row.free_gb))
                .value("DiskType", text(&row.disk_type)),
        )
    }

    fn upsert_network(&mut self, row: &NetworkRow) -> Result<UpsertMode, StorageError> {
        self.write(
            RowWrite::new(Table::NetworkAdapters)
                .key("AssetNumber", FieldValue::Text(row.asset_number.clone()))
                .key("MacAddress", FieldValue::Text(row.mac_address.clone()))
                .value("AdapterName", text(&row.adapter_name))
                .value("IPAddress", text(&row.ip_address))
                .value("SubnetMask", text(&row.subnet_mask))
                .value("DefaultGateway", text(&row.default_gateway))
                .value("DNSServers", text(&row.dns_servers))
                .value("DHCPEnabled", FieldValue::Boolean(row.dhcp_enabled))
                .value("DHCPServer", text(&row.dhcp_server)),
        )
    }

    fn upsert_application(
        &mut self,
        app_name: &str,
        row: &ApplicationRow,
    ) -> Result<UpsertMode, StorageError> {
        self.write(
            RowWrite::new(Table::Software)
                .key("AssetNumber", FieldValue::Text(row.asset_number.clone()))
                .key("IsApplication", FieldValue::Boolean(true))
                .key("AppName", FieldValue::text(Some(app_name)))
                .value("AppVersion", text(&row.app_version))
                .value("Publisher", text(&row.publisher))
                .value("InstallDate", FieldValue::timestamp(row.install_date)),
        )
    }

    fn upsert_hotfix(
        &mut self,
        hot_fix_id: &str,
        row: &HotfixRow,
    ) -> Result<UpsertMode, StorageError> {
        self.write(
            RowWrite::new(Table::Software)
                .key("AssetNumber", FieldValue::Text(row.asset_number.clone()))
                .key("IsApplication", FieldValue::Boolean(false))
                .key("HotFixID", FieldValue::text(Some(hot_fix_id)))
                .value("HotFixDescription", text(&row.description))
                .value("InstalledOn", FieldValue::timestamp(row.installed_on)),
        )
    }
}
