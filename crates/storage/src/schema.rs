use std::time::Duration;

use rusqlite::Connection;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

/// Per-connection settings. Applied to every connection the pipeline opens.
pub fn configure_connection(conn: &Connection, busy_timeout: Duration) -> Result<(), StorageError> {
    conn.busy_timeout(busy_timeout)?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA cache_size = -32000;
    ",
    )?;
    Ok(())
}

/// Create any missing target tables. Existing tables are left as deployed,
/// whatever columns they have.
pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, unixepoch())",
        [SCHEMA_VERSION],
    )?;
    Ok(())
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS Systems (
    AssetNumber NVARCHAR(50) PRIMARY KEY,
    HostName NVARCHAR(100) NOT NULL,
    UUID NVARCHAR(50),
    SerialNumber NVARCHAR(100),
    OSName NVARCHAR(100),
    OSVersion NVARCHAR(50),
    OSArchitecture NVARCHAR(20),
    OSBuild NVARCHAR(50),
    Manufacturer NVARCHAR(100),
    Model NVARCHAR(100),
    BootTime DATETIME,
    BIOSVersion NVARCHAR(100),
    ScanDate DATETIME NOT NULL,
    PSVersion NVARCHAR(20)
);

CREATE TABLE IF NOT EXISTS Hardware (
    HardwareID INTEGER PRIMARY KEY AUTOINCREMENT,
    AssetNumber NVARCHAR(50) NOT NULL UNIQUE REFERENCES Systems (AssetNumber),
    CPUName NVARCHAR(200),
    CPUCores INTEGER,
    CPUThreads INTEGER,
    CPUClockSpeedMHz INTEGER,
    TotalRAMGB DECIMAL(6,2),
    PageFileGB DECIMAL(6,2),
    RAMSticks INTEGER,
    GPUName NVARCHAR(200),
    GPURAMGB DECIMAL(6,2),
    GPUDriverVersion NVARCHAR(50)
);

CREATE TABLE IF NOT EXISTS Disks (
    HardwareID INTEGER NOT NULL REFERENCES Hardware (HardwareID),
    DeviceID NVARCHAR(10) NOT NULL,
    VolumeName NVARCHAR(100),
    SizeGB DECIMAL(10,2),
    FreeGB DECIMAL(10,2),
    DiskType NVARCHAR(20),
    PRIMARY KEY (HardwareID, DeviceID)
);

CREATE TABLE IF NOT EXISTS NetworkAdapters (
    AssetNumber NVARCHAR(50) NOT NULL REFERENCES Systems (AssetNumber),
    MacAddress NVARCHAR(30) NOT NULL,
    AdapterName NVARCHAR(200),
    IPAddress NVARCHAR(200),
    SubnetMask NVARCHAR(50),
    DefaultGateway NVARCHAR(200),
    DNSServers NVARCHAR(500),
    DHCPEnabled BOOLEAN NOT NULL DEFAULT 0,
    DHCPServer NVARCHAR(50),
    PRIMARY KEY (AssetNumber, MacAddress)
);

CREATE TABLE IF NOT EXISTS Software (
    SoftwareID INTEGER PRIMARY KEY AUTOINCREMENT,
    AssetNumber NVARCHAR(50) NOT NULL REFERENCES Systems (AssetNumber),
    IsApplication BOOLEAN NOT NULL,
    AppName NVARCHAR(300),
    AppVersion NVARCHAR(100),
    Publisher NVARCHAR(200),
    InstallDate DATETIME,
    HotFixID NVARCHAR(50),
    HotFixDescription NVARCHAR(200),
    InstalledOn DATETIME,
    CHECK ((IsApplication = 1 AND AppName IS NOT NULL) OR (IsApplication = 0 AND HotFixID IS NOT NULL))
);
CREATE UNIQUE INDEX IF NOT EXISTS ux_software_app ON Software (AssetNumber, AppName) WHERE IsApplication = 1;
CREATE UNIQUE INDEX IF NOT EXISTS ux_software_hotfix ON Software (AssetNumber, HotFixID) WHERE IsApplication = 0;
";
