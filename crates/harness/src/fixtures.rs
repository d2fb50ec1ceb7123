use serde_json::{Value, json};

/// A complete, valid snapshot for `asset_number` with one disk, one adapter,
/// one application and one hotfix.
pub fn snapshot(asset_number: &str, host_name: &str) -> Value {
    SnapshotBuilder::new(asset_number, host_name).build()
}

/// Collector-shaped snapshot document with chainable tweaks.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    doc: Value,
}

impl SnapshotBuilder {
    pub fn new(asset_number: &str, host_name: &str) -> Self {
        let doc = json!({
            "AssetNumber": asset_number,
            "UUID": "4C4C4544-0042-3510-8051-B4C04F4D3432",
            "PSVersion": "5.1.19041.4170",
            "System": {
                "HostName": host_name,
                "OS": "Microsoft Windows 11 Pro",
                "Version": "10.0.22631",
                "Architecture": "64-bit",
                "Build": "22631",
                "Manufacturer": "Dell Inc.",
                "Model": "OptiPlex 7090",
                "BootTime": "2024-03-01T08:15:00",
                "BIOS": { "Version": "1.21.0", "Serial": "B5Q8M43" }
            },
            "Hardware": {
                "CPU": { "Name": "Intel(R) Core(TM) i7-10700 CPU @ 2.90GHz", "Cores": 8, "Threads": 16, "ClockSpeed": 2904 },
                "Memory": { "TotalGB": 15.79, "PageFileGB": 2.5, "Sticks": 2 },
                "Disks": [
                    { "DeviceID": "C:", "VolumeName": "OS", "SizeGB": 256, "FreeGB": 100, "Type": "Fixed" }
                ],
                "GPU": { "Name": "Intel(R) UHD Graphics 630", "AdapterRAMGB": 1, "DriverVersion": "31.0.101.2111" }
            },
            "Network": [
                {
                    "Name": "Eth0",
                    "MacAddress": "AA:BB:CC:DD:EE:01",
                    "IPAddress": ["10.20.30.40", "fe80::1"],
                    "SubnetMask": [24, 64],
                    "DefaultGateway": ["10.20.30.1"],
                    "DNSServers": ["10.20.0.10", "10.20.0.11"],
                    "DHCPEnabled": true,
                    "DHCPServer": "10.20.0.5"
                }
            ],
            "Software": {
                "InstalledApps": [
                    { "DisplayName": "7-Zip 23.01 (x64)", "DisplayVersion": "23.01", "Publisher": "Igor Pavlov", "InstallDate": "20240115" }
                ],
                "Hotfixes": [
                    { "HotFixID": "KB5034441", "Description": "Security Update", "InstalledOn": "1/16/2024" }
                ]
            }
        });
        Self { doc }
    }

    /// Replace the value at a `/`-separated JSON pointer, creating nothing.
    pub fn set(mut self, pointer: &str, value: Value) -> Self {
        if let Some(slot) = self.doc.pointer_mut(pointer) {
            *slot = value;
        }
        self
    }

    /// Remove a field from the object at `parent` (a JSON pointer, `""` for the root).
    pub fn remove(mut self, parent: &str, field: &str) -> Self {
        if let Some(Value::Object(map)) = self.doc.pointer_mut(parent) {
            map.remove(field);
        }
        self
    }

    pub fn host_name(self, host_name: &str) -> Self {
        self.set("/System/HostName", json!(host_name))
    }

    pub fn disks(self, disks: Value) -> Self {
        self.set("/Hardware/Disks", disks)
    }

    pub fn network(self, network: Value) -> Self {
        self.set("/Network", network)
    }

    pub fn apps(self, apps: Value) -> Self {
        self.set("/Software/InstalledApps", apps)
    }

    pub fn build(self) -> Value {
        self.doc
    }
}
