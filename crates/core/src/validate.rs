use crate::error::CoreError;
use crate::snapshot::SnapshotDocument;

/// Check that a decoded snapshot carries every field the writer depends on.
///
/// All missing paths are collected into one error. A missing section is
/// reported once by its own path; its children are not listed separately.
pub fn validate_snapshot(doc: &SnapshotDocument) -> Result<(), CoreError> {
    let mut missing = Vec::new();

    if is_blank(doc.asset_number.as_deref()) {
        missing.push("AssetNumber".to_string());
    }

    match &doc.system {
        None => missing.push("System".into()),
        Some(system) => {
            if is_blank(system.host_name.as_deref()) {
                missing.push("System.HostName".into());
            }
            if is_blank(system.os.as_deref()) {
                missing.push("System.OS".into());
            }
            match &system.bios {
                None => missing.push("System.BIOS".into()),
                Some(bios) if is_blank(bios.serial.as_deref()) => {
                    missing.push("System.BIOS.Serial".into());
                }
                Some(_) => {}
            }
        }
    }

    match &doc.hardware {
        None => missing.push("Hardware".into()),
        Some(hardware) => {
            let cpu_name = hardware.cpu.as_ref().and_then(|c| c.name.as_deref());
            if is_blank(cpu_name) {
                missing.push("Hardware.CPU.Name".into());
            }
            let total = hardware.memory.as_ref().and_then(|m| m.total_gb.as_ref());
            if total.is_none_or(|v| v.is_null() || v.as_str().is_some_and(|s| s.trim().is_empty())) {
                missing.push("Hardware.Memory.TotalGB".into());
            }
        }
    }

    match &doc.network {
        None => missing.push("Network".into()),
        Some(adapters) => {
            for (i, adapter) in adapters.iter().enumerate() {
                if is_blank(adapter.mac_address.as_deref()) {
                    missing.push(format!("Network[{i}].MacAddress"));
                }
                if is_blank(adapter.name.as_deref()) {
                    missing.push(format!("Network[{i}].Name"));
                }
            }
        }
    }

    if doc.software.is_none() {
        missing.push("Software".into());
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(CoreError::MissingFields {
            asset_number: doc.asset_number.clone(),
            missing,
        })
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|s| s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn complete() -> serde_json::Value {
        json!({
            "AssetNumber": "07001010001",
            "System": {"HostName": "PT-A1", "OS": "Windows 11", "BIOS": {"Serial": "B5Q8M43"}},
            "Hardware": {"CPU": {"Name": "i7-10700"}, "Memory": {"TotalGB": 16}},
            "Network": [{"Name": "Eth0", "MacAddress": "AA:BB:CC:DD:EE:01"}],
            "Software": {"InstalledApps": []}
        })
    }

    fn missing_of(value: serde_json::Value) -> Vec<String> {
        let doc: SnapshotDocument = serde_json::from_value(value).unwrap();
        match validate_snapshot(&doc) {
            Ok(()) => Vec::new(),
            Err(CoreError::MissingFields { missing, .. }) => missing,
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn complete_snapshot_passes() {
        assert!(missing_of(complete()).is_empty());
    }

    #[test]
    fn reports_every_missing_path() {
        let mut doc = complete();
        doc["System"]["BIOS"] = json!({"Version": "1.0"});
        doc["Hardware"]["Memory"] = json!({"PageFileGB": 2});
        assert_eq!(
            missing_of(doc),
            vec!["System.BIOS.Serial", "Hardware.Memory.TotalGB"]
        );
    }

    #[test]
    fn missing_sections_are_reported_once() {
        let missing = missing_of(json!({"AssetNumber": "  "}));
        assert_eq!(
            missing,
            vec!["AssetNumber", "System", "Hardware", "Network", "Software"]
        );
    }

    #[test]
    fn missing_bios_section_is_not_split() {
        let mut doc = complete();
        doc["System"].as_object_mut().unwrap().remove("BIOS");
        assert_eq!(missing_of(doc), vec!["System.BIOS"]);
    }

    #[test]
    fn each_adapter_is_checked() {
        let mut doc = complete();
        doc["Network"] = json!([
            {"Name": "Eth0", "MacAddress": "AA:BB:CC:DD:EE:01"},
            {"Name": "", "MacAddress": null},
        ]);
        assert_eq!(
            missing_of(doc),
            vec!["Network[1].MacAddress", "Network[1].Name"]
        );
    }

    #[test]
    fn blank_values_count_as_missing() {
        let mut doc = complete();
        doc["System"]["HostName"] = json!("   ");
        doc["Hardware"]["Memory"]["TotalGB"] = json!("");
        doc["Hardware"]["CPU"] = json!({});
        assert_eq!(
            missing_of(doc),
            vec!["System.HostName", "Hardware.CPU.Name", "Hardware.Memory.TotalGB"]
        );
    }

    #[test]
    fn error_carries_asset_number() {
        let mut doc = complete();
        doc.as_object_mut().unwrap().remove("Software");
        let doc: SnapshotDocument = serde_json::from_value(doc).unwrap();
        let err = validate_snapshot(&doc).unwrap_err();
        assert_eq!(err.asset_number(), Some("07001010001"));
        assert_eq!(err.to_string(), "snapshot is missing required fields: Software");
    }
}
