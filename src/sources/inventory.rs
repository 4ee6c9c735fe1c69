// src/sources/inventory.rs — Device inventory loader

use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;

use super::{domain_of, json_records, LoadReport};
use crate::core::types::{DeviceDescriptor, DeviceInventory};
use crate::infra::errors::SynergyError;

fn parse_descriptor(v: &Value) -> Option<DeviceDescriptor> {
    let device_id = v.get("device_id").or_else(|| v.get("entity_id"))?.as_str()?;
    if device_id.is_empty() {
        return None;
    }
    let friendly_name = v
        .get("friendly_name")
        .or_else(|| v.get("name"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(device_id)
        .to_string();
    let domain = v
        .get("domain")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| domain_of(device_id))
        .to_string();
    let area_id = v
        .get("area_id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from);
    let capabilities: BTreeSet<String> = v
        .get("capabilities")
        .and_then(Value::as_array)
        .map(|caps| caps.iter().filter_map(Value::as_str).map(String::from).collect())
        .unwrap_or_default();

    Some(DeviceDescriptor {
        device_id: device_id.to_string(),
        friendly_name,
        domain,
        area_id,
        capabilities,
    })
}

pub fn parse_inventory(text: &str) -> Result<(DeviceInventory, LoadReport), SynergyError> {
    let records = json_records(text)?;
    let mut report = LoadReport::default();
    let mut descriptors = Vec::with_capacity(records.len());
    for record in &records {
        match parse_descriptor(record) {
            Some(d) => descriptors.push(d),
            None => report.dropped += 1,
        }
    }
    let inventory = DeviceInventory::new(descriptors);
    report.accepted = inventory.len();
    Ok((inventory, report))
}

/// Load the inventory. A missing or unreadable file is fatal.
pub fn load_inventory(path: &Path) -> Result<(DeviceInventory, LoadReport), SynergyError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| SynergyError::MissingInventory(format!("{}: {e}", path.display())))?;
    let (inventory, report) = parse_inventory(&text)
        .map_err(|e| SynergyError::MissingInventory(format!("{}: {e}", path.display())))?;
    report.log("inventory");
    Ok((inventory, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inventory_defaults() {
        let text = r#"[
            {"device_id": "light.hall", "friendly_name": "Hall Light", "area_id": "hall",
             "capabilities": ["brightness"]},
            {"entity_id": "sensor.temp", "area_id": ""},
            {"friendly_name": "No id"}
        ]"#;
        let (inv, report) = parse_inventory(text).unwrap();
        assert_eq!(report, LoadReport { accepted: 2, dropped: 1 });
        let hall = inv.get("light.hall").unwrap();
        assert_eq!(hall.domain, "light");
        assert!(hall.capabilities.contains("brightness"));
        let temp = inv.get("sensor.temp").unwrap();
        assert_eq!(temp.friendly_name, "sensor.temp");
        assert_eq!(temp.area_id, None);
    }

    #[test]
    fn test_missing_inventory_is_fatal() {
        let err = load_inventory(Path::new("/nonexistent/devices.json")).unwrap_err();
        assert!(matches!(err, SynergyError::MissingInventory(_)));
    }
}
