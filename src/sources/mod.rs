// src/sources/mod.rs — Loading and validating engine inputs from files

pub mod automations;
pub mod events;
pub mod inventory;

use serde::Serialize;

pub use automations::{load_relationships, parse_automations_yaml};
pub use events::{load_events, parse_events};
pub use inventory::{load_inventory, parse_inventory};

/// Accepted vs. dropped record counts for one input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub accepted: usize,
    pub dropped: usize,
}

impl LoadReport {
    pub(crate) fn log(&self, source: &str) {
        if self.dropped > 0 {
            tracing::warn!(
                source,
                accepted = self.accepted,
                dropped = self.dropped,
                "Dropped malformed records"
            );
        } else {
            tracing::info!(source, accepted = self.accepted, "Loaded records");
        }
    }
}

/// Split a text blob into JSON values: a top-level array, or one value per line.
pub(crate) fn json_records(text: &str) -> Result<Vec<serde_json::Value>, serde_json::Error> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed);
    }
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| serde_json::from_str(l).unwrap_or(serde_json::Value::Null))
        .collect())
}

/// "light.kitchen" -> "light"
pub(crate) fn domain_of(device_id: &str) -> &str {
    device_id.split_once('.').map(|(d, _)| d).unwrap_or("")
}
