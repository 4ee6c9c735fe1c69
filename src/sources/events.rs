// src/sources/events.rs — Event window loader (JSON array or JSON lines)

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::path::Path;

use super::{domain_of, json_records, LoadReport};
use crate::core::types::EventRecord;
use crate::infra::errors::SynergyError;

/// States that carry no behavioural signal.
const IGNORED_STATES: &[&str] = &["unavailable", "unknown"];

fn parse_record(v: &Value) -> Option<EventRecord> {
    let device_id = v.get("device_id").or_else(|| v.get("entity_id"))?.as_str()?;
    if device_id.is_empty() {
        return None;
    }
    let raw_ts = v.get("timestamp").or_else(|| v.get("last_changed"))?.as_str()?;
    let timestamp = DateTime::parse_from_rfc3339(raw_ts).ok()?.with_timezone(&Utc);
    let state = match v.get("state") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => (if *b { "on" } else { "off" }).to_string(),
        _ => return None,
    };
    if IGNORED_STATES.contains(&state.as_str()) {
        return None;
    }
    let domain = match v.get("domain").and_then(Value::as_str) {
        Some(d) if !d.is_empty() => d.to_string(),
        _ => domain_of(device_id).to_string(),
    };
    Some(EventRecord::new(device_id, timestamp, state, domain))
}

/// Parse events, dropping malformed records, and return them in timestamp
/// order (stable for equal timestamps).
pub fn parse_events(text: &str) -> Result<(Vec<EventRecord>, LoadReport), SynergyError> {
    let records = json_records(text)?;
    let mut report = LoadReport::default();
    let mut events = Vec::with_capacity(records.len());
    for record in &records {
        match parse_record(record) {
            Some(e) => events.push(e),
            None => report.dropped += 1,
        }
    }
    events.sort_by_key(|e| e.timestamp);
    report.accepted = events.len();
    Ok((events, report))
}

/// Load the event window. An unreadable file is fatal.
pub fn load_events(path: &Path) -> Result<(Vec<EventRecord>, LoadReport), SynergyError> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))
        .map_err(|e| SynergyError::EventSource(format!("{e:#}")))?;
    let (events, report) = parse_events(&text)
        .map_err(|e| SynergyError::EventSource(format!("{}: {e}", path.display())))?;
    report.log("events");
    Ok((events, report))
}
