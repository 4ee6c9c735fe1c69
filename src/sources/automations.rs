// src/sources/automations.rs — Existing automations as the exclusion set

use serde::Deserialize;
use serde_json::Value as JsonValue;
use serde_yml::Value;
use std::collections::BTreeSet;
use std::path::Path;

use super::{json_records, LoadReport};
use crate::core::types::RelationshipEdge;
use crate::infra::errors::SynergyError;

pub const TRIGGER_ACTION: &str = "trigger_action";
pub const CO_ACTION: &str = "co_action";

#[derive(Debug, Deserialize)]
struct RawAutomation {
    id: Option<Value>,
    alias: Option<String>,
    #[serde(alias = "triggers")]
    trigger: Option<Value>,
    #[serde(alias = "conditions")]
    condition: Option<Value>,
    #[serde(alias = "actions")]
    action: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Entry {
    Automation(RawAutomation),
    Other(Value),
}

/// Collect every `entity_id` referenced anywhere under `value`.
fn collect_entities(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::Mapping(map) => {
            for (k, v) in map {
                if k.as_str() == Some("entity_id") {
                    push_entity_ids(v, out);
                } else {
                    collect_entities(v, out);
                }
            }
        }
        Value::Sequence(items) => {
            for item in items {
                collect_entities(item, out);
            }
        }
        _ => {}
    }
}

fn push_entity_ids(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::String(s) => {
            for id in s.split(',').map(str::trim) {
                if id.contains('.') {
                    out.insert(id.to_string());
                }
            }
        }
        Value::Sequence(items) => {
            for item in items {
                push_entity_ids(item, out);
            }
        }
        _ => {}
    }
}

fn automation_id(raw: &RawAutomation) -> Option<String> {
    let id = match &raw.id {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    id.or_else(|| raw.alias.clone().filter(|a| !a.is_empty()))
}

fn edges_for(raw: &RawAutomation) -> Option<Vec<RelationshipEdge>> {
    let id = automation_id(raw)?;

    let mut sources = BTreeSet::new();
    for section in [&raw.trigger, &raw.condition].into_iter().flatten() {
        collect_entities(section, &mut sources);
    }
    let mut targets = BTreeSet::new();
    if let Some(action) = &raw.action {
        collect_entities(action, &mut targets);
    }

    let edge = |a: &str, b: &str, kind: &str| RelationshipEdge {
        device_a: a.to_string(),
        device_b: b.to_string(),
        automation_id: id.clone(),
        relationship_kind: kind.to_string(),
    };

    let mut edges = Vec::new();
    for s in &sources {
        for t in targets.iter().filter(|t| *t != s) {
            edges.push(edge(s, t, TRIGGER_ACTION));
        }
    }
    let targets: Vec<&String> = targets.iter().collect();
    for (i, a) in targets.iter().enumerate() {
        for b in &targets[i + 1..] {
            edges.push(edge(a, b, CO_ACTION));
        }
    }

    if edges.is_empty() {
        None
    } else {
        Some(edges)
    }
}

/// Parse a Home-Assistant style `automations.yaml`.
pub fn parse_automations_yaml(text: &str) -> Result<(Vec<RelationshipEdge>, LoadReport), SynergyError> {
    let entries: Vec<Entry> = match serde_yml::from_str::<Option<Vec<Entry>>>(text)? {
        Some(entries) => entries,
        None => Vec::new(),
    };

    let mut report = LoadReport::default();
    let mut edges = Vec::new();
    for entry in &entries {
        let found = match entry {
            Entry::Automation(raw) => edges_for(raw),
            Entry::Other(_) => None,
        };
        match found {
            Some(found) => {
                report.accepted += 1;
                edges.extend(found);
            }
            None => report.dropped += 1,
        }
    }
    Ok((edges, report))
}

fn parse_edge(v: &JsonValue) -> Option<RelationshipEdge> {
    let a = v.get("device_a")?.as_str()?;
    let b = v.get("device_b")?.as_str()?;
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let text = |key: &str, fallback: &str| {
        v.get(key)
            .and_then(JsonValue::as_str)
            .unwrap_or(fallback)
            .to_string()
    };
    Some(RelationshipEdge {
        device_a: a.to_string(),
        device_b: b.to_string(),
        automation_id: text("automation_id", ""),
        relationship_kind: text("relationship_kind", TRIGGER_ACTION),
    })
}

/// Parse a JSON edge list.
pub fn parse_relationships_json(text: &str) -> Result<(Vec<RelationshipEdge>, LoadReport), SynergyError> {
    let mut report = LoadReport::default();
    let mut edges = Vec::new();
    for record in json_records(text)? {
        match parse_edge(&record) {
            Some(edge) => edges.push(edge),
            None => report.dropped += 1,
        }
    }
    report.accepted = edges.len();
    Ok((edges, report))
}

/// Load relationship edges; `.yaml` / `.yml` files are read as automation configs.
pub fn load_relationships(path: &Path) -> Result<(Vec<RelationshipEdge>, LoadReport), SynergyError> {
    let text = std::fs::read_to_string(path)?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let (edges, report) = if is_yaml {
        parse_automations_yaml(&text)?
    } else {
        parse_relationships_json(&text)?
    };
    report.log("relationships");
    Ok((edges, report))
}
