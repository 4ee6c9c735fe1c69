// src/ranking/render.rs — Candidate to user-facing suggestion

use serde_json::Value;
use std::collections::BTreeSet;
use uuid::Uuid;

use super::balancer::unified_score;
use crate::core::types::{
    is_controllable, Candidate, Category, Complexity, DeviceInventory, PatternCandidate,
    PatternType, Suggestion, SynergyCandidate,
};
use crate::synergy::classify::keyword_category;

/// Ranking inputs derived from one candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scores {
    pub confidence: f64,
    pub impact: f64,
    pub complexity: Complexity,
    pub unified: f64,
}

/// Pattern candidates have no impact score of their own; confidence stands in.
/// Synergy candidates carry impact only, which also serves as their confidence.
pub fn scores(candidate: &Candidate, inventory: &DeviceInventory) -> Scores {
    let (confidence, impact, complexity) = match candidate {
        Candidate::Pattern(p) => {
            let c = p.confidence.clamp(0.0, 1.0);
            (c, c, pattern_complexity(p, inventory))
        }
        Candidate::Synergy(s) => {
            let i = s.impact_score.clamp(0.0, 1.0);
            (i, i, s.complexity)
        }
    };
    Scores {
        confidence,
        impact,
        complexity,
        unified: unified_score(confidence, impact, complexity),
    }
}

fn pattern_complexity(p: &PatternCandidate, inventory: &DeviceInventory) -> Complexity {
    if p.pattern_type != PatternType::CoOccurrence {
        return Complexity::Low;
    }
    let areas: BTreeSet<&str> = p
        .devices
        .iter()
        .filter_map(|d| inventory.area_of(d))
        .collect();
    if areas.len() >= 2 {
        Complexity::Medium
    } else {
        Complexity::Low
    }
}

fn name<'a>(inventory: &'a DeviceInventory, device_id: &'a str) -> &'a str {
    inventory
        .get(device_id)
        .map(|d| d.friendly_name.as_str())
        .unwrap_or(device_id)
}

fn meta_str<'a>(p: &'a PatternCandidate, key: &str) -> Option<&'a str> {
    p.metadata.get(key).and_then(Value::as_str)
}

fn meta_u64(p: &PatternCandidate, key: &str) -> Option<u64> {
    p.metadata.get(key).and_then(Value::as_u64)
}

/// Deterministic id so reruns over the same data produce the same suggestions.
pub fn suggestion_id(kind: PatternType, devices: &[String], discriminator: &str) -> String {
    let name = format!(
        "synergy-miner:suggestion:{}:{}:{discriminator}",
        kind.as_str(),
        devices.join(",")
    );
    Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes()).to_string()
}

fn day_phrase(days: &str) -> &'static str {
    match days {
        "weekdays" => "on weekdays",
        "weekends" => "on weekends",
        _ => "every day",
    }
}

fn render_time_of_day(p: &PatternCandidate, inventory: &DeviceInventory) -> (String, String, String) {
    let device = p.devices.first().map(String::as_str).unwrap_or_default();
    let n = name(inventory, device);
    let time = meta_str(p, "typical_time").unwrap_or("--:--");
    let days = day_phrase(meta_str(p, "days").unwrap_or("daily"));
    let state = meta_str(p, "state").unwrap_or("on");
    let controllable = inventory
        .get(device)
        .map(|d| is_controllable(&d.domain))
        .unwrap_or(false);

    let title = match (controllable, state) {
        (true, "on") => format!("Turn on {n} around {time} {days}"),
        (true, "off") => format!("Turn off {n} around {time} {days}"),
        (true, other) => format!("Set {n} to {other} around {time} {days}"),
        (false, _) => format!("Use {n} activity around {time} {days}"),
    };
    let description = format!(
        "{n} changes to '{state}' around {time} {days} ({} of {} events).",
        p.support,
        meta_u64(p, "total_events").unwrap_or(u64::from(p.support))
    );
    let disc = meta_u64(p, "hour_start").map(|h| h.to_string()).unwrap_or_default();
    (title, description, disc)
}

fn render_cooccurrence(p: &PatternCandidate, inventory: &DeviceInventory) -> (String, String, String) {
    let a = p.devices.first().map(String::as_str).unwrap_or_default();
    let b = p.devices.get(1).map(String::as_str).unwrap_or_default();
    let leader = meta_str(p, "leader").unwrap_or(a);
    let follower = if leader == a { b } else { a };
    let window = meta_u64(p, "window_minutes").unwrap_or(5);
    let gap = p
        .metadata
        .get("avg_gap_seconds")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);

    let title = format!(
        "When {} changes, update {}",
        name(inventory, leader),
        name(inventory, follower)
    );
    let description = format!(
        "{} follows {} within {window} minutes ({} times, {gap:.0}s apart on average).",
        name(inventory, follower),
        name(inventory, leader),
        p.support
    );
    (title, description, String::new())
}

fn render_intervention(p: &PatternCandidate, inventory: &DeviceInventory) -> (String, String, String) {
    let device = p.devices.first().map(String::as_str).unwrap_or_default();
    let n = name(inventory, device);
    let hour = meta_u64(p, "hour").unwrap_or(0);
    let title = format!("Automate {n} at {hour:02}:00");
    let description = format!(
        "{n} is operated by hand around {hour:02}:00 with a regular rhythm ({} of {} events).",
        p.support,
        meta_u64(p, "total_events").unwrap_or(u64::from(p.support))
    );
    (title, description, hour.to_string())
}

fn render_synergy(s: &SynergyCandidate, inventory: &DeviceInventory) -> (String, String, String) {
    let (first, last) = s.endpoints().unwrap_or(("", ""));
    let title = if s.hop_count > 1 {
        let via = s.hop_count - 1;
        format!(
            "Connect {} to {} via {via} {}",
            name(inventory, first),
            name(inventory, last),
            if via == 1 { "device" } else { "devices" }
        )
    } else {
        format!(
            "Connect {} to {}",
            name(inventory, first),
            name(inventory, last)
        )
    };
    let description = format!("{} ({} opportunity).", s.description, s.category.as_str());
    (title, description, String::new())
}

fn pattern_category(p: &PatternCandidate, inventory: &DeviceInventory) -> Category {
    let text = p
        .devices
        .iter()
        .map(|d| match inventory.get(d) {
            Some(desc) => format!("{} {}", desc.describe(), desc.domain),
            None => d.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ");
    keyword_category(&text).unwrap_or(Category::Convenience)
}

pub fn render(candidate: &Candidate, scores: Scores, inventory: &DeviceInventory) -> Suggestion {
    let ((title, description, disc), category) = match candidate {
        Candidate::Pattern(p) => {
            let parts = match p.pattern_type {
                PatternType::TimeOfDay => render_time_of_day(p, inventory),
                PatternType::CoOccurrence => render_cooccurrence(p, inventory),
                _ => render_intervention(p, inventory),
            };
            (parts, pattern_category(p, inventory))
        }
        Candidate::Synergy(s) => (render_synergy(s, inventory), s.category),
    };

    Suggestion {
        id: suggestion_id(candidate.kind(), candidate.devices(), &disc),
        suggestion_type: candidate.kind(),
        title,
        description,
        confidence: scores.confidence,
        category,
        complexity: scores.complexity,
        devices_involved: candidate.devices().to_vec(),
        unified_score: scores.unified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DeviceDescriptor;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn inventory() -> DeviceInventory {
        let d = |id: &str, name: &str, area: &str| DeviceDescriptor {
            device_id: id.into(),
            friendly_name: name.into(),
            domain: id.split('.').next().unwrap_or("").into(),
            area_id: Some(area.into()),
            capabilities: BTreeSet::new(),
        };
        DeviceInventory::new(vec![
            d("light.hall", "Hall Light", "hall"),
            d("binary_sensor.motion", "Motion Sensor", "hall"),
            d("lock.front", "Front Door", "entrance"),
        ])
    }

    fn pattern(kind: PatternType, devices: &[&str], metadata: BTreeMap<String, Value>) -> Candidate {
        Candidate::Pattern(PatternCandidate {
            pattern_type: kind,
            devices: devices.iter().map(|s| s.to_string()).collect(),
            confidence: 0.8,
            support: 12,
            metadata,
        })
    }

    #[test]
    fn test_time_of_day_title() {
        let inv = inventory();
        let mut meta = BTreeMap::new();
        meta.insert("typical_time".to_string(), json!("07:15"));
        meta.insert("days".to_string(), json!("weekdays"));
        meta.insert("state".to_string(), json!("on"));
        meta.insert("hour_start".to_string(), json!(7));
        let c = pattern(PatternType::TimeOfDay, &["light.hall"], meta);
        let s = render(&c, scores(&c, &inv), &inv);
        assert_eq!(s.title, "Turn on Hall Light around 07:15 on weekdays");
        assert_eq!(s.category, Category::Convenience);
        assert!((s.unified_score - 0.64).abs() < 1e-9);
    }

    #[test]
    fn test_ids_are_stable_and_distinct() {
        let devices = vec!["light.hall".to_string()];
        let a = suggestion_id(PatternType::TimeOfDay, &devices, "7");
        assert_eq!(a, suggestion_id(PatternType::TimeOfDay, &devices, "7"));
        assert_ne!(a, suggestion_id(PatternType::TimeOfDay, &devices, "19"));
        assert_ne!(a, suggestion_id(PatternType::ManualIntervention, &devices, "7"));
    }

    #[test]
    fn test_cross_area_cooccurrence_is_medium() {
        let inv = inventory();
        let c = pattern(
            PatternType::CoOccurrence,
            &["binary_sensor.motion", "lock.front"],
            BTreeMap::new(),
        );
        let s = scores(&c, &inv);
        assert_eq!(s.complexity, Complexity::Medium);
        let rendered = render(&c, s, &inv);
        assert_eq!(rendered.category, Category::Security);
    }

    fn synergy(path: &[&str]) -> Candidate {
        Candidate::Synergy(SynergyCandidate {
            path: path.iter().map(|s| s.to_string()).collect(),
            hop_count: path.len() - 1,
            area_span: BTreeSet::from(["hall".to_string()]),
            impact_score: 0.7,
            complexity: Complexity::Medium,
            category: Category::Security,
            description: "motion sensor in hall, hall light in hall".into(),
        })
    }

    #[test]
    fn test_synergy_title_counts_intermediate_devices() {
        let inv = inventory();
        let direct = synergy(&["binary_sensor.motion", "light.hall"]);
        let one = synergy(&["binary_sensor.motion", "light.hall", "lock.front"]);
        let two = synergy(&["binary_sensor.motion", "light.hall", "switch.x", "lock.front"]);
        assert_eq!(
            render(&direct, scores(&direct, &inv), &inv).title,
            "Connect Motion Sensor to Hall Light"
        );
        assert_eq!(
            render(&one, scores(&one, &inv), &inv).title,
            "Connect Motion Sensor to Front Door via 1 device"
        );
        assert!(render(&two, scores(&two, &inv), &inv)
            .title
            .ends_with("via 2 devices"));
    }
}
