// src/core/types.rs — Core domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// One device state change. Read-only once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub state: String,
    pub domain: String,
}

impl EventRecord {
    pub fn new(
        device_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        state: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            timestamp,
            state: state.into(),
            domain: domain.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub device_id: String,
    pub friendly_name: String,
    pub domain: String,
    #[serde(default)]
    pub area_id: Option<String>,
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
}

impl DeviceDescriptor {
    /// "hall light in hallway"; the area is omitted for unplaced devices.
    pub fn describe(&self) -> String {
        let name = self.friendly_name.to_lowercase();
        match &self.area_id {
            Some(area) => format!("{name} in {}", area.replace('_', " ")),
            None => name,
        }
    }
}

/// Device descriptors keyed by id, iterated in id order.
#[derive(Debug, Clone, Default)]
pub struct DeviceInventory {
    devices: BTreeMap<String, DeviceDescriptor>,
}

impl DeviceInventory {
    /// Build from descriptors; the first descriptor for a duplicated id wins.
    pub fn new(descriptors: impl IntoIterator<Item = DeviceDescriptor>) -> Self {
        let mut devices = BTreeMap::new();
        for d in descriptors {
            devices.entry(d.device_id.clone()).or_insert(d);
        }
        Self { devices }
    }

    pub fn get(&self, device_id: &str) -> Option<&DeviceDescriptor> {
        self.devices.get(device_id)
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.devices.contains_key(device_id)
    }

    pub fn area_of(&self, device_id: &str) -> Option<&str> {
        self.get(device_id).and_then(|d| d.area_id.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceDescriptor> {
        self.devices.values()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// An existing automation linking two devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pub device_a: String,
    pub device_b: String,
    pub automation_id: String,
    pub relationship_kind: String,
}

/// Undirected device pair, always stored in sorted order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey(String, String);

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self(a.to_string(), b.to_string())
        } else {
            Self(b.to_string(), a.to_string())
        }
    }

    pub fn first(&self) -> &str {
        &self.0
    }

    pub fn second(&self) -> &str {
        &self.1
    }
}

/// The already-automated exclusion set. Built once, only consulted afterwards.
#[derive(Debug, Clone, Default)]
pub struct RelationshipIndex {
    pairs: HashMap<PairKey, Vec<RelationshipEdge>>,
}

impl RelationshipIndex {
    pub fn from_edges(edges: impl IntoIterator<Item = RelationshipEdge>) -> Self {
        let mut pairs: HashMap<PairKey, Vec<RelationshipEdge>> = HashMap::new();
        for edge in edges {
            if edge.device_a == edge.device_b {
                continue;
            }
            pairs
                .entry(PairKey::new(&edge.device_a, &edge.device_b))
                .or_default()
                .push(edge);
        }
        Self { pairs }
    }

    pub fn contains(&self, a: &str, b: &str) -> bool {
        self.pairs.contains_key(&PairKey::new(a, b))
    }

    pub fn edges_for(&self, a: &str, b: &str) -> &[RelationshipEdge] {
        self.pairs
            .get(&PairKey::new(a, b))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Which detector (or the explorer) produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    TimeOfDay,
    CoOccurrence,
    ManualIntervention,
    Synergy,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TimeOfDay => "time_of_day",
            Self::CoOccurrence => "co_occurrence",
            Self::ManualIntervention => "manual_intervention",
            Self::Synergy => "synergy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    pub fn penalty(&self) -> f64 {
        match self {
            Self::Low => 0.0,
            Self::Medium => 0.1,
            Self::High => 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Energy,
    Comfort,
    Security,
    Convenience,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Energy,
        Category::Comfort,
        Category::Security,
        Category::Convenience,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Energy => "energy",
            Self::Comfort => "comfort",
            Self::Security => "security",
            Self::Convenience => "convenience",
        }
    }

    /// Exact literal match only; anything else is not a category.
    pub fn parse_literal(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

/// A statistically supported regularity found by one of the detectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternCandidate {
    pub pattern_type: PatternType,
    pub devices: Vec<String>,
    pub confidence: f64,
    pub support: u32,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// A device chain from graph exploration, scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynergyCandidate {
    pub path: Vec<String>,
    pub hop_count: usize,
    pub area_span: BTreeSet<String>,
    pub impact_score: f64,
    pub complexity: Complexity,
    pub category: Category,
    pub description: String,
}

impl SynergyCandidate {
    pub fn endpoints(&self) -> Option<(&str, &str)> {
        match (self.path.first(), self.path.last()) {
            (Some(a), Some(b)) => Some((a.as_str(), b.as_str())),
            _ => None,
        }
    }
}

/// Anything the balancer can rank.
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    Pattern(PatternCandidate),
    Synergy(SynergyCandidate),
}

impl Candidate {
    pub fn kind(&self) -> PatternType {
        match self {
            Self::Pattern(p) => p.pattern_type,
            Self::Synergy(_) => PatternType::Synergy,
        }
    }

    pub fn devices(&self) -> &[String] {
        match self {
            Self::Pattern(p) => &p.devices,
            Self::Synergy(s) => &s.path,
        }
    }
}

/// The engine's only output artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    #[serde(rename = "type")]
    pub suggestion_type: PatternType,
    pub title: String,
    pub description: String,
    pub confidence: f64,
    pub category: Category,
    pub complexity: Complexity,
    pub devices_involved: Vec<String>,
    pub unified_score: f64,
}

/// Domains a user (or an automation) can actually act on.
pub const CONTROLLABLE_DOMAINS: &[&str] = &[
    "light",
    "switch",
    "fan",
    "cover",
    "climate",
    "lock",
    "media_player",
    "input_boolean",
    "scene",
    "script",
    "vacuum",
    "water_heater",
    "humidifier",
];

pub fn is_controllable(domain: &str) -> bool {
    CONTROLLABLE_DOMAINS.contains(&domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(a: &str, b: &str) -> RelationshipEdge {
        RelationshipEdge {
            device_a: a.into(),
            device_b: b.into(),
            automation_id: "auto-1".into(),
            relationship_kind: "trigger_action".into(),
        }
    }

    #[test]
    fn test_pair_key_is_order_independent() {
        assert_eq!(PairKey::new("b", "a"), PairKey::new("a", "b"));
        assert_eq!(PairKey::new("b", "a").first(), "a");
    }

    #[test]
    fn test_relationship_index_lookup_both_directions() {
        let idx = RelationshipIndex::from_edges(vec![edge("light.hall", "binary_sensor.motion")]);
        assert!(idx.contains("light.hall", "binary_sensor.motion"));
        assert!(idx.contains("binary_sensor.motion", "light.hall"));
        assert!(!idx.contains("light.hall", "light.kitchen"));
        assert_eq!(idx.edges_for("binary_sensor.motion", "light.hall").len(), 1);
    }

    #[test]
    fn test_relationship_index_groups_edges_per_pair() {
        let idx = RelationshipIndex::from_edges(vec![edge("a", "b"), edge("b", "a"), edge("a", "a")]);
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.edges_for("a", "b").len(), 2);
    }

    #[test]
    fn test_inventory_keeps_first_duplicate() {
        let d1 = DeviceDescriptor {
            device_id: "light.x".into(),
            friendly_name: "First".into(),
            domain: "light".into(),
            area_id: None,
            capabilities: BTreeSet::new(),
        };
        let mut d2 = d1.clone();
        d2.friendly_name = "Second".into();
        let inv = DeviceInventory::new(vec![d1, d2]);
        assert_eq!(inv.len(), 1);
        assert_eq!(inv.get("light.x").unwrap().friendly_name, "First");
    }

    #[test]
    fn test_describe_includes_area() {
        let d = DeviceDescriptor {
            device_id: "binary_sensor.motion".into(),
            friendly_name: "Motion Sensor".into(),
            domain: "binary_sensor".into(),
            area_id: Some("living_room".into()),
            capabilities: BTreeSet::new(),
        };
        assert_eq!(d.describe(), "motion sensor in living room");
    }

    #[test]
    fn test_category_literal_parse_is_strict() {
        assert_eq!(Category::parse_literal("security"), Some(Category::Security));
        assert_eq!(Category::parse_literal("Security"), None);
        assert_eq!(Category::parse_literal("safety"), None);
    }

    #[test]
    fn test_complexity_penalties() {
        assert_eq!(Complexity::Low.penalty(), 0.0);
        assert!((Complexity::Medium.penalty() - 0.1).abs() < 1e-9);
        assert!((Complexity::High.penalty() - 0.3).abs() < 1e-9);
    }
}
