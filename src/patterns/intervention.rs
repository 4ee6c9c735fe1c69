// src/patterns/intervention.rs — Regular manual-intervention detection
//
// An isolation forest is fitted per device over (hour, weekday, weekend)
// features. The inliers, the actions too consistent to be random, are the
// ones reported: a person flipping the same switch at the same hour every
// day is an automation waiting to happen.

use chrono::FixedOffset;
use serde_json::json;
use std::collections::BTreeMap;

use super::isolation_forest::IsolationForest;
use super::{fixed_offset, group_by_device, LocalTime};
use crate::core::types::{is_controllable, EventRecord, PatternCandidate, PatternType};
use crate::infra::config::{DiscoveryConfig, InterventionConfig};

#[derive(Debug, Clone)]
pub struct InterventionDetector {
    pub contamination: f64,
    pub min_events: usize,
    pub min_occurrences: u32,
    pub min_confidence: f64,
    pub trees: usize,
    pub sample_size: usize,
    pub seed: u64,
    pub offset: FixedOffset,
}

impl InterventionDetector {
    pub fn from_config(discovery: &DiscoveryConfig, config: &InterventionConfig) -> Self {
        Self {
            contamination: discovery.contamination_rate,
            min_events: config.min_events,
            min_occurrences: config.min_occurrences,
            min_confidence: config.min_confidence,
            trees: config.trees,
            sample_size: config.sample_size,
            seed: config.seed,
            offset: fixed_offset(discovery.utc_offset_minutes),
        }
    }

    pub fn detect(&self, events: &[EventRecord]) -> Vec<PatternCandidate> {
        let mut patterns = Vec::new();
        for (device_id, device_events) in group_by_device(events) {
            patterns.extend(self.detect_device(device_id, &device_events));
        }
        patterns
    }

    pub fn detect_device(&self, device_id: &str, events: &[&EventRecord]) -> Vec<PatternCandidate> {
        let controllable = events.first().is_some_and(|e| is_controllable(&e.domain));
        if !controllable || events.len() < self.min_events {
            return Vec::new();
        }

        let times: Vec<LocalTime> = events
            .iter()
            .map(|e| LocalTime::at(e.timestamp, self.offset))
            .collect();
        let features: Vec<Vec<f64>> = times.iter().map(features_of).collect();

        let forest = IsolationForest::fit(&features, self.trees, self.sample_size, self.seed);
        let mask = forest.inliers(&features, self.contamination);
        let inlier_count = mask.iter().filter(|m| **m).count();

        // hour → (occurrences, weekday occurrences)
        let mut by_hour: BTreeMap<u32, (u32, u32)> = BTreeMap::new();
        for (t, _) in times.iter().zip(&mask).filter(|(_, inlier)| **inlier) {
            let slot = by_hour.entry(t.hour).or_default();
            slot.0 += 1;
            if !t.is_weekend() {
                slot.1 += 1;
            }
        }

        let total = events.len();
        let mut patterns = Vec::new();
        for (hour, (occurrences, weekday)) in by_hour {
            let confidence = (occurrences as f64 / total as f64).min(1.0);
            if occurrences < self.min_occurrences || confidence < self.min_confidence {
                continue;
            }

            let mut metadata = BTreeMap::new();
            metadata.insert("hour".into(), json!(hour));
            metadata.insert("inliers".into(), json!(inlier_count));
            metadata.insert("total_events".into(), json!(total));
            metadata.insert(
                "weekday_share".into(),
                json!(((weekday as f64 / occurrences as f64) * 100.0).round() / 100.0),
            );

            patterns.push(PatternCandidate {
                pattern_type: PatternType::ManualIntervention,
                devices: vec![device_id.to_string()],
                confidence,
                support: occurrences,
                metadata,
            });
        }
        patterns
    }
}

fn features_of(t: &LocalTime) -> Vec<f64> {
    vec![
        t.hour as f64 + t.minute as f64 / 60.0,
        t.weekday as f64,
        if t.is_weekend() { 1.0 } else { 0.0 },
    ]
}
