// src/patterns/time_of_day.rs — Recurring-time clustering per device

use chrono::FixedOffset;
use serde_json::json;
use std::collections::BTreeMap;

use super::{fixed_offset, group_by_device, LocalTime};
use crate::core::types::{EventRecord, PatternCandidate, PatternType};
use crate::infra::config::{DiscoveryConfig, TimeOfDayConfig};

/// Finds hours of the day at which a device reliably changes state.
#[derive(Debug, Clone)]
pub struct TimeOfDayDetector {
    pub min_support: u32,
    pub min_confidence: f64,
    pub min_events: usize,
    pub max_cluster_hours: usize,
    pub split_weekdays: bool,
    pub offset: FixedOffset,
}

impl TimeOfDayDetector {
    pub fn from_config(discovery: &DiscoveryConfig, config: &TimeOfDayConfig) -> Self {
        Self {
            min_support: discovery.min_support,
            min_confidence: discovery.min_confidence,
            min_events: config.min_events,
            max_cluster_hours: config.max_cluster_hours.clamp(1, 24),
            split_weekdays: config.split_weekdays,
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
        if events.len() < self.min_events {
            tracing::debug!(device_id, events = events.len(), "Too few events for time clustering");
            return Vec::new();
        }

        let times: Vec<LocalTime> = events
            .iter()
            .map(|e| LocalTime::at(e.timestamp, self.offset))
            .collect();

        let mut hist = [0u32; 24];
        for t in &times {
            hist[t.hour as usize] += 1;
        }

        let total = events.len();
        let mut patterns = Vec::new();
        for (start, width) in cluster_hours(&hist, total, self.max_cluster_hours) {
            let in_cluster: Vec<usize> = (0..total)
                .filter(|&i| hour_in_cluster(times[i].hour as usize, start, width))
                .collect();
            let occurrences = in_cluster.len() as u32;
            let confidence = (occurrences as f64 / total as f64).min(1.0);
            if occurrences < self.min_support || confidence < self.min_confidence {
                continue;
            }

            let (typical, spread) = typical_minute(&in_cluster, &times, start);
            let days = self.day_label(&in_cluster, &times);
            let dominant_state = dominant_state(&in_cluster, events);

            let mut metadata = BTreeMap::new();
            metadata.insert("hour_start".into(), json!(start));
            metadata.insert("hour_end".into(), json!((start + width - 1) % 24));
            metadata.insert(
                "typical_time".into(),
                json!(format!("{:02}:{:02}", typical / 60, typical % 60)),
            );
            metadata.insert("spread_minutes".into(), json!(spread.round()));
            metadata.insert("days".into(), json!(days));
            metadata.insert("state".into(), json!(dominant_state));
            metadata.insert("total_events".into(), json!(total));

            patterns.push(PatternCandidate {
                pattern_type: PatternType::TimeOfDay,
                devices: vec![device_id.to_string()],
                confidence,
                support: occurrences,
                metadata,
            });
        }
        patterns
    }

    fn day_label(&self, idx: &[usize], times: &[LocalTime]) -> &'static str {
        if !self.split_weekdays || idx.is_empty() {
            return "daily";
        }
        let weekend = idx.iter().filter(|&&i| times[i].is_weekend()).count() as f64;
        let share = weekend / idx.len() as f64;
        if share >= 0.9 {
            "weekends"
        } else if share <= 0.1 {
            "weekdays"
        } else {
            "daily"
        }
    }
}

/// Greedy density clustering on the circular 24-bucket histogram.
///
/// Buckets at or above the mean density seed clusters in descending count
/// order; a cluster grows towards its denser dense neighbour until it reaches
/// `max_width` hours. Returns `(start_hour, width)` pairs, densest first.
pub fn cluster_hours(hist: &[u32; 24], total: usize, max_width: usize) -> Vec<(usize, usize)> {
    let threshold = ((total as f64 / 24.0).ceil() as u32).max(2);
    let mut order: Vec<usize> = (0..24).collect();
    order.sort_by(|&a, &b| hist[b].cmp(&hist[a]).then(a.cmp(&b)));

    let mut used = [false; 24];
    let mut clusters = Vec::new();
    for seed in order {
        if used[seed] || hist[seed] < threshold {
            continue;
        }
        let mut start = seed;
        let mut width = 1;
        used[seed] = true;

        while width < max_width.min(24) {
            let left = (start + 23) % 24;
            let right = (start + width) % 24;
            let left_ok = !used[left] && hist[left] >= threshold;
            let right_ok = !used[right] && hist[right] >= threshold;
            match (left_ok, right_ok) {
                (true, true) if hist[left] >= hist[right] => {
                    start = left;
                    used[left] = true;
                }
                (_, true) => used[right] = true,
                (true, false) => {
                    start = left;
                    used[left] = true;
                }
                (false, false) => break,
            }
            width += 1;
        }
        clusters.push((start, width));
    }
    clusters
}

fn hour_in_cluster(hour: usize, start: usize, width: usize) -> bool {
    (hour + 24 - start) % 24 < width
}

/// Mean and standard deviation of minute-of-day, measured from the cluster
/// start so clusters spanning midnight average correctly.
fn typical_minute(idx: &[usize], times: &[LocalTime], start: usize) -> (u32, f64) {
    if idx.is_empty() {
        return (start as u32 * 60, 0.0);
    }
    let base = start as i64 * 60;
    let rel: Vec<f64> = idx
        .iter()
        .map(|&i| (times[i].minute_of_day() as i64 - base).rem_euclid(1440) as f64)
        .collect();
    let n = rel.len() as f64;
    let mean = rel.iter().sum::<f64>() / n;
    let var = rel.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let typical = ((base + mean.round() as i64).rem_euclid(1440)) as u32;
    (typical, var.sqrt())
}

fn dominant_state(idx: &[usize], events: &[&EventRecord]) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for &i in idx {
        *counts.entry(events[i].state.as_str()).or_default() += 1;
    }
    // ties resolve to the lexicographically smallest state
    counts
        .into_iter()
        .fold(None::<(&str, usize)>, |best, (state, n)| match best {
            Some((_, m)) if m >= n => best,
            _ => Some((state, n)),
        })
        .map(|(s, _)| s.to_string())
        .unwrap_or_default()
}
