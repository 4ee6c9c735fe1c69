// src/patterns/cooccurrence.rs — Device co-occurrence mining within a sliding window
//
// The forward scan is O(n·w) with w the average window occupancy, which makes
// this the dominant cost of a run. Above `max_events` the input is reduced
// first: everything from the last `recent_days` is kept and older events are
// uniformly subsampled with a seeded RNG.

use chrono::Duration;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::core::types::{EventRecord, PairKey, PatternCandidate, PatternType};
use crate::infra::config::{CooccurrenceConfig, DiscoveryConfig};

#[derive(Debug, Clone)]
pub struct CooccurrenceDetector {
    pub window: Duration,
    pub min_support: u32,
    pub min_confidence: f64,
    pub max_events: usize,
    pub recent_days: i64,
    pub sample_seed: u64,
}

#[derive(Debug, Default, Clone, Copy)]
struct PairStats {
    count: u32,
    gap_secs: f64,
    /// Times the pair's first (sorted) device fired before the second.
    first_leads: u32,
}

impl CooccurrenceDetector {
    pub fn from_config(discovery: &DiscoveryConfig, config: &CooccurrenceConfig) -> Self {
        Self {
            window: Duration::minutes(discovery.time_window_minutes as i64),
            min_support: discovery.min_support,
            min_confidence: config.min_confidence,
            max_events: config.max_events,
            recent_days: config.recent_days,
            sample_seed: config.sample_seed,
        }
    }

    pub fn detect(&self, events: &[EventRecord]) -> Vec<PatternCandidate> {
        let (retained, sampled) = self.retain(events);
        if sampled {
            tracing::info!(
                original = events.len(),
                retained = retained.len(),
                "Co-occurrence input subsampled"
            );
        }

        let mut device_counts: HashMap<&str, u32> = HashMap::new();
        for e in &retained {
            *device_counts.entry(e.device_id.as_str()).or_default() += 1;
        }

        let pairs = self.scan(&retained);

        // BTreeMap iteration keeps the output order stable
        let sorted: BTreeMap<PairKey, PairStats> = pairs.into_iter().collect();
        let mut patterns = Vec::new();
        for (key, stats) in sorted {
            if stats.count < self.min_support {
                continue;
            }
            let count_a = device_counts.get(key.first()).copied().unwrap_or(0);
            let count_b = device_counts.get(key.second()).copied().unwrap_or(0);
            let denom = count_a.min(count_b).max(1);
            let confidence = (stats.count as f64 / denom as f64).min(1.0);
            if confidence < self.min_confidence {
                continue;
            }

            let leader = if stats.first_leads * 2 >= stats.count {
                key.first()
            } else {
                key.second()
            };

            let mut metadata = BTreeMap::new();
            metadata.insert(
                "avg_gap_seconds".into(),
                json!((stats.gap_secs / stats.count as f64).round()),
            );
            metadata.insert("leader".into(), json!(leader));
            metadata.insert("window_minutes".into(), json!(self.window.num_minutes()));
            metadata.insert("sampled".into(), json!(sampled));

            patterns.push(PatternCandidate {
                pattern_type: PatternType::CoOccurrence,
                devices: vec![key.first().to_string(), key.second().to_string()],
                confidence,
                support: stats.count,
                metadata,
            });
        }
        patterns
    }

    /// Forward scan: each anchor event counts every other device seen within
    /// the window after it, at most once per partner device.
    fn scan<'a>(&self, events: &[&'a EventRecord]) -> HashMap<PairKey, PairStats> {
        let mut pairs: HashMap<PairKey, PairStats> = HashMap::new();
        let mut seen: HashSet<&'a str> = HashSet::new();

        for (i, anchor) in events.iter().enumerate() {
            seen.clear();
            for other in &events[i + 1..] {
                let gap = other.timestamp - anchor.timestamp;
                if gap > self.window {
                    break;
                }
                if other.device_id == anchor.device_id || !seen.insert(other.device_id.as_str()) {
                    continue;
                }
                let key = PairKey::new(&anchor.device_id, &other.device_id);
                let anchor_first = key.first() == anchor.device_id;
                let stats = pairs.entry(key).or_default();
                stats.count += 1;
                stats.gap_secs += gap.num_milliseconds() as f64 / 1000.0;
                if anchor_first {
                    stats.first_leads += 1;
                }
            }
        }
        pairs
    }

    /// Mixed retention: keep all recent events, subsample the older tail.
    /// Returns the events in timestamp order and whether sampling applied.
    pub fn retain<'a>(&self, events: &'a [EventRecord]) -> (Vec<&'a EventRecord>, bool) {
        let mut sorted: Vec<&EventRecord> = events.iter().collect();
        sorted.sort_by_key(|e| e.timestamp);

        if sorted.len() <= self.max_events {
            return (sorted, false);
        }
        let Some(latest) = sorted.last().map(|e| e.timestamp) else {
            return (sorted, false);
        };

        // A window reaching past the representable range keeps everything.
        let Some(cutoff) = Duration::try_days(self.recent_days)
            .and_then(|window| latest.checked_sub_signed(window))
        else {
            return (sorted, false);
        };
        let split = sorted.partition_point(|e| e.timestamp < cutoff);
        let (older, recent) = sorted.split_at(split);

        let budget = self.max_events.saturating_sub(recent.len());
        if older.len() <= budget {
            return (sorted, false);
        }

        let mut rng = StdRng::seed_from_u64(self.sample_seed);
        let mut picks = rand::seq::index::sample(&mut rng, older.len(), budget).into_vec();
        picks.sort_unstable();

        let mut retained: Vec<&EventRecord> = Vec::with_capacity(budget + recent.len());
        retained.extend(picks.into_iter().map(|i| older[i]));
        retained.extend_from_slice(recent);
        (retained, true)
    }
}
