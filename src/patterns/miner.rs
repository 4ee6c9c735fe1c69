// src/patterns/miner.rs — Runs the detectors over one event window

use serde::Serialize;
use std::time::{Duration, Instant};

use super::{CooccurrenceDetector, InterventionDetector, TimeOfDayDetector};
use crate::core::types::{EventRecord, PatternCandidate};
use crate::infra::config::Config;

const TIME_OF_DAY_BUDGET: Duration = Duration::from_secs(300);
const COOCCURRENCE_BUDGET: Duration = Duration::from_secs(180);
const INTERVENTION_BUDGET: Duration = Duration::from_secs(120);

/// Runs the three statistical detectors, one after another.
pub struct PatternMiner {
    time_of_day: TimeOfDayDetector,
    cooccurrence: CooccurrenceDetector,
    intervention: InterventionDetector,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MiningStats {
    pub time_of_day: usize,
    pub cooccurrence: usize,
    pub intervention: usize,
    pub time_of_day_ms: u64,
    pub cooccurrence_ms: u64,
    pub intervention_ms: u64,
}

#[derive(Debug, Clone, Default)]
pub struct MiningOutput {
    /// Candidates in creation order: time-of-day, co-occurrence, intervention.
    pub candidates: Vec<PatternCandidate>,
    pub stats: MiningStats,
}

impl PatternMiner {
    pub fn new(config: &Config) -> Self {
        Self {
            time_of_day: TimeOfDayDetector::from_config(&config.discovery, &config.time_of_day),
            cooccurrence: CooccurrenceDetector::from_config(
                &config.discovery,
                &config.cooccurrence,
            ),
            intervention: InterventionDetector::from_config(
                &config.discovery,
                &config.intervention,
            ),
        }
    }

    /// Mine patterns from a timestamp-ordered event window.
    ///
    /// Detectors run sequentially so only one detector's working set is alive
    /// at a time; each stage's intermediate state is dropped before the next.
    pub fn mine(&self, events: &[EventRecord]) -> MiningOutput {
        let mut output = MiningOutput::default();

        // 1. Recurring times of day
        let (found, ms) = timed("time_of_day", TIME_OF_DAY_BUDGET, || {
            self.time_of_day.detect(events)
        });
        output.stats.time_of_day = found.len();
        output.stats.time_of_day_ms = ms;
        output.candidates.extend(found);

        // 2. Devices firing together
        let (found, ms) = timed("cooccurrence", COOCCURRENCE_BUDGET, || {
            self.cooccurrence.detect(events)
        });
        output.stats.cooccurrence = found.len();
        output.stats.cooccurrence_ms = ms;
        output.candidates.extend(found);

        // 3. Regular manual actions
        let (found, ms) = timed("intervention", INTERVENTION_BUDGET, || {
            self.intervention.detect(events)
        });
        output.stats.intervention = found.len();
        output.stats.intervention_ms = ms;
        output.candidates.extend(found);

        output
    }
}

fn timed<T>(stage: &str, budget: Duration, f: impl FnOnce() -> Vec<T>) -> (Vec<T>, u64) {
    let started = Instant::now();
    let out = f();
    let elapsed = started.elapsed();
    if elapsed > budget {
        tracing::warn!(
            stage,
            elapsed_ms = elapsed.as_millis() as u64,
            budget_ms = budget.as_millis() as u64,
            "Detector exceeded its time budget"
        );
    }
    tracing::info!(
        stage,
        candidates = out.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Detector finished"
    );
    (out, elapsed.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PatternType;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    #[test]
    fn test_mine_orders_by_detector() {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 7, 0, 0).unwrap();
        let mut events = Vec::new();
        for d in 0..14 {
            let t = start + ChronoDuration::days(d);
            events.push(EventRecord::new("binary_sensor.motion", t, "on", "binary_sensor"));
            events.push(EventRecord::new(
                "light.kitchen",
                t + ChronoDuration::seconds(20),
                "on",
                "light",
            ));
        }
        events.sort_by_key(|e| e.timestamp);

        let out = PatternMiner::new(&Config::default()).mine(&events);
        assert!(out.stats.time_of_day >= 1);
        assert_eq!(out.stats.cooccurrence, 1);
        assert!(out.stats.intervention >= 1);

        let kinds: Vec<PatternType> = out.candidates.iter().map(|c| c.pattern_type).collect();
        let mut sorted = kinds.clone();
        sorted.sort();
        assert_eq!(kinds, sorted);
    }

    #[test]
    fn test_empty_window() {
        let out = PatternMiner::new(&Config::default()).mine(&[]);
        assert!(out.candidates.is_empty());
    }
}
