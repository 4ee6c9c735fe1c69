// src/patterns/mod.rs — Statistical pattern detectors over the event window

pub mod cooccurrence;
pub mod intervention;
pub mod isolation_forest;
pub mod miner;
pub mod time_of_day;

use chrono::{DateTime, Datelike, FixedOffset, Offset, Timelike, Utc};
use std::collections::BTreeMap;

use crate::core::types::EventRecord;

pub use cooccurrence::CooccurrenceDetector;
pub use intervention::InterventionDetector;
pub use isolation_forest::IsolationForest;
pub use miner::{MiningOutput, PatternMiner};
pub use time_of_day::TimeOfDayDetector;

/// Local wall-clock view of an event timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalTime {
    pub hour: u32,
    pub minute: u32,
    /// Monday = 0 … Sunday = 6
    pub weekday: u32,
}

impl LocalTime {
    pub fn at(ts: DateTime<Utc>, offset: FixedOffset) -> Self {
        let local = ts.with_timezone(&offset);
        Self {
            hour: local.hour(),
            minute: local.minute(),
            weekday: local.weekday().num_days_from_monday(),
        }
    }

    pub fn minute_of_day(&self) -> u32 {
        self.hour * 60 + self.minute
    }

    pub fn is_weekend(&self) -> bool {
        self.weekday >= 5
    }
}

/// Offset from minutes east of UTC; out-of-range values fall back to UTC.
pub fn fixed_offset(minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(minutes.saturating_mul(60)).unwrap_or_else(|| {
        tracing::warn!(minutes, "Invalid UTC offset, using UTC");
        Utc.fix()
    })
}

/// Events grouped per device, devices in id order, events in input order.
pub fn group_by_device(events: &[EventRecord]) -> BTreeMap<&str, Vec<&EventRecord>> {
    let mut groups: BTreeMap<&str, Vec<&EventRecord>> = BTreeMap::new();
    for e in events {
        groups.entry(e.device_id.as_str()).or_default().push(e);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_local_time_applies_offset() {
        // Saturday 2026-03-07 23:30 UTC is Sunday 01:30 at +02:00
        let ts = Utc.with_ymd_and_hms(2026, 3, 7, 23, 30, 0).unwrap();
        let lt = LocalTime::at(ts, fixed_offset(120));
        assert_eq!(lt.hour, 1);
        assert_eq!(lt.minute, 30);
        assert_eq!(lt.weekday, 6);
        assert!(lt.is_weekend());
    }

    #[test]
    fn test_invalid_offset_falls_back_to_utc() {
        assert_eq!(fixed_offset(100_000).local_minus_utc(), 0);
    }

    #[test]
    fn test_group_by_device_orders_ids() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 7, 8, 0, 0).unwrap();
        let events = vec![
            EventRecord::new("light.b", ts, "on", "light"),
            EventRecord::new("light.a", ts, "on", "light"),
            EventRecord::new("light.b", ts, "off", "light"),
        ];
        let groups = group_by_device(&events);
        let ids: Vec<&str> = groups.keys().copied().collect();
        assert_eq!(ids, vec!["light.a", "light.b"]);
        assert_eq!(groups["light.b"].len(), 2);
    }
}
