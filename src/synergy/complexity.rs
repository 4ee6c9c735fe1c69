// src/synergy/complexity.rs — Heuristic effort level of a device chain

use crate::core::types::Complexity;

/// Complexity from chain length (devices) and distinct areas spanned.
///
/// Two devices in one area is low. Three devices in one area, or any chain
/// crossing into a second area, is medium. Four or more devices, or three or
/// more areas, is high.
pub fn assess(device_count: usize, area_count: usize) -> Complexity {
    if device_count >= 4 || area_count >= 3 {
        Complexity::High
    } else if device_count == 3 || area_count == 2 {
        Complexity::Medium
    } else {
        Complexity::Low
    }
}
