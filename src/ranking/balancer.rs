// src/ranking/balancer.rs — Unified score and type-diverse selection

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::core::types::{Complexity, PatternType};

/// `confidence * impact * (1 - penalty)`, kept inside [0, 1].
pub fn unified_score(confidence: f64, impact: f64, complexity: Complexity) -> f64 {
    let score = confidence * impact * (1.0 - complexity.penalty());
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// What the balancer needs to know about one candidate. Slice position is
/// creation order and breaks ties.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranked {
    pub kind: PatternType,
    pub score: f64,
}

fn by_score(items: &[Ranked], a: usize, b: usize) -> Ordering {
    items[b]
        .score
        .total_cmp(&items[a].score)
        .then_with(|| a.cmp(&b))
}

/// Choose at most `cap` candidates and return their indices, best first.
///
/// 1. The best candidate of each present type, strongest types first.
/// 2. Remaining slots by descending score, skipping a candidate whose type
///    already holds half the cap (only when two or more types are present).
/// 3. Final order is score descending, ties by creation order.
pub fn select(items: &[Ranked], cap: usize) -> Vec<usize> {
    if cap == 0 || items.is_empty() {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|&a, &b| by_score(items, a, b));

    let mut picked: Vec<usize> = Vec::with_capacity(cap.min(items.len()));
    let mut taken = vec![false; items.len()];
    let mut per_type: BTreeMap<PatternType, usize> = BTreeMap::new();

    for &i in &order {
        if picked.len() >= cap {
            break;
        }
        if !per_type.contains_key(&items[i].kind) {
            per_type.insert(items[i].kind, 1);
            taken[i] = true;
            picked.push(i);
        }
    }

    let type_limit = if per_type.len() >= 2 {
        (cap / 2).max(1)
    } else {
        cap
    };

    for &i in &order {
        if picked.len() >= cap {
            break;
        }
        if taken[i] {
            continue;
        }
        let count = per_type.entry(items[i].kind).or_insert(0);
        if *count >= type_limit {
            continue;
        }
        *count += 1;
        taken[i] = true;
        picked.push(i);
    }

    picked.sort_by(|&a, &b| by_score(items, a, b));
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn r(kind: PatternType, score: f64) -> Ranked {
        Ranked { kind, score }
    }

    #[test]
    fn test_unified_score_penalties() {
        assert!((unified_score(0.8, 0.8, Complexity::Low) - 0.64).abs() < 1e-9);
        assert!((unified_score(1.0, 1.0, Complexity::High) - 0.7).abs() < 1e-9);
        assert_eq!(unified_score(f64::NAN, 1.0, Complexity::Low), 0.0);
    }

    #[test]
    fn test_every_type_represented() {
        let items = vec![
            r(PatternType::TimeOfDay, 0.9),
            r(PatternType::TimeOfDay, 0.85),
            r(PatternType::TimeOfDay, 0.8),
            r(PatternType::Synergy, 0.1),
        ];
        let picked = select(&items, 2);
        assert_eq!(picked, vec![0, 3]);
    }

    #[test]
    fn test_half_cap_ceiling() {
        let mut items: Vec<Ranked> = (0..8).map(|i| r(PatternType::CoOccurrence, 0.9 - i as f64 * 0.01)).collect();
        items.push(r(PatternType::Synergy, 0.2));
        items.push(r(PatternType::Synergy, 0.1));
        let picked = select(&items, 4);
        let co = picked
            .iter()
            .filter(|&&i| items[i].kind == PatternType::CoOccurrence)
            .count();
        assert_eq!(co, 2);
        assert_eq!(picked.len(), 4);
    }

    #[test]
    fn test_single_type_fills_cap() {
        let items: Vec<Ranked> = (0..5).map(|_| r(PatternType::TimeOfDay, 0.5)).collect();
        assert_eq!(select(&items, 3), vec![0, 1, 2]);
    }

    #[test]
    fn test_ties_keep_creation_order() {
        let items = vec![
            r(PatternType::Synergy, 0.5),
            r(PatternType::TimeOfDay, 0.5),
            r(PatternType::Synergy, 0.5),
        ];
        assert_eq!(select(&items, 10), vec![0, 1, 2]);
    }

    #[test]
    fn test_zero_cap() {
        assert!(select(&[r(PatternType::Synergy, 1.0)], 0).is_empty());
    }
}
