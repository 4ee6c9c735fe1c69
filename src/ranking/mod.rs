// src/ranking/mod.rs — Suggestion ranking and diversity balancing

pub mod balancer;
pub mod render;

use crate::core::types::{Candidate, DeviceInventory, Suggestion};

pub use balancer::{select, unified_score, Ranked};
pub use render::{render, scores, suggestion_id, Scores};

/// Score every candidate, pick a type-diverse subset of at most `cap`,
/// and render it. `candidates` must be in creation order.
pub fn rank(candidates: &[Candidate], inventory: &DeviceInventory, cap: usize) -> Vec<Suggestion> {
    let scored: Vec<Scores> = candidates.iter().map(|c| scores(c, inventory)).collect();
    let ranked: Vec<Ranked> = candidates
        .iter()
        .zip(&scored)
        .map(|(c, s)| Ranked {
            kind: c.kind(),
            score: s.unified,
        })
        .collect();

    let picked = select(&ranked, cap);
    tracing::info!(
        candidates = candidates.len(),
        selected = picked.len(),
        cap,
        "Ranking finished"
    );
    picked
        .into_iter()
        .map(|i| render(&candidates[i], scored[i], inventory))
        .collect()
}
