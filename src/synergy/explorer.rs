// src/synergy/explorer.rs — Bounded breadth-first chain generation

use serde::Serialize;
use std::collections::VecDeque;

use super::graph::{DeviceGraph, NodeId};
use crate::core::types::{is_controllable, RelationshipIndex};

/// A device chain produced by traversal, not yet scored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub nodes: Vec<NodeId>,
}

impl Chain {
    pub fn hop_count(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    pub fn device_ids(&self, graph: &DeviceGraph) -> Vec<String> {
        self.nodes
            .iter()
            .map(|&n| graph.device(n).device_id.clone())
            .collect()
    }

    /// Stable identifier, also used as the embedding cache key.
    pub fn key(&self, graph: &DeviceGraph) -> String {
        self.device_ids(graph).join(">")
    }
}

/// Paths extended per allowed candidate before traversal gives up. Bounds
/// work when most paths end on sensors and never count as candidates.
const EXPANSIONS_PER_CANDIDATE: usize = 64;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExplorationStats {
    pub seeds: usize,
    /// Chains with a controllable tail in canonical orientation, before exclusion.
    pub generated: usize,
    /// Dropped because the endpoint pair is already automated.
    pub excluded: usize,
    pub emitted: usize,
    /// Paths built by extending a shorter path by one hop.
    pub expansions: usize,
    /// True when `max_candidates` or the expansion budget stopped the traversal early.
    pub capped: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Exploration {
    pub chains: Vec<Chain>,
    pub stats: ExplorationStats,
}

pub struct Explorer<'a> {
    graph: &'a DeviceGraph,
    relationships: &'a RelationshipIndex,
    max_depth: usize,
    max_candidates: usize,
}

impl<'a> Explorer<'a> {
    pub fn new(
        graph: &'a DeviceGraph,
        relationships: &'a RelationshipIndex,
        max_depth: usize,
        max_candidates: usize,
    ) -> Self {
        Self {
            graph,
            relationships,
            max_depth,
            max_candidates,
        }
    }

    /// Walk every seed in id order, breadth first, up to `max_depth` hops.
    ///
    /// A chain is a candidate when it ends on a controllable device and is in
    /// canonical orientation. Every candidate counts against `max_candidates`,
    /// automated or not. Candidates whose endpoints are linked by an existing
    /// automation are dropped here, before any scoring.
    pub fn explore(&self) -> Exploration {
        let mut out = Exploration::default();
        if self.max_depth == 0 || self.max_candidates == 0 {
            return out;
        }
        let expansion_budget = self.max_candidates.saturating_mul(EXPANSIONS_PER_CANDIDATE);

        'seeds: for seed in self.graph.node_ids() {
            if self.graph.degree(seed) == 0 {
                continue;
            }
            out.stats.seeds += 1;

            let mut queue: VecDeque<Vec<NodeId>> = VecDeque::new();
            queue.push_back(vec![seed]);

            while let Some(path) = queue.pop_front() {
                let last = path[path.len() - 1];
                for &next in self.graph.neighbors(last) {
                    if path.contains(&next) {
                        continue;
                    }
                    if out.stats.expansions >= expansion_budget {
                        out.stats.capped = true;
                        tracing::warn!(
                            budget = expansion_budget,
                            "Synergy expansion budget exhausted, stopping exploration"
                        );
                        break 'seeds;
                    }
                    out.stats.expansions += 1;

                    let mut extended = path.clone();
                    extended.push(next);

                    if self.is_candidate(&extended) {
                        out.stats.generated += 1;
                        if self.is_automated(&extended) {
                            out.stats.excluded += 1;
                        } else {
                            out.chains.push(Chain {
                                nodes: extended.clone(),
                            });
                            out.stats.emitted += 1;
                        }
                        if out.stats.generated >= self.max_candidates {
                            out.stats.capped = true;
                            tracing::warn!(
                                cap = self.max_candidates,
                                "Synergy candidate cap reached, stopping exploration"
                            );
                            break 'seeds;
                        }
                    }

                    if extended.len() <= self.max_depth {
                        queue.push_back(extended);
                    }
                }
            }
        }

        tracing::debug!(
            seeds = out.stats.seeds,
            generated = out.stats.generated,
            excluded = out.stats.excluded,
            emitted = out.stats.emitted,
            expansions = out.stats.expansions,
            "Exploration finished"
        );
        out
    }

    /// Controllable tail, and of a chain and its reverse only the one whose
    /// head has the lower id when both ends are controllable.
    fn is_candidate(&self, path: &[NodeId]) -> bool {
        let head = path[0];
        let tail = path[path.len() - 1];
        if !is_controllable(&self.graph.device(tail).domain) {
            return false;
        }
        !is_controllable(&self.graph.device(head).domain) || head < tail
    }

    fn is_automated(&self, path: &[NodeId]) -> bool {
        let head = self.graph.device(path[0]);
        let tail = self.graph.device(path[path.len() - 1]);
        self.relationships.contains(&head.device_id, &tail.device_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{DeviceDescriptor, DeviceInventory, RelationshipEdge};
    use std::collections::{BTreeSet, HashSet};

    fn device(id: &str, area: &str) -> DeviceDescriptor {
        DeviceDescriptor {
            device_id: id.into(),
            friendly_name: id.into(),
            domain: id.split('.').next().unwrap_or("").into(),
            area_id: Some(area.into()),
            capabilities: BTreeSet::new(),
        }
    }

    fn edge(a: &str, b: &str) -> RelationshipEdge {
        RelationshipEdge {
            device_a: a.into(),
            device_b: b.into(),
            automation_id: "existing".into(),
            relationship_kind: "trigger_action".into(),
        }
    }

    fn hall() -> DeviceGraph {
        let inv = DeviceInventory::new(vec![
            device("binary_sensor.motion", "hall"),
            device("light.ceiling", "hall"),
            device("switch.fan", "hall"),
        ]);
        DeviceGraph::build(&inv, &[])
    }

    #[test]
    fn test_no_edges_means_nothing_excluded() {
        let g = hall();
        let rel = RelationshipIndex::default();
        let out = Explorer::new(&g, &rel, 2, 500).explore();
        assert_eq!(out.stats.excluded, 0);
        assert_eq!(out.stats.generated, out.chains.len());
        assert!(!out.chains.is_empty());
    }

    #[test]
    fn test_chains_have_no_cycles_and_respect_depth() {
        let g = hall();
        let rel = RelationshipIndex::default();
        let out = Explorer::new(&g, &rel, 2, 500).explore();
        for chain in &out.chains {
            assert!(chain.hop_count() >= 1 && chain.hop_count() <= 2);
            let unique: HashSet<_> = chain.nodes.iter().collect();
            assert_eq!(unique.len(), chain.nodes.len());
        }
    }

    #[test]
    fn test_tail_must_be_controllable() {
        let g = hall();
        let rel = RelationshipIndex::default();
        let out = Explorer::new(&g, &rel, 3, 500).explore();
        for chain in &out.chains {
            let tail = g.device(*chain.nodes.last().unwrap());
            assert_ne!(tail.domain, "binary_sensor");
        }
    }

    #[test]
    fn test_excluded_endpoints_never_emitted() {
        let g = hall();
        let rel = RelationshipIndex::from_edges(vec![edge("binary_sensor.motion", "light.ceiling")]);
        let out = Explorer::new(&g, &rel, 2, 500).explore();
        assert!(out.stats.excluded >= 1);
        for chain in &out.chains {
            let ids = chain.device_ids(&g);
            assert!(!rel.contains(&ids[0], &ids[ids.len() - 1]));
        }
    }

    #[test]
    fn test_cap_stops_generation() {
        let g = hall();
        let rel = RelationshipIndex::default();
        let out = Explorer::new(&g, &rel, 3, 2).explore();
        assert_eq!(out.chains.len(), 2);
        assert!(out.stats.capped);
    }

    #[test]
    fn test_reverse_chains_deduplicated() {
        let inv = DeviceInventory::new(vec![
            device("light.a", "den"),
            device("light.b", "den"),
        ]);
        let g = DeviceGraph::build(&inv, &[]);
        let out = Explorer::new(&g, &RelationshipIndex::default(), 1, 500).explore();
        assert_eq!(out.chains.len(), 1);
        assert_eq!(out.chains[0].key(&g), "light.a>light.b");
    }

    #[test]
    fn test_reverse_of_multi_hop_chain_not_emitted() {
        let g = hall();
        let rel = RelationshipIndex::default();
        let out = Explorer::new(&g, &rel, 3, 500).explore();
        let keys: HashSet<Vec<NodeId>> = out.chains.iter().map(|c| c.nodes.clone()).collect();
        assert_eq!(keys.len(), out.chains.len());
        for chain in &out.chains {
            let mut reversed = chain.nodes.clone();
            reversed.reverse();
            assert!(!keys.contains(&reversed), "{} emitted both ways", chain.key(&g));
        }
    }

    #[test]
    fn test_dense_automated_area_hits_cap() {
        let inv = DeviceInventory::new((0..40).map(|i| device(&format!("light.l{i:02}"), "loft")));
        let g = DeviceGraph::build(&inv, &[]);
        let mut edges = Vec::new();
        for a in 0..40 {
            for b in (a + 1)..40 {
                edges.push(edge(&format!("light.l{a:02}"), &format!("light.l{b:02}")));
            }
        }
        let rel = RelationshipIndex::from_edges(edges);

        let out = Explorer::new(&g, &rel, 3, 500).explore();
        assert!(out.stats.capped);
        assert!(out.chains.is_empty());
        assert_eq!(out.stats.generated, 500);
        assert_eq!(out.stats.excluded, 500);
        assert!(out.stats.expansions <= 500 * EXPANSIONS_PER_CANDIDATE);
    }

    #[test]
    fn test_sensor_heavy_graph_stops_at_expansion_budget() {
        let mut devices: Vec<DeviceDescriptor> =
            (0..30).map(|i| device(&format!("sensor.s{i:02}"), "lab")).collect();
        devices.push(device("light.only", "lab"));
        let g = DeviceGraph::build(&DeviceInventory::new(devices), &[]);

        let out = Explorer::new(&g, &RelationshipIndex::default(), 4, 2).explore();
        assert!(out.stats.capped);
        assert!(out.stats.expansions <= 2 * EXPANSIONS_PER_CANDIDATE);
    }
}
