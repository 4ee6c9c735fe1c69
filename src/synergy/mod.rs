// src/synergy/mod.rs — N-level synergy exploration over the device graph

pub mod classify;
pub mod complexity;
pub mod explorer;
pub mod graph;
pub mod scoring;

use serde::Serialize;
use std::sync::Arc;

use crate::core::types::{DeviceInventory, RelationshipIndex, SynergyCandidate};
use crate::infra::config::{DiscoveryConfig, SynergyConfig};
use crate::memory::EmbeddingCache;
use crate::provider::ScoringBackend;

pub use explorer::{Chain, Exploration, ExplorationStats, Explorer};
pub use graph::{DeviceGraph, NodeId};
pub use scoring::{describe_chain, ChainScorer, ScoringStats};

#[derive(Debug, Clone, Default, Serialize)]
pub struct SynergyStats {
    pub graph_nodes: usize,
    pub graph_edges: usize,
    pub exploration: ExplorationStats,
    pub scoring: ScoringStats,
}

/// Build the graph, generate chains, drop already-automated ones, score the rest.
pub async fn discover_synergies(
    inventory: &DeviceInventory,
    relationships: &RelationshipIndex,
    discovery: &DiscoveryConfig,
    config: &SynergyConfig,
    backend: Arc<dyn ScoringBackend>,
    cache: &EmbeddingCache,
) -> (Vec<SynergyCandidate>, SynergyStats) {
    let graph = DeviceGraph::build(inventory, &config.area_links);
    let exploration = Explorer::new(
        &graph,
        relationships,
        discovery.max_depth,
        discovery.max_candidates,
    )
    .explore();

    tracing::info!(
        nodes = graph.len(),
        edges = graph.edge_count(),
        chains = exploration.chains.len(),
        excluded = exploration.stats.excluded,
        "Synergy exploration finished"
    );

    let scorer = ChainScorer::new(backend, cache, config);
    let (candidates, scoring) = scorer
        .score(&graph, &exploration.chains, exploration.stats.seeds)
        .await;

    let stats = SynergyStats {
        graph_nodes: graph.len(),
        graph_edges: graph.edge_count(),
        exploration: exploration.stats,
        scoring,
    };
    (candidates, stats)
}
