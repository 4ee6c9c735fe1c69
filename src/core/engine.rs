// src/core/engine.rs — One offline discovery run: mine, explore, rank

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use super::types::{Candidate, DeviceInventory, EventRecord, RelationshipIndex, Suggestion};
use crate::infra::config::Config;
use crate::infra::errors::SynergyError;
use crate::memory::{self, CacheStats, EmbeddingCache};
use crate::patterns::miner::MiningStats;
use crate::patterns::PatternMiner;
use crate::provider::{self, ScoringBackend};
use crate::ranking;
use crate::synergy::{self, SynergyStats};

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub events_received: usize,
    pub events_used: usize,
    /// Events whose device is not in the inventory.
    pub events_unknown_device: usize,
    pub devices: usize,
    pub relationships: usize,
    pub mining: MiningStats,
    pub synergy: SynergyStats,
    pub cache: CacheStats,
    pub candidates: usize,
    pub suggestions: usize,
    pub mining_ms: u64,
    pub synergy_ms: u64,
    pub ranking_ms: u64,
    pub total_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryReport {
    pub suggestions: Vec<Suggestion>,
    pub stats: RunStats,
}

/// Holds the run's collaborators: configuration, scoring backend, and the
/// embedding cache (which outlives a single run when the engine is reused).
pub struct DiscoveryEngine {
    config: Config,
    backend: Arc<dyn ScoringBackend>,
    cache: EmbeddingCache,
}

impl DiscoveryEngine {
    pub fn new(config: Config, backend: Arc<dyn ScoringBackend>, cache: EmbeddingCache) -> Self {
        Self {
            config,
            backend,
            cache,
        }
    }

    /// Backend and cache built from the config's `[backend]` and `[store]` sections.
    pub fn from_config(config: Config) -> Self {
        let backend = provider::from_config(&config.backend);
        let cache = memory::build_cache(&config.discovery, &config.store);
        Self::new(config, backend, cache)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    pub async fn discover(
        &self,
        events: &[EventRecord],
        inventory: &DeviceInventory,
        relationships: &RelationshipIndex,
    ) -> Result<DiscoveryReport, SynergyError> {
        if inventory.is_empty() {
            return Err(SynergyError::MissingInventory(
                "inventory contains no devices".into(),
            ));
        }
        let started = Instant::now();
        let mut stats = RunStats {
            events_received: events.len(),
            devices: inventory.len(),
            relationships: relationships.len(),
            ..Default::default()
        };

        let mut window: Vec<EventRecord> = events
            .iter()
            .filter(|e| inventory.contains(&e.device_id))
            .cloned()
            .collect();
        stats.events_used = window.len();
        stats.events_unknown_device = events.len() - window.len();
        if stats.events_unknown_device > 0 {
            tracing::warn!(
                dropped = stats.events_unknown_device,
                "Dropped events for devices missing from the inventory"
            );
        }
        if !window.windows(2).all(|w| w[0].timestamp <= w[1].timestamp) {
            window.sort_by_key(|e| e.timestamp);
        }

        tracing::info!(
            events = stats.events_used,
            devices = stats.devices,
            relationships = stats.relationships,
            backend = self.backend.id(),
            "Starting discovery"
        );

        // 1. Statistical detectors
        let t = Instant::now();
        let mined = PatternMiner::new(&self.config).mine(&window);
        drop(window);
        stats.mining = mined.stats;
        stats.mining_ms = t.elapsed().as_millis() as u64;

        // 2. Graph exploration and scoring
        let t = Instant::now();
        let (synergies, synergy_stats) = synergy::discover_synergies(
            inventory,
            relationships,
            &self.config.discovery,
            &self.config.synergy,
            self.backend.clone(),
            &self.cache,
        )
        .await;
        stats.synergy = synergy_stats;
        stats.synergy_ms = t.elapsed().as_millis() as u64;

        // 3. Unified ranking
        let t = Instant::now();
        let candidates: Vec<Candidate> = mined
            .candidates
            .into_iter()
            .map(Candidate::Pattern)
            .chain(synergies.into_iter().map(Candidate::Synergy))
            .collect();
        stats.candidates = candidates.len();
        let suggestions = ranking::rank(&candidates, inventory, self.config.discovery.suggestion_cap);
        stats.ranking_ms = t.elapsed().as_millis() as u64;

        stats.suggestions = suggestions.len();
        stats.cache = self.cache.stats();
        stats.total_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            candidates = stats.candidates,
            suggestions = stats.suggestions,
            elapsed_ms = stats.total_ms,
            "Discovery finished"
        );

        Ok(DiscoveryReport { suggestions, stats })
    }
}

/// Run discovery once with a backend and cache built from `config`.
pub async fn discover(
    events: &[EventRecord],
    inventory: &DeviceInventory,
    relationships: &RelationshipIndex,
    config: &Config,
) -> Result<Vec<Suggestion>, SynergyError> {
    let engine = DiscoveryEngine::from_config(config.clone());
    let report = engine.discover(events, inventory, relationships).await?;
    Ok(report.suggestions)
}
