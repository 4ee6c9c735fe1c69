// src/synergy/scoring.rs — Describe, embed, rerank and classify surviving chains

use serde::Serialize;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use xxhash_rust::xxh3::xxh3_64;

use super::classify::{self, ClassificationSource};
use super::complexity;
use super::explorer::Chain;
use super::graph::DeviceGraph;
use crate::core::types::SynergyCandidate;
use crate::infra::config::SynergyConfig;
use crate::infra::errors::SynergyError;
use crate::memory::EmbeddingCache;
use crate::provider::ScoringBackend;

/// Budget for scoring the chains of 20 seed devices.
const SCORING_BUDGET_PER_20_SEEDS: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScoringStats {
    pub scored: usize,
    /// Chains dropped because a model call failed or timed out.
    pub dropped: usize,
    pub cache_hits: usize,
    pub encoded: usize,
    pub batches: usize,
    pub classified_by_model: usize,
    pub classified_by_keyword: usize,
    pub classified_by_default: usize,
    pub elapsed_ms: u64,
}

/// Render a chain as "motion sensor in bedroom, light in bedroom".
pub fn describe_chain(graph: &DeviceGraph, chain: &Chain) -> String {
    chain
        .nodes
        .iter()
        .map(|&n| graph.device(n).describe())
        .collect::<Vec<_>>()
        .join(", ")
}

pub struct ChainScorer<'a> {
    backend: Arc<dyn ScoringBackend>,
    cache: &'a EmbeddingCache,
    config: &'a SynergyConfig,
}

struct Pending {
    chain_idx: usize,
    key: String,
    area: Option<String>,
    description: String,
}

impl<'a> ChainScorer<'a> {
    pub fn new(
        backend: Arc<dyn ScoringBackend>,
        cache: &'a EmbeddingCache,
        config: &'a SynergyConfig,
    ) -> Self {
        Self {
            backend,
            cache,
            config,
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.model_timeout_ms)
    }

    /// Run one backend call under the configured timeout.
    async fn call<T>(
        &self,
        fut: impl Future<Output = Result<T, SynergyError>>,
    ) -> Result<T, SynergyError> {
        match tokio::time::timeout(self.timeout(), fut).await {
            Ok(result) => result,
            Err(_) => Err(SynergyError::ModelTimeout {
                backend: self.backend.id().to_string(),
                timeout_ms: self.config.model_timeout_ms,
            }),
        }
    }

    /// Cache keys carry the encoder and dimension so vectors from different
    /// models never mix in the persisted table.
    fn cache_key(&self, kind: &str, id: &str) -> String {
        format!(
            "{}/{}:{kind}:{id}",
            self.backend.encoder_id(),
            self.backend.info().dimension
        )
    }

    /// Reference vectors are keyed by prompt text, so edited prompts are re-encoded.
    fn reference_key(&self, prompt: &str) -> String {
        self.cache_key("reference", &format!("{:016x}", xxh3_64(prompt.as_bytes())))
    }

    async fn reference_vectors(&self) -> Result<Vec<Vec<f32>>, SynergyError> {
        let prompts = &self.config.reference_prompts;
        let mut vectors: Vec<Option<Vec<f32>>> = Vec::with_capacity(prompts.len());
        let mut missing: Vec<usize> = Vec::new();
        for (i, prompt) in prompts.iter().enumerate() {
            match self.cache.get(&self.reference_key(prompt)) {
                Some(v) => vectors.push(Some(v.to_vec())),
                None => {
                    vectors.push(None);
                    missing.push(i);
                }
            }
        }

        if !missing.is_empty() {
            let texts: Vec<&str> = missing.iter().map(|&i| prompts[i].as_str()).collect();
            let encoded = self.call(self.backend.encode(&texts)).await?;
            for (&i, v) in missing.iter().zip(encoded) {
                let key = self.reference_key(&prompts[i]);
                vectors[i] = Some(self.cache.insert(&key, None, v).to_vec());
            }
        }

        Ok(vectors.into_iter().flatten().collect())
    }

    /// Score chains in order. Chains whose model calls fail are dropped;
    /// classification failures fall back to keywords instead.
    pub async fn score(
        &self,
        graph: &DeviceGraph,
        chains: &[Chain],
        seeds: usize,
    ) -> (Vec<SynergyCandidate>, ScoringStats) {
        let started = Instant::now();
        let mut stats = ScoringStats::default();
        if chains.is_empty() {
            return (Vec::new(), stats);
        }

        let references = match self.reference_vectors().await {
            Ok(refs) if !refs.is_empty() => refs,
            Ok(_) => {
                tracing::warn!("No reference prompts configured, skipping synergy scoring");
                stats.dropped = chains.len();
                return (Vec::new(), stats);
            }
            Err(e) => {
                tracing::warn!(chains = chains.len(), "Reference encoding failed, dropping synergy chains: {e}");
                stats.dropped = chains.len();
                return (Vec::new(), stats);
            }
        };

        // Bulk-load persisted vectors for every area the chains touch.
        let areas: BTreeSet<&str> = chains
            .iter()
            .flat_map(|c| c.nodes.iter())
            .filter_map(|&n| graph.device(n).area_id.as_deref())
            .collect();
        for area in areas {
            self.cache.preload_area(area);
        }

        // 1. Descriptions and cached vectors
        let mut vectors: Vec<Option<Arc<[f32]>>> = vec![None; chains.len()];
        let mut pending: Vec<Pending> = Vec::new();
        let descriptions: Vec<String> = chains.iter().map(|c| describe_chain(graph, c)).collect();
        for (i, chain) in chains.iter().enumerate() {
            let key = self.cache_key("chain", &chain.key(graph));
            match self.cache.get(&key) {
                Some(v) => {
                    stats.cache_hits += 1;
                    vectors[i] = Some(v);
                }
                None => pending.push(Pending {
                    chain_idx: i,
                    key,
                    area: graph.device(chain.nodes[0]).area_id.clone(),
                    description: descriptions[i].clone(),
                }),
            }
        }

        // 2. Batch-encode the misses
        let batch_size = self.config.batch_size.max(1);
        for batch in pending.chunks(batch_size) {
            stats.batches += 1;
            let texts: Vec<&str> = batch.iter().map(|p| p.description.as_str()).collect();
            match self.call(self.backend.encode(&texts)).await {
                Ok(encoded) if encoded.len() == batch.len() => {
                    stats.encoded += encoded.len();
                    for (p, v) in batch.iter().zip(encoded) {
                        vectors[p.chain_idx] = Some(self.cache.insert(&p.key, p.area.as_deref(), v));
                    }
                }
                Ok(encoded) => tracing::warn!(
                    expected = batch.len(),
                    got = encoded.len(),
                    "Encoder returned wrong batch size, dropping batch"
                ),
                Err(e) => tracing::warn!(size = batch.len(), "Batch encoding failed, dropping batch: {e}"),
            }
        }

        // 3. Rerank and classify
        let mut out = Vec::with_capacity(chains.len());
        for (i, chain) in chains.iter().enumerate() {
            let Some(vector) = &vectors[i] else {
                stats.dropped += 1;
                continue;
            };
            let impact = match self.call(self.backend.rerank(vector, &references)).await {
                Ok(score) if score.is_finite() => f64::from(score).clamp(0.0, 1.0),
                Ok(score) => {
                    tracing::warn!(chain = i, score, "Non-finite rerank score, dropping chain");
                    stats.dropped += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(chain = i, "Rerank failed, dropping chain: {e}");
                    stats.dropped += 1;
                    continue;
                }
            };

            let description = &descriptions[i];
            let answer = self.call(self.backend.classify(description)).await;
            let (category, source) = classify::resolve(answer, description);
            match source {
                ClassificationSource::Model => stats.classified_by_model += 1,
                ClassificationSource::Keyword => stats.classified_by_keyword += 1,
                ClassificationSource::Default => stats.classified_by_default += 1,
            }

            let area_span: BTreeSet<String> = chain
                .nodes
                .iter()
                .filter_map(|&n| graph.device(n).area_id.clone())
                .collect();
            out.push(SynergyCandidate {
                path: chain.device_ids(graph),
                hop_count: chain.hop_count(),
                complexity: complexity::assess(chain.nodes.len(), area_span.len()),
                area_span,
                impact_score: impact,
                category,
                description: description.clone(),
            });
            stats.scored += 1;
        }

        let elapsed = started.elapsed();
        stats.elapsed_ms = elapsed.as_millis() as u64;
        let budget = SCORING_BUDGET_PER_20_SEEDS * (seeds.max(1).div_ceil(20) as u32);
        if elapsed > budget {
            tracing::warn!(
                elapsed_ms = stats.elapsed_ms,
                budget_ms = budget.as_millis() as u64,
                seeds,
                "Synergy scoring exceeded its time budget"
            );
        }
        tracing::info!(
            scored = stats.scored,
            dropped = stats.dropped,
            cache_hits = stats.cache_hits,
            encoded = stats.encoded,
            elapsed_ms = stats.elapsed_ms,
            "Synergy scoring finished"
        );
        (out, stats)
    }
}
