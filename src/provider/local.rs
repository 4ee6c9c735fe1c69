// src/provider/local.rs — Offline scoring backend (signed feature hashing)
//
// Deterministic and dependency-free at runtime: no model files, no network.
// Word unigrams and bigrams are hashed with xxh3 into a fixed number of
// buckets with a sign bit, then L2-normalised.

use async_trait::async_trait;
use xxhash_rust::xxh3::xxh3_64;

use super::{BackendInfo, ScoringBackend};
use crate::core::types::Category;
use crate::infra::errors::SynergyError;
use crate::memory::embeddings::{cosine_similarity, max_similarity, normalize};
use crate::synergy::classify::FEW_SHOT;

/// Below this similarity to every exemplar the classifier abstains.
const CLASSIFY_FLOOR: f32 = 0.15;

const STOPWORDS: &[&str] = &["a", "an", "and", "at", "in", "of", "on", "the", "to", "when"];

pub struct LocalBackend {
    dimension: usize,
    exemplars: Vec<(Category, Vec<f32>)>,
}

impl LocalBackend {
    pub fn new(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        let exemplars = FEW_SHOT
            .iter()
            .map(|(text, category)| (*category, embed_text(text, dimension)))
            .collect();
        Self {
            dimension,
            exemplars,
        }
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        embed_text(text, self.dimension)
    }
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

fn add_feature(v: &mut [f32], feature: &str, weight: f32) {
    let h = xxh3_64(feature.as_bytes());
    let idx = (h % v.len() as u64) as usize;
    let sign = if h >> 63 == 1 { -1.0 } else { 1.0 };
    v[idx] += sign * weight;
}

fn embed_text(text: &str, dimension: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; dimension];
    let toks = tokens(text);
    for t in &toks {
        add_feature(&mut v, t, 1.0);
    }
    for pair in toks.windows(2) {
        add_feature(&mut v, &format!("{} {}", pair[0], pair[1]), 0.5);
    }
    normalize(&mut v);
    v
}

#[async_trait]
impl ScoringBackend for LocalBackend {
    fn id(&self) -> &str {
        "local"
    }

    fn info(&self) -> BackendInfo {
        BackendInfo {
            name: "Local feature-hashing encoder".into(),
            dimension: self.dimension,
            batch_latency_ms: 1,
            memory_mb: 1,
        }
    }

    async fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, SynergyError> {
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }

    async fn rerank(&self, vector: &[f32], references: &[Vec<f32>]) -> Result<f32, SynergyError> {
        Ok(max_similarity(vector, references))
    }

    async fn classify(&self, text: &str) -> Result<String, SynergyError> {
        let v = self.embed(text);
        let best = self
            .exemplars
            .iter()
            .map(|(category, e)| (*category, cosine_similarity(&v, e)))
            .fold(None::<(Category, f32)>, |best, (c, s)| match best {
                Some((_, b)) if b >= s => best,
                _ => Some((c, s)),
            });
        Ok(match best {
            Some((category, sim)) if sim >= CLASSIFY_FLOOR => category.as_str().to_string(),
            _ => "unknown".to_string(),
        })
    }
}
