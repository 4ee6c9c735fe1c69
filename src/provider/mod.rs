// src/provider/mod.rs — Scoring backend layer (encode / rerank / classify)

pub mod local;
pub mod ollama;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::infra::config::{BackendConfig, BackendKind};
use crate::infra::errors::SynergyError;

/// Narrow capability interface every scoring backend implements. The
/// explorer only talks to this trait, so an embedded model and a remote
/// service are interchangeable.
#[async_trait]
pub trait ScoringBackend: Send + Sync {
    fn id(&self) -> &str;
    fn info(&self) -> BackendInfo;

    /// Names the model behind `encode`. Persisted vectors are keyed by it,
    /// so it must change whenever the embedding model does.
    fn encoder_id(&self) -> String {
        self.id().to_string()
    }

    /// Batch-encode texts into fixed-length vectors, one per input, in order.
    async fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, SynergyError>;

    /// Relevance of `vector` to the reference set, in [0, 1].
    async fn rerank(&self, vector: &[f32], references: &[Vec<f32>]) -> Result<f32, SynergyError>;

    /// Raw category answer for a chain description. Callers must validate it.
    async fn classify(&self, text: &str) -> Result<String, SynergyError>;
}

/// Documented footprint of a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendInfo {
    pub name: String,
    pub dimension: usize,
    /// Expected latency of one encode call for a full batch.
    pub batch_latency_ms: u64,
    pub memory_mb: u64,
}

/// Build the backend selected in config.
pub fn from_config(config: &BackendConfig) -> Arc<dyn ScoringBackend> {
    match config.kind {
        BackendKind::Local => Arc::new(local::LocalBackend::new(config.dimension)),
        BackendKind::Ollama => Arc::new(ollama::OllamaBackend::new(config)),
    }
}
