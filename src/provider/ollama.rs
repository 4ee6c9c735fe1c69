// src/provider/ollama.rs — Ollama scoring backend (remote embedding + generation)

use async_trait::async_trait;

use super::{BackendInfo, ScoringBackend};
use crate::infra::config::BackendConfig;
use crate::infra::errors::SynergyError;
use crate::memory::embeddings::max_similarity;
use crate::synergy::classify::build_prompt;

pub struct OllamaBackend {
    base_url: String,
    embed_model: String,
    classify_model: String,
    dimension: usize,
    seed: u64,
    client: reqwest::Client,
}

impl OllamaBackend {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            embed_model: config.embed_model.clone(),
            classify_model: config.classify_model.clone(),
            dimension: config.dimension,
            seed: config.seed,
            client: reqwest::Client::new(),
        }
    }

    fn unavailable(&self, message: impl Into<String>) -> SynergyError {
        SynergyError::ModelUnavailable {
            backend: "ollama".into(),
            message: message.into(),
        }
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<serde_json::Value, SynergyError> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.unavailable(format!("Cannot reach Ollama: {e}")))?;

        if !response.status().is_success() {
            return Err(self.unavailable(format!("HTTP {}", response.status())));
        }

        response
            .json()
            .await
            .map_err(|e| self.unavailable(format!("Invalid Ollama response: {e}")))
    }
}

/// Pull `embeddings` out of an `/api/embed` response.
fn parse_embeddings(resp: &serde_json::Value) -> Option<Vec<Vec<f32>>> {
    resp["embeddings"]
        .as_array()?
        .iter()
        .map(|row| {
            row.as_array().map(|values| {
                values
                    .iter()
                    .map(|v| v.as_f64().unwrap_or(0.0) as f32)
                    .collect()
            })
        })
        .collect()
}

#[async_trait]
impl ScoringBackend for OllamaBackend {
    fn id(&self) -> &str {
        "ollama"
    }

    fn encoder_id(&self) -> String {
        format!("ollama:{}", self.embed_model)
    }

    fn info(&self) -> BackendInfo {
        BackendInfo {
            name: format!("Ollama ({}, {})", self.embed_model, self.classify_model),
            dimension: self.dimension,
            batch_latency_ms: 250,
            memory_mb: 450,
        }
    }

    async fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, SynergyError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = serde_json::json!({
            "model": self.embed_model,
            "input": texts,
        });
        let resp = self.post("/api/embed", body).await?;
        let embeddings =
            parse_embeddings(&resp).ok_or_else(|| self.unavailable("Missing embeddings in response"))?;
        if embeddings.len() != texts.len() {
            return Err(self.unavailable(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }
        Ok(embeddings)
    }

    async fn rerank(&self, vector: &[f32], references: &[Vec<f32>]) -> Result<f32, SynergyError> {
        // Ollama has no cross-encoder endpoint; score against the encoded references.
        Ok(max_similarity(vector, references))
    }

    async fn classify(&self, text: &str) -> Result<String, SynergyError> {
        let body = serde_json::json!({
            "model": self.classify_model,
            "prompt": build_prompt(text),
            "stream": false,
            "options": {
                "temperature": 0,
                "seed": self.seed,
                "num_predict": 8,
            },
        });
        let resp = self.post("/api/generate", body).await?;
        resp["response"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| self.unavailable("Missing response text"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_embeddings() {
        let resp = serde_json::json!({"embeddings": [[0.5, 1.0], [0.0, -1.0]]});
        assert_eq!(
            parse_embeddings(&resp),
            Some(vec![vec![0.5, 1.0], vec![0.0, -1.0]])
        );
        assert_eq!(parse_embeddings(&serde_json::json!({"error": "x"})), None);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = BackendConfig {
            base_url: "http://ha.local:11434/".into(),
            ..Default::default()
        };
        assert_eq!(OllamaBackend::new(&config).base_url, "http://ha.local:11434");
    }

    #[test]
    fn test_encoder_id_follows_embed_model() {
        let a = OllamaBackend::new(&BackendConfig {
            embed_model: "nomic-embed-text".into(),
            ..Default::default()
        });
        let b = OllamaBackend::new(&BackendConfig {
            embed_model: "all-minilm".into(),
            ..Default::default()
        });
        assert_eq!(a.encoder_id(), "ollama:nomic-embed-text");
        assert_ne!(a.encoder_id(), b.encoder_id());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_model_failure() {
        let config = BackendConfig {
            base_url: "http://127.0.0.1:9".into(),
            ..Default::default()
        };
        let err = OllamaBackend::new(&config).encode(&["lamp"]).await.unwrap_err();
        assert!(err.is_model_failure());
    }
}
