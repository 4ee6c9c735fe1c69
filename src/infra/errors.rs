// src/infra/errors.rs — Error types for the discovery engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SynergyError {
    // Fatal: nothing can run without these
    #[error("Device inventory missing or unreadable: {0}")]
    MissingInventory(String),

    #[error("Event source missing or unreadable: {0}")]
    EventSource(String),

    // Model errors (recoverable per chain)
    #[error("Scoring backend '{backend}' unavailable: {message}")]
    ModelUnavailable { backend: String, message: String },

    #[error("Scoring backend '{backend}' timed out after {timeout_ms}ms")]
    ModelTimeout { backend: String, timeout_ms: u64 },

    // Infra
    #[error("Vector store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SynergyError {
    /// Model failures degrade a single chain's scoring; they never abort a run.
    pub fn is_model_failure(&self) -> bool {
        matches!(
            self,
            SynergyError::ModelUnavailable { .. } | SynergyError::ModelTimeout { .. }
        )
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SynergyError::MissingInventory(_) | SynergyError::EventSource(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_failures_are_recoverable() {
        let e = SynergyError::ModelTimeout {
            backend: "local".into(),
            timeout_ms: 10,
        };
        assert!(e.is_model_failure());
        assert!(!e.is_fatal());
    }

    #[test]
    fn test_missing_inventory_is_fatal() {
        let e = SynergyError::MissingInventory("devices.json".into());
        assert!(e.is_fatal());
        assert!(!e.is_model_failure());
        assert!(e.to_string().contains("devices.json"));
    }
}
