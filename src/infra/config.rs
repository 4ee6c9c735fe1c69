// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::infra::paths;

/// Longest recent window the co-occurrence retention accepts (ten years).
pub const MAX_RECENT_DAYS: i64 = 3650;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub time_of_day: TimeOfDayConfig,

    #[serde(default)]
    pub cooccurrence: CooccurrenceConfig,

    #[serde(default)]
    pub intervention: InterventionConfig,

    #[serde(default)]
    pub synergy: SynergyConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

/// Caller-facing knobs of a single `discover` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub time_window_minutes: u32,
    pub min_support: u32,
    pub min_confidence: f64,
    pub max_depth: usize,
    pub max_candidates: usize,
    pub suggestion_cap: usize,
    pub contamination_rate: f64,
    pub embedding_cache_mb: usize,
    /// Offset applied to UTC timestamps before deriving hour / day-of-week.
    pub utc_offset_minutes: i32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            time_window_minutes: 5,
            min_support: 5,
            min_confidence: 0.6,
            max_depth: 3,
            max_candidates: 500,
            suggestion_cap: 10,
            contamination_rate: 0.1,
            embedding_cache_mb: 200,
            utc_offset_minutes: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeOfDayConfig {
    pub min_events: usize,
    pub max_cluster_hours: usize,
    pub split_weekdays: bool,
}

impl Default for TimeOfDayConfig {
    fn default() -> Self {
        Self {
            min_events: 10,
            max_cluster_hours: 3,
            split_weekdays: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CooccurrenceConfig {
    pub min_confidence: f64,
    /// Above this many events the mixed retention strategy kicks in.
    pub max_events: usize,
    pub recent_days: i64,
    pub sample_seed: u64,
}

impl Default for CooccurrenceConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.7,
            max_events: 50_000,
            recent_days: 7,
            sample_seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterventionConfig {
    pub min_events: usize,
    pub min_occurrences: u32,
    pub min_confidence: f64,
    pub trees: usize,
    pub sample_size: usize,
    pub seed: u64,
}

impl Default for InterventionConfig {
    fn default() -> Self {
        Self {
            min_events: 10,
            min_occurrences: 3,
            min_confidence: 0.6,
            trees: 100,
            sample_size: 256,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynergyConfig {
    pub batch_size: usize,
    pub model_timeout_ms: u64,
    pub reference_prompts: Vec<String>,
    /// Physically adjacent area pairs; devices in linked areas are graph neighbours.
    pub area_links: Vec<(String, String)>,
}

impl Default for SynergyConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            model_timeout_ms: 10_000,
            reference_prompts: default_reference_prompts(),
            area_links: Vec::new(),
        }
    }
}

fn default_reference_prompts() -> Vec<String> {
    [
        "motion sensor turns on light in the same room",
        "door opens and lights turn on at night",
        "turn off lights and devices when nobody is home to save energy",
        "adjust thermostat temperature when window or door opens",
        "lock door and arm alarm when leaving",
        "start fan when humidity or temperature rises",
        "close blinds and covers at sunset",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Local,
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub base_url: String,
    pub embed_model: String,
    pub classify_model: String,
    pub dimension: usize,
    pub seed: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Local,
            base_url: "http://localhost:11434".into(),
            embed_model: "all-minilm".into(),
            classify_model: "qwen2.5:0.5b".into(),
            dimension: 384,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub enabled: bool,
    /// SQLite file; `:memory:` for an ephemeral store. Defaults to the data dir.
    pub path: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl Config {
    /// Load config from file, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make a run meaningless.
    pub fn validate(&self) -> anyhow::Result<()> {
        let d = &self.discovery;
        if !(0.0..=1.0).contains(&d.min_confidence) {
            anyhow::bail!("discovery.min_confidence must be within [0, 1]");
        }
        if !(0.0..0.5).contains(&d.contamination_rate) {
            anyhow::bail!("discovery.contamination_rate must be within [0, 0.5)");
        }
        if d.suggestion_cap == 0 {
            anyhow::bail!("discovery.suggestion_cap must be at least 1");
        }
        if d.max_depth == 0 {
            anyhow::bail!("discovery.max_depth must be at least 1");
        }
        if !(1..=MAX_RECENT_DAYS).contains(&self.cooccurrence.recent_days) {
            anyhow::bail!("cooccurrence.recent_days must be within [1, {MAX_RECENT_DAYS}]");
        }
        if self.synergy.batch_size == 0 {
            anyhow::bail!("synergy.batch_size must be at least 1");
        }
        if self.backend.dimension == 0 {
            anyhow::bail!("backend.dimension must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_reasonable() {
        let c = Config::default();
        assert_eq!(c.discovery.time_window_minutes, 5);
        assert_eq!(c.discovery.min_support, 5);
        assert!((c.discovery.min_confidence - 0.6).abs() < 0.001);
        assert_eq!(c.discovery.max_candidates, 500);
        assert_eq!(c.discovery.suggestion_cap, 10);
        assert!((c.discovery.contamination_rate - 0.1).abs() < 0.001);
        assert_eq!(c.discovery.embedding_cache_mb, 200);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_detector_defaults() {
        assert!((CooccurrenceConfig::default().min_confidence - 0.7).abs() < 0.001);
        assert_eq!(CooccurrenceConfig::default().max_events, 50_000);
        assert_eq!(InterventionConfig::default().min_occurrences, 3);
        assert_eq!(TimeOfDayConfig::default().min_events, 10);
        assert_eq!(SynergyConfig::default().batch_size, 32);
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.discovery.suggestion_cap, 10);
        assert_eq!(config.backend.kind, BackendKind::Local);
        assert!(!config.synergy.reference_prompts.is_empty());
    }

    #[test]
    fn test_parse_partial_sections() {
        let toml_str = r#"
[discovery]
min_support = 3
suggestion_cap = 4

[synergy]
area_links = [["kitchen", "living_room"]]

[backend]
kind = "ollama"
base_url = "http://ha.local:11434"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.discovery.min_support, 3);
        assert_eq!(config.discovery.suggestion_cap, 4);
        // untouched fields keep their defaults
        assert_eq!(config.discovery.max_candidates, 500);
        assert_eq!(config.synergy.area_links.len(), 1);
        assert_eq!(config.backend.kind, BackendKind::Ollama);
        assert_eq!(config.backend.dimension, 384);
    }

    #[test]
    fn test_validate_rejects_bad_confidence() {
        let mut c = Config::default();
        c.discovery.min_confidence = 1.5;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_cap() {
        let mut c = Config::default();
        c.discovery.suggestion_cap = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_recent_days() {
        let mut c = Config::default();
        c.cooccurrence.recent_days = 1_000_000_000_000;
        assert!(c.validate().is_err());
        c.cooccurrence.recent_days = 0;
        assert!(c.validate().is_err());
        c.cooccurrence.recent_days = MAX_RECENT_DAYS;
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(
            deserialized.discovery.suggestion_cap,
            config.discovery.suggestion_cap
        );
        assert_eq!(deserialized.store.enabled, config.store.enabled);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }
}
