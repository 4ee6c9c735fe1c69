// src/core/mod.rs — Domain types and the discovery engine

pub mod engine;
pub mod types;

pub use engine::{discover, DiscoveryEngine, DiscoveryReport, RunStats};
