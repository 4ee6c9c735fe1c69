// src/lib.rs — Library root for synergy-miner

pub mod cli;
pub mod core;
pub mod infra;
pub mod memory;
pub mod patterns;
pub mod provider;
pub mod ranking;
pub mod sources;
pub mod synergy;
