// src/cli/discover.rs — `synergy discover`: load inputs, run the engine, emit JSON

use serde::Serialize;
use std::path::Path;

use crate::core::types::RelationshipIndex;
use crate::core::{DiscoveryEngine, DiscoveryReport};
use crate::infra::config::Config;
use crate::sources::{self, LoadReport};

#[derive(Debug, Serialize)]
struct InputReport {
    events: LoadReport,
    devices: LoadReport,
    relationships: Option<LoadReport>,
}

#[derive(Debug, Serialize)]
struct Output {
    #[serde(flatten)]
    report: DiscoveryReport,
    inputs: InputReport,
}

pub async fn run_discover(
    config: Config,
    events: &Path,
    devices: &Path,
    relationships: Option<&Path>,
    output: Option<&Path>,
    pretty: bool,
) -> anyhow::Result<()> {
    // Inventory first: without it nothing can run.
    let (inventory, devices_report) = sources::load_inventory(devices)?;
    let (events, events_report) = sources::load_events(events)?;
    let (index, relationships_report) = match relationships {
        Some(path) => {
            let (edges, report) = sources::load_relationships(path)?;
            (RelationshipIndex::from_edges(edges), Some(report))
        }
        None => (RelationshipIndex::default(), None),
    };

    let engine = DiscoveryEngine::from_config(config);
    let report = engine.discover(&events, &inventory, &index).await?;

    let out = Output {
        report,
        inputs: InputReport {
            events: events_report,
            devices: devices_report,
            relationships: relationships_report,
        },
    };
    let json = if pretty {
        serde_json::to_string_pretty(&out)?
    } else {
        serde_json::to_string(&out)?
    };

    match output {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))?;
            eprintln!(
                "Wrote {} suggestions to {}",
                out.report.suggestions.len(),
                path.display()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}
