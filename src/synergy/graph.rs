// src/synergy/graph.rs — Immutable device adjacency (arena + CSR edge index)

use std::collections::{BTreeMap, BTreeSet};

use crate::core::types::{DeviceDescriptor, DeviceInventory};

/// Index of a device in the graph arena. Ordering follows device id order.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct NodeId(pub u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Device graph built once per run and never mutated during traversal.
///
/// Two devices are neighbours when they share an area, or when their areas
/// are listed as a physically adjacent pair. Devices without an area have
/// no neighbours.
#[derive(Debug, Clone, Default)]
pub struct DeviceGraph {
    nodes: Vec<DeviceDescriptor>,
    by_id: BTreeMap<String, NodeId>,
    /// `offsets[i]..offsets[i + 1]` is node i's slice of `targets`.
    offsets: Vec<usize>,
    targets: Vec<NodeId>,
}

impl DeviceGraph {
    pub fn build(inventory: &DeviceInventory, area_links: &[(String, String)]) -> Self {
        let nodes: Vec<DeviceDescriptor> = inventory.iter().cloned().collect();
        let by_id: BTreeMap<String, NodeId> = nodes
            .iter()
            .enumerate()
            .map(|(i, d)| (d.device_id.clone(), NodeId(i as u32)))
            .collect();

        let mut members: BTreeMap<&str, Vec<NodeId>> = BTreeMap::new();
        for (i, d) in nodes.iter().enumerate() {
            if let Some(area) = d.area_id.as_deref() {
                members.entry(area).or_default().push(NodeId(i as u32));
            }
        }

        let mut linked: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for (a, b) in area_links {
            if a == b {
                continue;
            }
            linked.entry(a.as_str()).or_default().insert(b.as_str());
            linked.entry(b.as_str()).or_default().insert(a.as_str());
        }

        let mut offsets = Vec::with_capacity(nodes.len() + 1);
        let mut targets = Vec::new();
        offsets.push(0);
        for (i, d) in nodes.iter().enumerate() {
            let me = NodeId(i as u32);
            let mut adj: Vec<NodeId> = Vec::new();
            if let Some(area) = d.area_id.as_deref() {
                let reachable = std::iter::once(area)
                    .chain(linked.get(area).into_iter().flatten().copied());
                for other_area in reachable {
                    if let Some(ids) = members.get(other_area) {
                        adj.extend(ids.iter().copied().filter(|&n| n != me));
                    }
                }
            }
            adj.sort_unstable();
            adj.dedup();
            targets.extend(adj);
            offsets.push(targets.len());
        }

        Self {
            nodes,
            by_id,
            offsets,
            targets,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.targets.len() / 2
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn lookup(&self, device_id: &str) -> Option<NodeId> {
        self.by_id.get(device_id).copied()
    }

    pub fn device(&self, node: NodeId) -> &DeviceDescriptor {
        &self.nodes[node.index()]
    }

    /// Neighbours in ascending id order.
    pub fn neighbors(&self, node: NodeId) -> &[NodeId] {
        let i = node.index();
        match (self.offsets.get(i), self.offsets.get(i + 1)) {
            (Some(&start), Some(&end)) => &self.targets[start..end],
            _ => &[],
        }
    }

    pub fn degree(&self, node: NodeId) -> usize {
        self.neighbors(node).len()
    }
}
