//! Road network graph
//!
//! Immutable once built from a map document. The petgraph `DiGraph` carries
//! adjacency; edge attributes live in an insertion-ordered record table so
//! iteration and random edge choice stay deterministic for a given map.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

use super::error::{SimError, SimResult};
use super::map::MapFile;
use super::types::{EdgeKey, Mode, ModeMask, Point};

/// A directed edge with its planning attributes
#[derive(Debug, Clone)]
pub struct EdgeRecord {
    pub from: String,
    pub to: String,
    pub distance: f64,
    pub modes: ModeMask,
    pub one_way: bool,
}

impl EdgeRecord {
    pub fn key(&self) -> EdgeKey {
        (self.from.clone(), self.to.clone())
    }

    pub fn allows(&self, mode: Mode) -> bool {
        self.modes.allows(mode)
    }
}

/// Directed road graph with node coordinates
pub struct RoadGraph {
    graph: DiGraph<String, usize>,
    node_index: HashMap<String, NodeIndex>,
    node_order: Vec<String>,
    coords: HashMap<String, Point>,
    records: Vec<EdgeRecord>,
    by_key: HashMap<EdgeKey, usize>,
}

impl RoadGraph {
    /// Build a graph from a validated map document. Non-one-way edges are
    /// materialised in both directions.
    pub fn from_map(map: &MapFile) -> SimResult<Self> {
        map.validate()?;

        let mut graph = DiGraph::new();
        let mut node_index = HashMap::new();
        let mut node_order = Vec::with_capacity(map.nodes.len());
        let mut coords = HashMap::new();

        for node in &map.nodes {
            let idx = graph.add_node(node.id.clone());
            node_index.insert(node.id.clone(), idx);
            node_order.push(node.id.clone());
            coords.insert(node.id.clone(), Point::new(node.x, node.y));
        }

        let mut network = Self {
            graph,
            node_index,
            node_order,
            coords,
            records: Vec::new(),
            by_key: HashMap::new(),
        };

        for edge in &map.edges {
            let modes: Vec<Mode> = edge
                .allowed_modes
                .iter()
                .filter_map(|m| Mode::parse(m))
                .collect();
            let mask = ModeMask::from_modes(&modes);

            network.insert_edge(&edge.from, &edge.to, edge.distance, mask, edge.one_way);
            if !edge.one_way {
                network.insert_edge(&edge.to, &edge.from, edge.distance, mask, false);
            }
        }

        Ok(network)
    }

    fn insert_edge(&mut self, from: &str, to: &str, distance: f64, modes: ModeMask, one_way: bool) {
        let key = (from.to_string(), to.to_string());
        if self.by_key.contains_key(&key) {
            return;
        }

        let record = EdgeRecord {
            from: from.to_string(),
            to: to.to_string(),
            distance,
            modes,
            one_way,
        };
        let slot = self.records.len();
        self.records.push(record);
        self.by_key.insert(key, slot);

        let a = self.node_index[from];
        let b = self.node_index[to];
        self.graph.add_edge(a, b, slot);
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.node_index.get(id).copied()
    }

    pub fn id_of(&self, idx: NodeIndex) -> &str {
        &self.graph[idx]
    }

    pub fn coord(&self, id: &str) -> SimResult<Point> {
        self.coords
            .get(id)
            .copied()
            .ok_or_else(|| SimError::UnknownNode(id.to_string()))
    }

    pub fn coord_of(&self, idx: NodeIndex) -> Point {
        self.coords[self.id_of(idx)]
    }

    /// Node ids in map declaration order.
    pub fn nodes(&self) -> &[String] {
        &self.node_order
    }

    /// All directed edge records in insertion order.
    pub fn edges(&self) -> &[EdgeRecord] {
        &self.records
    }

    pub fn edge(&self, from: &str, to: &str) -> Option<&EdgeRecord> {
        let key = (from.to_string(), to.to_string());
        self.by_key.get(&key).map(|slot| &self.records[*slot])
    }

    /// Outgoing edges of a node, resolved to their records.
    pub fn out_edges(&self, idx: NodeIndex) -> impl Iterator<Item = &EdgeRecord> {
        self.graph.edges(idx).map(|e| &self.records[*e.weight()])
    }

    /// Outgoing edges of a node addressed by id.
    pub fn neighbours(&self, id: &str) -> SimResult<Vec<&EdgeRecord>> {
        let idx = self
            .index_of(id)
            .ok_or_else(|| SimError::UnknownNode(id.to_string()))?;
        Ok(self.out_edges(idx).collect())
    }

    pub fn out_degree(&self, id: &str) -> usize {
        match self.index_of(id) {
            Some(idx) => self.graph.edges(idx).count(),
            None => 0,
        }
    }

    pub fn node_count(&self) -> usize {
        self.node_order.len()
    }

    pub fn edge_count(&self) -> usize {
        self.records.len()
    }
}
