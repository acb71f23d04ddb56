//! Congestion analysis
//!
//! Derives per-edge density from the occupancy index, classifies it into
//! bands, and keeps a bounded history of sampled multipliers from which the
//! congestion probability is computed.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use super::agent::AgentRoster;
use super::graph::RoadGraph;
use super::snapshot::{BottleneckView, EdgeTraffic, TrafficStats};
use super::types::EdgeKey;

/// Density below which an edge flows freely.
pub const LIGHT_DENSITY: f64 = 0.2;
/// Density at which traffic is noticeable.
pub const MODERATE_DENSITY: f64 = 0.4;
/// Density at which an edge counts as a bottleneck.
pub const HEAVY_DENSITY: f64 = 0.7;
/// Density at or above capacity.
pub const CONGESTED_DENSITY: f64 = 1.0;

/// Multiplier samples retained per edge.
pub const HISTORY_CAP: usize = 100;

/// Largest multiplier the band sampler can produce.
pub const BAND_CEILING: f64 = 6.0;

/// Named density band with an associated multiplier sampling range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CongestionLevel {
    FreeFlow,
    Light,
    Moderate,
    Heavy,
    Congested,
}

impl CongestionLevel {
    pub const ALL: [CongestionLevel; 5] = [
        CongestionLevel::FreeFlow,
        CongestionLevel::Light,
        CongestionLevel::Moderate,
        CongestionLevel::Heavy,
        CongestionLevel::Congested,
    ];

    pub fn from_density(density: f64) -> Self {
        if density < LIGHT_DENSITY {
            CongestionLevel::FreeFlow
        } else if density < MODERATE_DENSITY {
            CongestionLevel::Light
        } else if density < HEAVY_DENSITY {
            CongestionLevel::Moderate
        } else if density < CONGESTED_DENSITY {
            CongestionLevel::Heavy
        } else {
            CongestionLevel::Congested
        }
    }

    /// Uniform range multipliers for this band are drawn from.
    pub fn sample_range(&self) -> (f64, f64) {
        match self {
            CongestionLevel::FreeFlow => (0.5, 0.8),
            CongestionLevel::Light => (1.0, 1.5),
            CongestionLevel::Moderate => (1.5, 2.5),
            CongestionLevel::Heavy => (2.5, 4.0),
            CongestionLevel::Congested => (4.0, BAND_CEILING),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CongestionLevel::FreeFlow => "free_flow",
            CongestionLevel::Light => "light",
            CongestionLevel::Moderate => "moderate",
            CongestionLevel::Heavy => "heavy",
            CongestionLevel::Congested => "congested",
        }
    }
}

/// Per-edge density, band, probability, and multiplier history
pub struct CongestionAnalyzer {
    base_capacity: f64,
    capacities: HashMap<EdgeKey, f64>,
    history: HashMap<EdgeKey, VecDeque<f64>>,
}

impl CongestionAnalyzer {
    /// Capacity scales linearly with edge length so long edges hold more
    /// agents. `base_capacity` is capacity-usage per unit of length.
    pub fn new(graph: &RoadGraph, base_capacity: f64) -> Self {
        let capacities = graph
            .edges()
            .iter()
            .map(|rec| (rec.key(), base_capacity * rec.distance))
            .collect();
        Self {
            base_capacity,
            capacities,
            history: HashMap::new(),
        }
    }

    pub fn capacity(&self, edge: &EdgeKey) -> f64 {
        self.capacities.get(edge).copied().unwrap_or(self.base_capacity)
    }

    /// Capacity usage on the edge divided by its capacity.
    pub fn density(&self, edge: &EdgeKey, roster: &AgentRoster) -> f64 {
        let usage = roster.capacity_usage_on(edge);
        (usage / self.capacity(edge)).max(0.0)
    }

    pub fn level(&self, edge: &EdgeKey, roster: &AgentRoster) -> CongestionLevel {
        CongestionLevel::from_density(self.density(edge, roster))
    }

    /// Append a band sample to the edge's bounded history.
    pub fn record_sample(&mut self, edge: EdgeKey, multiplier: f64) {
        let samples = self.history.entry(edge).or_default();
        samples.push_back(multiplier);
        if samples.len() > HISTORY_CAP {
            samples.pop_front();
        }
    }

    pub fn history_mean(&self, edge: &EdgeKey) -> Option<f64> {
        let samples = self.history.get(edge)?;
        if samples.is_empty() {
            return None;
        }
        Some(samples.iter().sum::<f64>() / samples.len() as f64)
    }

    /// Probability that an agent entering the edge hits congestion, from
    /// current density plus the historical multiplier trend.
    pub fn probability(&self, edge: &EdgeKey, roster: &AgentRoster) -> f64 {
        let density_part = (self.density(edge, roster) / CONGESTED_DENSITY).clamp(0.0, 1.0);
        let history_part = self
            .history_mean(edge)
            .map(|mean| (mean - 1.0) / 4.0)
            .unwrap_or(0.0);
        (density_part + history_part).clamp(0.0, 1.0)
    }

    /// Edges at or above the bottleneck density, densest first.
    pub fn bottlenecks(&self, graph: &RoadGraph, roster: &AgentRoster) -> Vec<(EdgeKey, f64)> {
        let mut found: Vec<(EdgeKey, f64)> = graph
            .edges()
            .iter()
            .map(|rec| {
                let key = rec.key();
                let density = self.density(&key, roster);
                (key, density)
            })
            .filter(|(_, density)| *density >= HEAVY_DENSITY)
            .collect();
        found.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        found
    }

    /// Mean density of a node's outgoing edges.
    pub fn node_congestion(&self, graph: &RoadGraph, node: &str, roster: &AgentRoster) -> f64 {
        let Ok(edges) = graph.neighbours(node) else {
            return 0.0;
        };
        if edges.is_empty() {
            return 0.0;
        }
        let total: f64 = edges
            .iter()
            .map(|rec| self.density(&rec.key(), roster))
            .sum();
        total / edges.len() as f64
    }

    /// Network-wide traffic statistics.
    pub fn global_statistics(&self, graph: &RoadGraph, roster: &AgentRoster) -> TrafficStats {
        let mut densities = Vec::with_capacity(graph.edge_count());
        let mut probabilities = Vec::with_capacity(graph.edge_count());
        let mut band_counts: HashMap<&'static str, usize> = HashMap::new();

        for rec in graph.edges() {
            let key = rec.key();
            let density = self.density(&key, roster);
            probabilities.push(self.probability(&key, roster));
            *band_counts
                .entry(CongestionLevel::from_density(density).as_str())
                .or_insert(0) += 1;
            densities.push(density);
        }

        let total_edges = graph.edge_count();
        let mean = |values: &[f64]| {
            if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            }
        };

        let congestion_distribution = CongestionLevel::ALL
            .iter()
            .map(|level| {
                let count = band_counts.get(level.as_str()).copied().unwrap_or(0);
                let share = if total_edges > 0 {
                    count as f64 / total_edges as f64 * 100.0
                } else {
                    0.0
                };
                (level.as_str().to_string(), share)
            })
            .collect();

        let bottlenecks = self.bottlenecks(graph, roster);

        TrafficStats {
            average_density: mean(&densities),
            average_congestion_probability: mean(&probabilities),
            total_edges,
            congestion_distribution,
            bottleneck_count: bottlenecks.len(),
            top_bottlenecks: bottlenecks
                .iter()
                .take(5)
                .map(|((from, to), density)| BottleneckView {
                    from: from.clone(),
                    to: to.clone(),
                    density: *density,
                    probability: self.probability(&(from.clone(), to.clone()), roster),
                })
                .collect(),
        }
    }

    /// Per-edge traffic rows for visualisation consumers.
    pub fn edge_traffic(&self, graph: &RoadGraph, roster: &AgentRoster) -> Vec<EdgeTraffic> {
        graph
            .edges()
            .iter()
            .map(|rec| {
                let key = rec.key();
                let density = self.density(&key, roster);
                EdgeTraffic {
                    from: rec.from.clone(),
                    to: rec.to.clone(),
                    density,
                    congestion_level: CongestionLevel::from_density(density)
                        .as_str()
                        .to_string(),
                    congestion_probability: self.probability(&key, roster),
                    agent_count: roster.agent_count_on(&key),
                    capacity: self.capacity(&key),
                }
            })
            .collect()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}
