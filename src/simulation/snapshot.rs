//! Read-only projections of engine state
//!
//! Everything here is an owned, serde-serializable copy. External
//! transports can hand these to clients without holding the engine lock.

use std::collections::BTreeMap;

use serde::Serialize;

use super::agent::Agent;
use super::incident::{Accident, Blockage};
use super::map::MapNode;

/// One agent as the query surface reports it
#[derive(Debug, Clone, Serialize)]
pub struct AgentView {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub origin: String,
    pub destination: String,
    pub current_node: String,
    pub next_node: Option<String>,
    pub path: Vec<String>,
    pub path_index: usize,
    pub status: String,
    pub position_on_edge: f64,
    pub current_speed: f64,
    pub target_speed: f64,
    pub nominal_speed: f64,
    pub capacity_usage: f64,
    pub total_distance: f64,
    pub wait_time: f64,
    pub reroute_count: u32,
    pub travel_time: Option<f64>,
}

impl From<&Agent> for AgentView {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id.clone(),
            kind: agent.kind.as_str().to_string(),
            origin: agent.origin.clone(),
            destination: agent.destination.clone(),
            current_node: agent.current_node.clone(),
            next_node: agent.next_node.clone(),
            path: agent.path.clone(),
            path_index: agent.path_index,
            status: agent.status.as_str().to_string(),
            position_on_edge: agent.position_on_edge,
            current_speed: agent.current_speed,
            target_speed: agent.target_speed,
            nominal_speed: agent.nominal_speed,
            capacity_usage: agent.capacity_usage,
            total_distance: agent.total_distance,
            wait_time: agent.wait_time,
            reroute_count: agent.reroute_count,
            travel_time: agent.travel_time(),
        }
    }
}

/// Aggregate agent lifecycle statistics
#[derive(Debug, Clone, Serialize)]
pub struct VehicleStats {
    pub total_agents: usize,
    pub active_agents: usize,
    pub arrived_agents: usize,
    pub average_travel_time: f64,
    pub average_wait_time: f64,
    pub total_reroutes: u64,
    pub agents_by_kind: BTreeMap<String, usize>,
}

/// Live speed summary for one agent kind
#[derive(Debug, Clone, Serialize, Default)]
pub struct SpeedSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

/// Network-wide congestion statistics
#[derive(Debug, Clone, Serialize)]
pub struct TrafficStats {
    pub average_density: f64,
    pub average_congestion_probability: f64,
    pub total_edges: usize,
    /// Share of edges per band, in percent. Sums to 100 for non-empty maps.
    pub congestion_distribution: BTreeMap<String, f64>,
    pub bottleneck_count: usize,
    pub top_bottlenecks: Vec<BottleneckView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BottleneckView {
    pub from: String,
    pub to: String,
    pub density: f64,
    pub probability: f64,
}

/// Traffic row for one directed edge
#[derive(Debug, Clone, Serialize)]
pub struct EdgeTraffic {
    pub from: String,
    pub to: String,
    pub density: f64,
    pub congestion_level: String,
    pub congestion_probability: f64,
    pub agent_count: usize,
    pub capacity: f64,
}

/// Combined statistics answer
#[derive(Debug, Clone, Serialize)]
pub struct TrafficStatistics {
    pub vehicle_statistics: VehicleStats,
    pub traffic_statistics: TrafficStats,
    pub speed_distribution: BTreeMap<String, SpeedSummary>,
}

/// Per-node congestion entry for the report
#[derive(Debug, Clone, Serialize)]
pub struct NodeCongestion {
    pub node: String,
    pub congestion: f64,
}

/// Detailed congestion analysis
#[derive(Debug, Clone, Serialize)]
pub struct CongestionReport {
    pub bottlenecks: Vec<BottleneckView>,
    pub congested_intersections: Vec<NodeCongestion>,
    pub global_stats: TrafficStats,
}

/// Result of one tick
#[derive(Debug, Clone, Serialize)]
pub struct TickSummary {
    pub step: u64,
    pub dt: f64,
    pub active_agents: usize,
    pub moved: usize,
    pub arrived: usize,
    pub accidents: Vec<Accident>,
    pub blocked_roads: Vec<Blockage>,
    /// Multiplier field keyed `"from,to"`.
    pub multipliers: BTreeMap<String, f64>,
}

/// Full state projection
#[derive(Debug, Clone, Serialize)]
pub struct SimulationState {
    pub step: u64,
    pub is_running: bool,
    pub agents: Vec<AgentView>,
    pub vehicle_statistics: VehicleStats,
    pub traffic_statistics: TrafficStats,
    pub edge_traffic: Vec<EdgeTraffic>,
    pub multipliers: BTreeMap<String, f64>,
    pub total_spawned: u64,
}

/// Small status card
#[derive(Debug, Clone, Serialize)]
pub struct SimulationInfo {
    pub elapsed_sim_time: f64,
    pub step: u64,
    pub total_spawned: u64,
    pub agent_count: usize,
    pub accident_count: usize,
    pub blocked_road_count: usize,
    pub hotspot_count: usize,
}

/// Edge row of the map projection
#[derive(Debug, Clone, Serialize)]
pub struct MapEdgeView {
    pub from: String,
    pub to: String,
    pub distance: f64,
    pub allowed_modes: Vec<String>,
    pub one_way: bool,
}

/// Map geometry as loaded, for rendering clients
#[derive(Debug, Clone, Serialize)]
pub struct MapData {
    pub nodes: Vec<MapNode>,
    pub edges: Vec<MapEdgeView>,
}

/// Known maps and the one currently loaded
#[derive(Debug, Clone, Serialize)]
pub struct MapsView {
    pub maps: Vec<String>,
    pub current: String,
}

/// Planner answer for the route query
#[derive(Debug, Clone, Serialize)]
pub struct PlanView {
    pub path: Option<Vec<String>>,
    pub cost: Option<f64>,
}
