//! Core traffic simulation
//!
//! Everything the engine needs lives here: the road graph, the planner, the
//! agent roster, the congestion analyser, and the tick orchestrator. The
//! module has no transport or rendering dependencies; external collaborators
//! drive it through commands and read snapshot projections.

mod agent;
mod config;
mod congestion;
mod error;
mod graph;
mod incident;
mod map;
mod planner;
mod snapshot;
mod types;
mod world;

// Re-export public types for external use
#[allow(unused_imports)]
pub use agent::{Agent, AgentRoster};
#[allow(unused_imports)]
pub use config::{SimConfig, SpawnMix, SpeedProfile, MAX_TICK_DT};
#[allow(unused_imports)]
pub use congestion::{CongestionAnalyzer, CongestionLevel, BAND_CEILING, HEAVY_DENSITY, HISTORY_CAP};
#[allow(unused_imports)]
pub use error::{SimError, SimResult};
#[allow(unused_imports)]
pub use graph::{EdgeRecord, RoadGraph};
#[allow(unused_imports)]
pub use incident::{Accident, Blockage, Severity, BLOCKED_MULTIPLIER};
#[allow(unused_imports)]
pub use map::{available_maps, grid_map, load_builtin, MapEdge, MapFile, MapNode};
#[allow(unused_imports)]
pub use planner::{plan, PlannedPath};
#[allow(unused_imports)]
pub use snapshot::{
    AgentView, BottleneckView, CongestionReport, EdgeTraffic, MapData, MapEdgeView, MapsView,
    NodeCongestion, PlanView, SimulationInfo, SimulationState, SpeedSummary, TickSummary,
    TrafficStatistics, TrafficStats, VehicleStats,
};
#[allow(unused_imports)]
pub use types::{
    edge_key, edge_label, AgentStatus, EdgeKey, Mode, ModeMask, Point, CLEAR_AHEAD_DISTANCE,
    MIN_FOLLOWING_DISTANCE,
};
pub use world::SimEngine;
