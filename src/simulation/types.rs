//! Core types for the traffic simulation
//!
//! Standalone types shared by the graph, planner, and agent modules.

use serde::{Deserialize, Serialize};

/// Ordered pair of node ids identifying a directed edge.
pub type EdgeKey = (String, String);

/// Build an [`EdgeKey`] from borrowed node ids.
pub fn edge_key(from: &str, to: &str) -> EdgeKey {
    (from.to_string(), to.to_string())
}

/// Label used for string-keyed multiplier snapshots (`"from,to"`).
pub fn edge_label(from: &str, to: &str) -> String {
    format!("{},{}", from, to)
}

/// A 2D position in the map's abstract coordinate plane
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Travel mode of an agent, also used to tag which modes an edge admits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Car,
    Bicycle,
    Pedestrian,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Car, Mode::Bicycle, Mode::Pedestrian];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Car => "car",
            Mode::Bicycle => "bicycle",
            Mode::Pedestrian => "pedestrian",
        }
    }

    /// Parse a mode name as it appears in map documents and commands.
    pub fn parse(name: &str) -> Option<Mode> {
        match name {
            "car" => Some(Mode::Car),
            "bicycle" => Some(Mode::Bicycle),
            "pedestrian" => Some(Mode::Pedestrian),
            _ => None,
        }
    }

    fn bit(self) -> u8 {
        match self {
            Mode::Car => 0b001,
            Mode::Bicycle => 0b010,
            Mode::Pedestrian => 0b100,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bitmask over the travel modes an edge admits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModeMask(u8);

impl ModeMask {
    pub fn empty() -> Self {
        ModeMask(0)
    }

    pub fn all() -> Self {
        ModeMask(0b111)
    }

    pub fn from_modes(modes: &[Mode]) -> Self {
        let mut mask = ModeMask(0);
        for mode in modes {
            mask.insert(*mode);
        }
        mask
    }

    pub fn insert(&mut self, mode: Mode) {
        self.0 |= mode.bit();
    }

    pub fn allows(&self, mode: Mode) -> bool {
        self.0 & mode.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// The modes present in the mask, in declaration order.
    pub fn modes(&self) -> Vec<Mode> {
        Mode::ALL.iter().copied().filter(|m| self.allows(*m)).collect()
    }
}

/// Lifecycle status of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Spawned but not yet advanced by a tick
    Waiting,
    /// Travelling along its current edge
    Moving,
    /// Held up by traffic, a blockage, or a failed reroute
    Stuck,
    /// Reached its destination; inert until removed
    Arrived,
    /// Path was just replaced by the reroute decider
    Rerouting,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Waiting => "waiting",
            AgentStatus::Moving => "moving",
            AgentStatus::Stuck => "stuck",
            AgentStatus::Arrived => "arrived",
            AgentStatus::Rerouting => "rerouting",
        }
    }
}

/// Gap below which a follower stops entirely, in edge length units
pub const MIN_FOLLOWING_DISTANCE: f64 = 30.0;

/// Gap above which the road ahead counts as clear
pub const CLEAR_AHEAD_DISTANCE: f64 = 60.0;
