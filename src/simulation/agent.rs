//! Agents and the roster that indexes them
//!
//! An agent is a closed record: its planned path, its progress along the
//! current edge, and the counters the statistics queries report. All
//! mutation happens inside a tick; the roster keeps the by-id, active-set,
//! and edge-occupancy views consistent.

use std::collections::{HashMap, HashSet};

use super::error::{SimError, SimResult};
use super::types::{
    AgentStatus, EdgeKey, Mode, CLEAR_AHEAD_DISTANCE, MIN_FOLLOWING_DISTANCE,
};

/// One moving agent
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: String,
    pub kind: Mode,
    pub origin: String,
    pub destination: String,
    pub current_node: String,
    pub next_node: Option<String>,
    pub path: Vec<String>,
    pub path_index: usize,
    pub status: AgentStatus,
    /// Progress along the current edge, 0 at the tail node, 1 at the head.
    pub position_on_edge: f64,
    pub current_speed: f64,
    pub target_speed: f64,
    /// Speed this agent drives at on a clear road, sampled at spawn.
    pub nominal_speed: f64,
    pub capacity_usage: f64,
    pub path_cost: f64,
    pub total_distance: f64,
    pub wait_time: f64,
    pub reroute_count: u32,
    /// Simulation time at spawn, in seconds.
    pub spawned_at: f64,
    /// Simulation time at arrival, once reached.
    pub arrived_at: Option<f64>,
}

impl Agent {
    pub fn new(
        id: String,
        kind: Mode,
        origin: String,
        destination: String,
        nominal_speed: f64,
        capacity_usage: f64,
        now: f64,
    ) -> Self {
        Self {
            id,
            kind,
            current_node: origin.clone(),
            origin,
            destination,
            next_node: None,
            path: Vec::new(),
            path_index: 0,
            status: AgentStatus::Waiting,
            position_on_edge: 0.0,
            // Agents enter the network at speed rather than from a
            // standing start.
            current_speed: nominal_speed,
            target_speed: nominal_speed,
            nominal_speed,
            capacity_usage,
            path_cost: 0.0,
            total_distance: 0.0,
            wait_time: 0.0,
            reroute_count: 0,
            spawned_at: now,
            arrived_at: None,
        }
    }

    /// Install a path that starts at the current node. Resets edge progress.
    pub fn set_path(&mut self, path: Vec<String>, cost: f64) {
        debug_assert!(
            path.first().map(String::as_str) == Some(self.current_node.as_str()),
            "path must start at the agent's current node"
        );
        self.next_node = path.get(1).cloned();
        self.path = path;
        self.path_index = 0;
        self.path_cost = cost;
        self.position_on_edge = 0.0;
        if self.next_node.is_some() && self.status == AgentStatus::Waiting {
            self.status = AgentStatus::Moving;
        }
    }

    pub fn is_active(&self) -> bool {
        self.status != AgentStatus::Arrived
    }

    /// The directed edge the agent currently occupies, if it is between
    /// nodes.
    pub fn current_edge(&self) -> Option<EdgeKey> {
        self.next_node
            .as_ref()
            .map(|next| (self.current_node.clone(), next.clone()))
    }

    /// Car-following reaction to the gap ahead, in edge length units.
    /// `None` means the road ahead is clear.
    pub fn follow_gap(&mut self, gap: Option<f64>) {
        match gap {
            Some(d) if d < MIN_FOLLOWING_DISTANCE => {
                self.target_speed = 0.0;
                self.status = AgentStatus::Stuck;
            }
            Some(d) if d < CLEAR_AHEAD_DISTANCE => {
                self.target_speed = self.nominal_speed * (d / CLEAR_AHEAD_DISTANCE);
                self.status = AgentStatus::Stuck;
            }
            _ => {
                self.target_speed = self.nominal_speed;
                self.status = AgentStatus::Moving;
            }
        }
    }

    /// Move current speed toward target speed, bounded by `accel * dt`.
    pub fn adjust_speed(&mut self, dt: f64, accel: f64) {
        let diff = self.target_speed - self.current_speed;
        let step = accel * dt;
        if diff.abs() <= step {
            self.current_speed = self.target_speed;
        } else if diff > 0.0 {
            self.current_speed += step;
        } else {
            self.current_speed -= step;
        }
    }

    /// Advance along the current edge; returns true on crossing the head
    /// node. Progress past the node within the same tick is discarded.
    pub fn advance_position(&mut self, dt: f64, edge_length: f64) -> bool {
        let delta = self.current_speed * dt / edge_length;
        self.position_on_edge = (self.position_on_edge + delta).min(1.0);
        self.position_on_edge >= 1.0
    }

    /// Consume a node crossing: step to the next path entry and reset edge
    /// progress. Returns true if the destination was reached.
    pub fn cross_node(&mut self, now: f64) -> bool {
        debug_assert!(self.path_index + 1 < self.path.len());
        self.path_index += 1;
        self.current_node = self.path[self.path_index].clone();
        self.next_node = self.path.get(self.path_index + 1).cloned();
        self.position_on_edge = 0.0;

        if self.current_node == self.destination {
            self.mark_arrived(now);
            true
        } else {
            false
        }
    }

    pub fn mark_arrived(&mut self, now: f64) {
        self.status = AgentStatus::Arrived;
        self.next_node = None;
        self.arrived_at = Some(now);
        self.current_speed = 0.0;
        self.target_speed = 0.0;
    }

    pub fn travel_time(&self) -> Option<f64> {
        self.arrived_at.map(|t| t - self.spawned_at)
    }
}

/// Index over all agents: by id, by activity, and by occupied edge
#[derive(Default)]
pub struct AgentRoster {
    agents: HashMap<String, Agent>,
    /// Spawn order, kept so tick passes visit agents deterministically.
    order: Vec<String>,
    active: HashSet<String>,
    occupancy: HashMap<EdgeKey, Vec<String>>,
}

impl AgentRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, agent: Agent) {
        let id = agent.id.clone();
        if agent.is_active() {
            self.active.insert(id.clone());
            if let Some(edge) = agent.current_edge() {
                self.occupancy.entry(edge).or_default().push(id.clone());
            }
        }
        self.order.push(id.clone());
        self.agents.insert(id, agent);
    }

    pub fn remove(&mut self, id: &str) -> SimResult<Agent> {
        let agent = self
            .agents
            .remove(id)
            .ok_or_else(|| SimError::UnknownAgent(id.to_string()))?;
        self.active.remove(id);
        self.order.retain(|existing| existing != id);
        for occupants in self.occupancy.values_mut() {
            occupants.retain(|existing| existing != id);
        }
        Ok(agent)
    }

    pub fn get(&self, id: &str) -> Option<&Agent> {
        self.agents.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Agent> {
        self.agents.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// All agents in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.order.iter().filter_map(|id| self.agents.get(id))
    }

    /// Ids of active agents in spawn order, cloned so callers may mutate
    /// the roster while walking the list.
    pub fn active_ids(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|id| self.active.contains(*id))
            .cloned()
            .collect()
    }

    /// Drop an agent from the active set after it arrives.
    pub fn note_arrival(&mut self, id: &str) {
        self.active.remove(id);
        for occupants in self.occupancy.values_mut() {
            occupants.retain(|existing| existing != id);
        }
    }

    /// Ids of active agents on a directed edge.
    pub fn occupants(&self, edge: &EdgeKey) -> &[String] {
        self.occupancy.get(edge).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn agent_count_on(&self, edge: &EdgeKey) -> usize {
        self.occupants(edge).len()
    }

    /// Total capacity usage of agents on an edge.
    pub fn capacity_usage_on(&self, edge: &EdgeKey) -> f64 {
        self.occupants(edge)
            .iter()
            .filter_map(|id| self.agents.get(id))
            .map(|a| a.capacity_usage)
            .sum()
    }

    /// Smallest gap to an agent further along the same edge, as a fraction
    /// of edge length. `None` when nobody is ahead.
    pub fn gap_ahead(&self, edge: &EdgeKey, position: f64, exclude: &str) -> Option<f64> {
        self.occupants(edge)
            .iter()
            .filter(|id| id.as_str() != exclude)
            .filter_map(|id| self.agents.get(id))
            .filter(|other| other.position_on_edge > position)
            .map(|other| other.position_on_edge - position)
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// Rebuild the edge occupancy index from the active set.
    pub fn rebuild_occupancy(&mut self) {
        self.occupancy.clear();
        for id in &self.order {
            if !self.active.contains(id) {
                continue;
            }
            if let Some(edge) = self.agents.get(id).and_then(Agent::current_edge) {
                self.occupancy.entry(edge).or_default().push(id.clone());
            }
        }
    }

    pub fn clear(&mut self) {
        self.agents.clear();
        self.order.clear();
        self.active.clear();
        self.occupancy.clear();
    }
}
