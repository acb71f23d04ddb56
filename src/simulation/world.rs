//! Main simulation engine
//!
//! `SimEngine` exclusively owns all mutable state: the agent roster, the
//! multiplier field, incidents, and the clocks. Every mutation happens
//! inside `tick` or a command method, so an external transport only needs
//! one mutex around the engine to serialise access.
//!
//! The two movement passes are deliberately sequential over the full active
//! set: the car-following scan observes pre-integration positions, and the
//! integrator reads the target speeds that scan produced. Parallelising over
//! agents would require snapshotting positions before the first pass.

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::agent::{Agent, AgentRoster};
use super::config::{SimConfig, SpawnMix, SpeedProfile};
use super::congestion::{CongestionAnalyzer, CongestionLevel, BAND_CEILING};
use super::error::{SimError, SimResult};
use super::graph::RoadGraph;
use super::incident::{Accident, Blockage, Severity, BLOCKED_MULTIPLIER};
use super::map::{self, MapFile, MapNode};
use super::planner::{self, PlannedPath};
use super::snapshot::{
    AgentView, CongestionReport, MapData, MapEdgeView, MapsView, NodeCongestion, PlanView,
    SimulationInfo, SimulationState, SpeedSummary, TickSummary, TrafficStatistics, TrafficStats,
    VehicleStats,
};
use super::types::{edge_key, edge_label, AgentStatus, EdgeKey, Mode};

/// How many upcoming path edges the reroute decider inspects.
const REROUTE_LOOKAHEAD: usize = 3;

/// Congestion probability above which the decider forces a reroute.
const REROUTE_PROBABILITY: f64 = 0.5;

/// Seconds of simulated time over which hotspot congestion ramps up.
const HOTSPOT_RAMP_SECS: f64 = 60.0;

/// The simulation engine
pub struct SimEngine {
    graph: RoadGraph,
    config: SimConfig,
    map_id: String,
    roster: AgentRoster,
    analyzer: CongestionAnalyzer,
    multipliers: HashMap<EdgeKey, f64>,
    blocked: BTreeMap<EdgeKey, Blockage>,
    accidents: BTreeMap<String, Accident>,
    hotspots: HashSet<EdgeKey>,

    /// Optional seeded RNG for reproducible simulations
    rng: Option<StdRng>,
    seed: Option<u64>,

    step: u64,
    sim_time: f64,
    last_tick: Option<Instant>,
    running: bool,
    total_spawned: u64,
    next_agent_serial: u64,
    next_accident_serial: u64,
    spawn_credit: f64,
}

impl SimEngine {
    pub fn new(map: &MapFile, config: SimConfig) -> SimResult<Self> {
        Self::build(map, config, None, "custom")
    }

    /// Engine with a seeded RNG for reproducible runs.
    pub fn with_seed(map: &MapFile, config: SimConfig, seed: u64) -> SimResult<Self> {
        Self::build(map, config, Some(seed), "custom")
    }

    pub fn from_builtin(id: &str, config: SimConfig) -> SimResult<Self> {
        let map = map::load_builtin(id)?;
        Self::build(&map, config, None, id)
    }

    pub fn from_builtin_seeded(id: &str, config: SimConfig, seed: u64) -> SimResult<Self> {
        let map = map::load_builtin(id)?;
        Self::build(&map, config, Some(seed), id)
    }

    fn build(map: &MapFile, config: SimConfig, seed: Option<u64>, map_id: &str) -> SimResult<Self> {
        let graph = RoadGraph::from_map(map)?;
        let analyzer = CongestionAnalyzer::new(&graph, config.base_edge_capacity);
        let hotspots = Self::identify_hotspots(&graph);

        let mut engine = Self {
            graph,
            config,
            map_id: map_id.to_string(),
            roster: AgentRoster::new(),
            analyzer,
            multipliers: HashMap::new(),
            blocked: BTreeMap::new(),
            accidents: BTreeMap::new(),
            hotspots,
            rng: seed.map(StdRng::seed_from_u64),
            seed,
            step: 0,
            sim_time: 0.0,
            last_tick: None,
            running: false,
            total_spawned: 0,
            next_agent_serial: 0,
            next_accident_serial: 0,
            spawn_credit: 0.0,
        };
        engine.init_multipliers();

        info!(
            map = map_id,
            nodes = engine.graph.node_count(),
            edges = engine.graph.edge_count(),
            hotspots = engine.hotspots.len(),
            "engine built"
        );
        Ok(engine)
    }

    // ---- random helpers -------------------------------------------------

    fn random_range(&mut self, range: std::ops::Range<f64>) -> f64 {
        match &mut self.rng {
            Some(rng) => rng.random_range(range),
            None => rand::rng().random_range(range),
        }
    }

    fn random_unit(&mut self) -> f64 {
        match &mut self.rng {
            Some(rng) => rng.random(),
            None => rand::rng().random(),
        }
    }

    fn random_index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(match &mut self.rng {
            Some(rng) => rng.random_range(0..len),
            None => rand::rng().random_range(0..len),
        })
    }

    fn sample_speed(&mut self, profile: &SpeedProfile) -> f64 {
        match &mut self.rng {
            Some(rng) => profile.sample(rng),
            None => profile.sample(&mut rand::rng()),
        }
    }

    fn random_node(&mut self, exclude: Option<&str>) -> Option<String> {
        let candidates: Vec<String> = self
            .graph
            .nodes()
            .iter()
            .filter(|id| Some(id.as_str()) != exclude)
            .cloned()
            .collect();
        match &mut self.rng {
            Some(rng) => candidates.choose(rng).cloned(),
            None => candidates.choose(&mut rand::rng()).cloned(),
        }
    }

    // ---- setup ----------------------------------------------------------

    /// Nodes in the top fifth by out-degree mark their outgoing edges as
    /// hotspots.
    fn identify_hotspots(graph: &RoadGraph) -> HashSet<EdgeKey> {
        let mut ranked: Vec<(&String, usize)> = graph
            .nodes()
            .iter()
            .map(|id| (id, graph.out_degree(id)))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        let count = (graph.node_count() / 5).max(1);
        let mut hotspots = HashSet::new();
        for (node, _) in ranked.into_iter().take(count) {
            if let Ok(edges) = graph.neighbours(node) {
                for rec in edges {
                    hotspots.insert(rec.key());
                }
            }
        }
        hotspots
    }

    /// Seed every edge with a free-flow multiplier, matching what a reset
    /// produces.
    fn init_multipliers(&mut self) {
        let keys: Vec<EdgeKey> = self.graph.edges().iter().map(|r| r.key()).collect();
        let (lo, hi) = CongestionLevel::FreeFlow.sample_range();
        for key in keys {
            let value = self.random_range(lo..hi);
            self.multipliers.insert(key, value);
        }
    }

    // ---- tick pipeline --------------------------------------------------

    /// Advance by real elapsed time since the previous call, clamped.
    pub fn tick(&mut self) -> TickSummary {
        let now = Instant::now();
        let dt = match self.last_tick {
            Some(prev) => now.duration_since(prev).as_secs_f64(),
            None => 0.0,
        };
        self.last_tick = Some(now);
        self.tick_with(dt)
    }

    /// Advance by an explicit time step, clamped to the configured maximum.
    pub fn tick_with(&mut self, dt: f64) -> TickSummary {
        let dt = dt.clamp(0.0, self.config.max_tick_dt);
        self.step += 1;
        self.sim_time += dt;

        self.handle_incidents(dt);
        self.refresh_multipliers();
        self.car_following_pass();
        let (moved, arrived) = self.integration_pass(dt);
        self.roster.rebuild_occupancy();
        let rerouted = self.reroute_pass();
        if rerouted > 0 {
            // Reroutes may change the edge an agent occupies.
            self.roster.rebuild_occupancy();
        }

        debug!(
            step = self.step,
            active = self.roster.active_count(),
            moved,
            arrived,
            rerouted,
            "tick"
        );

        TickSummary {
            step: self.step,
            dt,
            active_agents: self.roster.active_count(),
            moved,
            arrived,
            accidents: self.accidents.values().cloned().collect(),
            blocked_roads: self.blocked.values().cloned().collect(),
            multipliers: self.multiplier_snapshot(),
        }
    }

    fn handle_incidents(&mut self, dt: f64) {
        if self.config.accident_rate_per_hour > 0.0 {
            let probability = (self.config.accident_rate_per_hour * dt / 3600.0).min(1.0);
            if self.random_unit() < probability {
                if let Err(err) = self.create_accident(None, None, None) {
                    debug!(%err, "random accident rejected");
                }
            }
        }

        let due: Vec<String> = self
            .accidents
            .values()
            .filter(|a| a.expired(self.sim_time))
            .map(|a| a.id.clone())
            .collect();
        for id in due {
            let _ = self.resolve_accident(&id);
        }

        if self.config.auto_spawn_rate_per_min > 0.0 {
            self.spawn_credit += self.config.auto_spawn_rate_per_min * dt / 60.0;
            while self.spawn_credit >= 1.0 {
                self.spawn_credit -= 1.0;
                let roll = self.random_unit();
                let kind = self.config.spawn_mix.pick(roll);
                if self.spawn(kind, None, None).is_err() {
                    break;
                }
            }
        }
    }

    /// Re-sample the multiplier field from the density bands. Blocked edges
    /// hold the sentinel, accident edges take the severity boost on top of
    /// the band sample, hotspot edges ramp up with elapsed time.
    fn refresh_multipliers(&mut self) {
        let congestion_factor = (self.sim_time / HOTSPOT_RAMP_SECS).min(1.0);
        let keys: Vec<EdgeKey> = self.graph.edges().iter().map(|r| r.key()).collect();
        let boosts: HashMap<EdgeKey, f64> = self
            .accidents
            .values()
            .map(|a| (a.edge(), a.severity.boost()))
            .collect();

        for key in keys {
            if self.blocked.contains_key(&key) {
                self.multipliers.insert(key, BLOCKED_MULTIPLIER);
                continue;
            }

            let level = self.analyzer.level(&key, &self.roster);
            let (lo, hi) = level.sample_range();
            let sample = self.random_range(lo..hi);
            self.analyzer.record_sample(key.clone(), sample);

            let value = if let Some(boost) = boosts.get(&key) {
                sample * boost
            } else if self.hotspots.contains(&key) {
                let buildup = 1.0 + congestion_factor * self.random_range(0.5..2.0);
                (sample * buildup).min(BAND_CEILING)
            } else {
                sample
            };
            self.multipliers.insert(key, value);
        }
    }

    /// First pass: adjust target speeds from the gap to the agent ahead.
    fn car_following_pass(&mut self) {
        for id in self.roster.active_ids() {
            let Some(agent) = self.roster.get(&id) else {
                continue;
            };
            let Some(edge) = agent.current_edge() else {
                continue;
            };
            let position = agent.position_on_edge;

            if self.blocked.contains_key(&edge) {
                // Frozen until the reroute decider finds a way around.
                if let Some(agent) = self.roster.get_mut(&id) {
                    agent.target_speed = 0.0;
                    agent.status = AgentStatus::Stuck;
                }
                continue;
            }

            let Some(record) = self.graph.edge(&edge.0, &edge.1) else {
                warn!(agent = %id, from = %edge.0, to = %edge.1, "agent on unknown edge");
                continue;
            };
            let edge_length = record.distance;

            let gap = self
                .roster
                .gap_ahead(&edge, position, &id)
                .map(|fraction| fraction * edge_length);
            if let Some(agent) = self.roster.get_mut(&id) {
                agent.follow_gap(gap);
            }
        }
    }

    /// Second pass: integrate speeds and positions, consuming node
    /// crossings. Returns (moved, arrived) counts.
    fn integration_pass(&mut self, dt: f64) -> (usize, usize) {
        let mut moved = 0;
        let mut arrived = 0;
        let now = self.sim_time;
        let accel = self.config.acceleration;

        for id in self.roster.active_ids() {
            let Some(agent) = self.roster.get(&id) else {
                continue;
            };

            let Some(next) = agent.next_node.clone() else {
                // Single-node paths arrive on their first tick.
                if agent.current_node == agent.destination {
                    if let Some(agent) = self.roster.get_mut(&id) {
                        agent.mark_arrived(now);
                    }
                    self.roster.note_arrival(&id);
                    arrived += 1;
                }
                continue;
            };

            let edge = (agent.current_node.clone(), next);
            let Some(record) = self.graph.edge(&edge.0, &edge.1) else {
                warn!(agent = %id, from = %edge.0, to = %edge.1, "agent on unknown edge");
                continue;
            };
            let edge_length = record.distance;

            let mut reached = false;
            if let Some(agent) = self.roster.get_mut(&id) {
                agent.adjust_speed(dt, accel);
                if agent.advance_position(dt, edge_length) {
                    agent.total_distance += edge_length;
                    moved += 1;
                    reached = agent.cross_node(now);
                }
                if agent.status == AgentStatus::Stuck {
                    agent.wait_time += dt;
                }
                debug_assert!(
                    (0.0..=1.0).contains(&agent.position_on_edge),
                    "position out of range"
                );
            }
            if reached {
                self.roster.note_arrival(&id);
                arrived += 1;
            }
        }

        (moved, arrived)
    }

    /// Third pass: force a reroute when an upcoming edge is blocked or
    /// likely congested.
    fn reroute_pass(&mut self) -> usize {
        let mut rerouted = 0;

        for id in self.roster.active_ids() {
            let Some(agent) = self.roster.get(&id) else {
                continue;
            };
            if agent.next_node.is_none() {
                continue;
            }

            let start = agent.path_index;
            let end = (start + REROUTE_LOOKAHEAD).min(agent.path.len().saturating_sub(1));
            let upcoming: Vec<EdgeKey> = (start..end)
                .map(|i| (agent.path[i].clone(), agent.path[i + 1].clone()))
                .collect();

            let mut force = upcoming.iter().any(|key| self.blocked.contains_key(key));
            if !force {
                force = upcoming
                    .iter()
                    .any(|key| self.analyzer.probability(key, &self.roster) > REROUTE_PROBABILITY);
            }

            if force && self.reroute_agent(&id) {
                rerouted += 1;
            }
        }

        rerouted
    }

    /// Replace the agent's path from its current node. On failure the old
    /// path is kept and the agent is frozen until the next attempt.
    fn reroute_agent(&mut self, id: &str) -> bool {
        let Some(agent) = self.roster.get(id) else {
            return false;
        };
        let current = agent.current_node.clone();
        let destination = agent.destination.clone();
        let kind = agent.kind;
        let old_next = agent.next_node.clone();
        let old_position = agent.position_on_edge;

        match self.plan_internal(&current, &destination, kind) {
            Ok(Some(path)) => {
                let same_edge = path.nodes.get(1) == old_next.as_ref();
                let Some(agent) = self.roster.get_mut(id) else {
                    return false;
                };
                let nominal = agent.nominal_speed;
                agent.set_path(path.nodes, path.cost);
                if same_edge {
                    agent.position_on_edge = old_position;
                }
                agent.status = AgentStatus::Rerouting;
                agent.target_speed = nominal;
                agent.reroute_count += 1;
                debug!(agent = id, "rerouted");
                true
            }
            Ok(None) => {
                if let Some(agent) = self.roster.get_mut(id) {
                    agent.target_speed = 0.0;
                    agent.current_speed = 0.0;
                    agent.status = AgentStatus::Stuck;
                }
                false
            }
            Err(err) => {
                warn!(agent = id, %err, "reroute planning failed");
                false
            }
        }
    }

    fn plan_internal(&self, start: &str, goal: &str, mode: Mode) -> SimResult<Option<PlannedPath>> {
        planner::plan(
            &self.graph,
            &self.multipliers,
            &self.blocked,
            self.config.default_multiplier,
            start,
            goal,
            mode,
        )
    }

    // ---- commands -------------------------------------------------------

    /// Spawn one agent. Endpoints default to random distinct nodes; a spawn
    /// with no viable path fails without adding the agent.
    pub fn spawn(
        &mut self,
        kind: Mode,
        start: Option<&str>,
        goal: Option<&str>,
    ) -> SimResult<AgentView> {
        for endpoint in [start, goal].into_iter().flatten() {
            if !self.graph.contains_node(endpoint) {
                return Err(SimError::UnknownNode(endpoint.to_string()));
            }
        }

        let start_node = match start {
            Some(s) => s.to_string(),
            None => self
                .random_node(None)
                .ok_or_else(|| SimError::InvalidMap("map has no nodes".to_string()))?,
        };
        let goal_node = match goal {
            Some(g) => g.to_string(),
            None => self
                .random_node(Some(&start_node))
                .ok_or_else(|| SimError::NoPath {
                    from: start_node.clone(),
                    to: start_node.clone(),
                })?,
        };

        let planned = self.plan_internal(&start_node, &goal_node, kind)?;
        let Some(path) = planned else {
            return Err(SimError::NoPath {
                from: start_node,
                to: goal_node,
            });
        };

        self.next_agent_serial += 1;
        let id = format!("{}_{}", kind.as_str(), self.next_agent_serial);
        let profile = *self.config.speed_profile(kind);
        let nominal = self.sample_speed(&profile);
        let mut agent = Agent::new(
            id.clone(),
            kind,
            start_node,
            goal_node,
            nominal,
            self.config.capacity_usage(kind),
            self.sim_time,
        );
        agent.set_path(path.nodes, path.cost);

        let view = AgentView::from(&agent);
        self.roster.add(agent);
        self.total_spawned += 1;
        debug!(agent = %id, kind = kind.as_str(), "spawned");
        Ok(view)
    }

    /// Spawn up to `count` agents with kinds drawn from the mix. Returns
    /// how many spawns succeeded.
    pub fn spawn_many(&mut self, count: usize, mix: Option<SpawnMix>) -> SimResult<usize> {
        let mix = mix.unwrap_or(self.config.spawn_mix);
        mix.validate().map_err(SimError::BadDistribution)?;

        let mut spawned = 0;
        for _ in 0..count {
            let roll = self.random_unit();
            let kind = mix.pick(roll);
            if self.spawn(kind, None, None).is_ok() {
                spawned += 1;
            }
        }
        Ok(spawned)
    }

    pub fn remove_agent(&mut self, id: &str) -> SimResult<()> {
        self.roster.remove(id)?;
        debug!(agent = id, "removed");
        Ok(())
    }

    /// Create an accident. Edge and severity are randomised when omitted.
    /// An edge that is blocked or already carries an accident is rejected.
    pub fn create_accident(
        &mut self,
        from: Option<&str>,
        to: Option<&str>,
        severity: Option<Severity>,
    ) -> SimResult<Accident> {
        let key = match (from, to) {
            (Some(f), Some(t)) => {
                if !self.graph.contains_node(f) {
                    return Err(SimError::UnknownNode(f.to_string()));
                }
                if !self.graph.contains_node(t) {
                    return Err(SimError::UnknownNode(t.to_string()));
                }
                if self.graph.edge(f, t).is_none() {
                    return Err(SimError::UnknownEdge {
                        from: f.to_string(),
                        to: t.to_string(),
                    });
                }
                edge_key(f, t)
            }
            _ => {
                let slot = self
                    .random_index(self.graph.edge_count())
                    .ok_or_else(|| SimError::InvalidMap("map has no edges".to_string()))?;
                self.graph.edges()[slot].key()
            }
        };

        if self.blocked.contains_key(&key) {
            return Err(SimError::EdgeBlocked {
                from: key.0,
                to: key.1,
            });
        }
        if self.accidents.values().any(|a| a.edge() == key) {
            return Err(SimError::AccidentActive {
                from: key.0,
                to: key.1,
            });
        }

        let severity = match severity {
            Some(s) => s,
            None => {
                let slot = self.random_index(Severity::ALL.len()).unwrap_or(0);
                Severity::ALL[slot]
            }
        };
        let (lo, hi) = severity.duration_range();
        let duration = self.random_range(lo..hi);

        self.next_accident_serial += 1;
        let id = format!("accident_{}", self.next_accident_serial);
        let accident = Accident {
            id: id.clone(),
            from: key.0.clone(),
            to: key.1.clone(),
            severity,
            created_at: self.sim_time,
            duration,
        };

        let entry = self
            .multipliers
            .entry(key)
            .or_insert(self.config.default_multiplier);
        *entry *= severity.boost();

        info!(
            accident = %id,
            from = %accident.from,
            to = %accident.to,
            severity = severity.as_str(),
            duration,
            "accident created"
        );
        self.accidents.insert(id, accident.clone());
        Ok(accident)
    }

    /// Remove an accident and restore the edge's pre-boost multiplier.
    pub fn resolve_accident(&mut self, id: &str) -> SimResult<()> {
        let accident = self
            .accidents
            .remove(id)
            .ok_or_else(|| SimError::UnknownAccident(id.to_string()))?;

        let key = accident.edge();
        if !self.blocked.contains_key(&key) {
            if let Some(entry) = self.multipliers.get_mut(&key) {
                *entry /= accident.severity.boost();
            }
        }
        info!(accident = id, "accident resolved");
        Ok(())
    }

    /// Block an edge. Agents routed through it become reroute candidates on
    /// the next tick.
    pub fn block(&mut self, from: &str, to: &str, reason: &str) -> SimResult<()> {
        if !self.graph.contains_node(from) {
            return Err(SimError::UnknownNode(from.to_string()));
        }
        if !self.graph.contains_node(to) {
            return Err(SimError::UnknownNode(to.to_string()));
        }
        if self.graph.edge(from, to).is_none() {
            return Err(SimError::UnknownEdge {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let key = edge_key(from, to);
        self.blocked.insert(
            key.clone(),
            Blockage {
                from: from.to_string(),
                to: to.to_string(),
                reason: reason.to_string(),
                blocked_at: self.sim_time,
            },
        );
        self.multipliers.insert(key, BLOCKED_MULTIPLIER);
        info!(from, to, reason, "road blocked");
        Ok(())
    }

    /// Lift a blockage. Unblocking an edge that is not blocked is a no-op.
    pub fn unblock(&mut self, from: &str, to: &str) -> SimResult<()> {
        let key = edge_key(from, to);
        if self.blocked.remove(&key).is_some() {
            // Hold a sane cost until the next refresh re-samples the band.
            let value = match self.accidents.values().find(|a| a.edge() == key) {
                Some(accident) => self.config.default_multiplier * accident.severity.boost(),
                None => self.config.default_multiplier,
            };
            self.multipliers.insert(key, value);
            info!(from, to, "road unblocked");
        }
        Ok(())
    }

    /// Drop all agents and incidents and return to the just-built state.
    pub fn reset(&mut self) {
        self.roster.clear();
        self.accidents.clear();
        self.blocked.clear();
        self.analyzer.clear_history();
        self.step = 0;
        self.sim_time = 0.0;
        self.last_tick = None;
        self.running = false;
        self.total_spawned = 0;
        self.next_agent_serial = 0;
        self.next_accident_serial = 0;
        self.spawn_credit = 0.0;
        self.rng = self.seed.map(StdRng::seed_from_u64);
        self.init_multipliers();
        info!("simulation reset");
    }

    /// Switch to a built-in map. Destructive: all per-instance state resets.
    pub fn load_map(&mut self, id: &str) -> SimResult<()> {
        let map = map::load_builtin(id)?;
        self.graph = RoadGraph::from_map(&map)?;
        self.analyzer = CongestionAnalyzer::new(&self.graph, self.config.base_edge_capacity);
        self.hotspots = Self::identify_hotspots(&self.graph);
        self.map_id = id.to_string();
        self.multipliers.clear();
        self.reset();
        info!(map = id, "map loaded");
        Ok(())
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    /// Consumed between ticks; a tick in progress always completes.
    pub fn stop(&mut self) {
        self.running = false;
    }

    // ---- queries --------------------------------------------------------

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn total_spawned(&self) -> u64 {
        self.total_spawned
    }

    pub fn current_map(&self) -> &str {
        &self.map_id
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn graph(&self) -> &RoadGraph {
        &self.graph
    }

    pub fn hotspot_count(&self) -> usize {
        self.hotspots.len()
    }

    pub fn multiplier(&self, from: &str, to: &str) -> Option<f64> {
        self.multipliers.get(&edge_key(from, to)).copied()
    }

    pub fn nodes(&self) -> Vec<String> {
        self.graph.nodes().to_vec()
    }

    pub fn maps(&self) -> MapsView {
        MapsView {
            maps: map::available_maps()
                .iter()
                .map(|id| id.to_string())
                .collect(),
            current: self.map_id.clone(),
        }
    }

    pub fn map_data(&self) -> MapData {
        let nodes = self
            .graph
            .nodes()
            .iter()
            .map(|id| {
                let point = self.graph.coord(id).unwrap_or_default();
                MapNode {
                    id: id.clone(),
                    x: point.x,
                    y: point.y,
                }
            })
            .collect();
        let edges = self
            .graph
            .edges()
            .iter()
            .map(|rec| MapEdgeView {
                from: rec.from.clone(),
                to: rec.to.clone(),
                distance: rec.distance,
                allowed_modes: rec.modes.modes().iter().map(|m| m.as_str().to_string()).collect(),
                one_way: rec.one_way,
            })
            .collect();
        MapData { nodes, edges }
    }

    /// Route query under the current multiplier field.
    pub fn plan_route(&self, start: &str, goal: &str, mode: Mode) -> SimResult<PlanView> {
        Ok(match self.plan_internal(start, goal, mode)? {
            Some(path) => PlanView {
                path: Some(path.nodes),
                cost: Some(path.cost),
            },
            None => PlanView {
                path: None,
                cost: None,
            },
        })
    }

    pub fn agent(&self, id: &str) -> SimResult<AgentView> {
        self.roster
            .get(id)
            .map(AgentView::from)
            .ok_or_else(|| SimError::UnknownAgent(id.to_string()))
    }

    pub fn agents(&self) -> Vec<AgentView> {
        self.roster.iter().map(AgentView::from).collect()
    }

    pub fn accidents(&self) -> Vec<Accident> {
        self.accidents.values().cloned().collect()
    }

    pub fn blocked_roads(&self) -> Vec<Blockage> {
        self.blocked.values().cloned().collect()
    }

    fn multiplier_snapshot(&self) -> BTreeMap<String, f64> {
        self.multipliers
            .iter()
            .map(|((from, to), value)| (edge_label(from, to), *value))
            .collect()
    }

    pub fn vehicle_statistics(&self) -> VehicleStats {
        let mut by_kind: BTreeMap<String, usize> = Mode::ALL
            .iter()
            .map(|m| (m.as_str().to_string(), 0))
            .collect();
        let mut arrived = 0usize;
        let mut travel_sum = 0.0;
        let mut wait_sum = 0.0;
        let mut reroutes = 0u64;

        for agent in self.roster.iter() {
            *by_kind.entry(agent.kind.as_str().to_string()).or_insert(0) += 1;
            if let Some(time) = agent.travel_time() {
                arrived += 1;
                travel_sum += time;
            }
            wait_sum += agent.wait_time;
            reroutes += agent.reroute_count as u64;
        }

        let total = self.roster.len();
        VehicleStats {
            total_agents: total,
            active_agents: self.roster.active_count(),
            arrived_agents: arrived,
            average_travel_time: if arrived > 0 {
                travel_sum / arrived as f64
            } else {
                0.0
            },
            average_wait_time: if total > 0 {
                wait_sum / total as f64
            } else {
                0.0
            },
            total_reroutes: reroutes,
            agents_by_kind: by_kind,
        }
    }

    fn speed_distribution(&self) -> BTreeMap<String, SpeedSummary> {
        let mut summary: BTreeMap<String, SpeedSummary> = Mode::ALL
            .iter()
            .map(|m| (m.as_str().to_string(), SpeedSummary::default()))
            .collect();

        for agent in self.roster.iter().filter(|a| a.is_active()) {
            let entry = summary
                .entry(agent.kind.as_str().to_string())
                .or_default();
            let speed = agent.current_speed;
            if entry.count == 0 {
                entry.min = speed;
                entry.max = speed;
            } else {
                entry.min = entry.min.min(speed);
                entry.max = entry.max.max(speed);
            }
            entry.avg += speed;
            entry.count += 1;
        }
        for entry in summary.values_mut() {
            if entry.count > 0 {
                entry.avg /= entry.count as f64;
            }
        }
        summary
    }

    pub fn traffic_statistics(&self) -> TrafficStatistics {
        TrafficStatistics {
            vehicle_statistics: self.vehicle_statistics(),
            traffic_statistics: self.analyzer.global_statistics(&self.graph, &self.roster),
            speed_distribution: self.speed_distribution(),
        }
    }

    pub fn congestion_report(&self) -> CongestionReport {
        let bottlenecks = self
            .analyzer
            .bottlenecks(&self.graph, &self.roster)
            .into_iter()
            .map(|((from, to), density)| {
                let probability = self
                    .analyzer
                    .probability(&(from.clone(), to.clone()), &self.roster);
                super::snapshot::BottleneckView {
                    from,
                    to,
                    density,
                    probability,
                }
            })
            .collect();

        let mut congested: Vec<NodeCongestion> = self
            .graph
            .nodes()
            .iter()
            .map(|node| NodeCongestion {
                node: node.clone(),
                congestion: self.analyzer.node_congestion(&self.graph, node, &self.roster),
            })
            .filter(|entry| entry.congestion > 0.5)
            .collect();
        congested.sort_by(|a, b| {
            b.congestion
                .partial_cmp(&a.congestion)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        congested.truncate(10);

        CongestionReport {
            bottlenecks,
            congested_intersections: congested,
            global_stats: self.analyzer.global_statistics(&self.graph, &self.roster),
        }
    }

    pub fn edge_traffic(&self) -> Vec<super::snapshot::EdgeTraffic> {
        self.analyzer.edge_traffic(&self.graph, &self.roster)
    }

    pub fn global_traffic_statistics(&self) -> TrafficStats {
        self.analyzer.global_statistics(&self.graph, &self.roster)
    }

    pub fn state(&self) -> SimulationState {
        SimulationState {
            step: self.step,
            is_running: self.running,
            agents: self.agents(),
            vehicle_statistics: self.vehicle_statistics(),
            traffic_statistics: self.analyzer.global_statistics(&self.graph, &self.roster),
            edge_traffic: self.edge_traffic(),
            multipliers: self.multiplier_snapshot(),
            total_spawned: self.total_spawned,
        }
    }

    pub fn simulation_info(&self) -> SimulationInfo {
        SimulationInfo {
            elapsed_sim_time: self.sim_time,
            step: self.step,
            total_spawned: self.total_spawned,
            agent_count: self.roster.len(),
            accident_count: self.accidents.len(),
            blocked_road_count: self.blocked.len(),
            hotspot_count: self.hotspots.len(),
        }
    }
}
