//! Shortest-path planner over the live multiplier field
//!
//! Best-first search with a Euclidean heuristic. Edge cost is
//! `distance * multiplier` taken from the field snapshot passed in, so two
//! calls around a refresh may disagree; that is intended. Frontier ties on
//! f-score break by insertion order, which makes results reproducible for a
//! fixed field.

use ordered_float::OrderedFloat;
use petgraph::graph::NodeIndex;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};

use super::error::{SimError, SimResult};
use super::graph::RoadGraph;
use super::incident::Blockage;
use super::types::{EdgeKey, Mode};

/// A planned route and its cost under the multiplier snapshot used
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPath {
    /// Node ids from start to goal inclusive.
    pub nodes: Vec<String>,
    pub cost: f64,
}

/// Compute a route for `mode` from `start` to `goal`.
///
/// Returns `Ok(None)` when the goal is unreachable under the current
/// blockages and mode filter. Unknown endpoints are an error.
pub fn plan(
    graph: &RoadGraph,
    multipliers: &HashMap<EdgeKey, f64>,
    blocked: &BTreeMap<EdgeKey, Blockage>,
    default_multiplier: f64,
    start: &str,
    goal: &str,
    mode: Mode,
) -> SimResult<Option<PlannedPath>> {
    let start_idx = graph
        .index_of(start)
        .ok_or_else(|| SimError::UnknownNode(start.to_string()))?;
    let goal_idx = graph
        .index_of(goal)
        .ok_or_else(|| SimError::UnknownNode(goal.to_string()))?;

    if start_idx == goal_idx {
        return Ok(Some(PlannedPath {
            nodes: vec![start.to_string()],
            cost: 0.0,
        }));
    }

    let goal_pos = graph.coord_of(goal_idx);
    let heuristic = |idx: NodeIndex| graph.coord_of(idx).distance(&goal_pos);

    let mut g_score: HashMap<NodeIndex, f64> = HashMap::new();
    let mut came_from: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut closed: HashSet<NodeIndex> = HashSet::new();
    let mut frontier: BinaryHeap<Reverse<(OrderedFloat<f64>, u64, NodeIndex)>> = BinaryHeap::new();
    let mut seq: u64 = 0;

    g_score.insert(start_idx, 0.0);
    frontier.push(Reverse((OrderedFloat(heuristic(start_idx)), seq, start_idx)));

    while let Some(Reverse((_, _, current))) = frontier.pop() {
        if !closed.insert(current) {
            continue;
        }

        if current == goal_idx {
            let cost = g_score[&current];
            let mut nodes = vec![graph.id_of(current).to_string()];
            let mut cursor = current;
            while let Some(prev) = came_from.get(&cursor) {
                nodes.push(graph.id_of(*prev).to_string());
                cursor = *prev;
            }
            nodes.reverse();
            return Ok(Some(PlannedPath { nodes, cost }));
        }

        let current_g = g_score[&current];

        for record in graph.out_edges(current) {
            if !record.allows(mode) {
                continue;
            }
            let key = record.key();
            if blocked.contains_key(&key) {
                continue;
            }

            let neighbour = match graph.index_of(&record.to) {
                Some(idx) => idx,
                None => continue,
            };
            if closed.contains(&neighbour) {
                continue;
            }

            let multiplier = multipliers.get(&key).copied().unwrap_or(default_multiplier);
            let tentative = current_g + record.distance * multiplier;

            let better = g_score
                .get(&neighbour)
                .map_or(true, |known| tentative < *known);
            if better {
                g_score.insert(neighbour, tentative);
                came_from.insert(neighbour, current);
                seq += 1;
                frontier.push(Reverse((
                    OrderedFloat(tentative + heuristic(neighbour)),
                    seq,
                    neighbour,
                )));
            }
        }
    }

    Ok(None)
}
