//! Declarative map documents and the built-in map registry
//!
//! A map lists nodes with plane coordinates and directed edges with a
//! distance, an allowed-mode list, and a one-way flag. Edges that are not
//! one-way are materialised in both directions when the graph is built.

use serde::{Deserialize, Serialize};

use super::error::{SimError, SimResult};
use super::types::Mode;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapNode {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapEdge {
    pub from: String,
    pub to: String,
    pub distance: f64,
    pub allowed_modes: Vec<String>,
    #[serde(default)]
    pub one_way: bool,
}

/// A parsed map document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapFile {
    pub nodes: Vec<MapNode>,
    pub edges: Vec<MapEdge>,
}

impl MapFile {
    pub fn from_json(text: &str) -> SimResult<Self> {
        let map: MapFile = serde_json::from_str(text)?;
        map.validate()?;
        Ok(map)
    }

    /// Structural checks applied before a graph is built. All failures are
    /// load-time errors; the engine never sees a malformed map.
    pub fn validate(&self) -> SimResult<()> {
        if self.nodes.is_empty() {
            return Err(SimError::InvalidMap("map has no nodes".to_string()));
        }

        let mut seen = std::collections::HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(SimError::InvalidMap(format!(
                    "duplicate node id `{}`",
                    node.id
                )));
            }
            if !node.x.is_finite() || !node.y.is_finite() {
                return Err(SimError::InvalidMap(format!(
                    "node `{}` has a non-finite coordinate",
                    node.id
                )));
            }
        }

        for edge in &self.edges {
            for endpoint in [&edge.from, &edge.to] {
                if !seen.contains(endpoint.as_str()) {
                    return Err(SimError::InvalidMap(format!(
                        "edge `{}` -> `{}` references unknown node `{}`",
                        edge.from, edge.to, endpoint
                    )));
                }
            }
            if !(edge.distance > 0.0) || !edge.distance.is_finite() {
                return Err(SimError::InvalidMap(format!(
                    "edge `{}` -> `{}` must have a positive finite distance",
                    edge.from, edge.to
                )));
            }
            if edge.allowed_modes.is_empty() {
                return Err(SimError::InvalidMap(format!(
                    "edge `{}` -> `{}` admits no modes",
                    edge.from, edge.to
                )));
            }
            for mode in &edge.allowed_modes {
                if Mode::parse(mode).is_none() {
                    return Err(SimError::UnknownMode(mode.clone()));
                }
            }
        }

        Ok(())
    }
}

/// Names of the maps the engine knows without external input.
pub fn available_maps() -> &'static [&'static str] {
    &["square", "grid", "downtown"]
}

/// Load a built-in map by name.
pub fn load_builtin(id: &str) -> SimResult<MapFile> {
    match id {
        "square" => MapFile::from_json(SQUARE_MAP),
        "grid" => {
            let map = grid_map(4, 4, 100.0);
            map.validate()?;
            Ok(map)
        }
        "downtown" => MapFile::from_json(DOWNTOWN_MAP),
        _ => Err(SimError::UnknownMap(id.to_string())),
    }
}

/// Four corners joined by 60-unit two-way streets open to every mode.
const SQUARE_MAP: &str = r#"{
  "nodes": [
    {"id": "A", "x": 0.0,  "y": 0.0},
    {"id": "B", "x": 60.0, "y": 0.0},
    {"id": "C", "x": 60.0, "y": 60.0},
    {"id": "D", "x": 0.0,  "y": 60.0}
  ],
  "edges": [
    {"from": "A", "to": "B", "distance": 60.0, "allowed_modes": ["car", "bicycle", "pedestrian"]},
    {"from": "B", "to": "C", "distance": 60.0, "allowed_modes": ["car", "bicycle", "pedestrian"]},
    {"from": "C", "to": "D", "distance": 60.0, "allowed_modes": ["car", "bicycle", "pedestrian"]},
    {"from": "D", "to": "A", "distance": 60.0, "allowed_modes": ["car", "bicycle", "pedestrian"]}
  ]
}"#;

/// A small centre with one-way car arterials around a walkable core.
const DOWNTOWN_MAP: &str = r#"{
  "nodes": [
    {"id": "station",  "x": 0.0,   "y": 0.0},
    {"id": "market",   "x": 120.0, "y": 0.0},
    {"id": "plaza",    "x": 240.0, "y": 0.0},
    {"id": "harbour",  "x": 240.0, "y": 150.0},
    {"id": "old_town", "x": 120.0, "y": 150.0},
    {"id": "park",     "x": 0.0,   "y": 150.0},
    {"id": "campus",   "x": 120.0, "y": 280.0},
    {"id": "stadium",  "x": 320.0, "y": 80.0}
  ],
  "edges": [
    {"from": "station",  "to": "market",   "distance": 120.0, "allowed_modes": ["car", "bicycle", "pedestrian"]},
    {"from": "market",   "to": "plaza",    "distance": 120.0, "allowed_modes": ["car", "bicycle", "pedestrian"]},
    {"from": "plaza",    "to": "harbour",  "distance": 150.0, "allowed_modes": ["car", "bicycle"]},
    {"from": "harbour",  "to": "old_town", "distance": 120.0, "allowed_modes": ["car", "bicycle", "pedestrian"]},
    {"from": "old_town", "to": "park",     "distance": 120.0, "allowed_modes": ["bicycle", "pedestrian"]},
    {"from": "park",     "to": "station",  "distance": 150.0, "allowed_modes": ["car", "bicycle", "pedestrian"]},
    {"from": "market",   "to": "old_town", "distance": 150.0, "allowed_modes": ["car", "bicycle", "pedestrian"]},
    {"from": "plaza",    "to": "stadium",  "distance": 110.0, "allowed_modes": ["car"], "one_way": true},
    {"from": "stadium",  "to": "harbour",  "distance": 105.0, "allowed_modes": ["car"], "one_way": true},
    {"from": "old_town", "to": "campus",   "distance": 130.0, "allowed_modes": ["car", "bicycle", "pedestrian"]},
    {"from": "park",     "to": "campus",   "distance": 180.0, "allowed_modes": ["bicycle", "pedestrian"]}
  ]
}"#;

/// Rectangular grid of two-way all-mode streets, row-major node ids `r{r}c{c}`.
pub fn grid_map(rows: usize, cols: usize, spacing: f64) -> MapFile {
    let all_modes = vec![
        Mode::Car.as_str().to_string(),
        Mode::Bicycle.as_str().to_string(),
        Mode::Pedestrian.as_str().to_string(),
    ];

    let mut nodes = Vec::with_capacity(rows * cols);
    for r in 0..rows {
        for c in 0..cols {
            nodes.push(MapNode {
                id: format!("r{r}c{c}"),
                x: c as f64 * spacing,
                y: r as f64 * spacing,
            });
        }
    }

    let mut edges = Vec::new();
    for r in 0..rows {
        for c in 0..cols {
            if c + 1 < cols {
                edges.push(MapEdge {
                    from: format!("r{r}c{c}"),
                    to: format!("r{r}c{}", c + 1),
                    distance: spacing,
                    allowed_modes: all_modes.clone(),
                    one_way: false,
                });
            }
            if r + 1 < rows {
                edges.push(MapEdge {
                    from: format!("r{r}c{c}"),
                    to: format!("r{}c{c}", r + 1),
                    distance: spacing,
                    allowed_modes: all_modes.clone(),
                    one_way: false,
                });
            }
        }
    }

    MapFile { nodes, edges }
}
