//! Structured errors for the command and query surface
//!
//! Every validation failure a caller can trigger maps to a variant here, so
//! an external transport can report them without string matching.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("unknown node `{0}`")]
    UnknownNode(String),

    #[error("unknown agent `{0}`")]
    UnknownAgent(String),

    #[error("unknown accident `{0}`")]
    UnknownAccident(String),

    #[error("unknown map `{0}`")]
    UnknownMap(String),

    #[error("unknown mode `{0}`")]
    UnknownMode(String),

    #[error("no edge from `{from}` to `{to}`")]
    UnknownEdge { from: String, to: String },

    #[error("edge `{from}` -> `{to}` is blocked")]
    EdgeBlocked { from: String, to: String },

    #[error("edge `{from}` -> `{to}` already has an active accident")]
    AccidentActive { from: String, to: String },

    #[error("no path from `{from}` to `{to}`")]
    NoPath { from: String, to: String },

    #[error("invalid spawn distribution: {0}")]
    BadDistribution(String),

    #[error("invalid map: {0}")]
    InvalidMap(String),

    #[error("map parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type SimResult<T> = Result<T, SimError>;
