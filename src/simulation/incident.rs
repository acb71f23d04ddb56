//! Accidents and road blockages
//!
//! Both act on the multiplier field: accidents boost the current value and
//! later restore it, blockages pin the edge at a sentinel until lifted.

use serde::{Deserialize, Serialize};

use super::types::EdgeKey;

/// Multiplier pinned on a blocked edge. Planners also skip blocked edges
/// outright, so the sentinel only matters to cost display.
pub const BLOCKED_MULTIPLIER: f64 = 100.0;

/// Accident severity, ordered by disruption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Moderate,
    Severe,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Minor, Severity::Moderate, Severity::Severe];

    /// Factor applied on top of the edge's current multiplier.
    pub fn boost(&self) -> f64 {
        match self {
            Severity::Minor => 2.0,
            Severity::Moderate => 4.0,
            Severity::Severe => 10.0,
        }
    }

    /// Inclusive range the accident duration is drawn from, in seconds.
    pub fn duration_range(&self) -> (f64, f64) {
        match self {
            Severity::Minor => (30.0, 60.0),
            Severity::Moderate => (60.0, 90.0),
            Severity::Severe => (90.0, 120.0),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Minor => "minor",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
        }
    }

    pub fn parse(name: &str) -> Option<Severity> {
        match name {
            "minor" => Some(Severity::Minor),
            "moderate" => Some(Severity::Moderate),
            "severe" => Some(Severity::Severe),
            _ => None,
        }
    }
}

/// An active accident on one directed edge
#[derive(Debug, Clone, Serialize)]
pub struct Accident {
    pub id: String,
    pub from: String,
    pub to: String,
    pub severity: Severity,
    /// Simulation time at creation, in seconds.
    pub created_at: f64,
    /// Seconds until the accident clears on its own.
    pub duration: f64,
}

impl Accident {
    pub fn edge(&self) -> EdgeKey {
        (self.from.clone(), self.to.clone())
    }

    pub fn expired(&self, now: f64) -> bool {
        self.created_at + self.duration < now
    }
}

/// A blocked edge. Blockages never expire on their own
#[derive(Debug, Clone, Serialize)]
pub struct Blockage {
    pub from: String,
    pub to: String,
    pub reason: String,
    /// Simulation time the block was placed, in seconds.
    pub blocked_at: f64,
}

impl Blockage {
    pub fn edge(&self) -> EdgeKey {
        (self.from.clone(), self.to.clone())
    }
}
