//! Serializable telemetry snapshots.

use serde::Serialize;

/// Statistics of one timing point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointData {
    pub name: String,
    pub min_ms: u64,
    pub max_ms: u64,
    pub average_ms: u64,
    pub total_ms: u64,
    pub count: u64,
    pub errors: u64,
    pub max_active: u64,
}

/// All timing points at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelemetrySnapshot {
    /// Seconds since the registry was created
    pub uptime_secs: u64,
    /// Whether monitors are recording
    pub enabled: bool,
    /// Points sorted by name
    pub points: Vec<PointData>,
}

impl TelemetrySnapshot {
    /// Looks up a point by name.
    pub fn point(&self, name: &str) -> Option<&PointData> {
        self.points.iter().find(|p| p.name == name)
    }

    /// Renders the snapshot as JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
