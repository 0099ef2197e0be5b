//! In-process timing instrumentation.
//!
//! Code paths of interest wrap themselves in a [`Monitor`] obtained from a
//! named [`MeasurePoint`]. Each point aggregates count, min/max/average/total
//! duration, error count and the peak number of concurrent executions.
//!
//! ```text
//! TileService ──monitor("getTile")──► MeasurePoint ──► TelemetrySnapshot ──► /metrics
//! ```
//!
//! # Example
//!
//! ```ignore
//! use tileproxy::telemetry::Measurements;
//!
//! let measurements = Measurements::new(true);
//! let mut monitor = measurements.monitor("getTile");
//! if failed {
//!     monitor.set_error();
//! }
//! drop(monitor);
//! println!("{}", measurements.snapshot().to_json()?);
//! ```

mod point;
mod snapshot;

pub use point::{MeasurePoint, Monitor};
pub use snapshot::{PointData, TelemetrySnapshot};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

/// Registry of named timing points.
#[derive(Debug)]
pub struct Measurements {
    enabled: bool,
    started: Instant,
    points: RwLock<BTreeMap<String, Arc<MeasurePoint>>>,
}

impl Measurements {
    /// Creates a registry. When `enabled` is false every monitor is inert.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            started: Instant::now(),
            points: RwLock::new(BTreeMap::new()),
        }
    }

    /// Whether monitors record anything.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the point named `name`, creating it on first use.
    pub fn point(&self, name: &str) -> Arc<MeasurePoint> {
        if let Some(point) = self.points.read().get(name) {
            return Arc::clone(point);
        }
        let mut points = self.points.write();
        Arc::clone(
            points
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(MeasurePoint::new(name))),
        )
    }

    /// Starts a monitor on the point named `name`.
    pub fn monitor(&self, name: &str) -> Monitor {
        if !self.enabled {
            return Monitor::disabled();
        }
        self.point(name).monitor()
    }

    /// Clears every point's statistics.
    pub fn reset(&self) {
        for point in self.points.read().values() {
            point.reset();
        }
    }

    /// Copies all statistics.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            uptime_secs: self.started.elapsed().as_secs(),
            enabled: self.enabled,
            points: self.points.read().values().map(|p| p.data()).collect(),
        }
    }
}

impl Default for Measurements {
    fn default() -> Self {
        Self::new(true)
    }
}
