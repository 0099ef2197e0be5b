//! Timing points and monitors.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::PointData;

#[derive(Debug, Default)]
struct PointState {
    min: Duration,
    max: Duration,
    total: Duration,
    count: u64,
    errors: u64,
    active: u64,
    max_active: u64,
}

/// Aggregated timings for one named operation.
#[derive(Debug)]
pub struct MeasurePoint {
    name: String,
    state: Mutex<PointState>,
}

impl MeasurePoint {
    /// Creates an empty point.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(PointState::default()),
        }
    }

    /// Name of the operation.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Starts timing one execution of the operation.
    pub fn monitor(self: &Arc<Self>) -> Monitor {
        {
            let mut state = self.state.lock();
            state.active += 1;
            state.max_active = state.max_active.max(state.active);
        }
        Monitor {
            point: Some(Arc::clone(self)),
            start: Instant::now(),
            error: false,
        }
    }

    /// Executions currently in flight.
    pub fn active(&self) -> u64 {
        self.state.lock().active
    }

    /// Clears all statistics.
    pub fn reset(&self) {
        *self.state.lock() = PointState::default();
    }

    /// Point-in-time copy of the statistics.
    pub fn data(&self) -> PointData {
        let state = self.state.lock();
        let average = if state.count > 0 {
            state.total / state.count as u32
        } else {
            Duration::ZERO
        };
        PointData {
            name: self.name.clone(),
            min_ms: state.min.as_millis() as u64,
            max_ms: state.max.as_millis() as u64,
            average_ms: average.as_millis() as u64,
            total_ms: state.total.as_millis() as u64,
            count: state.count,
            errors: state.errors,
            max_active: state.max_active,
        }
    }

    fn record(&self, elapsed: Duration, error: bool) {
        let mut state = self.state.lock();
        state.active = state.active.saturating_sub(1);
        state.count += 1;
        state.total += elapsed;
        if elapsed > state.max {
            state.max = elapsed;
        }
        if state.min.is_zero() || elapsed < state.min {
            state.min = elapsed;
        }
        if error {
            state.errors += 1;
        }
    }
}

/// Times one execution; records into its point when stopped or dropped.
///
/// A monitor created while measurement is disabled records nothing.
#[derive(Debug)]
pub struct Monitor {
    point: Option<Arc<MeasurePoint>>,
    start: Instant,
    error: bool,
}

impl Monitor {
    /// A monitor that records nothing.
    pub fn disabled() -> Self {
        Self {
            point: None,
            start: Instant::now(),
            error: false,
        }
    }

    /// Marks this execution as failed.
    pub fn set_error(&mut self) {
        self.error = true;
    }

    /// Stops timing and returns the elapsed time.
    pub fn stop(mut self) -> Duration {
        self.finish()
    }

    fn finish(&mut self) -> Duration {
        let elapsed = self.start.elapsed();
        if let Some(point) = self.point.take() {
            point.record(elapsed, self.error);
        }
        elapsed
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.finish();
    }
}
