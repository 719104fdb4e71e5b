//! Per-phase cost and latency accounting.

use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;

/// One completed phase of a validation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseMetrics {
    /// Phase name (`cache_lookup`, `image_search`, ...).
    pub phase: &'static str,
    /// Estimated cost of the phase's external calls, USD.
    pub cost_usd: f64,
    /// Wall-clock time of the phase.
    pub elapsed_ms: u64,
}

/// Accumulates phase metrics over the lifetime of one request.
#[derive(Debug)]
pub struct MetricsRecorder {
    started: Instant,
    phases: Vec<PhaseMetrics>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            phases: Vec::new(),
        }
    }

    /// Records one completed phase.
    pub fn record(&mut self, phase: &'static str, cost_usd: f64, elapsed: Duration) {
        self.phases.push(PhaseMetrics {
            phase,
            cost_usd,
            elapsed_ms: elapsed.as_millis() as u64,
        });
    }

    /// Sum of all phase costs.
    pub fn total_cost(&self) -> f64 {
        self.phases.iter().map(|p| p.cost_usd).sum()
    }

    /// Wall-clock time since the recorder was created.
    pub fn total_latency_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub fn phases(&self) -> &[PhaseMetrics] {
        &self.phases
    }

    /// Serializes the phase trail for sources detail.
    pub fn to_detail(&self) -> Value {
        serde_json::to_value(&self.phases).unwrap_or(Value::Null)
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
