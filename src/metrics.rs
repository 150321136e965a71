//! Metrics capability injected into the engine.
//!
//! The encoder, the reinforcement adapter and the engine report gauges and
//! counters through a [`MetricsProvider`] passed in at construction rather
//! than through process-wide state.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::Serialize;

/// Sink for numeric engine metrics.
///
/// Implementations must be thread-safe (`Send + Sync`) to be shared via
/// `Arc<dyn MetricsProvider>`. Recording must never fail or block for long.
pub trait MetricsProvider: Send + Sync {
    /// Set a gauge to its latest value.
    fn record_gauge(&self, name: &str, value: f64);

    /// Increment a monotonically increasing counter by one.
    fn increment_counter(&self, name: &str);
}

/// Discards every metric.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsProvider for NoopMetrics {
    fn record_gauge(&self, _name: &str, _value: f64) {}

    fn increment_counter(&self, _name: &str) {}
}

/// Point-in-time copy of an [`InMemoryMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub gauges: BTreeMap<String, f64>,
    pub counters: BTreeMap<String, u64>,
}

/// Keeps the latest gauge values and counter totals in memory.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    inner: Mutex<MetricsSnapshot>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the current values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        match self.inner.lock() {
            Ok(inner) => inner.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn gauge(&self, name: &str) -> Option<f64> {
        self.snapshot().gauges.get(name).copied()
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.snapshot().counters.get(name).copied().unwrap_or(0)
    }
}

impl MetricsProvider for InMemoryMetrics {
    fn record_gauge(&self, name: &str, value: f64) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.gauges.insert(name.to_string(), value);
        }
    }

    fn increment_counter(&self, name: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            *inner.counters.entry(name.to_string()).or_insert(0) += 1;
        }
    }
}
