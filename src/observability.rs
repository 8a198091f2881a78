//! Handler metrics

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics handle for recording handler counters
#[derive(Debug, Default)]
pub struct Metrics {
    invocations: AtomicU64,
    failures: AtomicU64,
    dummy_responses: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invocation(&self) {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "invocations", "Metric incremented");
    }

    pub fn failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "failures", "Metric incremented");
    }

    pub fn dummy_response(&self) {
        self.dummy_responses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "dummy_responses", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            invocations: self.invocations.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            dummy_responses: self.dummy_responses.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub invocations: u64,
    pub failures: u64,
    pub dummy_responses: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = Metrics::new();
        metrics.invocation();
        metrics.invocation();
        metrics.failure();
        metrics.dummy_response();

        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                invocations: 2,
                failures: 1,
                dummy_responses: 1,
            }
        );
    }
}
