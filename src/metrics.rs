//! Translation and delivery counters.
//!
//! Owned by the coordinator rather than kept in a global, so each
//! coordinator (and each test) counts on its own.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct TranslationMetrics {
    /// Requests sent to the translation endpoint
    api_calls: AtomicUsize,

    /// Requests that ended in an upstream failure
    api_failures: AtomicUsize,

    /// Results handed to a live page channel
    deliveries: AtomicUsize,

    /// Results dropped because no page channel was live
    dropped_deliveries: AtomicUsize,
}

impl TranslationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_api_call(&self) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_api_failure(&self) {
        self.api_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of handing a result to the page channel.
    pub fn record_delivery(&self, delivered: bool) {
        if delivered {
            self.deliveries.fetch_add(1, Ordering::Relaxed);
        } else {
            self.dropped_deliveries.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn api_calls(&self) -> usize {
        self.api_calls.load(Ordering::Relaxed)
    }

    pub fn api_failures(&self) -> usize {
        self.api_failures.load(Ordering::Relaxed)
    }

    pub fn deliveries(&self) -> usize {
        self.deliveries.load(Ordering::Relaxed)
    }

    pub fn dropped_deliveries(&self) -> usize {
        self.dropped_deliveries.load(Ordering::Relaxed)
    }

    /// Generate a metrics report.
    pub fn report(&self) -> MetricsReport {
        let calls = self.api_calls();
        let failures = self.api_failures();
        let api_success_rate = if calls > 0 {
            (calls.saturating_sub(failures) as f64 / calls as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            api_calls: calls,
            api_failures: failures,
            api_success_rate,
            deliveries: self.deliveries(),
            dropped_deliveries: self.dropped_deliveries(),
        }
    }
}

/// Metrics report containing current translation statistics.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    /// Number of API calls made
    pub api_calls: usize,

    /// Number of API failures
    pub api_failures: usize,

    /// API success rate as a percentage (0-100)
    pub api_success_rate: f64,

    /// Results delivered to the page
    pub deliveries: usize,

    /// Results dropped for lack of a page channel
    pub dropped_deliveries: usize,
}
