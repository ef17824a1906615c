//! Per-source call statistics
//!
//! Uses DashMap for concurrent updates from the fan-out tasks. The store is
//! process-scoped and handed to the aggregator explicitly; nothing here is a
//! global.

use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use pricing_core::{PriceResult, ServiceName};

/// Running counters for one source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceCounters {
    pub calls: u64,
    pub priced: u64,
    pub empty: u64,
    pub failures: u64,
    pub total_latency_ms: u64,
    pub last_latency_ms: u64,
    pub last_error: Option<String>,
}

impl SourceCounters {
    pub fn average_latency_ms(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.total_latency_ms as f64 / self.calls as f64
        }
    }

    pub fn failure_rate(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.failures as f64 / self.calls as f64
        }
    }
}

#[derive(Debug)]
pub struct SourceStats {
    counters: DashMap<ServiceName, SourceCounters>,
    request_count: AtomicU64,
    last_update: RwLock<Option<Instant>>,
}

impl SourceStats {
    pub fn new() -> Self {
        Self {
            counters: DashMap::new(),
            request_count: AtomicU64::new(0),
            last_update: RwLock::new(None),
        }
    }

    /// Count one aggregate request, whether or not it reached any source
    pub fn record_request(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Fold one source result into its counters
    pub fn record(&self, service: ServiceName, result: &PriceResult) {
        let mut entry = self.counters.entry(service).or_default();
        entry.calls += 1;
        entry.total_latency_ms = entry.total_latency_ms.saturating_add(result.latency);
        entry.last_latency_ms = result.latency;

        if let Some(error) = &result.error {
            entry.failures += 1;
            entry.last_error = Some(error.clone());
        } else if result.price.is_some() {
            entry.priced += 1;
        } else {
            entry.empty += 1;
        }
        drop(entry);

        *self.last_update.write() = Some(Instant::now());
    }

    pub fn get(&self, service: ServiceName) -> Option<SourceCounters> {
        self.counters.get(&service).map(|r| r.value().clone())
    }

    /// All counters, in registry order
    pub fn snapshot(&self) -> Vec<(ServiceName, SourceCounters)> {
        let mut all: Vec<_> = self
            .counters
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();
        all.sort_by_key(|(service, _)| *service);
        all
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    pub fn last_update_age(&self) -> Option<Duration> {
        let last_update = *self.last_update.read();
        last_update.map(|at| at.elapsed())
    }

    pub fn reset(&self) {
        self.counters.clear();
        self.request_count.store(0, Ordering::Relaxed);
        *self.last_update.write() = None;
    }
}

impl Default for SourceStats {
    fn default() -> Self {
        Self::new()
    }
}
