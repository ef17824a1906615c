//! Multi-source token price aggregation
//!
//! Features:
//! - One adapter per upstream price API behind a common `PriceSource` trait
//! - Concurrent fan-out with per-source timeouts
//! - Partial-failure tolerance: one failing source never fails the request
//! - Upper-median consensus price
//! - Per-source call statistics and health probes

pub mod aggregator;
pub mod health;
pub mod sources;
pub mod stats;

pub use aggregator::{upper_median, AggregatorConfig, PriceAggregator};
pub use health::{health_check, health_check_evm, health_check_svm, HealthReport, ServiceHealth, ServiceStatus};
pub use sources::{build_client, default_sources, PriceSource};
pub use stats::{SourceCounters, SourceStats};
