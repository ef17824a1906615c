//! Upstream health probes
//!
//! A probe is an ordinary aggregate request for a well-known token; each
//! source's slot is classified into a status.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use pricing_core::{AggregateResult, ChainId, PriceRequest, PriceResult};

use crate::aggregator::PriceAggregator;

/// USDC on Ethereum
pub const EVM_PROBE_TOKEN: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
pub const EVM_PROBE_CHAIN: u64 = 1;

pub const SVM_PROBE_TOKEN: &str = "3S8qX1MsMqRbiwKg2cQyx7nis1oHMgaCuc9c4VfvVdPN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Operational,
    Degraded,
    Down,
}

impl ServiceStatus {
    pub fn classify(result: &PriceResult) -> Self {
        if result.error.is_some() {
            ServiceStatus::Down
        } else if result.price.is_none() {
            ServiceStatus::Degraded
        } else {
            ServiceStatus::Operational
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: ServiceStatus,
    pub latency: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&PriceResult> for ServiceHealth {
    fn from(result: &PriceResult) -> Self {
        Self {
            status: ServiceStatus::classify(result),
            latency: result.latency,
            error: result.error.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub success: bool,
    /// Unix milliseconds
    pub timestamp: i64,
    pub services: BTreeMap<String, ServiceHealth>,
}

impl HealthReport {
    fn from_result(result: &AggregateResult, suffix: Option<&str>) -> Self {
        let services = result
            .prices
            .iter()
            .map(|(name, price)| {
                let key = match suffix {
                    Some(suffix) => format!("{name}_{suffix}"),
                    None => name.clone(),
                };
                (key, ServiceHealth::from(price))
            })
            .collect();

        Self {
            success: result.success,
            timestamp: Utc::now().timestamp_millis(),
            services,
        }
    }

    pub fn operational_count(&self) -> usize {
        self.services
            .values()
            .filter(|s| s.status == ServiceStatus::Operational)
            .count()
    }
}

async fn probe(aggregator: &PriceAggregator, request: PriceRequest, suffix: Option<&str>) -> HealthReport {
    let result = aggregator.fetch_prices(&request).await;
    let report = HealthReport::from_result(&result, suffix);
    info!(
        "Health probe on chain {}: {}/{} operational",
        request.chain_id,
        report.operational_count(),
        report.services.len()
    );
    report
}

pub async fn health_check_evm(aggregator: &PriceAggregator) -> HealthReport {
    probe(aggregator, PriceRequest::new(EVM_PROBE_TOKEN, EVM_PROBE_CHAIN), None).await
}

/// The Solana probe counts as healthy only if some source actually priced it
async fn probe_svm(aggregator: &PriceAggregator, suffix: Option<&str>) -> HealthReport {
    let mut report = probe(aggregator, PriceRequest::new(SVM_PROBE_TOKEN, ChainId::solana()), suffix).await;
    report.success = report.operational_count() > 0;
    report
}

pub async fn health_check_svm(aggregator: &PriceAggregator) -> HealthReport {
    probe_svm(aggregator, None).await
}

/// Both probes concurrently, services keyed `{name}_evm` / `{name}_svm`
pub async fn health_check(aggregator: &PriceAggregator) -> HealthReport {
    let (evm, svm) = tokio::join!(
        probe(aggregator, PriceRequest::new(EVM_PROBE_TOKEN, EVM_PROBE_CHAIN), Some("evm")),
        probe_svm(aggregator, Some("svm")),
    );

    let mut services = evm.services;
    services.extend(svm.services);

    HealthReport {
        success: evm.success || svm.success,
        timestamp: Utc::now().timestamp_millis(),
        services,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::AggregatorConfig;
    use crate::sources::{descriptor_for, PriceSource};
    use pricing_core::{Credentials, PriceQuery, ServiceName, SourceDescriptor};
    use std::sync::Arc;

    struct FixedSource(ServiceName, PriceResult);

    #[async_trait::async_trait]
    impl PriceSource for FixedSource {
        fn name(&self) -> ServiceName {
            self.0
        }

        fn descriptor(&self) -> SourceDescriptor {
            descriptor_for(self.0)
        }

        async fn fetch(
            &self,
            _token_address: &str,
            _chain: &ChainId,
            _credentials: Option<&Credentials>,
            _query: &PriceQuery,
        ) -> PriceResult {
            self.1.clone()
        }
    }

    fn aggregator() -> PriceAggregator {
        aggregator_with([
            PriceResult::from_price(Some(1.0), 10),
            PriceResult::failed("Codex API error: 401", 20),
            PriceResult::empty(30),
            PriceResult::from_price(Some(1.0), 40),
            PriceResult::from_price(Some(1.0), 50),
        ])
    }

    fn aggregator_with(results: [PriceResult; 5]) -> PriceAggregator {
        let sources = ServiceName::ALL
            .into_iter()
            .zip(results)
            .map(|(name, result)| Arc::new(FixedSource(name, result)) as Arc<dyn PriceSource>)
            .collect();
        PriceAggregator::new(AggregatorConfig::default(), sources, Credentials::default())
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            ServiceStatus::classify(&PriceResult::from_price(Some(2.0), 1)),
            ServiceStatus::Operational
        );
        assert_eq!(ServiceStatus::classify(&PriceResult::empty(1)), ServiceStatus::Degraded);
        assert_eq!(ServiceStatus::classify(&PriceResult::failed("x", 1)), ServiceStatus::Down);
    }

    #[tokio::test]
    async fn test_evm_probe() {
        let report = health_check_evm(&aggregator()).await;

        assert!(report.success);
        assert_eq!(report.services.len(), 5);
        assert_eq!(report.services["birdeye"].status, ServiceStatus::Operational);
        assert_eq!(report.services["codex"].status, ServiceStatus::Down);
        assert_eq!(report.services["defillama"].status, ServiceStatus::Degraded);
        assert_eq!(report.services["defillama"].latency, 30);
        assert_eq!(report.operational_count(), 3);
    }

    #[tokio::test]
    async fn test_svm_probe_only_reaches_solana_source() {
        let report = health_check_svm(&aggregator()).await;

        assert!(report.success);
        assert_eq!(report.services.keys().collect::<Vec<_>>(), vec!["birdeye"]);
    }

    #[tokio::test]
    async fn test_svm_probe_fails_when_solana_source_is_down() {
        let agg = aggregator_with(std::array::from_fn(|_| {
            PriceResult::failed("Birdeye API error: 401", 15)
        }));

        let report = health_check_svm(&agg).await;
        assert!(!report.success);
        assert_eq!(report.services["birdeye"].status, ServiceStatus::Down);

        let degraded = aggregator_with(std::array::from_fn(|_| PriceResult::empty(15)));
        assert!(!health_check_svm(&degraded).await.success);
    }

    #[tokio::test]
    async fn test_combined_success_follows_either_probe() {
        let all_down = aggregator_with(std::array::from_fn(|_| PriceResult::failed("down", 1)));
        let report = health_check(&all_down).await;

        // The EVM request is well-formed, so its aggregate still succeeds
        assert!(report.success);
        assert_eq!(report.services["birdeye_svm"].status, ServiceStatus::Down);
        assert_eq!(report.operational_count(), 0);
    }

    #[tokio::test]
    async fn test_combined_keys_are_suffixed() {
        let report = health_check(&aggregator()).await;

        assert!(report.success);
        assert_eq!(report.services.len(), 6);
        assert!(report.services.contains_key("codex_evm"));
        assert!(report.services.contains_key("birdeye_svm"));
        assert!(!report.services.contains_key("codex_svm"));
        assert!(report.timestamp > 0);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["services"]["codex_evm"]["status"], "down");
        assert!(json["services"]["birdeye_evm"].get("error").is_none());
    }
}
