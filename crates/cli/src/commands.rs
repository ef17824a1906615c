//! Command handlers. Each returns the JSON document printed on stdout.

use anyhow::Result;
use serde_json::{json, Map, Value};
use tracing::debug;

use pricing_core::{support_table, ChainId, PriceRequest};
use pricing_feed::{health_check, health_check_evm, health_check_svm, PriceAggregator};

use crate::cli::Family;

pub async fn price(
    aggregator: &PriceAggregator,
    token: String,
    chain: String,
    timestamp: Option<i64>,
    search_width: Option<String>,
) -> Result<Value> {
    let mut request = PriceRequest::new(token, ChainId::from(chain));
    request.timestamp = timestamp;
    request.search_width = search_width;

    let result = aggregator.fetch_prices(&request).await;

    for (service, counters) in aggregator.stats().snapshot() {
        debug!(
            "{}: {} calls, {} priced, {} failed, last {}ms",
            service, counters.calls, counters.priced, counters.failures, counters.last_latency_ms
        );
    }

    Ok(serde_json::to_value(result)?)
}

pub async fn health(aggregator: &PriceAggregator, family: Option<Family>) -> Result<Value> {
    let report = match family {
        Some(Family::Evm) => health_check_evm(aggregator).await,
        Some(Family::Svm) => health_check_svm(aggregator).await,
        None => health_check(aggregator).await,
    };
    Ok(serde_json::to_value(report)?)
}

pub fn chains() -> Value {
    let table: Map<String, Value> = support_table()
        .into_iter()
        .map(|(service, chains)| (service.key().to_string(), json!(chains)))
        .collect();
    Value::Object(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricing_feed::AggregatorConfig;
    use pricing_core::Credentials;

    #[test]
    fn test_chains_lists_every_service() {
        let value = chains();
        let table = value.as_object().unwrap();

        assert_eq!(table.len(), 5);
        assert!(table["codex"]
            .as_array()
            .unwrap()
            .contains(&json!("Ethereum (1)")));
        assert!(table["birdeye"].as_array().unwrap().contains(&json!("solana")));
    }

    #[tokio::test]
    async fn test_invalid_address_is_reported_not_raised() {
        let aggregator = PriceAggregator::new(AggregatorConfig::default(), Vec::new(), Credentials::default());
        let value = price(&aggregator, "nope".to_string(), "1".to_string(), None, None)
            .await
            .unwrap();

        assert_eq!(value["success"], false);
        assert_eq!(value["prices"]["error"]["error"], "Invalid EVM address format");
        assert!(value["aggregatedPrice"].is_null());
    }
}
