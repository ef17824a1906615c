//! Dexscreener price source
//!
//! `GET /tokens/{address}` returns trading pairs across every chain. The first
//! pair on the requested chain wins, falling back to the first pair overall.

use std::time::Instant;

use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use pricing_core::{
    elapsed_ms, ChainId, CoreResult, Credentials, PriceQuery, PriceResult, ServiceName,
    SourceDescriptor,
};

use super::http::{ensure_success, failure, flexible_price, read_json, resolve_chain, transport_error};
use super::{descriptor_for, PriceSource};

const PROVIDER: ServiceName = ServiceName::Dexscreener;

#[derive(Debug, Deserialize)]
struct TokensResponse {
    #[serde(default)]
    pairs: Option<Vec<Pair>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pair {
    #[serde(default)]
    chain_id: Option<String>,
    #[serde(default, deserialize_with = "flexible_price")]
    price_usd: Option<f64>,
}

fn select_pair<'a>(pairs: &'a [Pair], chain_name: &str) -> Option<&'a Pair> {
    pairs
        .iter()
        .find(|pair| {
            pair.chain_id
                .as_deref()
                .is_some_and(|id| id.eq_ignore_ascii_case(chain_name))
        })
        .or_else(|| pairs.first())
}

pub struct DexscreenerSource {
    client: Client,
    base_url: String,
}

impl DexscreenerSource {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn lookup(&self, token_address: &str, chain: &ChainId, start: Instant) -> CoreResult<PriceResult> {
        let chain_name = resolve_chain(PROVIDER, chain)?;
        debug!("Dexscreener request: {} on {}", token_address, chain_name);

        let response = self
            .client
            .get(format!("{}/tokens/{}", self.base_url, token_address))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport_error)?;
        let latency = elapsed_ms(start);

        let response = ensure_success(PROVIDER, response, false).await?;
        let body: TokensResponse = read_json(response).await?;
        let pairs = body.pairs.unwrap_or_default();

        Ok(PriceResult::from_price(
            select_pair(&pairs, chain_name).and_then(|pair| pair.price_usd),
            latency,
        ))
    }
}

#[async_trait::async_trait]
impl PriceSource for DexscreenerSource {
    fn name(&self) -> ServiceName {
        PROVIDER
    }

    fn descriptor(&self) -> SourceDescriptor {
        descriptor_for(PROVIDER)
    }

    async fn fetch(
        &self,
        token_address: &str,
        chain: &ChainId,
        _credentials: Option<&Credentials>,
        _query: &PriceQuery,
    ) -> PriceResult {
        let start = Instant::now();
        self.lookup(token_address, chain, start)
            .await
            .unwrap_or_else(|err| failure(PROVIDER, err, start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const USDC_ETH: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";

    #[tokio::test]
    async fn test_prefers_pair_on_requested_chain() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/tokens/{USDC_ETH}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "schemaVersion": "1.0.0",
                "pairs": [
                    { "chainId": "bsc", "dexId": "pancakeswap", "priceUsd": "1.010" },
                    { "chainId": "ethereum", "dexId": "uniswap", "priceUsd": "0.9999" }
                ]
            })))
            .mount(&server)
            .await;

        let source = DexscreenerSource::new(Client::new(), server.uri());
        let result = source
            .fetch(USDC_ETH, &ChainId::from(1u64), None, &PriceQuery::default())
            .await;

        assert_eq!(result.price, Some(0.9999));
    }

    #[tokio::test]
    async fn test_falls_back_to_first_pair() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "pairs": [{ "chainId": "base", "priceUsd": 1.5 }]
            })))
            .mount(&server)
            .await;

        let source = DexscreenerSource::new(Client::new(), server.uri());
        let result = source
            .fetch(USDC_ETH, &ChainId::from(1u64), None, &PriceQuery::default())
            .await;

        assert_eq!(result.price, Some(1.5));
    }

    #[tokio::test]
    async fn test_null_pairs_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "pairs": null })))
            .mount(&server)
            .await;

        let source = DexscreenerSource::new(Client::new(), server.uri());
        let result = source
            .fetch(USDC_ETH, &ChainId::from(1u64), None, &PriceQuery::default())
            .await;

        assert!(result.price.is_none());
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let source = DexscreenerSource::new(Client::new(), server.uri());
        let result = source
            .fetch(USDC_ETH, &ChainId::from(1u64), None, &PriceQuery::default())
            .await;

        assert_eq!(result.error.as_deref(), Some("Dexscreener API error: 429"));
    }
}
