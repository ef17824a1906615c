//! GeckoTerminal price source
//!
//! `GET /simple/networks/{network}/token_price/{address}`; prices come back as
//! decimal strings keyed by the lowercased address.
//! API documentation: https://www.geckoterminal.com/dex-api

use std::collections::HashMap;
use std::time::Instant;

use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use pricing_core::{
    elapsed_ms, ChainId, CoreResult, Credentials, PriceQuery, PriceResult, ServiceName,
    SourceDescriptor,
};

use super::http::{ensure_success, failure, price_from_value, read_json, resolve_chain, transport_error};
use super::{descriptor_for, PriceSource};

const PROVIDER: ServiceName = ServiceName::GeckoTerminal;

#[derive(Debug, Deserialize)]
struct TokenPriceResponse {
    data: Option<TokenPriceData>,
}

#[derive(Debug, Deserialize)]
struct TokenPriceData {
    attributes: Option<Attributes>,
}

#[derive(Debug, Deserialize)]
struct Attributes {
    #[serde(default)]
    token_prices: HashMap<String, Value>,
}

pub struct GeckoTerminalSource {
    client: Client,
    base_url: String,
}

impl GeckoTerminalSource {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn lookup(&self, token_address: &str, chain: &ChainId, start: Instant) -> CoreResult<PriceResult> {
        let network = resolve_chain(PROVIDER, chain)?;
        debug!("GeckoTerminal request: {} on {}", token_address, network);

        let url = format!(
            "{}/simple/networks/{}/token_price/{}",
            self.base_url, network, token_address
        );
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport_error)?;
        let latency = elapsed_ms(start);

        let response = ensure_success(PROVIDER, response, false).await?;
        let body: TokenPriceResponse = read_json(response).await?;

        let prices = body
            .data
            .and_then(|data| data.attributes)
            .map(|attributes| attributes.token_prices)
            .unwrap_or_default();
        let price = prices
            .get(&token_address.to_lowercase())
            .or_else(|| prices.get(token_address))
            .and_then(price_from_value);

        Ok(PriceResult::from_price(price, latency))
    }
}

#[async_trait::async_trait]
impl PriceSource for GeckoTerminalSource {
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
    async fn test_string_price_for_lowercased_address() {
        let server = MockServer::start().await;
        let checksummed = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
        Mock::given(method("GET"))
            .and(path(format!("/simple/networks/eth/token_price/{checksummed}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "id": "a1b2",
                    "type": "simple_token_price",
                    "attributes": { "token_prices": { USDC_ETH: "0.999847" } }
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let source = GeckoTerminalSource::new(Client::new(), server.uri());
        let result = source
            .fetch(checksummed, &ChainId::from(1u64), None, &PriceQuery::default())
            .await;

        assert_eq!(result.price, Some(0.999847));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_unknown_token_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "id": "x", "type": "simple_token_price", "attributes": { "token_prices": {} } }
            })))
            .mount(&server)
            .await;

        let source = GeckoTerminalSource::new(Client::new(), server.uri());
        let result = source
            .fetch(USDC_ETH, &ChainId::from(1u64), None, &PriceQuery::default())
            .await;

        assert!(result.price.is_none());
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = GeckoTerminalSource::new(Client::new(), server.uri());
        let result = source
            .fetch(USDC_ETH, &ChainId::from(1u64), None, &PriceQuery::default())
            .await;

        assert_eq!(result.error.as_deref(), Some("GeckoTerminal API error: 503"));
    }

    #[tokio::test]
    async fn test_unreachable_upstream() {
        // Nothing listens on the discard port
        let source = GeckoTerminalSource::new(Client::new(), "http://127.0.0.1:9");
        let result = source
            .fetch(USDC_ETH, &ChainId::from(1u64), None, &PriceQuery::default())
            .await;

        assert!(result.price.is_none());
        assert!(result.error.is_some());
    }
}
