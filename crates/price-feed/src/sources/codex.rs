//! Codex price source
//!
//! GraphQL `getTokenPrices` over `POST /graphql`. Accepts an optional
//! timestamp per input, so this source serves historical lookups.

use std::time::Instant;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use pricing_core::{
    elapsed_ms, ChainId, CoreError, CoreResult, Credentials, PriceQuery, PriceResult, ServiceName,
    SourceDescriptor,
};

use super::http::{
    api_key, ensure_success, failure, flexible_price, flexible_timestamp, read_json, resolve_chain,
    transport_error,
};
use super::{descriptor_for, PriceSource};

const PROVIDER: ServiceName = ServiceName::Codex;

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<TokenPricesData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenPricesData {
    #[serde(default)]
    get_token_prices: Option<Vec<Option<TokenPrice>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenPrice {
    #[serde(default, deserialize_with = "flexible_price")]
    price_usd: Option<f64>,
    #[serde(default, deserialize_with = "flexible_timestamp")]
    timestamp: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// One-input `getTokenPrices` query. The address has already passed
/// validation, so it is safe to inline.
fn build_query(token_address: &str, network_id: u64, timestamp: Option<i64>) -> String {
    let mut input = format!("{{ address: \"{token_address}\", networkId: {network_id}");
    if let Some(ts) = timestamp {
        input.push_str(&format!(", timestamp: {ts}"));
    }
    input.push_str(" }");

    format!(
        "{{ getTokenPrices(inputs: [{input}]) {{ address networkId priceUsd timestamp }} }}"
    )
}

pub struct CodexSource {
    client: Client,
    base_url: String,
}

impl CodexSource {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn lookup(
        &self,
        token_address: &str,
        chain: &ChainId,
        credentials: Option<&Credentials>,
        query: &PriceQuery,
        start: Instant,
    ) -> CoreResult<PriceResult> {
        resolve_chain(PROVIDER, chain)?;
        let network_id = chain
            .as_u64()
            .ok_or_else(|| CoreError::ChainMappingNotFound(chain.clone()))?;
        let key = api_key(PROVIDER, credentials)?;

        let body = json!({ "query": build_query(token_address, network_id, query.timestamp) });
        debug!(
            "Codex request: {} on network {} at {:?}",
            token_address, network_id, query.timestamp
        );

        let response = self
            .client
            .post(format!("{}/graphql", self.base_url))
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let latency = elapsed_ms(start);

        let response = ensure_success(PROVIDER, response, true).await?;
        let body: GraphQlResponse = read_json(response).await?;

        let entry = body
            .data
            .and_then(|data| data.get_token_prices)
            .and_then(|prices| prices.into_iter().next().flatten());

        match entry {
            Some(price) if price.price_usd.is_some() => {
                Ok(PriceResult::from_price(price.price_usd, latency).with_timestamp(price.timestamp))
            }
            _ => match body.errors.first() {
                Some(err) => Err(CoreError::UpstreamGraphQl {
                    service: PROVIDER,
                    message: err.message.clone(),
                }),
                None => Ok(PriceResult::empty(latency)),
            },
        }
    }
}

#[async_trait::async_trait]
impl PriceSource for CodexSource {
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
        credentials: Option<&Credentials>,
        query: &PriceQuery,
    ) -> PriceResult {
        let start = Instant::now();
        self.lookup(token_address, chain, credentials, query, start)
            .await
            .unwrap_or_else(|err| failure(PROVIDER, err, start))
    }
}
