//! DefiLlama price source
//!
//! Prices are keyed by `"{chain}:{address}"`:
//! - current: `GET /prices/current/{key}`
//! - historical: `GET /prices/historical/{timestamp}/{key}?searchWidth=..`
//!
//! API documentation: https://defillama.com/docs/api

use std::collections::HashMap;
use std::time::Instant;

use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use pricing_core::{
    elapsed_ms, ChainId, CoreResult, Credentials, PriceQuery, PriceResult, ServiceName,
    SourceDescriptor,
};

use super::http::{
    ensure_success, failure, flexible_price, flexible_timestamp, read_json, resolve_chain,
    transport_error,
};
use super::{descriptor_for, PriceSource};

const PROVIDER: ServiceName = ServiceName::DefiLlama;

#[derive(Debug, Deserialize)]
struct PricesResponse {
    #[serde(default)]
    coins: HashMap<String, CoinPrice>,
}

#[derive(Debug, Deserialize)]
struct CoinPrice {
    #[serde(default, deserialize_with = "flexible_price")]
    price: Option<f64>,
    #[serde(default, deserialize_with = "flexible_timestamp")]
    timestamp: Option<i64>,
    confidence: Option<f64>,
}

pub struct DefiLlamaSource {
    client: Client,
    base_url: String,
}

impl DefiLlamaSource {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, coin_key: &str, timestamp: Option<i64>) -> String {
        match timestamp {
            Some(ts) => format!("{}/prices/historical/{}/{}", self.base_url, ts, coin_key),
            None => format!("{}/prices/current/{}", self.base_url, coin_key),
        }
    }

    async fn lookup(
        &self,
        token_address: &str,
        chain: &ChainId,
        query: &PriceQuery,
        start: Instant,
    ) -> CoreResult<PriceResult> {
        let chain_name = resolve_chain(PROVIDER, chain)?;
        let coin_key = format!("{chain_name}:{token_address}");

        let mut request = self
            .client
            .get(self.url(&coin_key, query.timestamp))
            .header(ACCEPT, "application/json");
        if let (Some(_), Some(width)) = (query.timestamp, query.search_width.as_deref()) {
            request = request.query(&[("searchWidth", width)]);
        }
        debug!("DefiLlama request: {} at {:?}", coin_key, query.timestamp);

        let response = request.send().await.map_err(transport_error)?;
        let latency = elapsed_ms(start);

        let response = ensure_success(PROVIDER, response, false).await?;
        let mut body: PricesResponse = read_json(response).await?;

        // The API may echo the key with a different address case
        let coin = body.coins.remove(&coin_key).or_else(|| {
            let key = body
                .coins
                .keys()
                .find(|k| k.eq_ignore_ascii_case(&coin_key))
                .cloned()?;
            body.coins.remove(&key)
        });

        Ok(match coin {
            Some(coin) => PriceResult::from_price(coin.price, latency)
                .with_timestamp(coin.timestamp)
                .with_confidence(coin.confidence),
            None => PriceResult::empty(latency),
        })
    }
}

#[async_trait::async_trait]
impl PriceSource for DefiLlamaSource {
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
        query: &PriceQuery,
    ) -> PriceResult {
        let start = Instant::now();
        self.lookup(token_address, chain, query, start)
            .await
            .unwrap_or_else(|err| failure(PROVIDER, err, start))
    }
}
