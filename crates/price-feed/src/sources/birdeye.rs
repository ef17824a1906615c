//! Birdeye price source
//!
//! `GET /defi/price?address=..` with the chain passed in the `x-chain` header.
//! Current prices only; the one source that covers Solana.
//! API documentation: https://docs.birdeye.so

use std::time::Instant;

use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use pricing_core::{
    elapsed_ms, ChainId, CoreResult, Credentials, PriceQuery, PriceResult, ServiceName,
    SourceDescriptor,
};

use super::http::{api_key, ensure_success, failure, flexible_price, read_json, resolve_chain, transport_error};
use super::{descriptor_for, PriceSource};

const PROVIDER: ServiceName = ServiceName::Birdeye;

#[derive(Debug, Deserialize)]
struct PriceResponse {
    #[serde(default)]
    success: bool,
    data: Option<PriceData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceData {
    #[serde(default, deserialize_with = "flexible_price")]
    value: Option<f64>,
    update_unix_time: Option<i64>,
}

pub struct BirdeyeSource {
    client: Client,
    base_url: String,
}

impl BirdeyeSource {
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
        start: Instant,
    ) -> CoreResult<PriceResult> {
        let chain_name = resolve_chain(PROVIDER, chain)?.to_lowercase();
        let key = api_key(PROVIDER, credentials)?;

        let url = format!("{}/defi/price", self.base_url);
        debug!("Birdeye request: {} on {}", token_address, chain_name);

        let response = self
            .client
            .get(&url)
            .query(&[("address", token_address)])
            .header("X-API-KEY", key)
            .header("x-chain", chain_name)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport_error)?;
        let latency = elapsed_ms(start);

        let response = ensure_success(PROVIDER, response, false).await?;
        let body: PriceResponse = read_json(response).await?;

        Ok(match body.data {
            Some(data) if body.success => {
                PriceResult::from_price(data.value, latency).with_timestamp(data.update_unix_time)
            }
            _ => PriceResult::empty(latency),
        })
    }
}

#[async_trait::async_trait]
impl PriceSource for BirdeyeSource {
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
        _query: &PriceQuery,
    ) -> PriceResult {
        let start = Instant::now();
        self.lookup(token_address, chain, credentials, start)
            .await
            .unwrap_or_else(|err| failure(PROVIDER, err, start))
    }
}
