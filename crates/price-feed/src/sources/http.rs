//! Request plumbing shared by the sources

use std::time::Instant;

use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};

use pricing_core::{
    elapsed_ms, is_supported, provider_chain_name, ChainId, CoreError, CoreResult, Credentials,
    PriceResult, ServiceName,
};

/// Eligibility check and chain name lookup, before any network call
pub(crate) fn resolve_chain(service: ServiceName, chain: &ChainId) -> CoreResult<&'static str> {
    if !is_supported(chain, service) {
        return Err(CoreError::UnsupportedChain {
            chain: chain.clone(),
            service,
        });
    }

    provider_chain_name(chain, service).ok_or_else(|| CoreError::ChainMappingNotFound(chain.clone()))
}

pub(crate) fn api_key(service: ServiceName, credentials: Option<&Credentials>) -> CoreResult<&str> {
    credentials
        .and_then(|c| c.key_for(service))
        .ok_or(CoreError::MissingCredential(service))
}

pub(crate) fn transport_error(err: reqwest::Error) -> CoreError {
    let message = if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_decode() {
        format!("invalid response body: {err}")
    } else {
        err.to_string()
    };
    CoreError::UpstreamTransport(message)
}

/// Turn a non-2xx response into `UpstreamHttp`, optionally keeping the body text
pub(crate) async fn ensure_success(
    service: ServiceName,
    response: Response,
    keep_body: bool,
) -> CoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = if keep_body {
        response
            .text()
            .await
            .ok()
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
    } else {
        None
    };

    Err(CoreError::UpstreamHttp {
        service,
        status: status.as_u16(),
        message,
    })
}

pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> CoreResult<T> {
    response.json::<T>().await.map_err(transport_error)
}

/// Record a failed lookup as the source's result
pub(crate) fn failure(service: ServiceName, err: CoreError, start: Instant) -> PriceResult {
    match &err {
        CoreError::UnsupportedChain { .. } | CoreError::ChainMappingNotFound(_) => {
            debug!("{} skipped: {}", service, err)
        }
        _ => warn!("{} lookup failed: {}", service, err),
    }
    PriceResult::failed(err, elapsed_ms(start))
}

/// Prices arrive as JSON numbers or decimal strings depending on the API
pub(crate) fn price_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn flexible_price<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(price_from_value))
}

/// Unix seconds, tolerating fractional values
pub(crate) fn flexible_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(price_from_value).map(|ts| ts as i64))
}
