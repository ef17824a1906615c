//! Error types

use thiserror::Error;

use crate::{ChainFamily, ChainId, ServiceName};

/// Core error types
///
/// Only `InvalidAddressFormat` and `NoEligibleProviders` fail a whole request;
/// every other kind is recorded in the slot of the source that produced it.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid {0} address format")]
    InvalidAddressFormat(ChainFamily),

    #[error("Chain {chain} not supported by {}", .service.display_name())]
    UnsupportedChain { chain: ChainId, service: ServiceName },

    #[error("No supported services found for chain {0}")]
    NoEligibleProviders(ChainId),

    #[error("Chain mapping not found for {0}")]
    ChainMappingNotFound(ChainId),

    #[error("{} API error: {status}{}", .service.display_name(), detail_suffix(.message))]
    UpstreamHttp {
        service: ServiceName,
        status: u16,
        message: Option<String>,
    },

    /// Provider answered 200 but reported an application-level error
    #[error("{} GraphQL error: {message}", .service.display_name())]
    UpstreamGraphQl { service: ServiceName, message: String },

    #[error("{0}")]
    UpstreamTransport(String),

    #[error("Service failed: {0}")]
    ServiceDispatchFailure(String),

    #[error("{} API key not configured", .0.display_name())]
    MissingCredential(ServiceName),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

fn detail_suffix(message: &Option<String>) -> String {
    match message {
        Some(m) if !m.is_empty() => format!(" - {m}"),
        _ => String::new(),
    }
}

/// Result type alias
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_caller_expectations() {
        assert_eq!(
            CoreError::InvalidAddressFormat(ChainFamily::Evm).to_string(),
            "Invalid EVM address format"
        );
        assert_eq!(
            CoreError::InvalidAddressFormat(ChainFamily::Svm).to_string(),
            "Invalid Solana address format"
        );
        assert_eq!(
            CoreError::UnsupportedChain {
                chain: ChainId::from(999999u64),
                service: ServiceName::DefiLlama,
            }
            .to_string(),
            "Chain 999999 not supported by DefiLlama"
        );
    }

    #[test]
    fn test_http_error_carries_status_and_message() {
        let bare = CoreError::UpstreamHttp {
            service: ServiceName::Birdeye,
            status: 429,
            message: None,
        };
        assert_eq!(bare.to_string(), "Birdeye API error: 429");

        let detailed = CoreError::UpstreamHttp {
            service: ServiceName::Codex,
            status: 401,
            message: Some("unauthorized".to_string()),
        };
        assert_eq!(detailed.to_string(), "Codex API error: 401 - unauthorized");
    }

    #[test]
    fn test_graphql_error_names_the_provider() {
        let err = CoreError::UpstreamGraphQl {
            service: ServiceName::Codex,
            message: "rate limit exceeded".to_string(),
        };
        assert_eq!(err.to_string(), "Codex GraphQL error: rate limit exceeded");
        assert!(!matches!(err, CoreError::UpstreamTransport(_)));
    }
}
