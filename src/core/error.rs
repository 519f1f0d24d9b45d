//! Typed errors for the market-data pipeline

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error: {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to decode response from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("page {page} failed after {attempts} attempts")]
    AttemptsExhausted {
        page: u32,
        attempts: usize,
        #[source]
        source: Box<FetchError>,
    },
}

#[derive(Debug, Error)]
pub enum AcquireError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("{provider} returned no records on the first page")]
    EmptyUpstream { provider: String },
}

/// Conditions under which a basket cannot be computed meaningfully.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmptyBasketReason {
    #[error("no altcoins left to select for the top {top_n} after filtering")]
    NoCandidates { top_n: usize },

    #[error("total market cap of the selected basket is zero")]
    ZeroMarketCap,
}
