use crate::core::error::FetchError;
use crate::core::market::RawRecord;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use std::time::Duration;
use tracing::{debug, error};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Builds the client shared by all page requests of one provider.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, FetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    reqwest::Client::builder()
        .user_agent(concat!("altbasket/", env!("CARGO_PKG_VERSION")))
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(FetchError::Client)
}

/// Issues one GET and decodes the body as a JSON array.
pub async fn get_json_array(
    client: &reqwest::Client,
    url: &str,
) -> Result<Vec<RawRecord>, FetchError> {
    debug!("Requesting market data from {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;

    if !response.status().is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: response.status(),
        });
    }

    let text = response
        .text()
        .await
        .map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;

    serde_json::from_str::<Vec<RawRecord>>(&text).map_err(|source| {
        error!(
            error = ?source,
            response = %text,
            "Failed to parse market data response"
        );
        FetchError::Decode {
            url: url.to_string(),
            source,
        }
    })
}
