use super::http::{DEFAULT_TIMEOUT, build_client, get_json_array};
use crate::core::coin::FieldMapping;
use crate::core::error::FetchError;
use crate::core::market::{MarketDataProvider, RawRecord};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// `/v1/tickers` with USD quotes. The endpoint returns a single ranked list,
/// so only page 1 exists.
pub struct CoinpaprikaProvider {
    base_url: String,
    client: reqwest::Client,
    mapping: FieldMapping,
    limit: u32,
}

impl CoinpaprikaProvider {
    pub fn new(base_url: &str, limit: u32) -> Result<Self, FetchError> {
        Self::with_timeout(base_url, limit, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, limit: u32, timeout: Duration) -> Result<Self, FetchError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: build_client(timeout)?,
            mapping: FieldMapping::coinpaprika(),
            limit,
        })
    }

    pub fn tickers_url(&self) -> String {
        format!("{}/v1/tickers?quotes=USD&limit={}", self.base_url, self.limit)
    }
}

#[async_trait]
impl MarketDataProvider for CoinpaprikaProvider {
    fn name(&self) -> &str {
        "coinpaprika"
    }

    fn field_mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    #[instrument(name = "CoinpaprikaPageFetch", skip(self), fields(page = %page))]
    async fn get_page(&self, page: u32) -> Result<Vec<RawRecord>, FetchError> {
        if page > 1 {
            debug!("No further pages for tickers endpoint");
            return Ok(Vec::new());
        }
        get_json_array(&self.client, &self.tickers_url()).await
    }
}
