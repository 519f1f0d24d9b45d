use super::http::{DEFAULT_TIMEOUT, build_client, get_json_array};
use crate::core::coin::FieldMapping;
use crate::core::error::FetchError;
use crate::core::market::{MarketDataProvider, RawRecord};
use async_trait::async_trait;
use std::time::Duration;
use tracing::instrument;

pub const PAGE_SIZE: u32 = 250;

/// `/coins/markets` ordered by market cap, 250 coins per page.
pub struct CoingeckoProvider {
    base_url: String,
    client: reqwest::Client,
    mapping: FieldMapping,
    price_change_24h: bool,
}

impl CoingeckoProvider {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        Self::with_options(base_url, DEFAULT_TIMEOUT, true)
    }

    pub fn with_options(
        base_url: &str,
        timeout: Duration,
        price_change_24h: bool,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: build_client(timeout)?,
            mapping: FieldMapping::coingecko(),
            price_change_24h,
        })
    }

    pub fn page_url(&self, page: u32) -> String {
        let mut url = format!(
            "{}/coins/markets?vs_currency=usd&order=market_cap_desc&per_page={}&page={}&sparkline=false",
            self.base_url, PAGE_SIZE, page
        );
        if self.price_change_24h {
            url.push_str("&price_change_percentage=24h");
        }
        url
    }
}

#[async_trait]
impl MarketDataProvider for CoingeckoProvider {
    fn name(&self) -> &str {
        "coingecko"
    }

    fn field_mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    #[instrument(name = "CoingeckoPageFetch", skip(self), fields(page = %page))]
    async fn get_page(&self, page: u32) -> Result<Vec<RawRecord>, FetchError> {
        get_json_array(&self.client, &self.page_url(page)).await
    }
}
