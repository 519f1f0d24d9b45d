use super::pager::{FetchSettings, PageFetch, fetch_pages};
use crate::core::cache::Cache;
use crate::core::coin::{CoinRecord, SkipReason, normalize};
use crate::core::error::AcquireError;
use crate::core::market::MarketDataProvider;
use std::sync::Arc;
use tracing::{debug, warn};

/// Upper bound on skip reasons echoed to the log.
pub const MAX_SKIPPED_TO_SHOW: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchKey {
    pub provider: String,
    pub pages: u32,
}

/// Cleaned market data ready for allocation or export.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    pub provider: String,
    pub records: Vec<CoinRecord>,
    pub skipped: Vec<SkipReason>,
    pub pages_fetched: u32,
    pub partial_failure: Option<String>,
}

impl MarketSnapshot {
    pub fn skipped_sample(&self) -> &[SkipReason] {
        &self.skipped[..self.skipped.len().min(MAX_SKIPPED_TO_SHOW)]
    }
}

/// Fetch, memoize and normalize market data from one provider.
pub struct MarketFeed {
    provider: Box<dyn MarketDataProvider>,
    settings: FetchSettings,
    cache: Arc<Cache<FetchKey, PageFetch>>,
}

impl MarketFeed {
    pub fn new(
        provider: Box<dyn MarketDataProvider>,
        settings: FetchSettings,
        cache: Arc<Cache<FetchKey, PageFetch>>,
    ) -> Self {
        Self {
            provider,
            settings,
            cache,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    async fn fetch(&self) -> Result<PageFetch, AcquireError> {
        let key = FetchKey {
            provider: self.provider.name().to_string(),
            pages: self.settings.pages,
        };
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        let fetched = fetch_pages(self.provider.as_ref(), &self.settings).await?;
        if fetched.failure.is_none() && !fetched.records.is_empty() {
            self.cache.put(key, fetched.clone()).await;
        }
        Ok(fetched)
    }

    pub async fn snapshot(&self) -> Result<MarketSnapshot, AcquireError> {
        let fetched = self.fetch().await?;
        if fetched.records.is_empty() {
            return Err(AcquireError::EmptyUpstream {
                provider: self.provider.name().to_string(),
            });
        }

        let (records, skipped) = normalize(&fetched.records, self.provider.field_mapping());
        debug!(
            provider = self.provider.name(),
            kept = records.len(),
            skipped = skipped.len(),
            "Normalized market data"
        );
        if !skipped.is_empty() {
            warn!(
                "Skipped {} coins due to missing data (e.g., null market cap rank)",
                skipped.len()
            );
            for reason in skipped.iter().take(MAX_SKIPPED_TO_SHOW) {
                debug!("{}", reason);
            }
        }

        Ok(MarketSnapshot {
            provider: self.provider.name().to_string(),
            records,
            skipped,
            pages_fetched: fetched.pages_fetched,
            partial_failure: fetched.failure,
        })
    }
}
