//! Market data provider abstraction

use crate::core::coin::FieldMapping;
use crate::core::error::FetchError;
use async_trait::async_trait;

/// One decoded element of a provider's JSON array response.
pub type RawRecord = serde_json::Value;

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Short provider name used in logs, cache keys and export file names.
    fn name(&self) -> &str;

    /// Where the six coin fields live inside this provider's records.
    fn field_mapping(&self) -> &FieldMapping;

    /// Fetches a single page (1-based). An empty list means no more data.
    async fn get_page(&self, page: u32) -> Result<Vec<RawRecord>, FetchError>;
}
