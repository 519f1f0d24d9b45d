pub mod coingecko;
pub mod coinpaprika;
pub mod feed;
pub mod http;
pub mod pager;
pub mod util;

use crate::core::config::{AppConfig, ProviderKind};
use crate::core::error::FetchError;
use crate::core::market::MarketDataProvider;
use coingecko::CoingeckoProvider;
use coinpaprika::CoinpaprikaProvider;

/// Builds the configured provider adapter.
pub fn build_provider(
    config: &AppConfig,
    kind: ProviderKind,
) -> Result<Box<dyn MarketDataProvider>, FetchError> {
    let timeout = config.fetch.timeout();
    Ok(match kind {
        ProviderKind::Coingecko => Box::new(CoingeckoProvider::with_options(
            &config.providers.coingecko.base_url,
            timeout,
            config.fetch.price_change_24h,
        )?),
        ProviderKind::Coinpaprika => Box::new(CoinpaprikaProvider::with_timeout(
            &config.providers.coinpaprika.base_url,
            config.providers.coinpaprika.limit,
            timeout,
        )?),
    })
}
