pub mod cli;
pub mod core;
pub mod providers;

use crate::cli::export::ExportFormat;
use crate::core::allocation::{BasketParams, parse_symbol_list};
use crate::core::cache::Cache;
use crate::core::config::{AppConfig, ProviderKind};
use crate::providers::feed::MarketFeed;
use crate::providers::pager::FetchSettings;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

/// Options shared by commands that fetch market data.
#[derive(Debug, Clone, Default)]
pub struct FetchOverrides {
    pub provider: Option<ProviderKind>,
    pub pages: Option<u32>,
}

/// Command-line overrides for the configured allocation inputs.
#[derive(Debug, Clone, Default)]
pub struct AllocOptions {
    pub fetch: FetchOverrides,
    pub portfolio_usd: Option<f64>,
    pub btc_weight_pct: Option<f64>,
    pub basket_weight_pct: Option<f64>,
    pub top_n: Option<usize>,
    /// Comma-separated symbols; replaces the configured list.
    pub exclude: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AppCommand {
    Alloc(AllocOptions),
    Export {
        fetch: FetchOverrides,
        format: ExportFormat,
    },
    History,
}

fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

fn apply_fetch_overrides(config: &mut AppConfig, fetch: &FetchOverrides) {
    if let Some(provider) = fetch.provider {
        config.provider = provider;
    }
    if let Some(pages) = fetch.pages {
        config.fetch.pages = pages;
    }
}

fn apply_alloc_overrides(config: &mut AppConfig, options: &AllocOptions) {
    apply_fetch_overrides(config, &options.fetch);
    let alloc = &mut config.allocation;
    if let Some(v) = options.portfolio_usd {
        alloc.portfolio_usd = v;
    }
    if let Some(v) = options.btc_weight_pct {
        alloc.btc_weight_pct = v;
    }
    if let Some(v) = options.basket_weight_pct {
        alloc.basket_weight_pct = v;
    }
    if let Some(v) = options.top_n {
        alloc.top_n = v;
    }
    if let Some(list) = &options.exclude {
        alloc.excluded = parse_symbol_list(list).into_iter().collect();
    }
}

fn market_feed(config: &AppConfig) -> Result<MarketFeed> {
    let provider = providers::build_provider(config, config.provider)?;
    let cache = Arc::new(Cache::new(config.fetch.cache_ttl()));
    Ok(MarketFeed::new(
        provider,
        FetchSettings::from(&config.fetch),
        cache,
    ))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("altbasket starting...");
    let mut config = load_config(config_path)?;

    match command {
        AppCommand::Alloc(options) => {
            apply_alloc_overrides(&mut config, &options);
            config.validate()?;
            let alloc = &config.allocation;
            let params = BasketParams::altcoins(
                &alloc.excluded,
                alloc.top_n,
                alloc.portfolio_usd,
                alloc.btc_weight_pct,
                alloc.basket_weight_pct,
            );
            let feed = market_feed(&config)?;
            cli::alloc::run(&feed, &params).await?;
        }
        AppCommand::Export { fetch, format } => {
            apply_fetch_overrides(&mut config, &fetch);
            config.validate()?;
            let feed = market_feed(&config)?;
            cli::export::run(&feed, format, &config.data_dir()).await?;
        }
        AppCommand::History => {
            config.validate()?;
            let provider = providers::build_provider(&config, ProviderKind::Coinpaprika)?;
            let today = chrono::Utc::now().date_naive();
            cli::history::run(
                provider.as_ref(),
                &FetchSettings::from(&config.fetch),
                today,
                &config.data_dir(),
            )
            .await?;
        }
    }
    Ok(())
}
