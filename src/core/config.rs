use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const MAX_WEIGHT_PCT: f64 = 300.0;
pub const MAX_TOP_N: usize = 450;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Coingecko,
    Coinpaprika,
}

/// What to do with pages already fetched when a later page keeps failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialPagePolicy {
    #[default]
    Abort,
    ReturnPartial,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CoingeckoProviderConfig {
    pub base_url: String,
}

impl Default for CoingeckoProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coingecko.com/api/v3".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CoinpaprikaProviderConfig {
    pub base_url: String,
    #[serde(default = "default_paprika_limit")]
    pub limit: u32,
}

fn default_paprika_limit() -> u32 {
    100
}

impl Default for CoinpaprikaProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coinpaprika.com".to_string(),
            limit: default_paprika_limit(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct ProvidersConfig {
    pub coingecko: CoingeckoProviderConfig,
    pub coinpaprika: CoinpaprikaProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct FetchConfig {
    pub pages: u32,
    pub retries: usize,
    pub retry_delay_secs: u64,
    pub throttle_ms: u64,
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub on_page_failure: PartialPagePolicy,
    pub price_change_24h: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            pages: 3,
            retries: 3,
            retry_delay_secs: 5,
            throttle_ms: 500,
            timeout_secs: 15,
            cache_ttl_secs: 600,
            on_page_failure: PartialPagePolicy::Abort,
            price_change_24h: true,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AllocationConfig {
    pub portfolio_usd: f64,
    pub btc_weight_pct: f64,
    pub basket_weight_pct: f64,
    pub top_n: usize,
    pub excluded: Vec<String>,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            portfolio_usd: 100_000.0,
            btc_weight_pct: 150.0,
            basket_weight_pct: 50.0,
            top_n: 10,
            excluded: [
                "usdt", "usdc", "dai", "tusd", "busd", "fdusd", "usdp", "pyusd", "usdd", "frax",
                "wbtc", "steth", "wsteth", "weth", "usds", "weeth",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderKind,
    pub providers: ProvidersConfig,
    pub fetch: FetchConfig,
    pub allocation: AllocationConfig,
    pub data_path: Option<String>,
}

impl AppConfig {
    /// Loads the config at the default location, or built-in defaults when
    /// no file has been set up yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "altbasket", "altbasket")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    /// Directory for exported snapshots, `data` under the working directory
    /// unless configured.
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(self.data_path.as_deref().unwrap_or("data"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Checks the bounds the allocation inputs are allowed to take.
    pub fn validate(&self) -> Result<()> {
        let alloc = &self.allocation;
        if !alloc.portfolio_usd.is_finite() || alloc.portfolio_usd < 0.0 {
            bail!(
                "Portfolio value must be a non-negative amount, got {}",
                alloc.portfolio_usd
            );
        }
        for (label, pct) in [
            ("BTC target weight", alloc.btc_weight_pct),
            ("Basket target weight", alloc.basket_weight_pct),
        ] {
            if !(0.0..=MAX_WEIGHT_PCT).contains(&pct) {
                bail!("{label} must be between 0 and {MAX_WEIGHT_PCT}%, got {pct}%");
            }
        }
        if !(1..=MAX_TOP_N).contains(&alloc.top_n) {
            bail!(
                "Number of top altcoins must be between 1 and {MAX_TOP_N}, got {}",
                alloc.top_n
            );
        }
        if self.fetch.pages == 0 {
            bail!("At least one page must be fetched");
        }
        if self.fetch.retries == 0 {
            bail!("Retry count must be at least 1");
        }
        Ok(())
    }
}
