//! Market-cap weighted basket calculation.
use crate::core::coin::CoinRecord;
use crate::core::error::EmptyBasketReason;
use std::collections::BTreeSet;
use tracing::debug;

/// Inputs for one basket calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct BasketParams {
    pub excluded_symbols: BTreeSet<String>,
    pub top_n: usize,
    pub portfolio_usd: f64,
    pub btc_weight_pct: f64,
    pub basket_weight_pct: f64,
}

impl BasketParams {
    /// Parameters for the altcoin-only basket. `btc` is always excluded since
    /// its target is sized separately.
    pub fn altcoins<I, S>(
        excluded: I,
        top_n: usize,
        portfolio_usd: f64,
        btc_weight_pct: f64,
        basket_weight_pct: f64,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut excluded_symbols: BTreeSet<String> = excluded
            .into_iter()
            .map(|s| s.as_ref().trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        excluded_symbols.insert("btc".to_string());
        Self {
            excluded_symbols,
            top_n,
            portfolio_usd,
            btc_weight_pct,
            basket_weight_pct,
        }
    }

    pub fn targets(&self) -> PortfolioTargets {
        PortfolioTargets::new(
            self.portfolio_usd,
            self.btc_weight_pct,
            self.basket_weight_pct,
        )
    }
}

/// Direct percentage targets of the total portfolio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortfolioTargets {
    pub btc_usd: f64,
    pub basket_usd: f64,
}

impl PortfolioTargets {
    pub fn new(portfolio_usd: f64, btc_weight_pct: f64, basket_weight_pct: f64) -> Self {
        Self {
            btc_usd: portfolio_usd * btc_weight_pct / 100.0,
            basket_usd: portfolio_usd * basket_weight_pct / 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationRow {
    pub basket_rank: usize,
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub market_cap_rank: u32,
    pub current_price: f64,
    pub market_cap: f64,
    pub weight_pct: f64,
    pub target_usd: f64,
}

impl AllocationRow {
    pub fn display_symbol(&self) -> String {
        self.symbol.to_uppercase()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasketResult {
    pub rows: Vec<AllocationRow>,
    pub total_market_cap: f64,
    pub targets: PortfolioTargets,
    /// Rows dropped because a numeric field was unusable.
    pub invalid_rows: usize,
}

fn is_usable(record: &CoinRecord) -> bool {
    record.market_cap.is_finite()
        && record.market_cap >= 0.0
        && record.current_price.is_finite()
        && record.current_price >= 0.0
        && record.market_cap_rank > 0
}

/// Records ordered by ascending rank; equal ranks keep their input order.
pub fn rank_sorted(records: &[CoinRecord]) -> Vec<CoinRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by_key(|r| r.market_cap_rank);
    sorted
}

/// How many fetched coins to show for reference next to a basket of `top_n`.
pub fn reference_len(top_n: usize, available: usize) -> usize {
    (top_n + 20).max(50).min(available)
}

/// Parses a comma-separated symbol list into trimmed lowercase entries.
pub fn parse_symbol_list(input: &str) -> BTreeSet<String> {
    input
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn compute_basket(
    records: &[CoinRecord],
    params: &BasketParams,
) -> Result<BasketResult, EmptyBasketReason> {
    let (usable, unusable): (Vec<CoinRecord>, Vec<CoinRecord>) =
        records.iter().cloned().partition(is_usable);
    if !unusable.is_empty() {
        debug!(count = unusable.len(), "Dropped rows with unusable numbers");
    }

    let basket: Vec<CoinRecord> = rank_sorted(&usable)
        .into_iter()
        .filter(|r| !params.excluded_symbols.contains(&r.symbol_key()))
        .take(params.top_n)
        .collect();

    if basket.is_empty() {
        return Err(EmptyBasketReason::NoCandidates {
            top_n: params.top_n,
        });
    }

    let total_market_cap: f64 = basket.iter().map(|r| r.market_cap).sum();
    if total_market_cap <= 0.0 {
        return Err(EmptyBasketReason::ZeroMarketCap);
    }

    let targets = params.targets();
    let rows = basket
        .into_iter()
        .enumerate()
        .map(|(i, r)| {
            let weight_pct = 100.0 * r.market_cap / total_market_cap;
            AllocationRow {
                basket_rank: i + 1,
                target_usd: weight_pct / 100.0 * targets.basket_usd,
                weight_pct,
                id: r.id,
                symbol: r.symbol,
                name: r.name,
                market_cap_rank: r.market_cap_rank,
                current_price: r.current_price,
                market_cap: r.market_cap,
            }
        })
        .collect();

    Ok(BasketResult {
        rows,
        total_market_cap,
        targets,
        invalid_rows: unusable.len(),
    })
}
