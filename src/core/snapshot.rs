//! Flat export shapes for fetched market data.

use crate::core::coin::CoinRecord;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

/// One CSV row of a dated market snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotRow {
    pub snapshot_date: NaiveDate,
    pub rank: u32,
    pub symbol: String,
    pub price_usd: f64,
    pub market_cap_usd: f64,
}

/// Stablecoins left out of the weekly history export.
pub const HISTORY_EXCLUDED: [&str; 5] = ["USDT", "USDC", "DAI", "TUSD", "FDUSD"];
pub const HISTORY_MAX_RANK: u32 = 50;

/// The `count` most recent Mondays, newest first. `today` counts if it is one.
pub fn last_mondays(today: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let back = i64::from(today.weekday().num_days_from_monday());
    let latest = today - Duration::days(back);
    (0..count)
        .map(|i| latest - Duration::weeks(i as i64))
        .collect()
}

/// Rows for records ranked `max_rank` or better, skipping excluded symbols.
///
/// Records must already be in rank order; the first record past `max_rank`
/// ends the scan.
pub fn snapshot_rows(
    records: &[CoinRecord],
    snapshot_date: NaiveDate,
    max_rank: Option<u32>,
    excluded: &BTreeSet<String>,
) -> Vec<SnapshotRow> {
    records
        .iter()
        .take_while(|r| max_rank.is_none_or(|max| r.market_cap_rank <= max))
        .filter(|r| !excluded.contains(&r.symbol_key()))
        .map(|r| SnapshotRow {
            snapshot_date,
            rank: r.market_cap_rank,
            symbol: r.symbol.clone(),
            price_usd: r.current_price,
            market_cap_usd: r.market_cap,
        })
        .collect()
}

/// `<provider>_<YYYYMMDD_HHMMSS>.json`, timestamp in UTC.
pub fn json_file_name(provider: &str, at: DateTime<Utc>) -> String {
    format!("{provider}_{}.json", at.format("%Y%m%d_%H%M%S"))
}
