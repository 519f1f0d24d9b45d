use super::export::write_csv;
use crate::core::coin::normalize;
use crate::core::market::MarketDataProvider;
use crate::core::snapshot::{
    HISTORY_EXCLUDED, HISTORY_MAX_RANK, SnapshotRow, last_mondays, snapshot_rows,
};
use crate::providers::pager::{FetchSettings, fetch_pages};
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const HISTORY_FILE: &str = "cp_top50_last_month.csv";
pub const SNAPSHOT_COUNT: usize = 4;

/// Stays well under the free tier's 10 requests per second.
pub const REQUEST_DELAY: Duration = Duration::from_millis(200);

/// Collects one ranked ticker snapshot per date, one request each.
pub async fn collect_rows(
    provider: &dyn MarketDataProvider,
    settings: &FetchSettings,
    dates: &[NaiveDate],
    delay: Duration,
) -> Result<Vec<SnapshotRow>> {
    let excluded: BTreeSet<String> = HISTORY_EXCLUDED.iter().map(|s| s.to_lowercase()).collect();
    let single_page = FetchSettings {
        pages: 1,
        ..settings.clone()
    };

    let mut rows = Vec::new();
    for (i, day) in dates.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let fetched = fetch_pages(provider, &single_page)
            .await
            .with_context(|| format!("Failed to fetch tickers for {day}"))?;
        let (mut records, skipped) = normalize(&fetched.records, provider.field_mapping());
        debug!(date = %day, kept = records.len(), skipped = skipped.len(), "Fetched tickers");
        records.sort_by_key(|r| r.market_cap_rank);
        rows.extend(snapshot_rows(
            &records,
            *day,
            Some(HISTORY_MAX_RANK),
            &excluded,
        ));
    }
    Ok(rows)
}

pub async fn run(
    provider: &dyn MarketDataProvider,
    settings: &FetchSettings,
    today: NaiveDate,
    data_dir: &Path,
) -> Result<PathBuf> {
    let dates = last_mondays(today, SNAPSHOT_COUNT);
    let rows = collect_rows(provider, settings, &dates, REQUEST_DELAY).await?;
    if rows.is_empty() {
        bail!("No ticker rows collected from {}", provider.name());
    }

    let path = data_dir.join(HISTORY_FILE);
    write_csv(&path, &rows)?;
    info!("Wrote {} rows to {}", rows.len(), path.display());
    println!("Saved {} rows to {}", rows.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::PartialPagePolicy;
    use crate::providers::coinpaprika::CoinpaprikaProvider;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TICKERS: &str = r#"[
        {"id": "btc-bitcoin", "name": "Bitcoin", "symbol": "BTC", "rank": 1,
         "quotes": {"USD": {"price": 65000.0, "market_cap": 1280000000000}}},
        {"id": "usdt-tether", "name": "Tether", "symbol": "USDT", "rank": 3,
         "quotes": {"USD": {"price": 1.0, "market_cap": 110000000000}}},
        {"id": "eth-ethereum", "name": "Ethereum", "symbol": "ETH", "rank": 2,
         "quotes": {"USD": {"price": 3200.0, "market_cap": 385000000000}}},
        {"id": "far-away", "name": "Far", "symbol": "FAR", "rank": 51,
         "quotes": {"USD": {"price": 0.1, "market_cap": 1000}}}
    ]"#;

    fn settings() -> FetchSettings {
        FetchSettings {
            pages: 3,
            retries: 1,
            retry_delay: Duration::ZERO,
            throttle: Duration::ZERO,
            on_page_failure: PartialPagePolicy::Abort,
        }
    }

    #[tokio::test]
    async fn test_one_request_per_date() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/tickers"))
            .respond_with(ResponseTemplate::new(200).set_body_string(TICKERS))
            .expect(2)
            .mount(&mock_server)
            .await;

        let provider = CoinpaprikaProvider::new(&mock_server.uri(), 100).unwrap();
        let dates = vec![
            NaiveDate::from_ymd_opt(2026, 10, 12).unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 5).unwrap(),
        ];
        let rows = collect_rows(&provider, &settings(), &dates, Duration::ZERO)
            .await
            .unwrap();

        let symbols: Vec<&str> = rows.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTC", "ETH", "BTC", "ETH"]);
        assert_eq!(rows[0].snapshot_date, dates[0]);
        assert_eq!(rows[3].snapshot_date, dates[1]);
    }

    #[tokio::test]
    async fn test_run_writes_history_file() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/tickers"))
            .respond_with(ResponseTemplate::new(200).set_body_string(TICKERS))
            .mount(&mock_server)
            .await;

        let provider = CoinpaprikaProvider::new(&mock_server.uri(), 100).unwrap();
        let dir = tempfile::TempDir::new().unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let path = run(&provider, &settings(), today, dir.path()).await.unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        // header plus two coins for each of four Mondays
        assert_eq!(content.lines().count(), 1 + 2 * SNAPSHOT_COUNT);
        assert!(content.contains("2026-09-21,1,BTC,"));
    }
}
