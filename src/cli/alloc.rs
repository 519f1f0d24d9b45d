use super::ui;
use crate::core::allocation::{
    BasketParams, BasketResult, PortfolioTargets, compute_basket, rank_sorted, reference_len,
};
use crate::core::coin::CoinRecord;
use crate::core::error::EmptyBasketReason;
use crate::providers::feed::{MarketFeed, MarketSnapshot};
use anyhow::{Context, Result};

/// Everything the allocation view displays, computed from one snapshot.
#[derive(Debug, Clone)]
pub struct AllocationReport {
    pub params: BasketParams,
    pub targets: PortfolioTargets,
    pub basket: Result<BasketResult, EmptyBasketReason>,
    /// Top fetched coins before any exclusion, by rank.
    pub reference: Vec<CoinRecord>,
    pub skipped: usize,
    pub partial_failure: Option<String>,
}

pub fn build_report(snapshot: &MarketSnapshot, params: &BasketParams) -> AllocationReport {
    let sorted = rank_sorted(&snapshot.records);
    let reference_count = reference_len(params.top_n, sorted.len());
    AllocationReport {
        params: params.clone(),
        targets: params.targets(),
        basket: compute_basket(&snapshot.records, params),
        reference: sorted.into_iter().take(reference_count).collect(),
        skipped: snapshot.skipped.len(),
        partial_failure: snapshot.partial_failure.clone(),
    }
}

pub async fn run(feed: &MarketFeed, params: &BasketParams) -> Result<AllocationReport> {
    let pb = ui::new_spinner(&format!(
        "Fetching market data from {}...",
        feed.provider_name()
    ));
    let snapshot = feed.snapshot().await;
    pb.finish_and_clear();
    let snapshot =
        snapshot.context("Could not proceed with calculation due to data fetching issues")?;

    let report = build_report(&snapshot, params);
    display_report(&report);
    Ok(report)
}

fn display_report(report: &AllocationReport) {
    if let Some(failure) = &report.partial_failure {
        println!(
            "{}",
            ui::style_text(
                &format!("Using partial market data: {failure}"),
                ui::StyleType::Warning
            )
        );
    }

    println!(
        "\n{}\n",
        ui::style_text("Target Allocation Summary", ui::StyleType::Title)
    );
    println!(
        "{} {}%: {}",
        ui::style_text("BTC Target Weight", ui::StyleType::TotalLabel),
        report.params.btc_weight_pct,
        ui::usd_target_text(report.targets.btc_usd)
    );
    println!(
        "{} {}%: {}",
        ui::style_text("Altcoin Basket Target Weight", ui::StyleType::TotalLabel),
        report.params.basket_weight_pct,
        ui::usd_target_text(report.targets.basket_usd)
    );

    match &report.basket {
        Ok(basket) => display_basket_table(basket),
        Err(reason) => {
            println!(
                "\n{}",
                ui::style_text(&format!("Warning: {reason}"), ui::StyleType::Warning)
            );
        }
    }

    display_reference_table(&report.reference);

    if report.skipped > 0 {
        println!(
            "\n{}",
            ui::style_text(
                &format!(
                    "Skipped {} coins due to missing data (e.g., null market cap rank)",
                    report.skipped
                ),
                ui::StyleType::Subtle
            )
        );
    }
    ui::print_separator();
}

fn display_basket_table(basket: &BasketResult) {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Basket Rank"),
        ui::header_cell("Symbol"),
        ui::header_cell("Name"),
        ui::header_cell("Overall Rank"),
        ui::header_cell("Price (USD)"),
        ui::header_cell("Market Cap (USD)"),
        ui::header_cell("Weight within Basket"),
        ui::header_cell("Target Allocation (USD)"),
    ]);

    for row in &basket.rows {
        table.add_row(vec![
            ui::right_cell(row.basket_rank.to_string()),
            comfy_table::Cell::new(row.display_symbol()),
            comfy_table::Cell::new(&row.name),
            ui::right_cell(row.market_cap_rank.to_string()),
            ui::right_cell(ui::format_amount(row.current_price, 4)),
            ui::right_cell(ui::format_amount(row.market_cap, 0)),
            ui::format_percentage_cell(row.weight_pct),
            ui::right_cell(ui::format_amount(row.target_usd.trunc(), 0)),
        ]);
    }

    println!(
        "\n{}\n",
        ui::style_text(
            &format!("Calculated Altcoin Basket (Top {} Filtered)", basket.rows.len()),
            ui::StyleType::Title
        )
    );
    println!("{table}");
    println!(
        "\n{} {} USD",
        ui::style_text(
            "Total Market Cap of Displayed Altcoin Basket:",
            ui::StyleType::TotalLabel
        ),
        ui::style_text(
            &ui::format_amount(basket.total_market_cap, 0),
            ui::StyleType::TotalValue
        )
    );
    if basket.invalid_rows > 0 {
        println!(
            "{}",
            ui::style_text(
                &format!(
                    "Removed {} rows with unusable numeric data",
                    basket.invalid_rows
                ),
                ui::StyleType::Subtle
            )
        );
    }
}

fn display_reference_table(reference: &[CoinRecord]) {
    if reference.is_empty() {
        return;
    }
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Overall Rank"),
        ui::header_cell("Symbol"),
        ui::header_cell("Name"),
        ui::header_cell("Price (USD)"),
        ui::header_cell("Market Cap (USD)"),
    ]);
    for coin in reference {
        table.add_row(vec![
            ui::right_cell(coin.market_cap_rank.to_string()),
            comfy_table::Cell::new(coin.display_symbol()),
            comfy_table::Cell::new(&coin.name),
            ui::right_cell(ui::format_amount(coin.current_price, 4)),
            ui::right_cell(ui::format_amount(coin.market_cap, 0)),
        ]);
    }
    println!(
        "\n{}\n",
        ui::style_text(
            &format!(
                "Reference: Top {} Fetched Coins (Before Filtering)",
                reference.len()
            ),
            ui::StyleType::Title
        )
    );
    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(symbol: &str, rank: u32, market_cap: f64) -> CoinRecord {
        CoinRecord {
            id: symbol.to_string(),
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            market_cap_rank: rank,
            market_cap,
            current_price: 1.0,
        }
    }

    fn snapshot(records: Vec<CoinRecord>) -> MarketSnapshot {
        MarketSnapshot {
            provider: "test".to_string(),
            records,
            skipped: Vec::new(),
            pages_fetched: 1,
            partial_failure: None,
        }
    }

    #[test]
    fn test_report_excludes_btc_from_basket_but_not_reference() {
        let snap = snapshot(vec![
            coin("eth", 2, 400.0),
            coin("btc", 1, 1000.0),
            coin("sol", 3, 100.0),
        ]);
        let params = BasketParams::altcoins(["usdt"], 10, 100_000.0, 150.0, 25.0);
        let report = build_report(&snap, &params);

        let basket = report.basket.unwrap();
        assert_eq!(basket.rows.len(), 2);
        assert!((basket.rows[0].weight_pct - 80.0).abs() < 1e-9);
        assert_eq!(report.reference[0].symbol, "btc");
        assert_eq!(report.reference.len(), 3);
        assert_eq!(report.targets.btc_usd, 150_000.0);
        assert_eq!(report.targets.basket_usd, 25_000.0);
    }

    #[test]
    fn test_report_keeps_targets_for_empty_basket() {
        let snap = snapshot(vec![coin("btc", 1, 1000.0)]);
        let params = BasketParams::altcoins(Vec::<String>::new(), 10, 1000.0, 100.0, 50.0);
        let report = build_report(&snap, &params);
        assert_eq!(
            report.basket.unwrap_err(),
            EmptyBasketReason::NoCandidates { top_n: 10 }
        );
        assert_eq!(report.targets.btc_usd, 1000.0);
        // Rendering an empty basket must not panic
        display_report(&build_report(&snap, &params));
    }
}
