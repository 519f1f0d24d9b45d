use crate::core::coin::CoinRecord;
use crate::core::snapshot::{SnapshotRow, json_file_name, snapshot_rows};
use crate::providers::feed::MarketFeed;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

/// Writes records as a pretty JSON array into `dir`, named after the
/// provider and the UTC time of the export.
pub fn write_json(
    dir: &Path,
    provider: &str,
    records: &[CoinRecord],
    at: DateTime<Utc>,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    let path = dir.join(json_file_name(provider, at));
    let body = serde_json::to_string_pretty(records).context("Failed to serialize records")?;
    fs::write(&path, body)
        .with_context(|| format!("Failed to write export file: {}", path.display()))?;
    Ok(path)
}

/// Writes snapshot rows with a header line to `path`, creating parent dirs.
pub fn write_csv(path: &Path, rows: &[SnapshotRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write CSV row to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush CSV file: {}", path.display()))?;
    Ok(())
}

pub async fn run(feed: &MarketFeed, format: ExportFormat, data_dir: &Path) -> Result<PathBuf> {
    let snapshot = feed
        .snapshot()
        .await
        .context("Failed to fetch market data for export")?;
    let now = Utc::now();

    let path = match format {
        ExportFormat::Json => write_json(data_dir, &snapshot.provider, &snapshot.records, now)?,
        ExportFormat::Csv => {
            let mut records = snapshot.records.clone();
            records.sort_by_key(|r| r.market_cap_rank);
            let rows = snapshot_rows(&records, now.date_naive(), None, &BTreeSet::new());
            let path = data_dir.join(format!(
                "{}_{}.csv",
                snapshot.provider,
                now.format("%Y%m%d_%H%M%S")
            ));
            write_csv(&path, &rows)?;
            path
        }
    };

    info!("Saved {} records to {}", snapshot.records.len(), path.display());
    println!("Saved {} records to {}", snapshot.records.len(), path.display());
    Ok(path)
}
