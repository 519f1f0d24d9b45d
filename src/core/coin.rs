//! Coin records and the normalization of raw provider payloads into them.

use crate::core::market::RawRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Display;

/// A fully-populated market record for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinRecord {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub market_cap_rank: u32,
    pub market_cap: f64,
    pub current_price: f64,
}

impl CoinRecord {
    /// Lowercase symbol used for comparisons and exclusion lists.
    pub fn symbol_key(&self) -> String {
        self.symbol.to_lowercase()
    }

    pub fn display_symbol(&self) -> String {
        self.symbol.to_uppercase()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoinField {
    Id,
    Symbol,
    Name,
    MarketCap,
    MarketCapRank,
    CurrentPrice,
}

impl CoinField {
    /// Fields checked after the rank, in reporting order.
    const REQUIRED: [CoinField; 5] = [
        CoinField::Id,
        CoinField::Symbol,
        CoinField::Name,
        CoinField::MarketCap,
        CoinField::CurrentPrice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CoinField::Id => "id",
            CoinField::Symbol => "symbol",
            CoinField::Name => "name",
            CoinField::MarketCap => "market_cap",
            CoinField::MarketCapRank => "market_cap_rank",
            CoinField::CurrentPrice => "current_price",
        }
    }
}

impl Display for CoinField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON pointers locating each coin field inside a provider's raw record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub market_cap: String,
    pub market_cap_rank: String,
    pub current_price: String,
}

impl FieldMapping {
    /// Flat `/coins/markets` objects.
    pub fn coingecko() -> Self {
        Self {
            id: "/id".to_string(),
            symbol: "/symbol".to_string(),
            name: "/name".to_string(),
            market_cap: "/market_cap".to_string(),
            market_cap_rank: "/market_cap_rank".to_string(),
            current_price: "/current_price".to_string(),
        }
    }

    /// `/v1/tickers` objects with USD figures nested under `quotes.USD`.
    pub fn coinpaprika() -> Self {
        Self {
            id: "/id".to_string(),
            symbol: "/symbol".to_string(),
            name: "/name".to_string(),
            market_cap: "/quotes/USD/market_cap".to_string(),
            market_cap_rank: "/rank".to_string(),
            current_price: "/quotes/USD/price".to_string(),
        }
    }

    pub fn pointer(&self, field: CoinField) -> &str {
        match field {
            CoinField::Id => &self.id,
            CoinField::Symbol => &self.symbol,
            CoinField::Name => &self.name,
            CoinField::MarketCap => &self.market_cap,
            CoinField::MarketCapRank => &self.market_cap_rank,
            CoinField::CurrentPrice => &self.current_price,
        }
    }

    /// Returns the field value, treating an explicit JSON `null` as absent.
    fn lookup<'a>(&self, raw: &'a RawRecord, field: CoinField) -> Option<&'a Value> {
        raw.pointer(self.pointer(field)).filter(|v| !v.is_null())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipKind {
    MissingRank,
    MissingFields(Vec<CoinField>),
    InvalidFields(Vec<CoinField>),
}

/// Why a raw record was dropped during normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipReason {
    pub id: Option<String>,
    pub rank: Option<String>,
    pub kind: SkipKind,
}

fn join_fields(fields: &[CoinField]) -> String {
    fields
        .iter()
        .map(CoinField::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let id = self.id.as_deref().unwrap_or("Unknown ID");
        let rank = self.rank.as_deref().unwrap_or("N/A");
        match &self.kind {
            SkipKind::MissingRank => {
                write!(f, "Skipped '{id}' due to missing/null market_cap_rank")
            }
            SkipKind::MissingFields(fields) => write!(
                f,
                "Skipped '{id}' (Rank: {rank}) due to missing/null: {}",
                join_fields(fields)
            ),
            SkipKind::InvalidFields(fields) => write!(
                f,
                "Skipped '{id}' (Rank: {rank}) due to invalid: {}",
                join_fields(fields)
            ),
        }
    }
}

fn as_text(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

/// USD amounts must be finite and non-negative.
fn as_amount(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (amount.is_finite() && amount >= 0.0).then_some(amount)
}

fn as_rank(value: &Value) -> Option<u32> {
    let rank = match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 1.0 && *f <= u32::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    u32::try_from(rank).ok().filter(|r| *r > 0)
}

fn describe(value: Option<&Value>) -> Option<String> {
    value.map(|v| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

fn normalize_one(raw: &RawRecord, mapping: &FieldMapping) -> Result<CoinRecord, SkipReason> {
    let id_value = mapping.lookup(raw, CoinField::Id);
    let rank_value = mapping.lookup(raw, CoinField::MarketCapRank);
    let skip = |kind| SkipReason {
        id: describe(id_value),
        rank: describe(rank_value),
        kind,
    };

    let Some(rank_value) = rank_value else {
        return Err(skip(SkipKind::MissingRank));
    };

    let missing: Vec<CoinField> = CoinField::REQUIRED
        .into_iter()
        .filter(|field| mapping.lookup(raw, *field).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(skip(SkipKind::MissingFields(missing)));
    }

    // Every field is present past this point.
    let text = |field| mapping.lookup(raw, field).and_then(as_text);
    let amount = |field| mapping.lookup(raw, field).and_then(as_amount);

    let id = text(CoinField::Id);
    let symbol = text(CoinField::Symbol);
    let name = text(CoinField::Name);
    let market_cap = amount(CoinField::MarketCap);
    let current_price = amount(CoinField::CurrentPrice);
    let rank = as_rank(rank_value);

    match (id, symbol, name, rank, market_cap, current_price) {
        (
            Some(id),
            Some(symbol),
            Some(name),
            Some(market_cap_rank),
            Some(market_cap),
            Some(current_price),
        ) => Ok(CoinRecord {
            id,
            symbol,
            name,
            market_cap_rank,
            market_cap,
            current_price,
        }),
        (id, symbol, name, rank, market_cap, current_price) => {
            let checks = [
                (CoinField::Id, id.is_some()),
                (CoinField::Symbol, symbol.is_some()),
                (CoinField::Name, name.is_some()),
                (CoinField::MarketCap, market_cap.is_some()),
                (CoinField::MarketCapRank, rank.is_some()),
                (CoinField::CurrentPrice, current_price.is_some()),
            ];
            let invalid = checks
                .into_iter()
                .filter(|(_, ok)| !ok)
                .map(|(field, _)| field)
                .collect();
            Err(skip(SkipKind::InvalidFields(invalid)))
        }
    }
}

/// Selects the six coin fields from each raw record, dropping whole records
/// that lack a rank or any other required field. Input order is preserved.
pub fn normalize(raw: &[RawRecord], mapping: &FieldMapping) -> (Vec<CoinRecord>, Vec<SkipReason>) {
    let mut records = Vec::with_capacity(raw.len());
    let mut skipped = Vec::new();
    for item in raw {
        match normalize_one(item, mapping) {
            Ok(record) => records.push(record),
            Err(reason) => skipped.push(reason),
        }
    }
    (records, skipped)
}
