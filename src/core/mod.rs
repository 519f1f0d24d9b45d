//! Core market-data types and calculations

pub mod allocation;
pub mod cache;
pub mod coin;
pub mod config;
pub mod error;
pub mod log;
pub mod market;
pub mod snapshot;

// Re-export main types for cleaner imports
pub use coin::{CoinRecord, FieldMapping, SkipReason, normalize};
pub use error::{AcquireError, EmptyBasketReason, FetchError};
pub use market::{MarketDataProvider, RawRecord};
