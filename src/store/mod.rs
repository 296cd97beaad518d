//! Data stores.
//!
//! Each store is a [`FetchStore`] specialised by a [`Resource`] that names
//! the row type and any state derived from freshly fetched rows:
//! - `CurrencyConfigStore`: currency metadata, derives the ticker index
//! - `MarketDataStore`: trade-pair rows, sorted on demand for display

pub mod lifecycle;

use serde::de::DeserializeOwned;

use crate::sort;
use crate::tickers::TickerIndex;
use crate::types::{CurrencyConfigEntry, TradePairRow};

pub use lifecycle::{FetchOutcome, FetchStatus, FetchStore, StoreEvent};

/// A remotely fetched collection.
pub trait Resource: Send + Sync + 'static {
    type Row: DeserializeOwned + Clone + Send + Sync + 'static;
    /// State rebuilt from each successful payload.
    type Derived: Default + Clone + Send + Sync + 'static;

    /// Store name used in logs and events.
    const NAME: &'static str;

    /// Fold freshly fetched rows into the derived state. Runs under the
    /// same lock as the row replacement.
    fn absorb(_derived: &mut Self::Derived, _rows: &[Self::Row]) {}
}

// ---------------------------------------------------------------------------
// Currency configuration
// ---------------------------------------------------------------------------

pub struct CurrencyConfig;

impl Resource for CurrencyConfig {
    type Row = CurrencyConfigEntry;
    type Derived = TickerIndex;

    const NAME: &'static str = "currency_config";

    fn absorb(index: &mut TickerIndex, rows: &[CurrencyConfigEntry]) {
        index.build(rows);
    }
}

pub type CurrencyConfigStore = FetchStore<CurrencyConfig>;

impl FetchStore<CurrencyConfig> {
    /// Snapshot of the currency code → display metadata index.
    ///
    /// Entries accumulate across fetches; a code keeps the metadata from
    /// the first payload that mentioned it.
    pub fn ticker_index(&self) -> TickerIndex {
        self.derived()
    }
}

// ---------------------------------------------------------------------------
// Market data
// ---------------------------------------------------------------------------

pub struct MarketData;

impl Resource for MarketData {
    type Row = TradePairRow;
    type Derived = ();

    const NAME: &'static str = "market_data";
}

pub type MarketDataStore = FetchStore<MarketData>;

impl FetchStore<MarketData> {
    /// Rows ordered by `descriptor` (e.g. `price_desc`). An empty or
    /// unparseable descriptor yields server order.
    pub fn sorted(&self, descriptor: &str, tickers: &TickerIndex) -> Vec<TradePairRow> {
        let mut rows = self.rows();
        sort::sort_rows(descriptor, &mut rows, tickers);
        rows
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
