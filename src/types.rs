//! Shared types for the TICKERBOARD data layer.
//!
//! Wire models for the two remote collections (currency configuration and
//! trading pairs) plus the fetch error taxonomy. Numeric market fields are
//! kept as the decimal strings the server sent; they are only parsed when a
//! row is sorted or displayed.
//!
//! Decoding is lenient: a `null`, a number where a string was expected or a
//! wrongly typed nested object degrades to an empty/absent value instead of
//! failing the whole payload.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

// ---------------------------------------------------------------------------
// Currency configuration
// ---------------------------------------------------------------------------

/// One entry of the currency-configuration endpoint.
///
/// Every field may be missing or malformed; such an entry still decodes and
/// shows up as "absent" downstream. A missing `code` decodes as `""`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrencyConfigEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub code: String,
    #[serde(default, deserialize_with = "lenient_int")]
    pub sort_order: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub ticker: Option<String>,
    /// "crypto" | "fiat" on the wire (field name `type`).
    #[serde(default, rename = "type", deserialize_with = "lenient_opt_string")]
    pub kind: Option<String>,
    #[serde(default, rename = "decimals_places", deserialize_with = "lenient_int")]
    pub decimal_places: Option<u32>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub icon: Option<String>,
}

impl fmt::Display for CurrencyConfigEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {} dp)",
            self.code,
            self.ticker.as_deref().unwrap_or("?"),
            self.decimal_places
                .map(|d| d.to_string())
                .unwrap_or_else(|| "?".to_string()),
        )
    }
}

/// Display metadata for a currency code, as stored in the ticker index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerInfo {
    pub ticker: Option<String>,
    pub icon: Option<String>,
    pub fraction_digits: Option<u32>,
}

impl From<&CurrencyConfigEntry> for TickerInfo {
    fn from(entry: &CurrencyConfigEntry) -> Self {
        Self {
            ticker: entry.ticker.clone(),
            icon: entry.icon.clone(),
            fraction_digits: entry.decimal_places,
        }
    }
}

// ---------------------------------------------------------------------------
// Trading pairs
// ---------------------------------------------------------------------------

/// One row of the market-data endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradePairRow {
    #[serde(default, deserialize_with = "lenient")]
    pub pair: Pair,
    #[serde(default, deserialize_with = "lenient")]
    pub price: Price,
    #[serde(default, deserialize_with = "lenient")]
    pub volume: Volume,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub price_history: Vec<String>,
}

impl TradePairRow {
    /// Symbol in `PRIMARY/SECONDARY` form.
    pub fn symbol(&self) -> String {
        format!("{}/{}", self.pair.primary, self.pair.secondary)
    }
}

impl fmt::Display for TradePairRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} last={} change={}{} vol={}",
            self.symbol(),
            self.price.last,
            self.price.change.direction.arrow(),
            self.price.change.amount,
            self.volume.secondary,
        )
    }
}

/// Currency pair; `primary` is the key into the ticker index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pair {
    #[serde(default, deserialize_with = "lenient_string")]
    pub primary: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub secondary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    #[serde(default, deserialize_with = "lenient_string")]
    pub last: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub best_bid: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub best_offer: String,
    #[serde(default, deserialize_with = "lenient")]
    pub change: PriceChange,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceChange {
    #[serde(default, deserialize_with = "lenient")]
    pub direction: PriceDirection,
    #[serde(default, deserialize_with = "lenient_string")]
    pub percent: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub amount: String,
}

/// Direction flag sent alongside a price change.
///
/// Purely informational: sorting uses the signed amount, never this flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceDirection {
    Up,
    Down,
    #[default]
    #[serde(other)]
    Unknown,
}

impl PriceDirection {
    pub fn arrow(&self) -> &'static str {
        match self {
            PriceDirection::Up => "▲",
            PriceDirection::Down => "▼",
            PriceDirection::Unknown => "",
        }
    }
}

impl fmt::Display for PriceDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceDirection::Up => write!(f, "Up"),
            PriceDirection::Down => write!(f, "Down"),
            PriceDirection::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    #[serde(default, deserialize_with = "lenient_string")]
    pub primary: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub secondary: String,
}

// ---------------------------------------------------------------------------
// Lenient decoding
// ---------------------------------------------------------------------------

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Strings and numbers as text; anything else as `""`.
fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(scalar_to_string(Value::deserialize(d)?).unwrap_or_default())
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(scalar_to_string(Value::deserialize(d)?))
}

/// Integers or integer strings that fit `T`; anything else as `None`.
fn lenient_int<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    let n = match Value::deserialize(d)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    Ok(n.and_then(|n| T::try_from(n).ok()))
}

/// Elements that are scalars become strings; a non-array becomes empty.
fn lenient_strings<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items
            .into_iter()
            .map(|v| scalar_to_string(v).unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    })
}

/// Nested object that falls back to its default when it does not decode.
fn lenient<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(T::deserialize(Value::deserialize(d)?).unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why a fetch did not produce rows.
///
/// `Canceled` is the only variant that is not a user-visible failure: it
/// means the request was superseded or explicitly aborted.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request canceled")]
    Canceled,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(String),
}

impl FetchError {
    pub fn is_canceled(&self) -> bool {
        matches!(self, FetchError::Canceled)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
