//! Display helpers for the CLI snapshot.
//!
//! Wire values stay strings everywhere else; this is the only place they are
//! turned into exact decimals, rounded to the ticker's fraction digits.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::tickers::TickerIndex;
use crate::types::TradePairRow;

/// Fraction digits used when a currency has no configured precision.
pub const DEFAULT_FRACTION_DIGITS: u32 = 2;

/// Largest scale `Decimal` can represent.
const MAX_FRACTION_DIGITS: u32 = 28;

const PLACEHOLDER: &str = "-";

/// Parse a wire decimal string. Surrounding whitespace is ignored.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.trim()).ok()
}

/// Round `raw` half-away-from-zero to `fraction_digits` and render it with
/// exactly that many digits. `None` when `raw` is not a decimal.
pub fn format_decimal(raw: &str, fraction_digits: u32) -> Option<String> {
    let digits = fraction_digits.min(MAX_FRACTION_DIGITS);
    let mut rounded =
        parse_decimal(raw)?.round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }
    Some(format!("{:.*}", digits as usize, rounded))
}

/// Plain-text table of `rows` in the order given. `limit == 0` prints all.
pub fn render_table(rows: &[TradePairRow], tickers: &TickerIndex, limit: usize) -> String {
    let take = if limit == 0 { rows.len() } else { limit.min(rows.len()) };

    let mut lines = Vec::with_capacity(take + 1);
    lines.push(format!(
        "{:<14} {:>16} {:>12} {:>20}",
        "PAIR", "LAST", "CHANGE", "VOLUME"
    ));

    for row in &rows[..take] {
        let primary = &row.pair.primary;
        let secondary = &row.pair.secondary;
        let price_digits = tickers
            .fraction_digits(primary)
            .unwrap_or(DEFAULT_FRACTION_DIGITS);
        let volume_digits = tickers
            .fraction_digits(secondary)
            .unwrap_or(DEFAULT_FRACTION_DIGITS);

        let name = format!(
            "{}/{}",
            tickers.ticker_for(primary),
            tickers.ticker_for(secondary)
        );
        let last = format_decimal(&row.price.last, price_digits)
            .unwrap_or_else(|| PLACEHOLDER.to_string());
        let change = format_decimal(&row.price.change.percent, 2)
            .map(|pct| format!("{}{pct}%", row.price.change.direction.arrow()))
            .unwrap_or_else(|| PLACEHOLDER.to_string());
        let volume = format_decimal(&row.volume.secondary, volume_digits)
            .unwrap_or_else(|| PLACEHOLDER.to_string());

        lines.push(format!("{name:<14} {last:>16} {change:>12} {volume:>20}"));
    }

    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
