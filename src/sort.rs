//! Row sort engine.
//!
//! Maps a `"{column}_{direction}"` descriptor to a key extractor and a
//! comparator, then reorders trade-pair rows in place. The sort is stable
//! and never fails: an unknown descriptor leaves the rows alone and
//! malformed numbers compare equal to everything, so those rows keep their
//! relative position.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::tickers::TickerIndex;
use crate::types::TradePairRow;

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// Sortable table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortColumn {
    Name,
    Price,
    PriceChange,
    Volume,
}

impl SortColumn {
    pub const ALL: &'static [SortColumn] = &[
        SortColumn::Name,
        SortColumn::Price,
        SortColumn::PriceChange,
        SortColumn::Volume,
    ];

    /// Token used in descriptors.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortColumn::Name => "name",
            SortColumn::Price => "price",
            SortColumn::PriceChange => "priceChange",
            SortColumn::Volume => "volume",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    /// Orient an ascending comparison. `Equal` stays `Equal`.
    fn orient(&self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

/// A parsed sort request, e.g. `price_desc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortDescriptor {
    pub column: SortColumn,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseSortError {
    #[error("empty sort descriptor")]
    Empty,
    #[error("unknown sort column: {0}")]
    UnknownColumn(String),
    #[error("unknown sort direction: {0}")]
    UnknownDirection(String),
    #[error("malformed sort descriptor: {0}")]
    Malformed(String),
}

impl SortDescriptor {
    pub fn new(column: SortColumn, direction: SortDirection) -> Self {
        Self { column, direction }
    }

    /// Stable in-place sort of `rows` by this descriptor.
    pub fn apply(&self, rows: &mut [TradePairRow], tickers: &TickerIndex) {
        if rows.len() < 2 {
            return;
        }

        let order = match self.column {
            SortColumn::Name => {
                let keys: Vec<String> = rows.iter().map(|r| name_key(r, tickers)).collect();
                stable_order(&keys, |a, b| self.direction.orient(a.cmp(b)))
            }
            SortColumn::Price => {
                let keys: Vec<f64> = rows.iter().map(|r| parse_number(&r.price.last)).collect();
                stable_order(&keys, |a, b| self.direction.orient(compare_numbers(*a, *b)))
            }
            SortColumn::PriceChange => {
                let keys: Vec<f64> = rows
                    .iter()
                    .map(|r| parse_number(&r.price.change.amount))
                    .collect();
                stable_order(&keys, |a, b| self.direction.orient(compare_numbers(*a, *b)))
            }
            SortColumn::Volume => {
                let keys: Vec<f64> = rows
                    .iter()
                    .map(|r| parse_number(&r.volume.secondary))
                    .collect();
                stable_order(&keys, |a, b| self.direction.orient(compare_numbers(*a, *b)))
            }
        };

        apply_permutation(rows, &order);
    }
}

impl FromStr for SortDescriptor {
    type Err = ParseSortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseSortError::Empty);
        }
        let (column, direction) = s
            .rsplit_once('_')
            .ok_or_else(|| ParseSortError::Malformed(s.to_string()))?;

        let column = SortColumn::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == column)
            .ok_or_else(|| ParseSortError::UnknownColumn(column.to_string()))?;

        let direction = match direction {
            "asc" => SortDirection::Asc,
            "desc" => SortDirection::Desc,
            other => return Err(ParseSortError::UnknownDirection(other.to_string())),
        };

        Ok(Self { column, direction })
    }
}

impl fmt::Display for SortDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.column.as_str(), self.direction.as_str())
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Sort `rows` in place according to the descriptor token.
///
/// An empty or unrecognised token is a no-op.
pub fn sort_rows(descriptor: &str, rows: &mut [TradePairRow], tickers: &TickerIndex) {
    match descriptor.parse::<SortDescriptor>() {
        Ok(parsed) => parsed.apply(rows, tickers),
        Err(ParseSortError::Empty) => {}
        Err(e) => debug!(descriptor, error = %e, "Ignoring unrecognised sort descriptor"),
    }
}

// ---------------------------------------------------------------------------
// Keys and comparison
// ---------------------------------------------------------------------------

/// Lower-cased display ticker, falling back to the primary code.
fn name_key(row: &TradePairRow, tickers: &TickerIndex) -> String {
    tickers.ticker_for(&row.pair.primary).to_lowercase()
}

/// Parse the longest numeric prefix of a transport decimal string.
///
/// Leading whitespace is skipped and trailing garbage ignored, so
/// `"12.5 USD"` is 12.5 and `"1,000"` is 1. Only `Infinity` spells an
/// infinity; `inf`, `nan` and strings without leading digits are NaN.
fn parse_number(raw: &str) -> f64 {
    let s = raw.trim_start();
    let bytes = s.as_bytes();

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    if s[end..].starts_with("Infinity") {
        return if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;
    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        end += 1 + frac_digits;
    }
    if int_digits + frac_digits == 0 {
        return f64::NAN;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(&bytes[exp_end..]);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    s[..end].parse::<f64>().unwrap_or(f64::NAN)
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// `a < b → Less`, `a > b → Greater`, otherwise `Equal` (NaN included).
fn compare_numbers(a: f64, b: f64) -> Ordering {
    if a < b {
        Ordering::Less
    } else if a > b {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

/// Stable bottom-up merge sort over key indices.
///
/// The comparator does not need to be a total order (NaN compares equal to
/// everything); the merge only moves a right-hand element ahead of a
/// left-hand one when it is strictly less, so equal runs keep their order.
fn stable_order<K>(keys: &[K], cmp: impl Fn(&K, &K) -> Ordering) -> Vec<usize> {
    let n = keys.len();
    let mut order: Vec<usize> = (0..n).collect();
    let mut buf = vec![0usize; n];
    let mut width = 1;

    while width < n {
        let mut start = 0;
        while start < n {
            let mid = (start + width).min(n);
            let end = (start + 2 * width).min(n);
            let (mut i, mut j, mut k) = (start, mid, start);

            while i < mid && j < end {
                if cmp(&keys[order[j]], &keys[order[i]]) == Ordering::Less {
                    buf[k] = order[j];
                    j += 1;
                } else {
                    buf[k] = order[i];
                    i += 1;
                }
                k += 1;
            }
            buf[k..k + (mid - i)].copy_from_slice(&order[i..mid]);
            k += mid - i;
            buf[k..k + (end - j)].copy_from_slice(&order[j..end]);

            start = end;
        }
        std::mem::swap(&mut order, &mut buf);
        width *= 2;
    }

    order
}

/// Reorder `rows` so that `rows[p]` becomes the old `rows[order[p]]`.
fn apply_permutation<T>(rows: &mut [T], order: &[usize]) {
    let mut placed = vec![false; rows.len()];
    for start in 0..rows.len() {
        if placed[start] {
            continue;
        }
        let mut current = start;
        loop {
            placed[current] = true;
            let source = order[current];
            if source == start {
                break;
            }
            rows.swap(current, source);
            current = source;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
