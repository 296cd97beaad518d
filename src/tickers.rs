//! Ticker index: currency code → display metadata.
//!
//! Built from currency-configuration rows and merged incrementally. The
//! first entry seen for a code is kept forever, so a later payload that
//! renames or duplicates a code never changes what the user already sees.

use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::types::{CurrencyConfigEntry, TickerInfo};

/// Lookup table used by name sorting and display formatting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickerIndex {
    entries: HashMap<String, TickerInfo>,
}

impl TickerIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge configuration rows into the index (first write wins).
    ///
    /// Returns the number of codes that were newly inserted.
    pub fn build(&mut self, entries: &[CurrencyConfigEntry]) -> usize {
        let mut inserted = 0;
        for entry in entries {
            // No key to index under.
            if entry.code.is_empty() {
                continue;
            }
            if self.insert_if_absent(&entry.code, TickerInfo::from(entry)) {
                inserted += 1;
            }
        }
        debug!(
            received = entries.len(),
            inserted,
            total = self.entries.len(),
            "Ticker index merged"
        );
        inserted
    }

    /// Insert `info` for `code` unless the code is already indexed.
    pub fn insert_if_absent(&mut self, code: &str, info: TickerInfo) -> bool {
        if self.entries.contains_key(code) {
            return false;
        }
        self.entries.insert(code.to_string(), info);
        true
    }

    pub fn get(&self, code: &str) -> Option<&TickerInfo> {
        self.entries.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    /// Display ticker for `code`, falling back to the code itself when the
    /// code is unknown or its ticker is missing/empty.
    pub fn ticker_for<'a>(&'a self, code: &'a str) -> &'a str {
        self.entries
            .get(code)
            .and_then(|info| info.ticker.as_deref())
            .filter(|t| !t.is_empty())
            .unwrap_or(code)
    }

    /// Fraction digits configured for `code`, if any.
    pub fn fraction_digits(&self, code: &str) -> Option<u32> {
        self.entries.get(code).and_then(|info| info.fraction_digits)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TickerInfo)> {
        self.entries.iter()
    }
}

impl FromIterator<(String, TickerInfo)> for TickerIndex {
    fn from_iter<I: IntoIterator<Item = (String, TickerInfo)>>(iter: I) -> Self {
        let mut index = TickerIndex::new();
        for (code, info) in iter {
            index.insert_if_absent(&code, info);
        }
        index
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
