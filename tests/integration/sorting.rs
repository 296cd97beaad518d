//! Sort engine scenarios over decoded wire rows.

use serde_json::json;

use tickerboard::sort::{sort_rows, SortColumn, SortDescriptor, SortDirection};
use tickerboard::tickers::TickerIndex;
use tickerboard::types::{CurrencyConfigEntry, TradePairRow};

use crate::mock_transport::{currency_entry, market_row};

fn rows(values: Vec<serde_json::Value>) -> Vec<TradePairRow> {
    serde_json::from_value(serde_json::Value::Array(values)).unwrap()
}

fn primaries(rows: &[TradePairRow]) -> Vec<&str> {
    rows.iter().map(|r| r.pair.primary.as_str()).collect()
}

fn three_pairs() -> Vec<TradePairRow> {
    rows(vec![
        market_row("ADA", "1.50", "0.05", "100"),
        market_row("BTC", "50000.00", "2500.00", "5000000"),
        market_row("ETH", "3000.00", "-64.50", "1500000"),
    ])
}

#[test]
fn test_price_scenario() {
    let tickers = TickerIndex::new();

    let mut asc = three_pairs();
    sort_rows("price_asc", &mut asc, &tickers);
    assert_eq!(primaries(&asc), vec!["ADA", "ETH", "BTC"]);

    let mut desc = three_pairs();
    sort_rows("price_desc", &mut desc, &tickers);
    assert_eq!(primaries(&desc), vec!["BTC", "ETH", "ADA"]);
}

#[test]
fn test_name_scenario_with_ticker_index() {
    let entries: Vec<CurrencyConfigEntry> = serde_json::from_value(json!([
        currency_entry("BTC", "ZBC", 8),
        currency_entry("ETH", "AETH", 18),
    ]))
    .unwrap();
    let mut tickers = TickerIndex::new();
    tickers.build(&entries);

    let mut table = rows(vec![
        market_row("BTC", "50000.00", "2500.00", "5000000"),
        market_row("ETH", "3000.00", "-64.50", "1500000"),
        market_row("ADA", "1.50", "0.05", "100"),
    ]);
    sort_rows("name_asc", &mut table, &tickers);

    assert_eq!(primaries(&table), vec!["ADA", "ETH", "BTC"]);
}

#[test]
fn test_price_change_sorts_by_signed_amount() {
    let mut table = three_pairs();
    sort_rows("priceChange_asc", &mut table, &TickerIndex::new());
    assert_eq!(primaries(&table), vec!["ETH", "ADA", "BTC"]);
}

#[test]
fn test_every_valid_descriptor_is_idempotent() {
    let tickers = TickerIndex::new();
    for column in SortColumn::ALL {
        for direction in [SortDirection::Asc, SortDirection::Desc] {
            let token = SortDescriptor::new(*column, direction).to_string();

            let mut once = three_pairs();
            sort_rows(&token, &mut once, &tickers);
            let mut twice = once.clone();
            sort_rows(&token, &mut twice, &tickers);

            assert_eq!(once, twice, "descriptor {token}");
        }
    }
}

#[test]
fn test_invalid_descriptors_leave_order() {
    for token in ["", "price", "price_up", "PRICE_asc", "rank_desc", "_asc"] {
        let mut table = three_pairs();
        sort_rows(token, &mut table, &TickerIndex::new());
        assert_eq!(table, three_pairs(), "descriptor {token:?}");
    }
}

#[test]
fn test_partial_rows_do_not_disturb_sort() {
    let mut table = rows(vec![
        market_row("BTC", "50000.00", "2500.00", "5000000"),
        json!({ "pair": { "primary": "BROKEN" } }),
        market_row("ADA", "1.50", "0.05", "100"),
    ]);

    sort_rows("volume_desc", &mut table, &TickerIndex::new());

    assert_eq!(table.len(), 3);
    assert!(primaries(&table).contains(&"BROKEN"));
}
