//! TICKERBOARD: market-data dashboard data layer
//!
//! Entry point. Initialises structured logging, loads configuration, picks
//! the data source, then keeps both stores fresh on their own refresh
//! intervals and prints a sorted snapshot whenever market data changes.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{info, warn};

use tickerboard::config::{AppConfig, SourceKind};
use tickerboard::display::render_table;
use tickerboard::store::{
    CurrencyConfigStore, FetchOutcome, MarketDataStore, StoreEvent,
};
use tickerboard::transport::{FixtureTransport, HttpTransport, Transport};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Before config loading so its diagnostics reach a subscriber
    init_logging();

    let cfg = AppConfig::load_or_default("config.toml")?;
    for warning in cfg.warnings() {
        warn!(%warning, "Configuration warning");
    }

    let transport = build_transport(&cfg)?;
    info!(
        source = %cfg.source.kind,
        transport = transport.name(),
        sort = %cfg.display.sort,
        "TICKERBOARD starting up"
    );

    let currency = Arc::new(CurrencyConfigStore::new(
        transport.clone(),
        cfg.api.currency_path.as_str(),
    ));
    let market = Arc::new(MarketDataStore::new(
        transport.clone(),
        cfg.api.market_path.as_str(),
    ));
    let mut market_events = market.subscribe();

    // -- Initial load ----------------------------------------------------

    let (currency_outcome, market_outcome) = futures::join!(currency.fetch(), market.fetch());
    info!(
        currency = ?currency_outcome,
        market = ?market_outcome,
        "Initial load complete"
    );
    if matches!(market_outcome, FetchOutcome::Updated { .. }) {
        print_snapshot(&cfg, &currency, &market);
    }
    // The initial update was already printed.
    while market_events.try_recv().is_ok() {}

    // -- Refresh loop ----------------------------------------------------

    let mut currency_tick = refresh_interval(cfg.refresh.currency_interval_secs);
    let mut market_tick = refresh_interval(cfg.refresh.market_interval_secs);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        currency_secs = cfg.refresh.currency_interval_secs,
        market_secs = cfg.refresh.market_interval_secs,
        "Entering refresh loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = currency_tick.tick() => {
                let store = currency.clone();
                tokio::spawn(async move {
                    store.fetch().await;
                });
            }
            _ = market_tick.tick() => {
                let store = market.clone();
                tokio::spawn(async move {
                    store.fetch().await;
                });
            }
            event = market_events.recv() => match event {
                Ok(StoreEvent::Updated { .. }) => print_snapshot(&cfg, &currency, &market),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event stream lagged");
                }
                Err(RecvError::Closed) => break,
            },
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    currency.cancel();
    market.cancel();
    info!(
        currency_fetches = currency.generation(),
        market_fetches = market.generation(),
        "TICKERBOARD shut down cleanly."
    );

    Ok(())
}

/// Transport for the configured data source.
fn build_transport(cfg: &AppConfig) -> Result<Arc<dyn Transport>> {
    let transport: Arc<dyn Transport> = match cfg.source.kind {
        SourceKind::Http => Arc::new(HttpTransport::new(&cfg.api)?),
        SourceKind::Fixture => Arc::new(FixtureTransport::bundled(
            &cfg.api.currency_path,
            &cfg.api.market_path,
            Duration::from_millis(cfg.source.fixture_latency_ms),
        )),
    };
    Ok(transport)
}

/// Interval whose first tick is one full period away.
fn refresh_interval(secs: u64) -> tokio::time::Interval {
    let period = Duration::from_secs(secs);
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

/// Print the current market rows in the configured order.
fn print_snapshot(cfg: &AppConfig, currency: &CurrencyConfigStore, market: &MarketDataStore) {
    let tickers = currency.ticker_index();
    let rows = market.sorted(&cfg.display.sort, &tickers);
    let status = market.status();

    info!(
        rows = rows.len(),
        tickers = tickers.len(),
        has_error = status.has_error,
        as_of = ?status.last_settled_at,
        "Market snapshot"
    );
    println!("{}\n", render_table(&rows, &tickers, cfg.display.limit));
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tickerboard=info"));

    let json_logging = std::env::var("TICKERBOARD_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
