//! Fixture transport serving embedded mock data.
//!
//! Stands in for the real API during local development and demos. Each
//! response is delayed by a configurable latency and can be canceled while
//! it is "in flight", just like a network request.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::Transport;
use crate::types::FetchError;

const TRANSPORT_NAME: &str = "fixture";

const CURRENCY_FIXTURE: &str = include_str!("../../fixtures/currency.json");
const MARKET_FIXTURE: &str = include_str!("../../fixtures/market.json");

/// In-memory transport keyed by endpoint path.
pub struct FixtureTransport {
    responses: HashMap<String, String>,
    latency: Duration,
}

impl FixtureTransport {
    /// Empty transport; every path answers 404 until registered.
    pub fn new(latency: Duration) -> Self {
        Self {
            responses: HashMap::new(),
            latency,
        }
    }

    /// Transport pre-loaded with the bundled currency and market data sets.
    pub fn bundled(currency_path: &str, market_path: &str, latency: Duration) -> Self {
        Self::new(latency)
            .with_response(currency_path, CURRENCY_FIXTURE)
            .with_response(market_path, MARKET_FIXTURE)
    }

    /// Register a raw JSON body for `path`.
    pub fn with_response(mut self, path: &str, body: &str) -> Self {
        self.responses.insert(path.to_string(), body.to_string());
        self
    }
}

#[async_trait]
impl Transport for FixtureTransport {
    async fn get(
        &self,
        path: &str,
        cancel: CancellationToken,
    ) -> Result<serde_json::Value, FetchError> {
        debug!(path, latency_ms = self.latency.as_millis() as u64, "Serving fixture");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Canceled),
            _ = tokio::time::sleep(self.latency) => {}
        }

        let body = self.responses.get(path).ok_or_else(|| FetchError::Status {
            status: 404,
            body: format!("no fixture for {path}"),
        })?;

        Ok(serde_json::from_str(body)?)
    }

    fn name(&self) -> &str {
        TRANSPORT_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
