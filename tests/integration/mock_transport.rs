//! Scriptable transport for integration testing.
//!
//! Each `get()` pops the next scripted reply. Replies can resolve
//! immediately, hang until canceled, or wait on a gate the test opens later
//! while ignoring cancellation. Every call is recorded.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use tickerboard::transport::Transport;
use tickerboard::types::FetchError;

/// What the next `get()` does.
pub enum Reply {
    /// Resolve with this JSON payload.
    Payload(Value),
    /// Fail with a transport error.
    Fail(String),
    /// Stay pending until the request's token fires.
    Hang,
    /// Wait for the gate to be opened; cancellation is ignored.
    Gated(oneshot::Receiver<Result<Value, FetchError>>),
}

/// A recorded `get()` call.
#[derive(Debug, Clone)]
pub struct Call {
    pub path: String,
    pub cancel: CancellationToken,
}

#[derive(Clone, Default)]
pub struct MockTransport {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the reply for the next unanswered call.
    pub fn push(&self, reply: Reply) -> &Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    /// A gated reply and the sender that opens it.
    pub fn gate() -> (Reply, oneshot::Sender<Result<Value, FetchError>>) {
        let (tx, rx) = oneshot::channel();
        (Reply::Gated(rx), tx)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, path: &str, cancel: CancellationToken) -> Result<Value, FetchError> {
        self.calls.lock().unwrap().push(Call {
            path: path.to_string(),
            cancel: cancel.clone(),
        });
        let reply = self.replies.lock().unwrap().pop_front();

        match reply {
            Some(Reply::Payload(value)) => Ok(value),
            Some(Reply::Fail(message)) => Err(FetchError::Transport(message)),
            Some(Reply::Hang) => {
                cancel.cancelled().await;
                Err(FetchError::Canceled)
            }
            Some(Reply::Gated(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(FetchError::Transport("gate dropped".into()))),
            None => Err(FetchError::Transport(format!("no scripted reply for {path}"))),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// Payload builders
// ---------------------------------------------------------------------------

/// A market row with the fields the sort engine reads.
pub fn market_row(primary: &str, last: &str, amount: &str, volume: &str) -> Value {
    serde_json::json!({
        "pair": { "primary": primary, "secondary": "USD" },
        "price": {
            "last": last,
            "bestBid": last,
            "bestOffer": last,
            "change": { "direction": "Up", "percent": "1.0", "amount": amount }
        },
        "volume": { "primary": "1", "secondary": volume },
        "priceHistory": []
    })
}

pub fn currency_entry(code: &str, ticker: &str, decimals: u32) -> Value {
    serde_json::json!({
        "code": code,
        "sort_order": 1,
        "ticker": ticker,
        "type": "crypto",
        "decimals_places": decimals,
        "icon": format!("{}-icon", code.to_lowercase())
    })
}
