//! Fetch lifecycle controller.
//!
//! `FetchStore<R>` owns one row collection and drives it through
//! `Idle → Fetching → {Success, Error, Canceled} → Idle`. Every `fetch()`
//! bumps a generation counter and cancels the previous in-flight request;
//! a response is only applied when its generation is still the latest, so
//! the last-issued request always wins regardless of network timing.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::Resource;
use crate::transport::Transport;
use crate::types::FetchError;

/// Buffered events per subscriber before the slowest one starts lagging.
const EVENT_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Consumer-facing snapshot of the lifecycle flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FetchStatus {
    pub is_fetching: bool,
    pub has_completed_first_fetch: bool,
    pub has_error: bool,
    pub last_settled_at: Option<DateTime<Utc>>,
}

/// How a single `fetch()` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Rows were replaced with the response payload.
    Updated { rows: usize },
    /// The request failed; prior rows were kept and `has_error` is set.
    Failed { message: String },
    /// The request was canceled while it was still the current one.
    Canceled,
    /// A newer `fetch()` was issued before this one resolved.
    Superseded,
}

/// Notification published on every lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Started { store: &'static str, generation: u64 },
    Updated { store: &'static str, generation: u64, rows: usize },
    Failed { store: &'static str, generation: u64, message: String },
    Canceled { store: &'static str, generation: u64 },
    Superseded { store: &'static str, generation: u64 },
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

struct ActiveRequest {
    generation: u64,
    cancel: CancellationToken,
}

struct FetchState<T, D> {
    rows: Vec<T>,
    derived: D,
    is_fetching: bool,
    has_completed_first_fetch: bool,
    has_error: bool,
    /// `Some` iff `is_fetching`.
    active: Option<ActiveRequest>,
    generation: u64,
    last_settled_at: Option<DateTime<Utc>>,
}

impl<T, D> FetchState<T, D> {
    /// Lifecycle cleanup shared by every way a current fetch can end.
    fn finish(&mut self) {
        self.is_fetching = false;
        self.has_completed_first_fetch = true;
        self.active = None;
        self.last_settled_at = Some(Utc::now());
    }
}

/// Guard for one issued request. Dropping it unsettled (the `fetch()`
/// future was dropped mid-flight) cancels the token and runs the cleanup.
struct InFlight<'a, R: Resource> {
    store: &'a FetchStore<R>,
    generation: u64,
    cancel: CancellationToken,
    settled: bool,
}

impl<R: Resource> InFlight<'_, R> {
    fn settle(mut self, result: Result<serde_json::Value, FetchError>) -> FetchOutcome {
        self.settled = true;
        self.store.settle(self.generation, &self.cancel, result)
    }
}

impl<R: Resource> Drop for InFlight<'_, R> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        self.cancel.cancel();
        self.store.abandon(self.generation);
    }
}

/// Generic data store wrapping a transport call with the fetch lifecycle.
///
/// Methods take `&self`; wrap the store in an `Arc` to drive it from
/// several tasks. The internal lock is never held across an await.
pub struct FetchStore<R: Resource> {
    path: String,
    transport: Arc<dyn Transport>,
    state: Mutex<FetchState<R::Row, R::Derived>>,
    events: broadcast::Sender<StoreEvent>,
}

impl<R: Resource> FetchStore<R> {
    /// Empty store that has not fetched yet.
    pub fn new(transport: Arc<dyn Transport>, path: impl Into<String>) -> Self {
        Self::with_rows(transport, path, Vec::new())
    }

    /// Store seeded with rows, e.g. from a previous snapshot.
    ///
    /// A non-empty seed counts as a completed first fetch. The seed is
    /// absorbed into the derived state like a fetched payload.
    pub fn with_rows(
        transport: Arc<dyn Transport>,
        path: impl Into<String>,
        rows: Vec<R::Row>,
    ) -> Self {
        let mut derived = R::Derived::default();
        R::absorb(&mut derived, &rows);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            path: path.into(),
            transport,
            state: Mutex::new(FetchState {
                has_completed_first_fetch: !rows.is_empty(),
                rows,
                derived,
                is_fetching: false,
                has_error: false,
                active: None,
                generation: 0,
                last_settled_at: None,
            }),
            events,
        }
    }

    // -- Actions ---------------------------------------------------------

    /// Fetch the collection, superseding any request still in flight.
    ///
    /// Never returns an error: failures are recorded in the store state
    /// and reported through the returned outcome and the event stream.
    pub async fn fetch(&self) -> FetchOutcome {
        let flight = self.begin();
        let span = info_span!(
            "fetch",
            store = R::NAME,
            generation = flight.generation,
            request_id = %Uuid::new_v4()
        );

        async move {
            let result = self.transport.get(&self.path, flight.cancel.clone()).await;
            flight.settle(result)
        }
        .instrument(span)
        .await
    }

    /// Cancel the in-flight request, if any. The pending `fetch()` then
    /// settles as [`FetchOutcome::Canceled`].
    pub fn cancel(&self) -> bool {
        let state = self.state.lock();
        match &state.active {
            Some(active) => {
                debug!(store = R::NAME, generation = active.generation, "Cancel requested");
                active.cancel.cancel();
                true
            }
            None => false,
        }
    }

    fn begin(&self) -> InFlight<'_, R> {
        let mut state = self.state.lock();

        state.generation += 1;
        let generation = state.generation;

        if let Some(previous) = state.active.take() {
            debug!(
                store = R::NAME,
                superseded = previous.generation,
                generation,
                "Canceling in-flight request"
            );
            previous.cancel.cancel();
        }

        let cancel = CancellationToken::new();
        state.active = Some(ActiveRequest {
            generation,
            cancel: cancel.clone(),
        });
        state.is_fetching = true;
        state.has_error = false;
        if state.rows.is_empty() {
            state.has_completed_first_fetch = false;
        }
        drop(state);

        self.emit(StoreEvent::Started { store: R::NAME, generation });
        InFlight {
            store: self,
            generation,
            cancel,
            settled: false,
        }
    }

    fn settle(
        &self,
        generation: u64,
        cancel: &CancellationToken,
        result: Result<serde_json::Value, FetchError>,
    ) -> FetchOutcome {
        let mut state = self.state.lock();

        if state.generation != generation {
            drop(state);
            debug!(store = R::NAME, generation, "Discarding superseded response");
            self.emit(StoreEvent::Superseded { store: R::NAME, generation });
            return FetchOutcome::Superseded;
        }

        let result = if cancel.is_cancelled() {
            Err(FetchError::Canceled)
        } else {
            result.and_then(decode_rows::<R::Row>)
        };

        let (outcome, event) = match result {
            Ok(rows) => {
                R::absorb(&mut state.derived, &rows);
                let count = rows.len();
                state.rows = rows;
                info!(store = R::NAME, rows = count, "Rows updated");
                (
                    FetchOutcome::Updated { rows: count },
                    StoreEvent::Updated { store: R::NAME, generation, rows: count },
                )
            }
            Err(FetchError::Canceled) => {
                debug!(store = R::NAME, "Fetch canceled");
                (
                    FetchOutcome::Canceled,
                    StoreEvent::Canceled { store: R::NAME, generation },
                )
            }
            Err(e) => {
                state.has_error = true;
                let message = e.to_string();
                warn!(store = R::NAME, error = %message, "Fetch failed, keeping previous rows");
                (
                    FetchOutcome::Failed { message: message.clone() },
                    StoreEvent::Failed { store: R::NAME, generation, message },
                )
            }
        };

        state.finish();
        drop(state);

        self.emit(event);
        outcome
    }

    /// Settle a fetch whose future was dropped before the transport
    /// answered. Only the current generation touches the flags.
    fn abandon(&self, generation: u64) {
        let mut state = self.state.lock();
        if state.generation != generation {
            return;
        }
        state.finish();
        drop(state);

        debug!(store = R::NAME, generation, "Fetch dropped before settling");
        self.emit(StoreEvent::Canceled { store: R::NAME, generation });
    }

    fn emit(&self, event: StoreEvent) {
        // No receivers is the normal case for headless use.
        let _ = self.events.send(event);
    }

    // -- Accessors -------------------------------------------------------

    /// Clone of the current rows, in server order.
    pub fn rows(&self) -> Vec<R::Row> {
        self.state.lock().rows.clone()
    }

    /// Borrow the current rows without cloning. Do not call back into the
    /// store from `f`.
    pub fn read_rows<O>(&self, f: impl FnOnce(&[R::Row]) -> O) -> O {
        f(&self.state.lock().rows)
    }

    /// Clone of the derived state (e.g. the ticker index).
    pub fn derived(&self) -> R::Derived {
        self.state.lock().derived.clone()
    }

    pub fn status(&self) -> FetchStatus {
        let state = self.state.lock();
        FetchStatus {
            is_fetching: state.is_fetching,
            has_completed_first_fetch: state.has_completed_first_fetch,
            has_error: state.has_error,
            last_settled_at: state.last_settled_at,
        }
    }

    pub fn is_fetching(&self) -> bool {
        self.state.lock().is_fetching
    }

    pub fn has_completed_first_fetch(&self) -> bool {
        self.state.lock().has_completed_first_fetch
    }

    pub fn has_error(&self) -> bool {
        self.state.lock().has_error
    }

    /// Whether a cancellation handle is currently held.
    pub fn has_active_request(&self) -> bool {
        self.state.lock().active.is_some()
    }

    /// Number of `fetch()` calls issued so far.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn name(&self) -> &'static str {
        R::NAME
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl<R: Resource> Drop for FetchStore<R> {
    fn drop(&mut self) {
        if let Some(active) = self.state.get_mut().active.take() {
            active.cancel.cancel();
        }
    }
}

/// Decode a payload into rows; JSON `null` counts as an empty collection.
///
/// The payload itself must be an array. Elements that are not rows at all
/// (e.g. `null` or a bare number) are skipped rather than failing the batch.
fn decode_rows<T: DeserializeOwned>(payload: serde_json::Value) -> Result<Vec<T>, FetchError> {
    let items: Option<Vec<serde_json::Value>> = serde_json::from_value(payload)?;
    let items = items.unwrap_or_default();

    let total = items.len();
    let rows: Vec<T> = items
        .into_iter()
        .filter_map(|item| T::deserialize(item).ok())
        .collect();
    if rows.len() < total {
        warn!(skipped = total - rows.len(), total, "Skipped undecodable rows");
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
