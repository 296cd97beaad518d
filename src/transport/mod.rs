//! Transport boundary.
//!
//! Defines the `Transport` trait the stores fetch through, and provides:
//! - `HttpTransport`: reqwest client against the configured API
//! - `FixtureTransport`: embedded mock data with simulated latency

pub mod fixture;
pub mod http;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::types::FetchError;

pub use fixture::FixtureTransport;
pub use http::HttpTransport;

/// Abstraction over the request layer used by the data stores.
///
/// Implementors must watch `cancel` and resolve with
/// [`FetchError::Canceled`] once it fires, so the store can tell a
/// superseded request apart from a real failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `path` and return the decoded JSON body.
    async fn get(
        &self,
        path: &str,
        cancel: CancellationToken,
    ) -> Result<serde_json::Value, FetchError>;

    /// Transport name for logging.
    fn name(&self) -> &str;
}
