//! HTTP transport backed by reqwest.
//!
//! Requests go to `{base_url}{path}`, optionally tagged with a
//! `username` query parameter. Every request races its cancellation
//! token; a fired token wins even if the response is already available.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::Transport;
use crate::config::ApiConfig;
use crate::types::FetchError;

const TRANSPORT_NAME: &str = "http";

/// reqwest-backed transport.
pub struct HttpTransport {
    http: Client,
    base_url: String,
    username: Option<String>,
}

impl HttpTransport {
    /// Build a client from the `[api]` config section.
    pub fn new(api: &ApiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .user_agent(api.user_agent.as_str())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            username: api.username.clone(),
        })
    }

    /// Full request URL for an endpoint path.
    pub fn url_for(&self, path: &str) -> String {
        let sep = if path.starts_with('/') { "" } else { "/" };
        let mut url = format!("{}{sep}{path}", self.base_url);
        if let Some(user) = &self.username {
            let joiner = if url.contains('?') { '&' } else { '?' };
            url.push(joiner);
            url.push_str("username=");
            url.push_str(&urlencoding::encode(user));
        }
        url
    }

    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        let resp = self.http.get(url).send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(
        &self,
        path: &str,
        cancel: CancellationToken,
    ) -> Result<serde_json::Value, FetchError> {
        let url = self.url_for(path);
        debug!(url = %url, "GET");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Canceled),
            result = self.fetch_json(&url) => result,
        }
    }

    fn name(&self) -> &str {
        TRANSPORT_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
