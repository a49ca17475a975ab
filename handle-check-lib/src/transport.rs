//! HTTP transport used by probes.
//!
//! Probes talk to the network through the [`HttpTransport`] trait so the
//! engine can run against a deterministic transport in tests. The production
//! implementation wraps a single shared `reqwest::Client`.

use crate::error::HandleCheckError;
use crate::types::ScanConfig;
use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::Url;
use std::time::Duration;
use tracing::trace;

/// A fully read HTTP response, after redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Final status code
    pub status: u16,

    /// URL of the last response in the redirect chain
    pub final_url: String,

    /// Response body decoded as text
    pub body: String,
}

/// Performs one GET request, following redirects, and reads the whole body.
///
/// Implementations are shared read-only by every probe of a scan.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<HttpResponse, HandleCheckError>;
}

/// Transport backed by a pooled `reqwest` client.
#[derive(Clone)]
pub struct ReqwestTransport {
    /// HTTP client shared by every probe
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with default settings.
    pub fn new() -> Result<Self, HandleCheckError> {
        Self::with_config(&ScanConfig::default())
    }

    /// Create a transport from engine settings.
    ///
    /// The client-level timeout is a backstop; probes enforce their own
    /// deadline, so it is set slightly above the configured timeout.
    pub fn with_config(config: &ScanConfig) -> Result<Self, HandleCheckError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout.saturating_add(Duration::from_secs(2)))
            .redirect(Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| {
                HandleCheckError::internal(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { http_client })
    }

    /// Wrap an existing client, e.g. one with custom proxy settings.
    pub fn from_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<HttpResponse, HandleCheckError> {
        trace!(%url, "sending probe request");

        let response = self.http_client.get(url.clone()).send().await?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.text().await?;

        trace!(%url, status, %final_url, bytes = body.len(), "probe response read");

        Ok(HttpResponse {
            status,
            final_url,
            body,
        })
    }
}
