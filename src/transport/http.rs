//! `reqwest`-backed transport

use super::traits::Transport;
use crate::error::{Error, Result};
use crate::oai::OaiRequest;
use async_trait::async_trait;
use std::time::Duration;

/// Sends OAI-PMH requests over HTTP, one attempt per call
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport for `base_url` with a per-request timeout
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("arxiv-harvest/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Endpoint every request is sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: &OaiRequest) -> Result<Vec<u8>> {
        tracing::debug!(%request, url = %self.base_url, "Sending OAI-PMH request");

        let response = self
            .client
            .get(&self.base_url)
            .query(&request.query_pairs())
            .send()
            .await?;

        // Check HTTP status before reading the body
        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        let body = response.bytes().await?;
        tracing::debug!(bytes = body.len(), "Received OAI-PMH response");
        Ok(body.to_vec())
    }
}
