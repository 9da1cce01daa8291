//! Transport trait

use crate::error::Result;
use crate::oai::OaiRequest;
use async_trait::async_trait;

/// Sends one OAI-PMH request and returns the raw response body
///
/// Implementations report transient problems (timeouts, refused connections,
/// non-success status) as errors for which
/// [`IsRetryable::is_retryable`](crate::retry::IsRetryable::is_retryable)
/// returns `true`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the response body for `request`
    async fn fetch(&self, request: &OaiRequest) -> Result<Vec<u8>>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn fetch(&self, request: &OaiRequest) -> Result<Vec<u8>> {
        (**self).fetch(request).await
    }
}
