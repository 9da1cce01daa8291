//! Retry decorator for transports

use super::traits::Transport;
use crate::config::RetryConfig;
use crate::error::Result;
use crate::oai::OaiRequest;
use crate::retry::{Sleeper, with_retry};
use async_trait::async_trait;
use std::sync::Arc;

/// Transport that retries transient failures of an inner transport
///
/// An `Err` from this transport is terminal: the retry budget is spent or the
/// failure was not transient.
pub struct RetryingTransport<T> {
    inner: T,
    retry: RetryConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl<T: Transport> RetryingTransport<T> {
    /// Wrap `inner` with the given retry schedule
    pub fn new(inner: T, retry: RetryConfig, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            inner,
            retry,
            sleeper,
        }
    }

    /// The wrapped transport
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: Transport> Transport for RetryingTransport<T> {
    async fn fetch(&self, request: &OaiRequest) -> Result<Vec<u8>> {
        with_retry(&self.retry, self.sleeper.as_ref(), || self.inner.fetch(request)).await
    }
}
