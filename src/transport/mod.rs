//! Transport layer for OAI-PMH requests
//!
//! The [`Transport`] trait is the seam between the harvest loop and the
//! network. Two implementations are provided:
//!
//! - [`HttpTransport`]: issues requests with `reqwest`, one attempt each
//! - [`RetryingTransport`]: wraps any transport with the retry schedule
//!
//! ## Usage
//!
//! ```no_run
//! use arxiv_harvest::config::HarvestConfig;
//! use arxiv_harvest::oai::OaiRequest;
//! use arxiv_harvest::retry::TokioSleeper;
//! use arxiv_harvest::transport::{HttpTransport, RetryingTransport, Transport};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HarvestConfig::default();
//! let http = HttpTransport::new(&config.base_url, config.request_timeout)?;
//! let transport = RetryingTransport::new(http, config.retry.clone(), Arc::new(TokioSleeper));
//!
//! let body = transport
//!     .fetch(&OaiRequest::Resume { token: "6960524|1001".to_string() })
//!     .await?;
//! println!("{} bytes", body.len());
//! # Ok(())
//! # }
//! ```

mod http;
mod retrying;
mod traits;

pub use http::HttpTransport;
pub use retrying::RetryingTransport;
pub use traits::Transport;
