//! # arxiv-harvest
//!
//! Incremental harvester for arXiv metadata over OAI-PMH.
//!
//! A run fetches the records announced in a date window, keeps the ones in
//! the configured categories, and folds them into a JSON snapshot that holds
//! only the last `retention_days` of publications.
//!
//! ## Design Philosophy
//!
//! - **Degrade, don't fail** - Upstream trouble shrinks the harvest; only a
//!   failure to write the snapshot is an error
//! - **Incremental** - Each run resumes from the newest announcement date
//!   already in the snapshot
//! - **Injectable seams** - Transport, clock, sleeper and storage are all
//!   passed in, so every path is testable without a network or real waits
//!
//! ## Quick Start
//!
//! ```no_run
//! use arxiv_harvest::{HarvestConfig, HttpTransport, JsonFileStore, TokioSleeper, run};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HarvestConfig {
//!         categories: vec!["cs.AI".to_string(), "math.PR".to_string()],
//!         ..Default::default()
//!     };
//!
//!     let transport = HttpTransport::new(&config.base_url, config.request_timeout)?;
//!     let store = JsonFileStore::new(&config.output_path);
//!     let today = chrono::Utc::now().date_naive();
//!
//!     let report = run(config, transport, store, Arc::new(TokioSleeper), today).await?;
//!     println!("kept {} records", report.stats.after_prune);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Category codes, set specs and filtering
pub mod category;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Paginated harvest loop
pub mod harvest;
/// Inline LaTeX to MathML conversion
pub mod math;
/// OAI-PMH requests and response parsing
pub mod oai;
/// One complete harvest run
pub mod pipeline;
/// Snapshot merging and retention
pub mod reconcile;
/// Harvested record types
pub mod record;
/// Retry logic with exponential backoff
pub mod retry;
/// Snapshot persistence
pub mod store;
/// Fetching OAI-PMH pages
pub mod transport;

// Re-export commonly used types
pub use category::{CategoryCode, CategoryFilter, SetSpec};
pub use config::{HarvestConfig, HarvestPolicy, RetryConfig};
pub use error::{Error, Result};
pub use harvest::{HarvestOutcome, HarvestStatus, HarvestWindow, Harvester};
pub use math::{InlineMathRenderer, MathRenderer, PlainText};
pub use pipeline::{Pipeline, RunReport, run};
pub use reconcile::{ReconcileStats, reconcile};
pub use record::{RawRecord, Record};
pub use retry::{IsRetryable, RecordingSleeper, Sleeper, TokioSleeper};
pub use store::{JsonFileStore, SnapshotStore};
pub use transport::{HttpTransport, RetryingTransport, Transport};
