//! Paginated harvest loop
//!
//! One harvest walks a single [`HarvestWindow`] page by page:
//!
//! 1. Request the window (`from`, `until`, `set`)
//! 2. Parse the page; stop on `noRecordsMatch`, a protocol error, or garbage
//! 3. Keep records that pass the category filter, converting them to [`Record`]s
//! 4. If the page carried a resumption token, wait the page delay and request
//!    the next page with the token alone; otherwise stop
//!
//! Upstream failures never escape [`Harvester::harvest`]. A failed page ends
//! the walk and the records gathered so far are returned with
//! [`HarvestStatus::Aborted`].

use crate::category::CategoryFilter;
use crate::config::HarvestPolicy;
use crate::error::Error;
use crate::math::{InlineMathRenderer, MathRenderer};
use crate::oai::{OaiRequest, ParsedPage, parse_page};
use crate::record::Record;
use crate::retry::Sleeper;
use crate::transport::{RetryingTransport, Transport};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Parameters of one harvest invocation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HarvestWindow {
    /// First datestamp to request (inclusive)
    pub start_date: NaiveDate,
    /// Last datestamp to request (inclusive)
    pub end_date: NaiveDate,
    /// Which records to keep
    pub categories: CategoryFilter,
    /// Records published before this date are dropped
    ///
    /// Such records were re-announced because their metadata changed, not
    /// because they are new.
    pub min_publication_date: Option<NaiveDate>,
}

impl HarvestWindow {
    /// Window without a publication-date floor
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, categories: CategoryFilter) -> Self {
        Self {
            start_date,
            end_date,
            categories,
            min_publication_date: None,
        }
    }

    /// Drop records published before `date`
    pub fn with_min_publication_date(mut self, date: NaiveDate) -> Self {
        self.min_publication_date = Some(date);
        self
    }

    fn first_request(&self, metadata_prefix: &str) -> OaiRequest {
        OaiRequest::ListRecords {
            metadata_prefix: metadata_prefix.to_string(),
            from: self.start_date,
            until: self.end_date,
            set: self.categories.top_level_set().map(str::to_string),
        }
    }
}

/// How a harvest ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HarvestStatus {
    /// Every page was fetched
    Complete,
    /// The repository reported that nothing matches the window
    NoRecords,
    /// Harvesting stopped early; the records are partial
    Aborted {
        /// What stopped it
        reason: String,
    },
}

/// Records gathered by one harvest plus how it went
#[derive(Clone, Debug, PartialEq)]
pub struct HarvestOutcome {
    /// Matching records in page order
    pub records: Vec<Record>,
    /// Pages successfully fetched
    pub pages: usize,
    /// Non-deleted records seen, matching or not
    pub processed: usize,
    /// Terminal state
    pub status: HarvestStatus,
}

impl HarvestOutcome {
    /// False when harvesting stopped before the last page
    pub fn is_complete(&self) -> bool {
        !matches!(self.status, HarvestStatus::Aborted { .. })
    }
}

/// Drives pagination over a [`Transport`]
pub struct Harvester<T> {
    transport: RetryingTransport<T>,
    sleeper: Arc<dyn Sleeper>,
    page_delay: Duration,
    renderer: Box<dyn MathRenderer>,
    metadata_prefix: String,
}

impl<T: Transport> Harvester<T> {
    /// Create a harvester; `transport` is wrapped with the policy's retry schedule
    pub fn new(transport: T, policy: HarvestPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            transport: RetryingTransport::new(transport, policy.retry, sleeper.clone()),
            sleeper,
            page_delay: policy.page_delay,
            renderer: Box::new(InlineMathRenderer::new()),
            metadata_prefix: "oai_dc".to_string(),
        }
    }

    /// Replace the math renderer applied to titles and abstracts
    pub fn with_renderer(mut self, renderer: impl MathRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Request a metadata format other than `oai_dc`
    pub fn with_metadata_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.metadata_prefix = prefix.into();
        self
    }

    /// Harvest every page of `window`
    pub async fn harvest(&self, window: &HarvestWindow) -> HarvestOutcome {
        info!(
            categories = %window.categories,
            from = %window.start_date,
            until = %window.end_date,
            "Starting harvest"
        );

        let mut records = Vec::new();
        let mut pages = 0;
        let mut processed = 0;
        let mut request = window.first_request(&self.metadata_prefix);

        let status = loop {
            let body = match self.transport.fetch(&request).await {
                Ok(body) => body,
                Err(e) => break HarvestStatus::Aborted {
                    reason: e.to_string(),
                },
            };
            pages += 1;

            let page = match parse_page(&body) {
                Ok(page) => page,
                Err(e) => break HarvestStatus::Aborted {
                    reason: e.to_string(),
                },
            };

            let (raw_records, continuation) = match page {
                ParsedPage::NoMoreRecords if pages == 1 => break HarvestStatus::NoRecords,
                ParsedPage::NoMoreRecords => break HarvestStatus::Complete,
                ParsedPage::ProtocolError { code, message } => {
                    break HarvestStatus::Aborted {
                        reason: Error::Protocol { code, message }.to_string(),
                    };
                }
                ParsedPage::Page {
                    records,
                    continuation,
                } => (records, continuation),
            };

            processed += raw_records.len();
            for raw in raw_records {
                if !window.categories.matches(&raw.set_specs) {
                    continue;
                }
                if let Some(floor) = window.min_publication_date
                    && raw.published_on().is_some_and(|published| published < floor)
                {
                    debug!(identifier = %raw.identifier, date = %raw.date, "Skipping re-announced record");
                    continue;
                }
                records.push(Record::from_raw(raw, self.renderer.as_ref()));
            }

            match continuation {
                Some(token) => {
                    info!(
                        collected = records.len(),
                        processed, "Found resumption token, fetching next page"
                    );
                    self.sleeper.sleep(self.page_delay).await;
                    request = OaiRequest::Resume { token };
                }
                None => break HarvestStatus::Complete,
            }
        };

        match &status {
            HarvestStatus::Aborted { reason } => warn!(
                reason = %reason,
                collected = records.len(),
                pages,
                "Harvest aborted, keeping partial results"
            ),
            HarvestStatus::NoRecords => info!("No records found for this period"),
            HarvestStatus::Complete => {}
        }
        info!(
            processed,
            matched = records.len(),
            pages,
            "Harvest finished"
        );

        HarvestOutcome {
            records,
            pages,
            processed,
            status,
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
