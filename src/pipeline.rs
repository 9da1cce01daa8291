//! One complete harvest run
//!
//! Load the snapshot, pick the window, harvest, reconcile, save. Everything
//! upstream-related degrades to fewer records; only a failure to write the
//! snapshot is returned as an error.

use crate::category::CategoryFilter;
use crate::config::HarvestConfig;
use crate::error::Result;
use crate::harvest::{HarvestStatus, HarvestWindow, Harvester};
use crate::reconcile::{ReconcileStats, latest_announcement, reconcile};
use crate::record::Record;
use crate::retry::Sleeper;
use crate::store::SnapshotStore;
use crate::transport::Transport;
use chrono::{Days, NaiveDate};
use std::sync::Arc;
use tracing::{info, warn};

/// Summary of a finished run
#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    /// Window that was harvested
    pub window: HarvestWindow,
    /// How the harvest ended
    pub status: HarvestStatus,
    /// Pages fetched
    pub pages: usize,
    /// Non-deleted records seen upstream
    pub processed: usize,
    /// Merge and prune counts
    pub stats: ReconcileStats,
}

/// Harvest runner bound to a transport and a snapshot store
pub struct Pipeline<T, S> {
    config: HarvestConfig,
    harvester: Harvester<T>,
    store: S,
}

impl<T: Transport, S: SnapshotStore> Pipeline<T, S> {
    /// Build a pipeline from configuration
    pub fn new(config: HarvestConfig, transport: T, store: S, sleeper: Arc<dyn Sleeper>) -> Self {
        let harvester = Harvester::new(transport, config.policy(), sleeper)
            .with_metadata_prefix(config.metadata_prefix.clone());
        Self {
            config,
            harvester,
            store,
        }
    }

    /// Window for a run on `today` given the current snapshot
    ///
    /// Resumes from the newest announcement date in the snapshot, or looks
    /// back `default_lookback_days` when there is none.
    pub fn window_for(&self, existing: &[Record], today: NaiveDate) -> HarvestWindow {
        let start = match latest_announcement(existing) {
            Some(last) => last.min(today),
            None => days_before(today, self.config.default_lookback_days),
        };

        let window = HarvestWindow::new(start, today, CategoryFilter::new(&self.config.categories));
        match self.config.publication_lag_days {
            Some(lag) => window.with_min_publication_date(days_before(start, lag)),
            None => window,
        }
    }

    /// Run one harvest as of `today`
    ///
    /// # Errors
    ///
    /// Returns an error only if the reconciled snapshot cannot be saved.
    pub async fn run(&self, today: NaiveDate) -> Result<RunReport> {
        let existing = match self.store.load().await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Existing snapshot is unreadable, starting from empty");
                Vec::new()
            }
        };

        let window = self.window_for(&existing, today);
        let outcome = self.harvester.harvest(&window).await;

        let cutoff = days_before(today, self.config.retention_days);
        let (snapshot, stats) = reconcile(existing, outcome.records, cutoff);

        self.store.save(&snapshot).await?;

        info!(
            matched = stats.fetched,
            kept = stats.after_prune,
            pruned = stats.pruned(),
            "Run finished"
        );

        Ok(RunReport {
            window,
            status: outcome.status,
            pages: outcome.pages,
            processed: outcome.processed,
            stats,
        })
    }
}

/// Build a [`Pipeline`] and run it once
///
/// # Errors
///
/// Returns an error only if the reconciled snapshot cannot be saved.
pub async fn run<T, S>(
    config: HarvestConfig,
    transport: T,
    store: S,
    sleeper: Arc<dyn Sleeper>,
    today: NaiveDate,
) -> Result<RunReport>
where
    T: Transport,
    S: SnapshotStore,
{
    Pipeline::new(config, transport, store, sleeper)
        .run(today)
        .await
}

fn days_before(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::oai::OaiRequest;
    use crate::retry::RecordingSleeper;
    use crate::store::JsonFileStore;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Serves one fixed page and records requests
    struct OnePage {
        body: Option<String>,
        requests: Mutex<Vec<OaiRequest>>,
    }

    impl OnePage {
        fn new(body: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                body: body.map(str::to_string),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for OnePage {
        async fn fetch(&self, request: &OaiRequest) -> Result<Vec<u8>> {
            self.requests.lock().unwrap().push(request.clone());
            match &self.body {
                Some(body) => Ok(body.clone().into_bytes()),
                None => Err(Error::HttpStatus {
                    status: 502,
                    url: "https://example.org/oai".to_string(),
                }),
            }
        }
    }

    const PAGE_WITH_B: &str = r#"<OAI-PMH><ListRecords>
        <record><header><datestamp>2024-01-11</datestamp><setSpec>cs:cs:AI</setSpec></header>
        <metadata><dc><title>B</title><date>2024-01-10</date><identifier>b</identifier></dc></metadata></record>
    </ListRecords></OAI-PMH>"#;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn existing(id: &str, date: &str, announced: &str) -> Record {
        Record {
            title: id.to_string(),
            creators: vec![],
            subjects: vec![],
            categories: vec!["cs.AI".to_string()],
            description: "N/A".to_string(),
            date: date.to_string(),
            announcement_date: announced.to_string(),
            identifier: id.to_string(),
        }
    }

    fn config(path: &std::path::Path, retention_days: u32) -> HarvestConfig {
        HarvestConfig {
            output_path: path.to_path_buf(),
            retention_days,
            categories: vec!["cs.AI".to_string()],
            ..HarvestConfig::default()
        }
    }

    #[tokio::test]
    async fn end_to_end_prunes_old_and_keeps_fresh() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let store = JsonFileStore::new(&path);
        store
            .save(&[existing("a", "2024-01-01", "2024-01-02")])
            .await
            .unwrap();

        // cutoff = 2024-01-12 - 7 days = 2024-01-05
        let report = run(
            config(&path, 7),
            OnePage::new(Some(PAGE_WITH_B)),
            JsonFileStore::new(&path),
            Arc::new(RecordingSleeper::new()),
            day("2024-01-12"),
        )
        .await
        .unwrap();

        let saved = store.load().await.unwrap();
        let ids: Vec<&str> = saved.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
        assert_eq!(report.status, HarvestStatus::Complete);
        assert_eq!(report.stats.fetched, 1);
        assert_eq!(report.stats.before_prune, 2);
        assert_eq!(report.stats.after_prune, 1);
    }

    #[tokio::test]
    async fn window_resumes_from_latest_announcement() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let transport = OnePage::new(Some(PAGE_WITH_B));
        let pipeline = Pipeline::new(
            config(&path, 30),
            transport.clone(),
            JsonFileStore::new(&path),
            Arc::new(RecordingSleeper::new()),
        );

        let window = pipeline.window_for(
            &[
                existing("a", "2024-01-03", "2024-01-04"),
                existing("c", "2024-01-06", "2024-01-09"),
            ],
            day("2024-01-12"),
        );

        assert_eq!(window.start_date, day("2024-01-09"));
        assert_eq!(window.end_date, day("2024-01-12"));
        assert_eq!(window.min_publication_date, Some(day("2024-01-04")));
        assert_eq!(window.categories.top_level_set(), Some("cs"));
    }

    #[tokio::test]
    async fn window_defaults_to_lookback_without_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let mut cfg = config(&path, 30);
        cfg.publication_lag_days = None;
        let pipeline = Pipeline::new(
            cfg,
            OnePage::new(None),
            JsonFileStore::new(&path),
            Arc::new(RecordingSleeper::new()),
        );

        let window = pipeline.window_for(&[], day("2024-01-12"));

        assert_eq!(window.start_date, day("2024-01-05"));
        assert_eq!(window.min_publication_date, None);
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_replaced() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, "not json at all").unwrap();

        let pipeline = Pipeline::new(
            config(&path, 30),
            OnePage::new(Some(PAGE_WITH_B)),
            JsonFileStore::new(&path),
            Arc::new(RecordingSleeper::new()),
        );
        pipeline.run(day("2024-01-12")).await.unwrap();

        let saved = JsonFileStore::new(&path).load().await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].identifier, "b");
    }

    #[tokio::test]
    async fn upstream_failure_keeps_existing_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let store = JsonFileStore::new(&path);
        store
            .save(&[existing("a", "2024-01-10", "2024-01-11")])
            .await
            .unwrap();

        let transport = OnePage::new(None);
        let pipeline = Pipeline::new(
            config(&path, 30),
            transport.clone(),
            JsonFileStore::new(&path),
            Arc::new(RecordingSleeper::new()),
        );
        let report = pipeline.run(day("2024-01-12")).await.unwrap();

        assert!(matches!(report.status, HarvestStatus::Aborted { .. }));
        assert_eq!(transport.requests.lock().unwrap().len(), 3);
        let saved = store.load().await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].identifier, "a");
    }

    #[tokio::test]
    async fn unwritable_output_is_an_error() {
        let dir = tempdir().unwrap();
        // A directory where the snapshot file should be
        let path = dir.path().join("snapshot.json");
        std::fs::create_dir(&path).unwrap();

        let pipeline = Pipeline::new(
            config(&path, 30),
            OnePage::new(Some(PAGE_WITH_B)),
            JsonFileStore::new(&path),
            Arc::new(RecordingSleeper::new()),
        );

        assert!(pipeline.run(day("2024-01-12")).await.is_err());
    }

    #[tokio::test]
    async fn record_without_publication_date_is_saved() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let page = r#"<OAI-PMH><ListRecords>
            <record><header><datestamp>2024-01-11</datestamp><setSpec>cs:cs:AI</setSpec></header>
            <metadata><dc><title>Undated</title><identifier>u</identifier></dc></metadata></record>
        </ListRecords></OAI-PMH>"#;

        let report = run(
            config(&path, 30),
            OnePage::new(Some(page)),
            JsonFileStore::new(&path),
            Arc::new(RecordingSleeper::new()),
            day("2024-01-12"),
        )
        .await
        .unwrap();

        assert_eq!(report.stats.fetched, 1);
        let saved = JsonFileStore::new(&path).load().await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].identifier, "u");
        assert_eq!(saved[0].date, "N/A");
    }

    #[test]
    fn days_before_saturates() {
        assert_eq!(days_before(day("2024-03-01"), 1), day("2024-02-29"));
        assert_eq!(days_before(NaiveDate::MIN, 5), NaiveDate::MIN);
    }
}
