use super::*;
use crate::config::RetryConfig;
use crate::error::{Error, Result};
use crate::math::PlainText;
use crate::retry::RecordingSleeper;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One scripted response
enum Step {
    Body(String),
    Status(u16),
}

/// Transport that replays a script and records every request
#[derive(Default)]
struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<OaiRequest>>,
}

impl ScriptedTransport {
    fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<OaiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(&self, request: &OaiRequest) -> Result<Vec<u8>> {
        self.requests.lock().unwrap().push(request.clone());
        // An exhausted script keeps failing
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Status(503));
        match step {
            Step::Body(body) => Ok(body.into_bytes()),
            Step::Status(status) => Err(Error::HttpStatus {
                status,
                url: "https://example.org/oai".to_string(),
            }),
        }
    }
}

/// `(identifier, setSpec, publication date)`
type Entry<'a> = (&'a str, &'a str, &'a str);

fn page_xml(entries: &[Entry<'_>], token: Option<&str>) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/"><ListRecords>"#,
    );
    for (id, set_spec, date) in entries {
        xml.push_str(&format!(
            r#"<record><header><identifier>oai:arXiv.org:{id}</identifier>
<datestamp>2024-01-12</datestamp><setSpec>{set_spec}</setSpec></header>
<metadata><oai_dc:dc xmlns:oai_dc="http://www.openarchives.org/OAI/2.0/oai_dc/" xmlns:dc="http://purl.org/dc/elements/1.1/">
<dc:title>Paper {id} on $\alpha$</dc:title><dc:creator>Author, A.</dc:creator>
<dc:description>Abstract of {id}</dc:description><dc:date>{date}</dc:date>
<dc:identifier>{id}</dc:identifier></oai_dc:dc></metadata></record>"#
        ));
    }
    match token {
        Some(token) => xml.push_str(&format!("<resumptionToken>{token}</resumptionToken>")),
        None => xml.push_str("<resumptionToken/>"),
    }
    xml.push_str("</ListRecords></OAI-PMH>");
    xml
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn window(codes: &[&str]) -> HarvestWindow {
    HarvestWindow::new(
        date(2024, 1, 5),
        date(2024, 1, 12),
        CategoryFilter::new(codes),
    )
}

fn harvester(
    transport: Arc<ScriptedTransport>,
    sleeper: Arc<RecordingSleeper>,
) -> Harvester<Arc<ScriptedTransport>> {
    Harvester::new(transport, HarvestPolicy::default(), sleeper)
}

fn ids(outcome: &HarvestOutcome) -> Vec<&str> {
    outcome
        .records
        .iter()
        .map(|r| r.identifier.as_str())
        .collect()
}

#[tokio::test]
async fn three_pages_issue_three_requests_in_order() {
    let transport = ScriptedTransport::new(vec![
        Step::Body(page_xml(&[("a", "cs:cs:AI", "2024-01-10")], Some("tok1"))),
        Step::Body(page_xml(
            &[("b", "cs:cs:AI", "2024-01-10"), ("c", "cs:cs:AI", "2024-01-11")],
            Some("tok2"),
        )),
        Step::Body(page_xml(&[("d", "cs:cs:AI", "2024-01-11")], None)),
    ]);
    let sleeper = Arc::new(RecordingSleeper::new());

    let outcome = harvester(transport.clone(), sleeper.clone())
        .harvest(&window(&["cs.AI"]))
        .await;

    assert_eq!(outcome.status, HarvestStatus::Complete);
    assert_eq!(ids(&outcome), vec!["a", "b", "c", "d"]);
    assert_eq!(outcome.pages, 3);
    assert_eq!(outcome.processed, 4);

    let requests = transport.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(
        requests[0],
        OaiRequest::ListRecords {
            metadata_prefix: "oai_dc".to_string(),
            from: date(2024, 1, 5),
            until: date(2024, 1, 12),
            set: Some("cs".to_string()),
        }
    );
    assert_eq!(
        requests[1],
        OaiRequest::Resume {
            token: "tok1".to_string()
        }
    );
    assert_eq!(
        requests[2],
        OaiRequest::Resume {
            token: "tok2".to_string()
        }
    );

    // Page delay between pages, none after the last
    assert_eq!(
        sleeper.delays(),
        vec![Duration::from_secs(3), Duration::from_secs(3)]
    );
}

#[tokio::test]
async fn category_filter_drops_non_matching_records() {
    let transport = ScriptedTransport::new(vec![Step::Body(page_xml(
        &[
            ("ai", "cs:cs:AI", "2024-01-10"),
            ("cv", "cs:cs:CV", "2024-01-10"),
            ("lg", "cs:cs:LG", "2024-01-10"),
        ],
        None,
    ))]);
    let sleeper = Arc::new(RecordingSleeper::new());

    let outcome = harvester(transport, sleeper)
        .harvest(&window(&["cs.AI", "cs.LG"]))
        .await;

    assert_eq!(ids(&outcome), vec!["ai", "lg"]);
    assert_eq!(outcome.processed, 3);
}

#[tokio::test]
async fn empty_filter_keeps_everything_and_sends_no_set() {
    let transport = ScriptedTransport::new(vec![Step::Body(page_xml(
        &[("x", "physics:hep-th", "2024-01-10")],
        None,
    ))]);
    let sleeper = Arc::new(RecordingSleeper::new());

    let outcome = harvester(transport.clone(), sleeper).harvest(&window(&[])).await;

    assert_eq!(ids(&outcome), vec!["x"]);
    assert_eq!(outcome.records[0].categories, vec!["physics.hep-th"]);
    match &transport.requests()[0] {
        OaiRequest::ListRecords { set, .. } => assert_eq!(*set, None),
        other => panic!("unexpected first request {other:?}"),
    }
}

#[tokio::test]
async fn records_are_normalized_with_math_rendering() {
    let transport = ScriptedTransport::new(vec![Step::Body(page_xml(
        &[("a", "cs:cs:AI", "2024-01-10")],
        None,
    ))]);
    let sleeper = Arc::new(RecordingSleeper::new());

    let outcome = harvester(transport, sleeper).harvest(&window(&["cs.AI"])).await;
    let record = &outcome.records[0];

    assert!(record.title.starts_with("Paper a on <math"), "{}", record.title);
    assert!(record.title.contains("<mi>α</mi>"));
    assert_eq!(record.announcement_date, "2024-01-12");
    assert_eq!(record.categories, vec!["cs.AI"]);
}

#[tokio::test]
async fn custom_renderer_is_used() {
    let transport = ScriptedTransport::new(vec![Step::Body(page_xml(
        &[("a", "cs:cs:AI", "2024-01-10")],
        None,
    ))]);
    let sleeper = Arc::new(RecordingSleeper::new());

    let outcome = harvester(transport, sleeper)
        .with_renderer(PlainText)
        .harvest(&window(&["cs.AI"]))
        .await;

    assert_eq!(outcome.records[0].title, r"Paper a on $\alpha$");
}

#[tokio::test]
async fn metadata_prefix_is_configurable() {
    let transport = ScriptedTransport::new(vec![Step::Body(page_xml(&[], None))]);
    let sleeper = Arc::new(RecordingSleeper::new());

    harvester(transport.clone(), sleeper)
        .with_metadata_prefix("arXiv")
        .harvest(&window(&["cs.AI"]))
        .await;

    match &transport.requests()[0] {
        OaiRequest::ListRecords {
            metadata_prefix, ..
        } => assert_eq!(metadata_prefix, "arXiv"),
        other => panic!("unexpected first request {other:?}"),
    }
}

#[tokio::test]
async fn always_failing_transport_returns_empty_without_error() {
    let transport = ScriptedTransport::new(vec![]);
    let sleeper = Arc::new(RecordingSleeper::new());

    let outcome = harvester(transport.clone(), sleeper.clone())
        .harvest(&window(&["cs.AI"]))
        .await;

    assert!(outcome.records.is_empty());
    assert!(!outcome.is_complete());
    assert!(matches!(outcome.status, HarvestStatus::Aborted { .. }));
    assert_eq!(outcome.pages, 0);
    assert_eq!(transport.requests().len(), 3, "one request, three attempts");
    assert_eq!(
        sleeper.delays(),
        vec![Duration::from_secs(2), Duration::from_secs(4)]
    );
}

#[tokio::test]
async fn failure_after_first_page_keeps_partial_results() {
    let transport = ScriptedTransport::new(vec![Step::Body(page_xml(
        &[("a", "cs:cs:AI", "2024-01-10")],
        Some("tok1"),
    ))]);
    let sleeper = Arc::new(RecordingSleeper::new());

    let outcome = harvester(transport.clone(), sleeper.clone())
        .harvest(&window(&["cs.AI"]))
        .await;

    assert_eq!(ids(&outcome), vec!["a"]);
    assert!(!outcome.is_complete());
    assert_eq!(outcome.pages, 1);
    // page delay, then two backoff waits
    assert_eq!(
        sleeper.delays(),
        vec![
            Duration::from_secs(3),
            Duration::from_secs(2),
            Duration::from_secs(4)
        ]
    );
}

#[tokio::test]
async fn transient_failure_then_success_continues() {
    let transport = ScriptedTransport::new(vec![
        Step::Status(503),
        Step::Status(500),
        Step::Body(page_xml(&[("a", "cs:cs:AI", "2024-01-10")], None)),
    ]);
    let sleeper = Arc::new(RecordingSleeper::new());

    let outcome = harvester(transport.clone(), sleeper.clone())
        .harvest(&window(&["cs.AI"]))
        .await;

    assert_eq!(outcome.status, HarvestStatus::Complete);
    assert_eq!(ids(&outcome), vec!["a"]);
    assert_eq!(transport.requests().len(), 3);
}

#[tokio::test]
async fn no_records_match_is_an_empty_success() {
    let transport = ScriptedTransport::new(vec![Step::Body(
        r#"<OAI-PMH><error code="noRecordsMatch">nothing</error></OAI-PMH>"#.to_string(),
    )]);
    let sleeper = Arc::new(RecordingSleeper::new());

    let outcome = harvester(transport, sleeper).harvest(&window(&["cs.AI"])).await;

    assert_eq!(outcome.status, HarvestStatus::NoRecords);
    assert!(outcome.is_complete());
    assert!(outcome.records.is_empty());
}

#[tokio::test]
async fn protocol_error_aborts_with_partial_results() {
    let transport = ScriptedTransport::new(vec![
        Step::Body(page_xml(&[("a", "cs:cs:AI", "2024-01-10")], Some("tok1"))),
        Step::Body(
            r#"<OAI-PMH><error code="badResumptionToken">expired</error></OAI-PMH>"#.to_string(),
        ),
    ]);
    let sleeper = Arc::new(RecordingSleeper::new());

    let outcome = harvester(transport.clone(), sleeper)
        .harvest(&window(&["cs.AI"]))
        .await;

    assert_eq!(ids(&outcome), vec!["a"]);
    assert_eq!(
        outcome.status,
        HarvestStatus::Aborted {
            reason: "OAI-PMH error badResumptionToken: expired".to_string()
        }
    );
    assert_eq!(transport.requests().len(), 2, "protocol errors are not retried");
}

#[tokio::test]
async fn malformed_page_aborts() {
    let transport = ScriptedTransport::new(vec![Step::Body(
        "<html>maintenance</html>".to_string(),
    )]);
    let sleeper = Arc::new(RecordingSleeper::new());

    let outcome = harvester(transport, sleeper).harvest(&window(&["cs.AI"])).await;

    assert!(!outcome.is_complete());
    assert!(outcome.records.is_empty());
}

#[tokio::test]
async fn min_publication_date_drops_reannounced_records() {
    let transport = ScriptedTransport::new(vec![Step::Body(page_xml(
        &[
            ("new", "cs:cs:AI", "2024-01-10"),
            ("old", "cs:cs:AI", "2023-06-01"),
            ("edge", "cs:cs:AI", "2023-12-31"),
            ("undated", "cs:cs:AI", "N/A"),
        ],
        None,
    ))]);
    let sleeper = Arc::new(RecordingSleeper::new());

    let window = window(&["cs.AI"]).with_min_publication_date(date(2023, 12, 31));
    let outcome = harvester(transport, sleeper).harvest(&window).await;

    assert_eq!(ids(&outcome), vec!["new", "edge", "undated"]);
}

#[tokio::test]
async fn retry_policy_comes_from_harvest_policy() {
    let transport = ScriptedTransport::new(vec![]);
    let sleeper = Arc::new(RecordingSleeper::new());
    let policy = HarvestPolicy {
        retry: RetryConfig {
            max_attempts: 1,
            ..RetryConfig::default()
        },
        page_delay: Duration::ZERO,
    };

    let outcome = Harvester::new(transport.clone(), policy, sleeper.clone())
        .harvest(&window(&["cs.AI"]))
        .await;

    assert!(!outcome.is_complete());
    assert_eq!(transport.requests().len(), 1);
    assert!(sleeper.delays().is_empty());
}
