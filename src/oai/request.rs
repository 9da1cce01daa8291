//! `ListRecords` request descriptors

use chrono::NaiveDate;
use std::fmt;

/// One `ListRecords` request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OaiRequest {
    /// First page of a harvest window
    ListRecords {
        /// Metadata format, normally `oai_dc`
        metadata_prefix: String,
        /// Inclusive lower datestamp bound
        from: NaiveDate,
        /// Inclusive upper datestamp bound
        until: NaiveDate,
        /// Optional top-level set, e.g. `cs`
        set: Option<String>,
    },
    /// Follow-up page; the token carries every other parameter
    Resume {
        /// Resumption token exactly as received
        token: String,
    },
}

impl OaiRequest {
    /// Query parameters in the order they are sent
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        match self {
            OaiRequest::ListRecords {
                metadata_prefix,
                from,
                until,
                set,
            } => {
                let mut pairs = vec![
                    ("verb", "ListRecords".to_string()),
                    ("metadataPrefix", metadata_prefix.clone()),
                    ("from", from.format("%Y-%m-%d").to_string()),
                    ("until", until.format("%Y-%m-%d").to_string()),
                ];
                if let Some(set) = set {
                    pairs.push(("set", set.clone()));
                }
                pairs
            }
            OaiRequest::Resume { token } => vec![
                ("verb", "ListRecords".to_string()),
                ("resumptionToken", token.clone()),
            ],
        }
    }
}

impl fmt::Display for OaiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OaiRequest::ListRecords {
                from, until, set, ..
            } => write!(
                f,
                "ListRecords {from}..{until} set={}",
                set.as_deref().unwrap_or("*")
            ),
            OaiRequest::Resume { token } => write!(f, "ListRecords resumptionToken={token}"),
        }
    }
}
