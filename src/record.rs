//! Harvested record types

use crate::category::{SetSpec, normalize_categories};
use crate::math::MathRenderer;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Value stored for a text field the repository did not send
pub const MISSING: &str = "N/A";

/// One article as stored in the snapshot
///
/// Field order here is the on-disk attribute order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Title, inline math converted to MathML
    pub title: String,
    /// Author names in publication order
    pub creators: Vec<String>,
    /// Free-text subject headings
    pub subjects: Vec<String>,
    /// Normalized taxonomy codes, sorted and deduplicated
    pub categories: Vec<String>,
    /// Abstract, inline math converted to MathML
    pub description: String,
    /// Nominal publication date (`YYYY-MM-DD`)
    pub date: String,
    /// Datestamp of the metadata version this record came from
    pub announcement_date: String,
    /// Stable article identifier; the dedup key
    pub identifier: String,
}

impl Record {
    /// Publication date, if `date` starts with a valid `YYYY-MM-DD`
    pub fn published_on(&self) -> Option<NaiveDate> {
        parse_leading_date(&self.date)
    }

    /// Announcement date, if parseable
    pub fn announced_on(&self) -> Option<NaiveDate> {
        parse_leading_date(&self.announcement_date)
    }

    /// Build a stored record from parser output, rendering inline math
    pub fn from_raw(raw: RawRecord, renderer: &dyn MathRenderer) -> Self {
        let categories = normalize_categories(&raw.set_specs);
        Self {
            title: renderer.render(&raw.title),
            creators: raw.creators,
            subjects: raw.subjects,
            categories,
            description: renderer.render(&raw.description),
            date: raw.date,
            announcement_date: raw.announcement_date,
            identifier: raw.identifier,
        }
    }
}

/// One non-deleted record as extracted from a response page
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawRecord {
    /// Classification sets from the header
    pub set_specs: Vec<SetSpec>,
    /// First `dc:title`, or [`MISSING`]
    pub title: String,
    /// Every `dc:creator`
    pub creators: Vec<String>,
    /// Every `dc:subject`
    pub subjects: Vec<String>,
    /// First `dc:description`, or [`MISSING`]
    pub description: String,
    /// First `dc:date`, or [`MISSING`]
    pub date: String,
    /// First `dc:identifier`, or [`MISSING`]
    pub identifier: String,
    /// Header `datestamp`
    pub announcement_date: String,
}

impl RawRecord {
    /// Publication date, if parseable
    pub fn published_on(&self) -> Option<NaiveDate> {
        parse_leading_date(&self.date)
    }
}

/// Parse the leading `YYYY-MM-DD` of a date-like string
///
/// arXiv dates are plain dates, but datestamps at second granularity
/// (`2024-01-05T00:00:00Z`) are accepted too.
pub fn parse_leading_date(value: &str) -> Option<NaiveDate> {
    let head = value.trim().get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}
