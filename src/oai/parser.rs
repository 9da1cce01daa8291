//! Parser for `ListRecords` response pages
//!
//! Elements are matched on local names, so namespace prefixes (`oai_dc:`,
//! `dc:`) never matter. Every metadata field is optional: a missing text field
//! becomes [`MISSING`], a missing list becomes empty.

use crate::category::SetSpec;
use crate::error::{Error, Result};
use crate::record::{MISSING, RawRecord};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Outcome of parsing one response page
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedPage {
    /// The repository reported `noRecordsMatch`
    NoMoreRecords,
    /// Any other OAI-PMH error; ends the harvest
    ProtocolError {
        /// OAI-PMH error code
        code: String,
        /// Error text
        message: String,
    },
    /// A page of records
    Page {
        /// Non-deleted records in document order
        records: Vec<RawRecord>,
        /// Resumption token for the next page, if any
        continuation: Option<String>,
    },
}

/// Fields collected while inside one `<record>`
#[derive(Default)]
struct RecordBuilder {
    deleted: bool,
    has_metadata: bool,
    datestamp: Option<String>,
    set_specs: Vec<SetSpec>,
    titles: Vec<String>,
    creators: Vec<String>,
    subjects: Vec<String>,
    descriptions: Vec<String>,
    dates: Vec<String>,
    identifiers: Vec<String>,
}

impl RecordBuilder {
    fn build(self) -> Option<RawRecord> {
        if self.deleted {
            return None;
        }
        if !self.has_metadata {
            tracing::debug!("Skipping record without a metadata block");
            return None;
        }
        let Some(announcement_date) = self.datestamp else {
            tracing::warn!("Skipping record whose header has no datestamp");
            return None;
        };

        Some(RawRecord {
            set_specs: self.set_specs,
            title: first_or_missing(self.titles),
            creators: self.creators,
            subjects: self.subjects,
            description: first_or_missing(self.descriptions),
            date: first_or_missing(self.dates),
            identifier: first_or_missing(self.identifiers),
            announcement_date,
        })
    }
}

fn first_or_missing(values: Vec<String>) -> String {
    values
        .into_iter()
        .next()
        .unwrap_or_else(|| MISSING.to_string())
}

/// Parse one `ListRecords` response body
///
/// # Errors
///
/// Returns [`Error::Xml`] if the body is not well-formed XML or is not an
/// OAI-PMH document. Upstream-reported errors are not `Err`; they come back as
/// [`ParsedPage::NoMoreRecords`] or [`ParsedPage::ProtocolError`].
pub fn parse_page(body: &[u8]) -> Result<ParsedPage> {
    let mut reader = Reader::from_reader(body);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut text = String::new();

    let mut seen_root = false;
    let mut records = Vec::new();
    let mut current: Option<RecordBuilder> = None;
    let mut continuation: Option<String> = None;
    let mut error: Option<(String, String)> = None;
    let mut error_code = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) => {
                let name = local_name(&e);
                if path.is_empty() {
                    seen_root = name == "OAI-PMH";
                }
                match name.as_str() {
                    "record" => current = Some(RecordBuilder::default()),
                    "header" => {
                        if let Some(builder) = current.as_mut()
                            && attribute(&e, b"status").as_deref() == Some("deleted")
                        {
                            builder.deleted = true;
                        }
                    }
                    "metadata" => {
                        if let Some(builder) = current.as_mut() {
                            builder.has_metadata = true;
                        }
                    }
                    "error" => error_code = attribute(&e, b"code").unwrap_or_default(),
                    _ => {}
                }
                path.push(name);
                text.clear();
            }
            Event::Empty(e) => {
                let name = local_name(&e);
                if path.is_empty() {
                    seen_root = name == "OAI-PMH";
                }
                match name.as_str() {
                    "error" if error.is_none() => {
                        error = Some((attribute(&e, b"code").unwrap_or_default(), String::new()));
                    }
                    "header" => {
                        if let Some(builder) = current.as_mut()
                            && attribute(&e, b"status").as_deref() == Some("deleted")
                        {
                            builder.deleted = true;
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(t) => {
                let value = t.unescape()?;
                text.push_str(&value);
            }
            Event::CData(t) => {
                text.push_str(&String::from_utf8_lossy(t.as_ref()));
            }
            Event::End(_) => {
                let Some(name) = path.pop() else {
                    return Err(Error::Xml("unbalanced closing tag".to_string()));
                };
                let parent = path.last().map(String::as_str);
                let value = collapse_whitespace(&text);
                text.clear();

                match (parent, name.as_str()) {
                    (_, "record") => {
                        if let Some(builder) = current.take()
                            && let Some(record) = builder.build()
                        {
                            records.push(record);
                        }
                    }
                    (_, "resumptionToken") => {
                        if !value.is_empty() {
                            continuation = Some(value);
                        }
                    }
                    (_, "error") => {
                        if error.is_none() {
                            error = Some((std::mem::take(&mut error_code), value));
                        }
                    }
                    (Some("header"), field) => {
                        if let Some(builder) = current.as_mut() {
                            match field {
                                "datestamp" if !value.is_empty() => {
                                    builder.datestamp = Some(value)
                                }
                                "setSpec" if !value.is_empty() => {
                                    builder.set_specs.push(SetSpec::parse(&value))
                                }
                                _ => {}
                            }
                        }
                    }
                    (Some("dc"), field) if !value.is_empty() => {
                        if let Some(builder) = current.as_mut() {
                            let target = match field {
                                "title" => Some(&mut builder.titles),
                                "creator" => Some(&mut builder.creators),
                                "subject" => Some(&mut builder.subjects),
                                "description" => Some(&mut builder.descriptions),
                                "date" => Some(&mut builder.dates),
                                "identifier" => Some(&mut builder.identifiers),
                                _ => None,
                            };
                            if let Some(target) = target {
                                target.push(value);
                            }
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }
        buf.clear();
    }

    if !path.is_empty() {
        return Err(Error::Xml(format!(
            "document ended inside <{}>",
            path.join("/")
        )));
    }
    if !seen_root {
        return Err(Error::Xml("missing OAI-PMH root element".to_string()));
    }

    if let Some((code, message)) = error {
        if code == "noRecordsMatch" {
            return Ok(ParsedPage::NoMoreRecords);
        }
        return Ok(ParsedPage::ProtocolError { code, message });
    }

    Ok(ParsedPage::Page {
        records,
        continuation,
    })
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .map(|a| String::from_utf8_lossy(a.value.as_ref()).into_owned())
}

/// Collapse runs of whitespace (arXiv wraps long titles) into single spaces
fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
