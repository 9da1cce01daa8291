//! OAI-PMH protocol surface
//!
//! Only the `ListRecords` verb is used. A harvest starts with a date-range
//! request and continues with bare resumption-token requests until the
//! repository stops returning tokens.
//!
//! ## Usage
//!
//! ```
//! use arxiv_harvest::oai::{ParsedPage, parse_page};
//!
//! let body = br#"<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">
//!   <error code="noRecordsMatch">No records</error>
//! </OAI-PMH>"#;
//!
//! assert_eq!(parse_page(body).unwrap(), ParsedPage::NoMoreRecords);
//! ```

mod parser;
mod request;

pub use parser::{ParsedPage, parse_page};
pub use request::OaiRequest;
