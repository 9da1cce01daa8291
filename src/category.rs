//! Taxonomy handling for OAI `setSpec` values
//!
//! arXiv publishes classification sets as colon-delimited paths such as
//! `cs`, `physics:hep-th` or `cs:cs:AI`. [`SetSpec`] splits one of these into
//! its trailing `(archive, subclass)` pair. The same parse feeds both the
//! record's normalized `categories` and the [`CategoryFilter`] match rules.

use std::fmt;

/// One parsed classification-set string
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetSpec {
    raw: String,
    archive: Option<String>,
    subclass: String,
}

impl SetSpec {
    /// Parse a raw `setSpec` value
    pub fn parse(raw: &str) -> Self {
        let mut segments = raw.rsplit(':');
        let subclass = segments.next().unwrap_or_default().to_string();
        let archive = segments.next().map(str::to_string);
        Self {
            raw: raw.to_string(),
            archive,
            subclass,
        }
    }

    /// The value exactly as the repository sent it
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Second-to-last path segment, if the path has more than one
    pub fn archive(&self) -> Option<&str> {
        self.archive.as_deref()
    }

    /// Last path segment
    pub fn subclass(&self) -> &str {
        &self.subclass
    }

    /// Normalized taxonomy code: `archive.subclass`, or the lone segment
    pub fn normalized(&self) -> String {
        match &self.archive {
            Some(archive) => format!("{}.{}", archive, self.subclass),
            None => self.subclass.clone(),
        }
    }
}

impl fmt::Display for SetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Deduplicated, sorted taxonomy codes for a list of set specs
pub fn normalize_categories(specs: &[SetSpec]) -> Vec<String> {
    let mut categories: Vec<String> = specs.iter().map(SetSpec::normalized).collect();
    categories.sort();
    categories.dedup();
    categories
}

/// A filter entry as given by the caller
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CategoryCode {
    /// `archive.subclass`, e.g. `cs.AI`
    Qualified {
        /// Archive part (`cs`)
        archive: String,
        /// Subject class part (`AI`)
        subclass: String,
    },
    /// Anything else, matched as a substring of the raw set spec
    ///
    /// `cs` also matches `xcs y`.
    Loose(String),
}

impl CategoryCode {
    /// Parse a caller-supplied code
    pub fn parse(code: &str) -> Self {
        let parts: Vec<&str> = code.split('.').collect();
        match parts.as_slice() {
            [archive, subclass] => CategoryCode::Qualified {
                archive: (*archive).to_string(),
                subclass: (*subclass).to_string(),
            },
            _ => CategoryCode::Loose(code.to_string()),
        }
    }

    /// Top-level archive this code belongs to
    pub fn archive(&self) -> &str {
        match self {
            CategoryCode::Qualified { archive, .. } => archive,
            CategoryCode::Loose(code) => code.split('.').next().unwrap_or(code),
        }
    }

    /// Whether one set spec satisfies this code
    ///
    /// A qualified code needs the spec to be exactly `archive:subclass` or to
    /// end with `:archive:subclass`.
    pub fn matches(&self, spec: &SetSpec) -> bool {
        match self {
            CategoryCode::Qualified { archive, subclass } => {
                let pair = format!("{archive}:{subclass}");
                let raw = spec.raw();
                raw == pair
                    || raw
                        .strip_suffix(pair.as_str())
                        .is_some_and(|head| head.ends_with(':'))
            }
            CategoryCode::Loose(code) => spec.raw().contains(code.as_str()),
        }
    }
}

impl fmt::Display for CategoryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryCode::Qualified { archive, subclass } => write!(f, "{archive}.{subclass}"),
            CategoryCode::Loose(code) => f.write_str(code),
        }
    }
}

/// OR-combination of category codes; empty matches everything
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategoryFilter {
    codes: Vec<CategoryCode>,
}

impl CategoryFilter {
    /// Build a filter from codes such as `["cs.AI", "cs.LG"]`
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            codes: codes
                .into_iter()
                .map(|c| CategoryCode::parse(c.as_ref()))
                .collect(),
        }
    }

    /// Filter that accepts every record
    pub fn all() -> Self {
        Self::default()
    }

    /// Parsed codes
    pub fn codes(&self) -> &[CategoryCode] {
        &self.codes
    }

    /// True when no codes were given
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Whether any code matches any of the record's set specs
    pub fn matches(&self, specs: &[SetSpec]) -> bool {
        if self.codes.is_empty() {
            return true;
        }
        self.codes
            .iter()
            .any(|code| specs.iter().any(|spec| code.matches(spec)))
    }

    /// OAI `set` to request, taken from the first code's archive
    ///
    /// All codes are assumed to live under the same top-level set.
    pub fn top_level_set(&self) -> Option<&str> {
        self.codes.first().map(CategoryCode::archive)
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.codes.is_empty() {
            return f.write_str("All");
        }
        let joined: Vec<String> = self.codes.iter().map(ToString::to_string).collect();
        f.write_str(&joined.join(", "))
    }
}
