//! Source code parsing and vocabulary alias normalization.
//!
//! Clinical records and ontology cross-references name the same vocabulary
//! in different ways ("SNOMED", "SNOMEDCT_US", a BioPortal IRI, ...). Codes
//! are reduced to a `(vocabulary, code)` pair and vocabularies are mapped to
//! a canonical tag through [`VocabularyAliases`].

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::table::{display_row, read_rows};

/// A vocabulary-qualified code with prefixes and namespaces stripped.
///
/// The vocabulary is upper-cased and the code lower-cased so that
/// comparisons are case-insensitive. An empty vocabulary means the raw value
/// carried no vocabulary tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceCode {
    pub vocabulary: String,
    pub code: String,
}

impl SourceCode {
    pub fn new(vocabulary: impl AsRef<str>, code: impl AsRef<str>) -> Self {
        Self {
            vocabulary: vocabulary.as_ref().trim().to_uppercase(),
            code: code.as_ref().trim().to_lowercase(),
        }
    }

    /// Parse a raw code string.
    ///
    /// Accepted shapes:
    /// - `SNOMED:70305005`, `snomedct_us:70305005` (prefix before the first colon)
    /// - `http://purl.bioontology.org/ontology/SNOMEDCT/70305005` (vocabulary is
    ///   the path segment before the code)
    /// - `https://identifiers.org/snomedct:70305005` (prefixed last segment)
    /// - `http://purl.obolibrary.org/obo/HP_0000118` and `HP_0000118` (OBO style)
    /// - `70305005` (bare code, empty vocabulary)
    ///
    /// Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Some(pos) = raw.find("://") {
            let segments: Vec<&str> = raw[pos + 3..]
                .split(['/', '#'])
                .filter(|s| !s.is_empty())
                .collect();
            let last = *segments.last()?;
            if let Some((prefix, local)) = last.split_once(':') {
                if !prefix.is_empty() && !local.is_empty() {
                    return Some(Self::new(prefix, local));
                }
            }
            if let Some((prefix, local)) = split_obo_local(last) {
                return Some(Self::new(prefix, local));
            }
            // The first segment is the host, never a vocabulary.
            if segments.len() >= 3 {
                return Some(Self::new(segments[segments.len() - 2], last));
            }
            return Some(Self::new("", last));
        }

        if let Some((vocabulary, code)) = raw.split_once(':') {
            if !code.trim().is_empty() {
                return Some(Self::new(vocabulary, code));
            }
            return None;
        }

        if let Some((prefix, local)) = split_obo_local(raw) {
            return Some(Self::new(prefix, local));
        }

        Some(Self::new("", raw))
    }

    /// Whether the code carries a vocabulary tag.
    pub fn has_vocabulary(&self) -> bool {
        !self.vocabulary.is_empty()
    }
}

impl fmt::Display for SourceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.vocabulary.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{}:{}", self.vocabulary, self.code)
        }
    }
}

/// Split an OBO local identifier such as `HP_0000118` into prefix and local part.
///
/// The prefix must be alphabetic and the local part must contain a digit, so
/// vocabulary names like `SNOMEDCT_US` are not mistaken for codes.
fn split_obo_local(value: &str) -> Option<(&str, &str)> {
    let (prefix, local) = value.rsplit_once('_')?;
    let prefix_ok = !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_alphabetic());
    let local_ok = !local.is_empty()
        && local.chars().all(|c| c.is_ascii_alphanumeric())
        && local.chars().any(|c| c.is_ascii_digit());
    if prefix_ok && local_ok {
        Some((prefix, local))
    } else {
        None
    }
}

/// Normalize a vocabulary name into an alias-table key.
fn alias_key(vocabulary: &str) -> String {
    vocabulary
        .trim()
        .to_uppercase()
        .chars()
        .map(|c| if c == '-' || c == ' ' { '_' } else { c })
        .collect()
}

/// Built-in aliases: (canonical tag, variants).
const DEFAULT_ALIASES: &[(&str, &[&str])] = &[
    (
        "SNOMEDCT_US",
        &["SNOMED", "SNOMEDCT", "SNOMED_CT", "SNOMEDCT_US", "SCTID"],
    ),
    ("ICD10CM", &["ICD10CM", "ICD10_CM", "ICD_10_CM"]),
    ("ICD10", &["ICD10", "ICD_10"]),
    ("ICD9CM", &["ICD9CM", "ICD9_CM", "ICD_9_CM", "ICD9"]),
    ("MSH", &["MESH", "MSH"]),
    ("UMLS", &["UMLS", "UMLS_CUI", "CUI"]),
    ("RXNORM", &["RXNORM", "RXCUI"]),
    ("LNC", &["LOINC", "LNC"]),
    ("NCI", &["NCIT", "NCI", "NCI_THESAURUS"]),
    ("MDR", &["MEDDRA", "MDR"]),
    ("OMIM", &["OMIM", "MIM"]),
    ("DOID", &["DOID", "DO"]),
    ("ORPHANET", &["ORPHANET", "ORDO", "ORPHA"]),
    ("DRUGBANK", &["DRUGBANK"]),
];

static DEFAULT_TABLE: Lazy<VocabularyAliases> = Lazy::new(|| {
    let mut table = VocabularyAliases::new();
    for (canonical, variants) in DEFAULT_ALIASES {
        for variant in *variants {
            table.insert(variant, canonical);
        }
    }
    table
});

/// Mapping from raw vocabulary name variants to a canonical vocabulary tag.
///
/// Loaded once and shared read-only across matchers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VocabularyAliases {
    aliases: HashMap<String, String>,
}

impl VocabularyAliases {
    /// Create an empty alias table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an alias table with the built-in clinical vocabulary variants.
    pub fn with_defaults() -> Self {
        DEFAULT_TABLE.clone()
    }

    /// Register `alias` as a variant of `canonical`.
    ///
    /// The canonical tag is also registered as an alias of itself.
    pub fn insert(&mut self, alias: &str, canonical: &str) {
        let canonical = alias_key(canonical);
        self.aliases.insert(alias_key(alias), canonical.clone());
        self.aliases.entry(canonical.clone()).or_insert(canonical);
    }

    /// Resolve a vocabulary name to its canonical tag.
    ///
    /// Returns `None` for an empty vocabulary or one with no alias entry.
    pub fn canonicalize(&self, vocabulary: &str) -> Option<&str> {
        if vocabulary.trim().is_empty() {
            return None;
        }
        self.aliases.get(&alias_key(vocabulary)).map(String::as_str)
    }

    /// Parse an alias table from comma-separated text.
    ///
    /// The first line is a header. Each following row is `alias,canonical`;
    /// fields may be quoted, and blank lines and lines starting with `#`
    /// are ignored.
    pub fn from_csv(text: &str) -> Result<Self> {
        let mut table = Self::new();
        for (line, record) in read_rows("vocabulary alias table", text)? {
            match (record.get(0), record.get(1)) {
                (Some(alias), Some(canonical)) if !alias.is_empty() && !canonical.is_empty() => {
                    table.insert(alias, canonical);
                }
                _ => {
                    return Err(Error::InvalidInput(format!(
                        "vocabulary alias row {} must be 'alias,canonical': {}",
                        line,
                        display_row(&record)
                    )));
                }
            }
        }
        debug!(alias_count = table.len(), "Parsed vocabulary alias table");
        Ok(table)
    }

    /// Merge another table into this one; entries from `other` win.
    pub fn extend(&mut self, other: &VocabularyAliases) {
        for (alias, canonical) in &other.aliases {
            self.aliases.insert(alias.clone(), canonical.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
