//! Per-record diagnostics collected during a mapping run.
//!
//! Record-level problems never abort a run. They are recorded here and the
//! affected record is skipped or left unmapped.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Record skipped because a required field was missing
    InputShape,
    /// Clinical vocabulary name did not resolve through the alias table
    VocabularyAliasMiss,
    /// Requested ontology is not loaded
    MissingOntology,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::InputShape => "input_shape",
            DiagnosticKind::VocabularyAliasMiss => "vocabulary_alias_miss",
            DiagnosticKind::MissingOntology => "missing_ontology",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Clinical key (or class id) of the affected record, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ontology: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn input_shape(record_key: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::InputShape,
            record_key: record_key.filter(|k| !k.trim().is_empty()).map(str::to_string),
            ontology: None,
            message: message.into(),
        }
    }

    /// Input-shape diagnostic built from a record-level error.
    pub fn from_error(record_key: Option<&str>, error: &Error) -> Self {
        Self::input_shape(record_key, error.to_string())
    }

    pub fn alias_miss(record_key: &str, vocabulary: &str) -> Self {
        Self {
            kind: DiagnosticKind::VocabularyAliasMiss,
            record_key: Some(record_key.to_string()),
            ontology: None,
            message: format!("vocabulary '{}' has no alias entry", vocabulary),
        }
    }

    pub fn missing_ontology(ontology: &str) -> Self {
        Self {
            kind: DiagnosticKind::MissingOntology,
            record_key: None,
            ontology: Some(ontology.to_string()),
            message: format!("ontology '{}' is not loaded", ontology),
        }
    }

    pub fn with_ontology(mut self, ontology: &str) -> Self {
        self.ontology = Some(ontology.to_string());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind.as_str())?;
        if let Some(key) = &self.record_key {
            write!(f, " {}", key)?;
        }
        if let Some(ontology) = &self.ontology {
            write!(f, " ({})", ontology)?;
        }
        write!(f, ": {}", self.message)
    }
}
