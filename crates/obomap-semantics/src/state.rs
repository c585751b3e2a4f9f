//! Per-concept assembly state.
//!
//! A concept starts `Unresolved`, becomes `Partial` once any ontology
//! resolves, and reaches `Complete` when every ontology referenced by its
//! domain's relation rules has resolved. States never move backwards.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyState {
    Unresolved,
    Partial,
    Complete,
}

impl AssemblyState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssemblyState::Unresolved => "unresolved",
            AssemblyState::Partial => "partial",
            AssemblyState::Complete => "complete",
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, AssemblyState::Complete)
    }
}

impl fmt::Display for AssemblyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks which required ontologies have resolved for one concept.
#[derive(Debug, Clone)]
pub struct AssemblyProgress<'a> {
    required: BTreeSet<&'a str>,
    resolved: BTreeSet<&'a str>,
    state: AssemblyState,
}

impl<'a> AssemblyProgress<'a> {
    /// Start tracking against the ontologies a domain's rules reference.
    ///
    /// An empty requirement set can never complete.
    pub fn new(required: BTreeSet<&'a str>) -> Self {
        Self {
            required,
            resolved: BTreeSet::new(),
            state: AssemblyState::Unresolved,
        }
    }

    /// Record that `ontology` has at least one mapping and return the new state.
    pub fn resolve(&mut self, ontology: &'a str) -> AssemblyState {
        self.resolved.insert(ontology);
        let next = if !self.required.is_empty() && self.required.is_subset(&self.resolved) {
            AssemblyState::Complete
        } else {
            AssemblyState::Partial
        };
        self.state = self.state.max(next);
        self.state
    }

    pub fn state(&self) -> AssemblyState {
        self.state
    }

    pub fn is_resolved(&self, ontology: &str) -> bool {
        self.resolved.contains(ontology)
    }

    /// Required ontologies still without a mapping.
    pub fn missing(&self) -> Vec<&'a str> {
        self.required.difference(&self.resolved).copied().collect()
    }
}
