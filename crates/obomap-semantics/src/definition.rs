//! Semantic definition types.

use serde::{Deserialize, Serialize};

use obomap_core::defaults::OBO_PURL;
use obomap_core::{ClinicalDomain, EvidenceType};

use crate::state::AssemblyState;

/// Expand a prefixed class identifier (`HP:0010837`) to its OBO PURL.
///
/// Identifiers that already are IRIs are returned unchanged.
pub fn class_iri(id: &str) -> String {
    if id.contains("://") {
        id.to_string()
    } else {
        format!("{}{}", OBO_PURL, id.trim().replace(':', "_"))
    }
}

/// Mapped classes of a concept within one ontology, in rank order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleOntologyDefinition {
    pub ontology: String,
    /// Distinct class identifiers, highest-ranked first
    pub classes: Vec<String>,
    /// Evidence type of the top-ranked class
    pub evidence_type: EvidenceType,
}

impl SingleOntologyDefinition {
    pub fn top_class(&self) -> Option<&str> {
        self.classes.first().map(String::as_str)
    }
}

/// One cross-ontology edge, with every term as a full IRI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

/// Semantic definition of one clinical concept.
///
/// `triples` and `superclasses` are populated only in the
/// [`AssemblyState::Complete`] state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticDefinition {
    pub clinical_key: String,
    pub domain: ClinicalDomain,
    pub state: AssemblyState,
    pub single: Vec<SingleOntologyDefinition>,
    #[serde(default)]
    pub triples: Vec<Triple>,
    #[serde(default)]
    pub superclasses: Vec<String>,
}

impl SemanticDefinition {
    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    pub fn single_for(&self, ontology: &str) -> Option<&SingleOntologyDefinition> {
        self.single.iter().find(|s| s.ontology == ontology)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_iri() {
        assert_eq!(
            class_iri("CHEBI:15365"),
            "http://purl.obolibrary.org/obo/CHEBI_15365"
        );
        assert_eq!(
            class_iri("http://purl.obolibrary.org/obo/VO_0000047"),
            "http://purl.obolibrary.org/obo/VO_0000047"
        );
        assert_eq!(class_iri("HP_0000118"), "http://purl.obolibrary.org/obo/HP_0000118");
    }

    #[test]
    fn test_definition_serde() {
        let definition = SemanticDefinition {
            clinical_key: "1".to_string(),
            domain: ClinicalDomain::Drug,
            state: AssemblyState::Partial,
            single: vec![SingleOntologyDefinition {
                ontology: "chebi".to_string(),
                classes: vec!["CHEBI:15365".to_string()],
                evidence_type: EvidenceType::CodeExact,
            }],
            triples: Vec::new(),
            superclasses: Vec::new(),
        };
        let json = serde_json::to_string(&definition).unwrap();
        assert!(json.contains("\"state\":\"partial\""));
        let back: SemanticDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, definition);
        assert_eq!(back.single_for("chebi").unwrap().top_class(), Some("CHEBI:15365"));
    }
}
