//! Ontology hierarchy expansion.
//!
//! A broad clinical concept ("cleft lip") that matches an ontology class
//! directly is also linked to that class's subclasses, so downstream users
//! can pick a more precise class. Expanded evidence carries
//! [`Provenance::Child`] and ranks below every direct and ancestor match of
//! the same evidence type.

use std::collections::BTreeSet;

use tracing::trace;

use obomap_core::{MatchEvidence, Provenance};

use crate::index::OntologyIndex;

/// Child evidence for the subclasses of directly matched classes.
///
/// Seeds are exact evidence with direct provenance; ancestor-derived,
/// similarity and already-expanded evidence never seed. Subclasses that
/// are themselves directly matched are left to their own evidence. The
/// expanded entry keeps the seed's evidence type and clinical string, with
/// the seed class as its ontology string.
pub fn expand_children(
    index: &OntologyIndex,
    evidence: &[MatchEvidence],
    depth: u32,
) -> Vec<MatchEvidence> {
    let seeds: Vec<&MatchEvidence> = evidence
        .iter()
        .filter(|e| e.evidence_type.is_exact() && e.provenance.is_direct())
        .collect();
    let direct: BTreeSet<&str> = seeds.iter().map(|e| e.ontology_class.as_str()).collect();

    let mut expanded = Vec::new();
    for seed in seeds {
        for child in index.descendants(&seed.ontology_class, depth) {
            if direct.contains(child) {
                continue;
            }
            trace!(
                clinical_key = %seed.clinical_key,
                ontology = %index.name(),
                class = %seed.ontology_class,
                child = child,
                "Subclass of direct match"
            );
            expanded.push(MatchEvidence::exact(
                &seed.clinical_key,
                index.name(),
                child,
                seed.evidence_type,
                Provenance::Child,
                (seed.clinical_string.clone(), seed.ontology_class.clone()),
            ));
        }
    }
    expanded
}
