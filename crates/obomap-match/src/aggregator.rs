//! Merge evidence from all matchers into ranked concept mappings.
//!
//! Each ontology class appears once per ontology, represented by its
//! strongest evidence. The other evidence types that reached the same class
//! are kept as `corroborating` so nothing is lost for auditing.

use std::collections::BTreeMap;

use tracing::trace;

use obomap_core::{ClinicalDomain, ConceptMapping, EvidenceType, MatchEvidence};

/// Build a ranked mapping from raw evidence.
///
/// Evidence for other clinical keys is ignored. Ontologies without
/// evidence are left out, so a concept with no evidence at all yields an
/// unmapped (empty) mapping.
pub fn aggregate(
    clinical_key: &str,
    domain: ClinicalDomain,
    evidence: impl IntoIterator<Item = MatchEvidence>,
) -> ConceptMapping {
    let mut grouped: BTreeMap<String, BTreeMap<String, Vec<MatchEvidence>>> = BTreeMap::new();
    for e in evidence {
        if e.clinical_key != clinical_key {
            continue;
        }
        grouped
            .entry(e.ontology.clone())
            .or_default()
            .entry(e.ontology_class.clone())
            .or_default()
            .push(e);
    }

    let mut mapping = ConceptMapping::unmapped(clinical_key, domain);
    for (ontology, classes) in grouped {
        let mut ranked: Vec<MatchEvidence> =
            classes.into_values().filter_map(collapse).collect();
        rank(&mut ranked);
        trace!(
            clinical_key = %clinical_key,
            ontology = %ontology,
            evidence_count = ranked.len(),
            "Aggregated evidence"
        );
        mapping.mappings.insert(ontology, ranked);
    }
    mapping
}

/// Re-run aggregation over a mapping's own evidence.
///
/// Returns an equal mapping; aggregation is idempotent.
pub fn reaggregate(mapping: &ConceptMapping) -> ConceptMapping {
    aggregate(&mapping.clinical_key, mapping.domain, mapping.iter().cloned())
}

/// Sort evidence into ranking order (see [`MatchEvidence::rank_cmp`]).
pub fn rank(evidence: &mut [MatchEvidence]) {
    evidence.sort_by(|a, b| a.rank_cmp(b));
}

/// Collapse all evidence for one class into its strongest entry.
fn collapse(mut group: Vec<MatchEvidence>) -> Option<MatchEvidence> {
    rank(&mut group);
    let mut iter = group.into_iter();
    let mut best = iter.next()?;
    let mut corroborating: Vec<EvidenceType> = std::mem::take(&mut best.corroborating);
    for other in iter {
        corroborating.push(other.evidence_type);
        corroborating.extend(other.corroborating);
    }
    corroborating.retain(|t| *t != best.evidence_type);
    corroborating.sort();
    corroborating.dedup();
    best.corroborating = corroborating;
    Some(best)
}
