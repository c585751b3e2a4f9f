//! Exact normalized label and synonym matching.

use std::collections::{BTreeSet, HashMap};

use tracing::trace;

use obomap_core::{ClinicalConcept, EvidenceType, MatchEvidence, Provenance};

use crate::index::OntologyIndex;
use crate::normalize::normalize;

/// Field of the clinical record a string came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringField {
    Label,
    Synonym,
}

impl StringField {
    fn evidence_type(self) -> EvidenceType {
        match self {
            StringField::Label => EvidenceType::LabelExact,
            StringField::Synonym => EvidenceType::SynonymExact,
        }
    }
}

/// One clinical string to match.
#[derive(Debug, Clone, PartialEq)]
pub struct ClinicalString<'a> {
    pub text: &'a str,
    pub field: StringField,
    pub provenance: Provenance,
}

/// Label, synonyms, ingredient strings and, optionally, ancestor labels.
pub fn clinical_strings(concept: &ClinicalConcept, include_ancestors: bool) -> Vec<ClinicalString<'_>> {
    let mut strings = vec![ClinicalString {
        text: concept.label.as_str(),
        field: StringField::Label,
        provenance: Provenance::Concept,
    }];
    strings.extend(concept.synonyms.iter().map(|s| ClinicalString {
        text: s.as_str(),
        field: StringField::Synonym,
        provenance: Provenance::Concept,
    }));
    if let Some(ingredient) = &concept.ingredient {
        strings.push(ClinicalString {
            text: ingredient.label.as_str(),
            field: StringField::Label,
            provenance: Provenance::Ingredient,
        });
        strings.extend(ingredient.synonyms.iter().map(|s| ClinicalString {
            text: s.as_str(),
            field: StringField::Synonym,
            provenance: Provenance::Ingredient,
        }));
    }
    if include_ancestors {
        let mut ancestors: Vec<_> = concept.ancestors.iter().collect();
        ancestors.sort_by_key(|a| a.level);
        strings.extend(ancestors.into_iter().filter_map(|a| {
            a.label.as_deref().map(|text| ClinicalString {
                text,
                field: StringField::Label,
                provenance: Provenance::Ancestor,
            })
        }));
    }
    strings.retain(|s| !s.text.trim().is_empty());
    strings
}

/// Normalized string index for one ontology, built once.
#[derive(Debug, Clone)]
pub struct StringMatcher {
    ontology: String,
    /// normalized string -> (class id, ontology string as written)
    index: HashMap<String, BTreeSet<(String, String)>>,
}

impl StringMatcher {
    pub fn new(index: &OntologyIndex) -> Self {
        let mut strings: HashMap<String, BTreeSet<(String, String)>> = HashMap::new();
        for class in index.classes() {
            for text in std::iter::once(&class.label).chain(class.synonyms.iter()) {
                let key = normalize(text);
                if key.is_empty() {
                    continue;
                }
                strings
                    .entry(key)
                    .or_default()
                    .insert((class.id.clone(), text.clone()));
            }
        }
        Self {
            ontology: index.name().to_string(),
            index: strings,
        }
    }

    pub fn ontology(&self) -> &str {
        &self.ontology
    }

    /// Number of distinct normalized strings.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Exact post-normalization matches for the concept's strings.
    pub fn match_concept(
        &self,
        concept: &ClinicalConcept,
        include_ancestors: bool,
    ) -> Vec<MatchEvidence> {
        let mut evidence = Vec::new();
        for clinical in clinical_strings(concept, include_ancestors) {
            let Some(hits) = self.index.get(&normalize(clinical.text)) else {
                continue;
            };
            trace!(
                clinical_key = %concept.key,
                ontology = %self.ontology,
                hit_count = hits.len(),
                "String match"
            );
            for (class_id, ontology_string) in hits {
                evidence.push(MatchEvidence::exact(
                    &concept.key,
                    &self.ontology,
                    class_id.as_str(),
                    clinical.field.evidence_type(),
                    clinical.provenance,
                    (clinical.text.to_string(), ontology_string.clone()),
                ));
            }
        }
        evidence
    }
}
