//! Exact code and database cross-reference matching.

use std::collections::{BTreeSet, HashMap};

use tracing::trace;

use obomap_core::{
    ClinicalConcept, EvidenceType, MatchEvidence, MatcherConfig, Provenance, SourceCode,
    VocabularyAliases,
};

use crate::index::OntologyIndex;

/// `(class id, ontology code as written)` pairs, ordered for determinism.
type ClassHits = BTreeSet<(String, String)>;

/// Result of code matching one concept against one ontology.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeMatches {
    pub evidence: Vec<MatchEvidence>,
    /// Clinical codes whose vocabulary has no alias entry and whose bare
    /// code matched nothing.
    pub alias_misses: Vec<SourceCode>,
}

/// Code lookup tables for one ontology, built once.
#[derive(Debug, Clone)]
pub struct CodeMatcher {
    ontology: String,
    /// (canonical vocabulary, code) -> classes
    by_pair: HashMap<(String, String), ClassHits>,
    /// code -> classes, for xrefs whose vocabulary did not resolve
    by_unresolved_code: HashMap<String, ClassHits>,
    /// code -> classes, every xref and class id
    by_code: HashMap<String, ClassHits>,
}

impl CodeMatcher {
    /// Index the cross-references and identifiers of every class.
    pub fn new(index: &OntologyIndex, aliases: &VocabularyAliases) -> Self {
        let mut matcher = Self {
            ontology: index.name().to_string(),
            by_pair: HashMap::new(),
            by_unresolved_code: HashMap::new(),
            by_code: HashMap::new(),
        };

        for class in index.classes() {
            for code in &class.codes {
                let hit = (class.id.clone(), code.to_string());
                matcher.index_bare(code, hit.clone());
                match aliases.canonicalize(&code.vocabulary) {
                    Some(canonical) => matcher.index_pair(canonical, code, hit),
                    None => {
                        matcher
                            .by_unresolved_code
                            .entry(code.code.clone())
                            .or_default()
                            .insert(hit);
                    }
                }
            }
            // The class identifier only matches its own prefix, never a bare code
            // from another resolved vocabulary.
            if let Some(own_id) = SourceCode::parse(&class.id) {
                let hit = (class.id.clone(), own_id.to_string());
                matcher.index_bare(&own_id, hit.clone());
                let vocabulary = aliases
                    .canonicalize(&own_id.vocabulary)
                    .unwrap_or(own_id.vocabulary.as_str())
                    .to_string();
                matcher.index_pair(&vocabulary, &own_id, hit);
            }
        }
        matcher
    }

    fn index_pair(&mut self, vocabulary: &str, code: &SourceCode, hit: (String, String)) {
        self.by_pair
            .entry((vocabulary.to_string(), code.code.clone()))
            .or_default()
            .insert(hit);
    }

    fn index_bare(&mut self, code: &SourceCode, hit: (String, String)) {
        self.by_code.entry(code.code.clone()).or_default().insert(hit);
    }

    pub fn ontology(&self) -> &str {
        &self.ontology
    }

    /// Match every code of a concept: its own codes, ingredient codes, and
    /// (when enabled) ancestor codes.
    pub fn match_concept(
        &self,
        concept: &ClinicalConcept,
        aliases: &VocabularyAliases,
        config: &MatcherConfig,
    ) -> CodeMatches {
        let mut result = CodeMatches::default();
        for (code, provenance) in clinical_codes(concept, config.match_ancestors) {
            let canonical = aliases.canonicalize(&code.vocabulary);
            let filter_name = canonical.unwrap_or(code.vocabulary.as_str());
            if !config.allows_vocabulary(filter_name) {
                continue;
            }

            let hits = self.lookup(code, canonical);
            if hits.is_empty() {
                if canonical.is_none() && code.has_vocabulary() {
                    result.alias_misses.push(code.clone());
                }
                continue;
            }

            trace!(
                clinical_key = %concept.key,
                ontology = %self.ontology,
                code = %code,
                hit_count = hits.len(),
                "Code match"
            );
            for (class_id, ontology_code) in hits {
                result.evidence.push(MatchEvidence::exact(
                    &concept.key,
                    &self.ontology,
                    class_id,
                    EvidenceType::CodeExact,
                    provenance,
                    (code.to_string(), ontology_code),
                ));
            }
        }
        result.alias_misses.sort();
        result.alias_misses.dedup();
        result
    }

    /// Classes reached by one clinical code.
    ///
    /// A resolved vocabulary is matched on the `(vocabulary, code)` pair,
    /// plus bare-code matches against xrefs whose own vocabulary did not
    /// resolve. An unresolved vocabulary falls back to bare-code matching
    /// against every ontology code.
    fn lookup(&self, code: &SourceCode, canonical: Option<&str>) -> ClassHits {
        let mut hits = ClassHits::new();
        match canonical {
            Some(vocabulary) => {
                if let Some(found) = self.by_pair.get(&(vocabulary.to_string(), code.code.clone())) {
                    hits.extend(found.iter().cloned());
                }
                if let Some(found) = self.by_unresolved_code.get(&code.code) {
                    hits.extend(found.iter().cloned());
                }
            }
            None => {
                if let Some(found) = self.by_code.get(&code.code) {
                    hits.extend(found.iter().cloned());
                }
            }
        }
        hits
    }
}

/// Codes of a concept tagged with where they came from.
fn clinical_codes(
    concept: &ClinicalConcept,
    include_ancestors: bool,
) -> Vec<(&SourceCode, Provenance)> {
    let mut codes: Vec<(&SourceCode, Provenance)> = concept
        .codes
        .iter()
        .map(|c| (c, Provenance::Concept))
        .collect();
    if let Some(ingredient) = &concept.ingredient {
        codes.extend(ingredient.codes.iter().map(|c| (c, Provenance::Ingredient)));
    }
    if include_ancestors {
        let mut ancestors: Vec<_> = concept.ancestors.iter().collect();
        ancestors.sort_by_key(|a| a.level);
        for ancestor in ancestors {
            codes.extend(ancestor.codes.iter().map(|c| (c, Provenance::Ancestor)));
        }
    }
    codes
}

#[cfg(test)]
mod tests {
    use super::*;
    use obomap_core::{ClinicalDomain, Ingredient, OntologyClass};

    fn hp_index() -> OntologyIndex {
        OntologyIndex::new(
            "hp",
            vec![
                OntologyClass::new("HP:0010837", "Increased overbite").with_xref("SNOMED:70305005"),
                OntologyClass::new("HP:0000692", "Abnormality of dental position")
                    .with_xref("SNOMEDCT_US:1234")
                    .with_xref("MADEUP:5555"),
                OntologyClass::new("HP:0000118", "Phenotypic abnormality"),
            ],
        )
        .unwrap()
    }

    fn matcher() -> (CodeMatcher, VocabularyAliases) {
        let aliases = VocabularyAliases::with_defaults();
        (CodeMatcher::new(&hp_index(), &aliases), aliases)
    }

    #[test]
    fn test_exact_code_match() {
        let (matcher, aliases) = matcher();
        let concept = ClinicalConcept::new("70305005", ClinicalDomain::Condition, "Horizontal overbite")
            .with_code("SNOMED:70305005");
        let result = matcher.match_concept(&concept, &aliases, &MatcherConfig::default());

        assert_eq!(result.evidence.len(), 1);
        let e = &result.evidence[0];
        assert_eq!(e.ontology_class, "HP:0010837");
        assert_eq!(e.evidence_type, EvidenceType::CodeExact);
        assert_eq!(e.score, 1.0);
        assert_eq!(e.provenance, Provenance::Concept);
    }

    #[test]
    fn test_vocabulary_naming_variants_match() {
        let (matcher, aliases) = matcher();
        let concept = ClinicalConcept::new("1", ClinicalDomain::Condition, "x")
            .with_code("http://purl.bioontology.org/ontology/SNOMEDCT/70305005")
            .with_code("snomedct_us:1234");
        let result = matcher.match_concept(&concept, &aliases, &MatcherConfig::default());
        let classes: BTreeSet<&str> = result
            .evidence
            .iter()
            .map(|e| e.ontology_class.as_str())
            .collect();
        assert_eq!(classes, BTreeSet::from(["HP:0000692", "HP:0010837"]));
    }

    #[test]
    fn test_different_vocabulary_same_code_does_not_match() {
        let (matcher, aliases) = matcher();
        let concept =
            ClinicalConcept::new("1", ClinicalDomain::Condition, "x").with_code("ICD10CM:70305005");
        let result = matcher.match_concept(&concept, &aliases, &MatcherConfig::default());
        assert!(result.evidence.is_empty());
        assert!(result.alias_misses.is_empty());
    }

    #[test]
    fn test_unresolved_ontology_vocabulary_matches_bare_code() {
        let (matcher, aliases) = matcher();
        let concept =
            ClinicalConcept::new("1", ClinicalDomain::Condition, "x").with_code("MSH:5555");
        let result = matcher.match_concept(&concept, &aliases, &MatcherConfig::default());
        assert_eq!(result.evidence.len(), 1);
        assert_eq!(result.evidence[0].ontology_class, "HP:0000692");
    }

    #[test]
    fn test_unknown_clinical_vocabulary_falls_back_to_bare_code() {
        let (matcher, aliases) = matcher();
        let concept =
            ClinicalConcept::new("1", ClinicalDomain::Condition, "x").with_code("LOCALVOCAB:70305005");
        let result = matcher.match_concept(&concept, &aliases, &MatcherConfig::default());
        assert_eq!(result.evidence.len(), 1);
        assert!(result.alias_misses.is_empty());
    }

    #[test]
    fn test_alias_miss_reported() {
        let (matcher, aliases) = matcher();
        let concept =
            ClinicalConcept::new("1", ClinicalDomain::Condition, "x").with_code("LOCALVOCAB:42");
        let result = matcher.match_concept(&concept, &aliases, &MatcherConfig::default());
        assert!(result.evidence.is_empty());
        assert_eq!(result.alias_misses, vec![SourceCode::new("LOCALVOCAB", "42")]);
    }

    #[test]
    fn test_class_identifier_is_matchable() {
        let (matcher, aliases) = matcher();
        let concept =
            ClinicalConcept::new("1", ClinicalDomain::Condition, "x").with_code("HP_0000118");
        let result = matcher.match_concept(&concept, &aliases, &MatcherConfig::default());
        assert_eq!(result.evidence[0].ontology_class, "HP:0000118");
    }

    #[test]
    fn test_class_identifier_not_reached_from_other_vocabulary() {
        let (matcher, aliases) = matcher();
        let concept =
            ClinicalConcept::new("1", ClinicalDomain::Condition, "x").with_code("SNOMED:0000118");
        let result = matcher.match_concept(&concept, &aliases, &MatcherConfig::default());
        assert!(result.evidence.is_empty());
    }

    #[test]
    fn test_ancestor_codes_marked() {
        let (matcher, aliases) = matcher();
        let concept = ClinicalConcept::new("1", ClinicalDomain::Condition, "x")
            .with_code("SNOMED:0000")
            .with_ancestor(0, &["SNOMED:1234"], None);

        let result = matcher.match_concept(&concept, &aliases, &MatcherConfig::default());
        assert_eq!(result.evidence.len(), 1);
        assert_eq!(result.evidence[0].provenance, Provenance::Ancestor);
        assert_eq!(result.evidence[0].score, 1.0);

        let off = MatcherConfig::default().with_match_ancestors(false);
        assert!(matcher.match_concept(&concept, &aliases, &off).evidence.is_empty());
    }

    #[test]
    fn test_ingredient_codes_marked() {
        let (matcher, aliases) = matcher();
        let concept = ClinicalConcept::new("1", ClinicalDomain::Drug, "x")
            .with_ingredient(Ingredient::new("9", "y").with_code("SNOMED:70305005"));
        let result = matcher.match_concept(&concept, &aliases, &MatcherConfig::default());
        assert_eq!(result.evidence[0].provenance, Provenance::Ingredient);
    }

    #[test]
    fn test_vocabulary_filter() {
        let (matcher, aliases) = matcher();
        let concept = ClinicalConcept::new("1", ClinicalDomain::Condition, "x")
            .with_code("SNOMED:70305005");
        let config = MatcherConfig::default().with_vocabulary_filter(&["ICD10CM"]);
        assert!(matcher.match_concept(&concept, &aliases, &config).evidence.is_empty());

        let config = MatcherConfig::default().with_vocabulary_filter(&["SNOMEDCT_US"]);
        assert_eq!(matcher.match_concept(&concept, &aliases, &config).evidence.len(), 1);
    }
}
