//! Core data models for obomap.
//!
//! These types are shared across all obomap crates: normalized clinical
//! records, ontology classes, and the evidence that links them.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::defaults::MEASUREMENT_KEY_SEPARATOR;
use crate::error::{Error, Result};
use crate::vocabulary::SourceCode;

// =============================================================================
// CLINICAL SIDE
// =============================================================================

/// Clinical domain a concept record belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ClinicalDomain {
    Condition,
    Drug,
    Measurement,
}

impl ClinicalDomain {
    pub const ALL: [ClinicalDomain; 3] = [
        ClinicalDomain::Condition,
        ClinicalDomain::Drug,
        ClinicalDomain::Measurement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClinicalDomain::Condition => "condition",
            ClinicalDomain::Drug => "drug",
            ClinicalDomain::Measurement => "measurement",
        }
    }
}

impl fmt::Display for ClinicalDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClinicalDomain {
    type Err = Error;

    /// Accepts singular and plural spellings, case-insensitive
    /// ("condition", "Conditions", "drugs", ...).
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "condition" | "conditions" | "condition_occurrence" => Ok(ClinicalDomain::Condition),
            "drug" | "drugs" | "drug_exposure" => Ok(ClinicalDomain::Drug),
            "measurement" | "measurements" => Ok(ClinicalDomain::Measurement),
            other => Err(Error::InvalidInput(format!(
                "unknown clinical domain: {}",
                other
            ))),
        }
    }
}

/// Ancestor of a clinical concept in its source vocabulary hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AncestorRecord {
    /// Codes of the ancestor concept
    #[serde(default)]
    pub codes: Vec<SourceCode>,
    /// Ancestor label, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Distance from the concept (0 = direct parent)
    #[serde(default)]
    pub level: u32,
}

/// Drug ingredient sub-concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: String,
    #[serde(default)]
    pub codes: Vec<SourceCode>,
    pub label: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

impl Ingredient {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            codes: Vec::new(),
            label: label.into(),
            synonyms: Vec::new(),
        }
    }

    pub fn with_code(mut self, raw: &str) -> Self {
        if let Some(code) = SourceCode::parse(raw) {
            self.codes.push(code);
        }
        self
    }

    pub fn with_synonym(mut self, synonym: impl Into<String>) -> Self {
        self.synonyms.push(synonym.into());
        self
    }
}

/// Normalized clinical concept record, one per primary key within a domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalConcept {
    /// Primary key (concept_id, or `concept_id_resulttype` for measurements)
    pub key: String,
    pub domain: ClinicalDomain,
    #[serde(default)]
    pub codes: Vec<SourceCode>,
    pub label: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub ancestors: Vec<AncestorRecord>,
    /// Ingredient sub-concept (drugs only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingredient: Option<Ingredient>,
    /// Result type / scale qualifier (measurements only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_type: Option<String>,
}

impl ClinicalConcept {
    pub fn new(key: impl Into<String>, domain: ClinicalDomain, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            domain,
            codes: Vec::new(),
            label: label.into(),
            synonyms: Vec::new(),
            ancestors: Vec::new(),
            ingredient: None,
            result_type: None,
        }
    }

    /// Create a measurement concept keyed by `concept_id` + result type.
    pub fn measurement(
        concept_id: impl AsRef<str>,
        result_type: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        let result_type = result_type.into();
        let key = format!(
            "{}{}{}",
            concept_id.as_ref(),
            MEASUREMENT_KEY_SEPARATOR,
            result_type
        );
        let mut concept = Self::new(key, ClinicalDomain::Measurement, label);
        concept.result_type = Some(result_type);
        concept
    }

    /// Add a code parsed from its raw form; blank codes are ignored.
    pub fn with_code(mut self, raw: &str) -> Self {
        if let Some(code) = SourceCode::parse(raw) {
            self.codes.push(code);
        }
        self
    }

    pub fn with_synonym(mut self, synonym: impl Into<String>) -> Self {
        self.synonyms.push(synonym.into());
        self
    }

    /// Add an ancestor record at the given distance.
    pub fn with_ancestor(mut self, level: u32, codes: &[&str], label: Option<&str>) -> Self {
        self.ancestors.push(AncestorRecord {
            codes: codes.iter().filter_map(|c| SourceCode::parse(c)).collect(),
            label: label.map(str::to_string),
            level,
        });
        self
    }

    pub fn with_ingredient(mut self, ingredient: Ingredient) -> Self {
        self.ingredient = Some(ingredient);
        self
    }

    /// Check the required fields of the record.
    ///
    /// Fails with [`Error::InputShape`] when the primary key or label is
    /// blank, or when a measurement has no result type.
    pub fn validate(&self) -> Result<()> {
        if self.key.trim().is_empty() {
            return Err(Error::InputShape(format!(
                "{} record '{}' has no primary key",
                self.domain, self.label
            )));
        }
        if self.label.trim().is_empty() {
            return Err(Error::InputShape(format!(
                "{} record {} has no label",
                self.domain, self.key
            )));
        }
        if self.domain == ClinicalDomain::Measurement
            && self
                .result_type
                .as_deref()
                .map_or(true, |r| r.trim().is_empty())
        {
            return Err(Error::InputShape(format!(
                "measurement record {} has no result type",
                self.key
            )));
        }
        Ok(())
    }
}

// =============================================================================
// ONTOLOGY SIDE
// =============================================================================

/// Hierarchy partitioned by distance (0 = direct parent/child).
pub type ClassLevels = BTreeMap<u32, BTreeSet<String>>;

/// A class from an OBO ontology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OntologyClass {
    /// IRI or prefixed identifier (e.g. `HP:0010837`)
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
    /// Database cross-references
    #[serde(default)]
    pub codes: Vec<SourceCode>,
    #[serde(default)]
    pub ancestors: ClassLevels,
    #[serde(default)]
    pub children: ClassLevels,
}

impl OntologyClass {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            synonyms: Vec::new(),
            codes: Vec::new(),
            ancestors: BTreeMap::new(),
            children: BTreeMap::new(),
        }
    }

    pub fn with_synonym(mut self, synonym: impl Into<String>) -> Self {
        self.synonyms.push(synonym.into());
        self
    }

    /// Add a cross-reference parsed from its raw form.
    pub fn with_xref(mut self, raw: &str) -> Self {
        if let Some(code) = SourceCode::parse(raw) {
            self.codes.push(code);
        }
        self
    }

    pub fn with_ancestor(mut self, level: u32, id: impl Into<String>) -> Self {
        self.ancestors.entry(level).or_default().insert(id.into());
        self
    }

    pub fn with_child(mut self, level: u32, id: impl Into<String>) -> Self {
        self.children.entry(level).or_default().insert(id.into());
        self
    }

    /// Check the required fields of the class.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::InputShape(format!(
                "ontology class '{}' has no identifier",
                self.label
            )));
        }
        if self.label.trim().is_empty() {
            return Err(Error::InputShape(format!(
                "ontology class {} has no label",
                self.id
            )));
        }
        Ok(())
    }
}

// =============================================================================
// EVIDENCE
// =============================================================================

/// Kind of evidence linking a clinical concept to an ontology class.
///
/// Variant order is precedence order: `CodeExact` is strongest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceType {
    CodeExact,
    LabelExact,
    SynonymExact,
    Similarity,
}

impl EvidenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceType::CodeExact => "code_exact",
            EvidenceType::LabelExact => "label_exact",
            EvidenceType::SynonymExact => "synonym_exact",
            EvidenceType::Similarity => "similarity",
        }
    }

    /// Whether the evidence came from exact (non-fuzzy) matching.
    pub fn is_exact(&self) -> bool {
        !matches!(self, EvidenceType::Similarity)
    }
}

impl fmt::Display for EvidenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a match was reached.
///
/// Variant order is precedence order: evidence from the concept itself
/// outranks ingredient evidence, which outranks evidence from the concept's
/// ancestors. `Child` marks subclasses of a directly matched ontology class.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Concept,
    Ingredient,
    Ancestor,
    Child,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Concept => "concept",
            Provenance::Ingredient => "ingredient",
            Provenance::Ancestor => "ancestor",
            Provenance::Child => "child",
        }
    }

    /// Evidence matched on the concept or its ingredient rather than derived
    /// through a hierarchy.
    pub fn is_direct(&self) -> bool {
        matches!(self, Provenance::Concept | Provenance::Ingredient)
    }
}

/// One piece of evidence linking a clinical concept to an ontology class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEvidence {
    pub clinical_key: String,
    pub ontology: String,
    pub ontology_class: String,
    pub evidence_type: EvidenceType,
    pub provenance: Provenance,
    /// 1.0 for exact matches, cosine similarity otherwise
    pub score: f32,
    /// Clinical side of the matched pair (code or string)
    pub clinical_string: String,
    /// Ontology side of the matched pair (code or string)
    pub ontology_string: String,
    /// Other evidence types that reached the same class
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub corroborating: Vec<EvidenceType>,
}

impl MatchEvidence {
    /// Exact evidence (code, label, or synonym), score 1.0.
    pub fn exact(
        clinical_key: impl Into<String>,
        ontology: impl Into<String>,
        ontology_class: impl Into<String>,
        evidence_type: EvidenceType,
        provenance: Provenance,
        matched: (String, String),
    ) -> Self {
        Self {
            clinical_key: clinical_key.into(),
            ontology: ontology.into(),
            ontology_class: ontology_class.into(),
            evidence_type,
            provenance,
            score: 1.0,
            clinical_string: matched.0,
            ontology_string: matched.1,
            corroborating: Vec::new(),
        }
    }

    /// Similarity evidence with a cosine score clamped to [0, 1].
    pub fn similarity(
        clinical_key: impl Into<String>,
        ontology: impl Into<String>,
        ontology_class: impl Into<String>,
        provenance: Provenance,
        score: f32,
        matched: (String, String),
    ) -> Self {
        Self {
            clinical_key: clinical_key.into(),
            ontology: ontology.into(),
            ontology_class: ontology_class.into(),
            evidence_type: EvidenceType::Similarity,
            provenance,
            score: score.clamp(0.0, 1.0),
            clinical_string: matched.0,
            ontology_string: matched.1,
            corroborating: Vec::new(),
        }
    }

    /// Ranking order: score descending, then evidence-type precedence, then
    /// provenance (exact evidence only), then class identifier ascending.
    ///
    /// Similarity ties go straight to the smallest class identifier. The
    /// trailing string comparisons make the order total so identical inputs
    /// always produce identical rankings.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then(self.evidence_type.cmp(&other.evidence_type))
            .then_with(|| {
                if self.evidence_type.is_exact() {
                    self.provenance.cmp(&other.provenance)
                } else {
                    Ordering::Equal
                }
            })
            .then_with(|| self.ontology_class.cmp(&other.ontology_class))
            .then_with(|| self.clinical_string.cmp(&other.clinical_string))
            .then_with(|| self.ontology_string.cmp(&other.ontology_string))
    }
}

/// Ranked mapping of one clinical concept to each requested ontology.
///
/// Built by the aggregator and immutable afterwards. Ontologies with no
/// evidence are absent from `mappings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptMapping {
    pub clinical_key: String,
    pub domain: ClinicalDomain,
    pub mappings: BTreeMap<String, Vec<MatchEvidence>>,
}

impl ConceptMapping {
    /// Mapping with no evidence.
    pub fn unmapped(clinical_key: impl Into<String>, domain: ClinicalDomain) -> Self {
        Self {
            clinical_key: clinical_key.into(),
            domain,
            mappings: BTreeMap::new(),
        }
    }

    pub fn is_unmapped(&self) -> bool {
        self.mappings.values().all(Vec::is_empty)
    }

    /// Ranked evidence for one ontology (empty when unresolved).
    pub fn evidence(&self, ontology: &str) -> &[MatchEvidence] {
        self.mappings
            .get(ontology)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Highest-ranked evidence for one ontology.
    pub fn top(&self, ontology: &str) -> Option<&MatchEvidence> {
        self.evidence(ontology).first()
    }

    /// Ontologies with at least one evidence entry.
    pub fn resolved_ontologies(&self) -> BTreeSet<&str> {
        self.mappings
            .iter()
            .filter(|(_, evidence)| !evidence.is_empty())
            .map(|(ontology, _)| ontology.as_str())
            .collect()
    }

    pub fn evidence_count(&self) -> usize {
        self.mappings.values().map(Vec::len).sum()
    }

    /// All evidence entries, ontology by ontology in rank order.
    pub fn iter(&self) -> impl Iterator<Item = &MatchEvidence> {
        self.mappings.values().flatten()
    }

    /// Consume the mapping into its flat evidence list.
    pub fn into_evidence(self) -> Vec<MatchEvidence> {
        self.mappings.into_values().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence(class: &str, evidence_type: EvidenceType, score: f32) -> MatchEvidence {
        MatchEvidence {
            clinical_key: "1".to_string(),
            ontology: "hp".to_string(),
            ontology_class: class.to_string(),
            evidence_type,
            provenance: Provenance::Concept,
            score,
            clinical_string: String::new(),
            ontology_string: String::new(),
            corroborating: Vec::new(),
        }
    }

    #[test]
    fn test_domain_from_str_accepts_plurals() {
        assert_eq!("conditions".parse::<ClinicalDomain>().unwrap(), ClinicalDomain::Condition);
        assert_eq!("Drugs".parse::<ClinicalDomain>().unwrap(), ClinicalDomain::Drug);
        assert_eq!(
            " measurement ".parse::<ClinicalDomain>().unwrap(),
            ClinicalDomain::Measurement
        );
        assert!("procedure".parse::<ClinicalDomain>().is_err());
    }

    #[test]
    fn test_domain_serde_lowercase() {
        let json = serde_json::to_string(&ClinicalDomain::Drug).unwrap();
        assert_eq!(json, "\"drug\"");
    }

    #[test]
    fn test_measurement_composite_key() {
        let concept = ClinicalConcept::measurement("3020630", "Low", "Protein in serum");
        assert_eq!(concept.key, "3020630_Low");
        assert_eq!(concept.result_type.as_deref(), Some("Low"));
        assert!(concept.validate().is_ok());
    }

    #[test]
    fn test_validate_missing_key() {
        let concept = ClinicalConcept::new("  ", ClinicalDomain::Condition, "Overbite");
        let err = concept.validate().unwrap_err();
        assert!(matches!(err, Error::InputShape(_)));
    }

    #[test]
    fn test_validate_missing_label() {
        let concept = ClinicalConcept::new("1", ClinicalDomain::Condition, "");
        assert!(concept.validate().is_err());
    }

    #[test]
    fn test_validate_measurement_without_result_type() {
        let concept = ClinicalConcept::new("3020630", ClinicalDomain::Measurement, "Protein");
        let err = concept.validate().unwrap_err();
        assert!(err.to_string().contains("result type"));
    }

    #[test]
    fn test_concept_builder_parses_codes() {
        let concept = ClinicalConcept::new("70305005", ClinicalDomain::Condition, "Horizontal overbite")
            .with_code("SNOMED:70305005")
            .with_code("")
            .with_ancestor(0, &["SNOMED:1234"], Some("Malocclusion"));
        assert_eq!(concept.codes, vec![SourceCode::new("SNOMED", "70305005")]);
        assert_eq!(concept.ancestors[0].codes[0].code, "1234");
    }

    #[test]
    fn test_class_validate() {
        assert!(OntologyClass::new("HP:0010837", "Increased overbite").validate().is_ok());
        assert!(OntologyClass::new("", "Increased overbite").validate().is_err());
        assert!(OntologyClass::new("HP:0010837", " ").validate().is_err());
    }

    #[test]
    fn test_evidence_type_precedence() {
        assert!(EvidenceType::CodeExact < EvidenceType::LabelExact);
        assert!(EvidenceType::LabelExact < EvidenceType::SynonymExact);
        assert!(EvidenceType::SynonymExact < EvidenceType::Similarity);
        assert!(!EvidenceType::Similarity.is_exact());
    }

    #[test]
    fn test_rank_cmp_score_then_type_then_class() {
        let mut list = vec![
            evidence("HP:3", EvidenceType::Similarity, 0.7),
            evidence("HP:2", EvidenceType::SynonymExact, 1.0),
            evidence("HP:9", EvidenceType::CodeExact, 1.0),
            evidence("HP:1", EvidenceType::SynonymExact, 1.0),
        ];
        list.sort_by(|a, b| a.rank_cmp(b));
        let order: Vec<&str> = list.iter().map(|e| e.ontology_class.as_str()).collect();
        assert_eq!(order, vec!["HP:9", "HP:1", "HP:2", "HP:3"]);
    }

    #[test]
    fn test_rank_cmp_ancestor_below_direct() {
        let direct = evidence("HP:2", EvidenceType::CodeExact, 1.0);
        let mut ancestor = evidence("HP:1", EvidenceType::CodeExact, 1.0);
        ancestor.provenance = Provenance::Ancestor;
        assert_eq!(direct.rank_cmp(&ancestor), Ordering::Less);
    }

    #[test]
    fn test_rank_cmp_child_below_ancestor() {
        let mut ancestor = evidence("HP:2", EvidenceType::CodeExact, 1.0);
        ancestor.provenance = Provenance::Ancestor;
        let mut child = evidence("HP:1", EvidenceType::CodeExact, 1.0);
        child.provenance = Provenance::Child;
        assert_eq!(ancestor.rank_cmp(&child), Ordering::Less);
        assert!(!child.provenance.is_direct());
        assert!(Provenance::Ingredient.is_direct());
    }

    #[test]
    fn test_rank_cmp_similarity_tie_ignores_provenance() {
        let concept = evidence("Z:1", EvidenceType::Similarity, 0.63);
        let mut ingredient = evidence("A:1", EvidenceType::Similarity, 0.63);
        ingredient.provenance = Provenance::Ingredient;
        assert_eq!(ingredient.rank_cmp(&concept), Ordering::Less);
    }

    #[test]
    fn test_similarity_score_clamped() {
        let e = MatchEvidence::similarity(
            "1",
            "hp",
            "HP:1",
            Provenance::Concept,
            1.0000002,
            ("a".to_string(), "b".to_string()),
        );
        assert_eq!(e.score, 1.0);
    }

    #[test]
    fn test_concept_mapping_accessors() {
        let mut mapping = ConceptMapping::unmapped("1", ClinicalDomain::Condition);
        assert!(mapping.is_unmapped());
        assert!(mapping.top("hp").is_none());

        mapping
            .mappings
            .insert("hp".to_string(), vec![evidence("HP:1", EvidenceType::CodeExact, 1.0)]);
        mapping.mappings.insert("mondo".to_string(), Vec::new());

        assert!(!mapping.is_unmapped());
        assert_eq!(mapping.top("hp").unwrap().ontology_class, "HP:1");
        assert_eq!(mapping.resolved_ontologies().into_iter().collect::<Vec<_>>(), vec!["hp"]);
        assert_eq!(mapping.evidence_count(), 1);
        assert_eq!(mapping.into_evidence().len(), 1);
    }
}
