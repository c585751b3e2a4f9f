//! # obomap-match
//!
//! Matching of clinical concepts to OBO ontology classes.
//!
//! Three matchers run per (concept, ontology) pair:
//! - **Code**: exact cross-reference and identifier matches, with
//!   vocabulary alias normalization
//! - **String**: exact matches on normalized labels and synonyms
//! - **Similarity**: TF-IDF cosine similarity, only for pairs the exact
//!   matchers left unresolved
//!
//! Subclasses of direct matches can be added from the ontology hierarchy
//! ([`hierarchy`]).
//!
//! The aggregator merges their evidence into ranked [`ConceptMapping`]s and
//! the pipeline runs the whole process sequentially or across worker tasks.
//!
//! [`ConceptMapping`]: obomap_core::ConceptMapping

pub mod aggregator;
pub mod code_matcher;
pub mod export;
pub mod hierarchy;
pub mod index;
pub mod normalize;
pub mod pipeline;
pub mod similarity;
pub mod string_matcher;
pub mod tfidf;

pub use aggregator::{aggregate, rank, reaggregate};
pub use code_matcher::{CodeMatcher, CodeMatches};
pub use export::{
    fingerprint, mapping_rows, rows_to_tsv, CoverageLevel, CoverageReport, MappingRow,
    OntologyCoverage, MAPPING_TSV_HEADER,
};
pub use hierarchy::expand_children;
pub use index::{OntologyIndex, OntologySet};
pub use normalize::normalize;
pub use pipeline::{validate_records, MappingPipeline, MappingRun};
pub use similarity::SimilarityMatcher;
pub use string_matcher::StringMatcher;
pub use tfidf::{FeatureExtractor, TfIdfSpace};

// Re-export core types for convenience
pub use obomap_core::{
    ClinicalConcept, ClinicalDomain, ConceptMapping, Diagnostic, Error, EvidenceType,
    MatchEvidence, MatcherConfig, Provenance, Result, VocabularyAliases,
};
