//! Centralized default constants for obomap.
//!
//! **This module is the single source of truth** for shared default values.
//! Matchers, the pipeline, and the assembler reference these constants
//! instead of defining their own magic numbers.

// =============================================================================
// SIMILARITY MATCHING
// =============================================================================

/// Minimum cosine similarity for a similarity match to be retained.
pub const SIMILARITY_THRESHOLD: f32 = 0.5;

/// Number of distinct ontology classes kept per concept per ontology.
pub const SIMILARITY_TOP_N: usize = 1;

/// Largest word n-gram used as a TF-IDF feature.
pub const WORD_NGRAM_MAX: usize = 3;

/// Character n-gram width when character features are selected.
pub const CHAR_NGRAM_SIZE: usize = 3;

/// Decimal places used when rendering scores in exported tables.
pub const SCORE_PRECISION: usize = 4;

// =============================================================================
// PIPELINE
// =============================================================================

/// Default number of parallel worker partitions.
pub const WORKERS: usize = 4;

/// Levels of ontology subclasses added below a directly matched class when
/// hierarchy expansion is enabled (1 = direct children only).
pub const HIERARCHY_DEPTH: u32 = 1;

/// Separator between concept id and result type in measurement keys.
pub const MEASUREMENT_KEY_SEPARATOR: &str = "_";

// =============================================================================
// ONTOLOGY SELECTION (OMOP domain to ontology assignment)
// =============================================================================

/// Ontologies mapped for condition concepts.
pub const CONDITION_ONTOLOGIES: &[&str] = &["hp", "mondo"];

/// Ontologies mapped for drug ingredient concepts.
pub const DRUG_ONTOLOGIES: &[&str] = &["chebi", "pr", "ncbitaxon", "vo"];

/// Ontologies mapped for measurement concepts.
pub const MEASUREMENT_ONTOLOGIES: &[&str] = &["hp", "uberon", "cl", "chebi", "pr", "ncbitaxon"];

// =============================================================================
// SEMANTIC DEFINITIONS
// =============================================================================

/// OBO PURL prefix used to expand prefixed identifiers.
pub const OBO_PURL: &str = "http://purl.obolibrary.org/obo/";

/// Default domain superclasses for condition definitions (phenotype, disease).
pub const CONDITION_SUPERCLASSES: &[&str] = &[
    "http://purl.obolibrary.org/obo/HP_0000118",
    "http://purl.obolibrary.org/obo/MONDO_0000001",
];

/// Default domain superclass for drug definitions (role).
pub const DRUG_SUPERCLASSES: &[&str] = &["http://purl.obolibrary.org/obo/CHEBI_24431"];

/// Default domain superclass for measurement definitions (phenotypic abnormality).
pub const MEASUREMENT_SUPERCLASSES: &[&str] = &["http://purl.obolibrary.org/obo/HP_0000118"];
