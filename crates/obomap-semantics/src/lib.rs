//! # obomap-semantics
//!
//! Semantic definitions for mapped clinical concepts.
//!
//! Every concept with mappings gets single-ontology definitions. Concepts
//! resolved in every ontology their domain's relation rules reference are
//! `Complete` and additionally carry cross-ontology triples between the
//! top-ranked classes, plus the domain superclasses.

pub mod assembler;
pub mod definition;
pub mod edges;
pub mod state;

pub use assembler::{AssemblerConfig, Assembly, AssemblySummary, SemanticAssembler};
pub use definition::{class_iri, SemanticDefinition, SingleOntologyDefinition, Triple};
pub use edges::{edge_rows, edges_to_tsv, EdgeRow, EDGE_TSV_HEADER};
pub use state::{AssemblyProgress, AssemblyState};
