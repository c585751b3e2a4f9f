//! # obomap-core
//!
//! Core types, configuration, and abstractions for the obomap mapping library.
//!
//! This crate provides the data model shared by the matching and semantic
//! assembly crates: clinical concept records, ontology classes, match
//! evidence, relation rules, the error type, and configuration.

pub mod config;
pub mod defaults;
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod models;
pub mod relations;
mod table;
pub mod vocabulary;

// Re-export commonly used types at crate root
pub use config::{DomainOntologies, MatcherConfig, TokenMode};
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use error::{Error, Result};
pub use models::*;
pub use relations::{RelationRule, RelationTable};
pub use vocabulary::{SourceCode, VocabularyAliases};
