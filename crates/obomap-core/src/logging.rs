//! Structured logging schema and field name constants for obomap.
//!
//! All crates use these names for structured `tracing` fields so log
//! aggregation can query mapping runs consistently.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Worker failure, run aborted |
//! | WARN  | Record skipped (input shape), empty selection for a domain |
//! | INFO  | Pipeline construction, run start/completion, assembly completion |
//! | DEBUG | Index/space fitting, per-ontology decisions, config choices |
//! | TRACE | Per-concept, per-evidence iteration |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID of a mapping run.
/// Format: UUIDv7 (time-ordered).
pub const RUN_ID: &str = "run_id";

/// Subsystem originating the log event.
/// Values: "match", "semantics"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "code_matcher", "tfidf", "aggregator", "pipeline", "assembler"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "run", "run_parallel", "fit", "assemble"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Clinical concept primary key.
pub const CLINICAL_KEY: &str = "clinical_key";

/// Ontology name (e.g. "hp", "mondo").
pub const ONTOLOGY: &str = "ontology";

/// Clinical domain ("condition", "drug", "measurement").
pub const DOMAIN: &str = "domain";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of clinical concepts in a run or partition.
pub const CONCEPT_COUNT: &str = "concept_count";

/// Number of ontology classes in an index.
pub const CLASS_COUNT: &str = "class_count";

/// Number of TF-IDF features fitted for an ontology.
pub const FEATURE_COUNT: &str = "feature_count";

/// Number of evidence entries produced.
pub const EVIDENCE_COUNT: &str = "evidence_count";

/// Number of worker partitions.
pub const WORKERS: &str = "workers";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Number of concepts without any mapping.
pub const UNMAPPED_COUNT: &str = "unmapped_count";

/// Number of diagnostics collected.
pub const DIAGNOSTIC_COUNT: &str = "diagnostic_count";

/// Number of cross-ontology triples emitted.
pub const TRIPLE_COUNT: &str = "triple_count";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
