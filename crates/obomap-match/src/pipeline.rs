//! Mapping pipeline: record validation, per-ontology matching, aggregation.
//!
//! All read-only state (ontology indexes, code and string tables, fitted
//! TF-IDF spaces, vocabulary aliases) is built once in
//! [`MappingPipeline::new`] and shared behind an `Arc`. A run never mutates
//! it, so sequential and parallel runs produce identical output.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use obomap_core::{
    ClinicalConcept, ClinicalDomain, ConceptMapping, Diagnostic, Error, MatcherConfig, Result,
    SourceCode, VocabularyAliases,
};

use crate::aggregator::aggregate;
use crate::code_matcher::CodeMatcher;
use crate::export::{fingerprint, mapping_rows, rows_to_tsv, CoverageReport, MappingRow};
use crate::hierarchy::expand_children;
use crate::index::OntologySet;
use crate::similarity::SimilarityMatcher;
use crate::string_matcher::StringMatcher;

/// Matchers fitted for one ontology.
#[derive(Debug)]
struct OntologyMatchers {
    code: CodeMatcher,
    string: StringMatcher,
    similarity: SimilarityMatcher,
}

#[derive(Debug)]
struct PipelineState {
    ontologies: Arc<OntologySet>,
    aliases: VocabularyAliases,
    config: MatcherConfig,
    matchers: BTreeMap<String, OntologyMatchers>,
    selected: BTreeMap<ClinicalDomain, Vec<String>>,
    setup_diagnostics: Vec<Diagnostic>,
}

/// Output of one mapping run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingRun {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// One mapping per valid input record, in input order
    pub mappings: Vec<ConceptMapping>,
    /// Keys of concepts with no evidence in any requested ontology
    pub unmapped: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub coverage: CoverageReport,
}

impl MappingRun {
    /// First mapping with the given clinical key.
    pub fn mapping(&self, clinical_key: &str) -> Option<&ConceptMapping> {
        self.mappings.iter().find(|m| m.clinical_key == clinical_key)
    }

    pub fn rows(&self) -> Vec<MappingRow> {
        mapping_rows(&self.mappings)
    }

    /// Mapping table as TSV. Excludes run id and timestamps.
    pub fn to_tsv(&self) -> Result<String> {
        rows_to_tsv(&self.rows())
    }

    /// SHA-256 of [`MappingRun::to_tsv`].
    pub fn fingerprint(&self) -> Result<String> {
        Ok(fingerprint(&self.to_tsv()?))
    }
}

/// Batch mapping of clinical concepts to ontology classes.
///
/// Cheap to clone; clones share the fitted state.
#[derive(Debug, Clone)]
pub struct MappingPipeline {
    state: Arc<PipelineState>,
}

impl MappingPipeline {
    /// Validate the configuration and fit every matcher once.
    ///
    /// Fails with [`Error::ThresholdConfig`] for out-of-range bounds and
    /// [`Error::EmptyIndex`] when no ontology is loaded.
    #[instrument(skip_all, fields(subsystem = "match", component = "pipeline", op = "new"))]
    pub fn new(
        ontologies: Arc<OntologySet>,
        aliases: VocabularyAliases,
        config: MatcherConfig,
    ) -> Result<Self> {
        let start = Instant::now();
        config.validate()?;
        if ontologies.is_empty() {
            return Err(Error::EmptyIndex("no ontologies loaded".to_string()));
        }

        let matchers: BTreeMap<String, OntologyMatchers> = ontologies
            .iter()
            .map(|index| {
                let matchers = OntologyMatchers {
                    code: CodeMatcher::new(index, &aliases),
                    string: StringMatcher::new(index),
                    similarity: SimilarityMatcher::new(index, &config),
                };
                (index.name().to_string(), matchers)
            })
            .collect();

        let loaded = ontologies.names();
        let selected: BTreeMap<ClinicalDomain, Vec<String>> = ClinicalDomain::ALL
            .iter()
            .map(|domain| {
                let names = config
                    .domains
                    .resolve(*domain, &loaded)
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                (*domain, names)
            })
            .collect();

        let mut setup_diagnostics: Vec<Diagnostic> = ontologies
            .iter()
            .flat_map(|index| index.diagnostics().iter().cloned())
            .collect();
        for name in config.domains.all_requested() {
            if ontologies.get(name).is_none() {
                warn!(ontology = name, "Requested ontology is not loaded");
                setup_diagnostics.push(Diagnostic::missing_ontology(name));
            }
        }
        for (domain, names) in &selected {
            if names.is_empty() {
                warn!(domain = %domain, "No loaded ontology selected for domain");
            } else {
                debug!(domain = %domain, ontologies = ?names, "Selected ontologies");
            }
        }

        info!(
            ontology_count = ontologies.len(),
            class_count = ontologies.class_count(),
            diagnostic_count = setup_diagnostics.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Mapping pipeline initialized"
        );

        Ok(Self {
            state: Arc::new(PipelineState {
                ontologies,
                aliases,
                config,
                matchers,
                selected,
                setup_diagnostics,
            }),
        })
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.state.config
    }

    pub fn ontologies(&self) -> &OntologySet {
        &self.state.ontologies
    }

    pub fn aliases(&self) -> &VocabularyAliases {
        &self.state.aliases
    }

    /// Loaded ontologies mapped for a domain.
    pub fn selected_ontologies(&self, domain: ClinicalDomain) -> &[String] {
        self.state
            .selected
            .get(&domain)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Diagnostics produced while loading (skipped classes, missing ontologies).
    pub fn setup_diagnostics(&self) -> &[Diagnostic] {
        &self.state.setup_diagnostics
    }

    /// Map a single concept against every ontology selected for its domain.
    ///
    /// Similarity matching runs for an ontology only when code and string
    /// matching found nothing there. With hierarchy expansion enabled, the
    /// subclasses of direct exact matches are added as child evidence.
    /// Returns the mapping and any vocabulary-alias diagnostics.
    pub fn map_concept(&self, concept: &ClinicalConcept) -> (ConceptMapping, Vec<Diagnostic>) {
        let state = &self.state;
        let mut evidence = Vec::new();
        let mut missed: Option<BTreeSet<SourceCode>> = None;

        for ontology in self.selected_ontologies(concept.domain) {
            let Some(matchers) = state.matchers.get(ontology) else {
                continue;
            };

            let codes = matchers
                .code
                .match_concept(concept, &state.aliases, &state.config);
            let missed_here: BTreeSet<SourceCode> = codes.alias_misses.into_iter().collect();
            missed = Some(match missed {
                None => missed_here,
                Some(previous) => previous.intersection(&missed_here).cloned().collect(),
            });

            let strings = matchers
                .string
                .match_concept(concept, state.config.match_ancestors);
            if codes.evidence.is_empty() && strings.is_empty() {
                evidence.extend(matchers.similarity.match_concept(concept));
                continue;
            }
            let mut exact = codes.evidence;
            exact.extend(strings);
            if state.config.match_hierarchy {
                if let Some(index) = state.ontologies.get(ontology) {
                    let children = expand_children(index, &exact, state.config.hierarchy_depth);
                    exact.extend(children);
                }
            }
            evidence.extend(exact);
        }

        let mut vocabularies: Vec<String> = missed
            .unwrap_or_default()
            .into_iter()
            .map(|code| code.vocabulary)
            .collect();
        vocabularies.dedup();
        let diagnostics: Vec<Diagnostic> = vocabularies
            .iter()
            .map(|vocabulary| {
                debug!(
                    clinical_key = %concept.key,
                    vocabulary = %vocabulary,
                    "Vocabulary has no alias entry"
                );
                Diagnostic::alias_miss(&concept.key, vocabulary)
            })
            .collect();

        (aggregate(&concept.key, concept.domain, evidence), diagnostics)
    }

    fn map_batch(&self, concepts: &[ClinicalConcept]) -> (Vec<ConceptMapping>, Vec<Diagnostic>) {
        let mut mappings = Vec::with_capacity(concepts.len());
        let mut diagnostics = Vec::new();
        for concept in concepts {
            let (mapping, concept_diagnostics) = self.map_concept(concept);
            mappings.push(mapping);
            diagnostics.extend(concept_diagnostics);
        }
        (mappings, diagnostics)
    }

    /// Map every valid concept sequentially.
    #[instrument(skip_all, fields(subsystem = "match", component = "pipeline", op = "run"))]
    pub fn run(&self, concepts: &[ClinicalConcept]) -> MappingRun {
        let run_id = Uuid::now_v7();
        let started_at = Utc::now();
        let start = Instant::now();
        info!(run_id = %run_id, concept_count = concepts.len(), "Mapping run started");

        let (valid, mut diagnostics) = validate_records(concepts);
        let mut mappings = Vec::with_capacity(valid.len());
        for concept in valid {
            let (mapping, concept_diagnostics) = self.map_concept(concept);
            mappings.push(mapping);
            diagnostics.extend(concept_diagnostics);
        }

        self.finish(run_id, started_at, start, mappings, diagnostics)
    }

    /// Map every valid concept across `workers` blocking tasks.
    ///
    /// Records are validated on the calling task, partitioned in input
    /// order, and the partition outputs are concatenated in that same
    /// order, so the result equals [`MappingPipeline::run`].
    #[instrument(skip_all, fields(subsystem = "match", component = "pipeline", op = "run_parallel"))]
    pub async fn run_parallel(&self, concepts: &[ClinicalConcept]) -> Result<MappingRun> {
        let run_id = Uuid::now_v7();
        let started_at = Utc::now();
        let start = Instant::now();

        let (valid, mut diagnostics) = validate_records(concepts);
        let workers = self.state.config.workers.min(valid.len()).max(1);
        let chunk_size = valid.len().div_ceil(workers).max(1);
        let partitions: Vec<Vec<ClinicalConcept>> = valid
            .chunks(chunk_size)
            .map(|chunk| chunk.iter().map(|c| (*c).clone()).collect())
            .collect();

        info!(
            run_id = %run_id,
            concept_count = concepts.len(),
            workers = partitions.len(),
            "Parallel mapping run started"
        );

        let mut tasks = JoinSet::new();
        for (partition, batch) in partitions.into_iter().enumerate() {
            let pipeline = self.clone();
            tasks.spawn_blocking(move || (partition, pipeline.map_batch(&batch)));
        }

        let mut outputs: Vec<Option<(Vec<ConceptMapping>, Vec<Diagnostic>)>> =
            (0..tasks.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((partition, output)) => outputs[partition] = Some(output),
                Err(e) => {
                    error!(run_id = %run_id, error = %e, "Mapping worker failed");
                    tasks.abort_all();
                    return Err(Error::Internal(format!("mapping worker failed: {}", e)));
                }
            }
        }

        let mut mappings = Vec::with_capacity(valid.len());
        for (partition_mappings, partition_diagnostics) in outputs.into_iter().flatten() {
            mappings.extend(partition_mappings);
            diagnostics.extend(partition_diagnostics);
        }

        Ok(self.finish(run_id, started_at, start, mappings, diagnostics))
    }

    fn finish(
        &self,
        run_id: Uuid,
        started_at: DateTime<Utc>,
        start: Instant,
        mappings: Vec<ConceptMapping>,
        diagnostics: Vec<Diagnostic>,
    ) -> MappingRun {
        let unmapped: Vec<String> = mappings
            .iter()
            .filter(|m| m.is_unmapped())
            .map(|m| m.clinical_key.clone())
            .collect();
        let coverage = CoverageReport::build(&mappings, &self.state.selected);

        let mut all_diagnostics = self.state.setup_diagnostics.clone();
        all_diagnostics.extend(diagnostics);

        debug!(run_id = %run_id, summary = %coverage, "Coverage");
        info!(
            run_id = %run_id,
            concept_count = mappings.len(),
            unmapped_count = unmapped.len(),
            diagnostic_count = all_diagnostics.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Mapping run completed"
        );

        MappingRun {
            run_id,
            started_at,
            mappings,
            unmapped,
            diagnostics: all_diagnostics,
            coverage,
        }
    }
}

/// Split records into valid ones and input-shape diagnostics.
///
/// A record is skipped when a required field is missing or when its key
/// repeats an earlier key in the same domain.
pub fn validate_records(concepts: &[ClinicalConcept]) -> (Vec<&ClinicalConcept>, Vec<Diagnostic>) {
    let mut seen: HashSet<(ClinicalDomain, &str)> = HashSet::new();
    let mut valid = Vec::with_capacity(concepts.len());
    let mut diagnostics = Vec::new();

    for concept in concepts {
        if let Err(e) = concept.validate() {
            warn!(
                clinical_key = %concept.key,
                domain = %concept.domain,
                error = %e,
                "Skipping clinical record"
            );
            diagnostics.push(Diagnostic::from_error(Some(&concept.key), &e));
            continue;
        }
        if !seen.insert((concept.domain, concept.key.as_str())) {
            let e = Error::InputShape(format!(
                "duplicate {} primary key {}",
                concept.domain, concept.key
            ));
            warn!(
                clinical_key = %concept.key,
                domain = %concept.domain,
                "Skipping duplicate clinical record"
            );
            diagnostics.push(Diagnostic::from_error(Some(&concept.key), &e));
            continue;
        }
        valid.push(concept);
    }
    (valid, diagnostics)
}
