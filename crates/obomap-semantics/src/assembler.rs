//! Semantic definition assembler.
//!
//! Turns ranked concept mappings into single-ontology definitions and, for
//! concepts resolved in every ontology their domain's relation rules
//! reference, cross-ontology triples between the top-ranked classes.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};

use obomap_core::defaults::{CONDITION_SUPERCLASSES, DRUG_SUPERCLASSES, MEASUREMENT_SUPERCLASSES};
use obomap_core::{ClinicalDomain, ConceptMapping, Error, MatchEvidence, RelationTable, Result};
use obomap_match::MappingRun;

use crate::definition::{class_iri, SemanticDefinition, SingleOntologyDefinition, Triple};
use crate::state::{AssemblyProgress, AssemblyState};

/// Assembler settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblerConfig {
    /// Superclass IRIs attached to complete definitions, per domain
    pub superclasses: BTreeMap<ClinicalDomain, Vec<String>>,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        let defaults = |iris: &[&str]| iris.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            superclasses: BTreeMap::from([
                (ClinicalDomain::Condition, defaults(CONDITION_SUPERCLASSES)),
                (ClinicalDomain::Drug, defaults(DRUG_SUPERCLASSES)),
                (ClinicalDomain::Measurement, defaults(MEASUREMENT_SUPERCLASSES)),
            ]),
        }
    }
}

impl AssemblerConfig {
    /// Replace a domain's superclasses. Prefixed ids are expanded to PURLs.
    pub fn with_superclasses(mut self, domain: ClinicalDomain, classes: &[&str]) -> Self {
        self.superclasses
            .insert(domain, classes.iter().map(|c| class_iri(c)).collect());
        self
    }

    pub fn superclasses_for(&self, domain: ClinicalDomain) -> &[String] {
        self.superclasses
            .get(&domain)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn validate(&self) -> Result<()> {
        for (domain, classes) in &self.superclasses {
            if classes.iter().any(|c| c.trim().is_empty()) {
                return Err(Error::Config(format!(
                    "blank superclass configured for domain {}",
                    domain
                )));
            }
        }
        Ok(())
    }
}

/// Per-state counts for an assembly pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblySummary {
    pub unresolved: usize,
    pub partial: usize,
    pub complete: usize,
    pub triple_count: usize,
}

impl AssemblySummary {
    fn record(&mut self, definition: &SemanticDefinition) {
        match definition.state {
            AssemblyState::Unresolved => self.unresolved += 1,
            AssemblyState::Partial => self.partial += 1,
            AssemblyState::Complete => self.complete += 1,
        }
        self.triple_count += definition.triples.len();
    }
}

/// Definitions for a batch of mappings, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assembly {
    pub definitions: Vec<SemanticDefinition>,
    pub summary: AssemblySummary,
}

impl Assembly {
    pub fn definition(&self, clinical_key: &str) -> Option<&SemanticDefinition> {
        self.definitions.iter().find(|d| d.clinical_key == clinical_key)
    }
}

/// Builds semantic definitions from concept mappings and a relation table.
#[derive(Debug, Clone)]
pub struct SemanticAssembler {
    relations: RelationTable,
    config: AssemblerConfig,
}

impl SemanticAssembler {
    pub fn new(relations: RelationTable, config: AssemblerConfig) -> Result<Self> {
        config.validate()?;
        for domain in ClinicalDomain::ALL {
            let rule_count = relations.rules_for(domain).count();
            if rule_count == 0 {
                warn!(domain = %domain, "No relation rules for domain; definitions stay single-ontology");
            } else {
                debug!(domain = %domain, rule_count, "Relation rules loaded");
            }
        }
        Ok(Self { relations, config })
    }

    pub fn relations(&self) -> &RelationTable {
        &self.relations
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Assemble the definition of one concept.
    pub fn assemble(&self, mapping: &ConceptMapping) -> SemanticDefinition {
        let mut progress = AssemblyProgress::new(self.relations.ontologies_for(mapping.domain));
        let mut single = Vec::with_capacity(mapping.mappings.len());

        for (ontology, evidence) in &mapping.mappings {
            let Some(definition) = single_definition(ontology, evidence) else {
                continue;
            };
            let state = progress.resolve(ontology.as_str());
            trace!(
                clinical_key = %mapping.clinical_key,
                ontology = %ontology,
                state = %state,
                "Ontology resolved"
            );
            single.push(definition);
        }

        let state = progress.state();
        let mut triples = Vec::new();
        let mut superclasses = Vec::new();
        if state.is_complete() {
            for rule in self.relations.rules_for(mapping.domain) {
                let (Some(subject), Some(object)) = (
                    mapping.top(&rule.source_ontology),
                    mapping.top(&rule.target_ontology),
                ) else {
                    continue;
                };
                let triple = Triple {
                    subject: class_iri(&subject.ontology_class),
                    predicate: rule.predicate_iri(),
                    object: class_iri(&object.ontology_class),
                };
                if !triples.contains(&triple) {
                    triples.push(triple);
                }
            }
            superclasses = self.config.superclasses_for(mapping.domain).to_vec();
        } else if state == AssemblyState::Partial {
            trace!(
                clinical_key = %mapping.clinical_key,
                missing = ?progress.missing(),
                "Definition left partial"
            );
        }

        SemanticDefinition {
            clinical_key: mapping.clinical_key.clone(),
            domain: mapping.domain,
            state,
            single,
            triples,
            superclasses,
        }
    }

    /// Assemble definitions for every mapping, preserving input order.
    #[instrument(skip_all, fields(subsystem = "semantics", component = "assembler", op = "assemble_all"))]
    pub fn assemble_all(&self, mappings: &[ConceptMapping]) -> Assembly {
        let start = Instant::now();
        let mut summary = AssemblySummary::default();
        let definitions: Vec<SemanticDefinition> = mappings
            .iter()
            .map(|mapping| {
                let definition = self.assemble(mapping);
                summary.record(&definition);
                definition
            })
            .collect();

        info!(
            concept_count = definitions.len(),
            complete = summary.complete,
            partial = summary.partial,
            unresolved = summary.unresolved,
            triple_count = summary.triple_count,
            duration_ms = start.elapsed().as_millis() as u64,
            "Semantic definitions assembled"
        );

        Assembly {
            definitions,
            summary,
        }
    }

    /// Assemble definitions for the mappings of a pipeline run.
    pub fn assemble_run(&self, run: &MappingRun) -> Assembly {
        debug!(run_id = %run.run_id, "Assembling definitions for mapping run");
        self.assemble_all(&run.mappings)
    }
}

/// Distinct classes of one ontology in rank order, or `None` without evidence.
fn single_definition(ontology: &str, evidence: &[MatchEvidence]) -> Option<SingleOntologyDefinition> {
    let top = evidence.first()?;
    let mut classes: Vec<String> = Vec::with_capacity(evidence.len());
    for e in evidence {
        if !classes.contains(&e.ontology_class) {
            classes.push(e.ontology_class.clone());
        }
    }
    Some(SingleOntologyDefinition {
        ontology: ontology.to_string(),
        classes,
        evidence_type: top.evidence_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use obomap_core::{EvidenceType, Provenance, RelationRule};

    fn evidence(ontology: &str, class: &str) -> MatchEvidence {
        MatchEvidence::exact(
            "1",
            ontology,
            class,
            EvidenceType::CodeExact,
            Provenance::Concept,
            (String::new(), String::new()),
        )
    }

    fn mapping(domain: ClinicalDomain, entries: &[(&str, &[&str])]) -> ConceptMapping {
        let mut m = ConceptMapping::unmapped("1", domain);
        for (ontology, classes) in entries {
            m.mappings.insert(
                ontology.to_string(),
                classes.iter().map(|c| evidence(ontology, c)).collect(),
            );
        }
        m
    }

    fn drug_assembler() -> SemanticAssembler {
        let table = RelationTable::new(vec![RelationRule::new(
            ClinicalDomain::Drug,
            "chebi",
            "RO_0002180",
            "vo",
        )]);
        SemanticAssembler::new(table, AssemblerConfig::default()).unwrap()
    }

    #[test]
    fn test_complete_emits_single_triple() {
        let m = mapping(
            ClinicalDomain::Drug,
            &[("chebi", &["CHEBI:15365"]), ("vo", &["VO:0000047"])],
        );
        let definition = drug_assembler().assemble(&m);

        assert_eq!(definition.state, AssemblyState::Complete);
        assert_eq!(
            definition.triples,
            vec![Triple {
                subject: "http://purl.obolibrary.org/obo/CHEBI_15365".to_string(),
                predicate: "http://purl.obolibrary.org/obo/RO_0002180".to_string(),
                object: "http://purl.obolibrary.org/obo/VO_0000047".to_string(),
            }]
        );
        assert_eq!(
            definition.superclasses,
            vec!["http://purl.obolibrary.org/obo/CHEBI_24431".to_string()]
        );
    }

    #[test]
    fn test_partial_has_no_triples() {
        let m = mapping(ClinicalDomain::Drug, &[("chebi", &["CHEBI:15365", "CHEBI:6801"])]);
        let definition = drug_assembler().assemble(&m);

        assert_eq!(definition.state, AssemblyState::Partial);
        assert!(definition.triples.is_empty());
        assert!(definition.superclasses.is_empty());
        assert_eq!(definition.single.len(), 1);
        assert_eq!(definition.single[0].classes, vec!["CHEBI:15365", "CHEBI:6801"]);
    }

    #[test]
    fn test_unmapped_is_unresolved() {
        let m = ConceptMapping::unmapped("1", ClinicalDomain::Drug);
        let definition = drug_assembler().assemble(&m);
        assert_eq!(definition.state, AssemblyState::Unresolved);
        assert!(definition.single.is_empty());
    }

    #[test]
    fn test_empty_evidence_list_does_not_resolve() {
        let mut m = mapping(ClinicalDomain::Drug, &[("chebi", &["CHEBI:15365"])]);
        m.mappings.insert("vo".to_string(), Vec::new());
        let definition = drug_assembler().assemble(&m);
        assert_eq!(definition.state, AssemblyState::Partial);
    }

    #[test]
    fn test_custom_superclasses() {
        let config = AssemblerConfig::default()
            .with_superclasses(ClinicalDomain::Drug, &["CHEBI:23888"]);
        assert_eq!(
            config.superclasses_for(ClinicalDomain::Drug),
            ["http://purl.obolibrary.org/obo/CHEBI_23888".to_string()]
        );
    }

    #[test]
    fn test_blank_superclass_rejected() {
        let mut config = AssemblerConfig::default();
        config
            .superclasses
            .insert(ClinicalDomain::Drug, vec![" ".to_string()]);
        let err = SemanticAssembler::new(RelationTable::default(), config).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_summary_counts() {
        let assembler = drug_assembler();
        let assembly = assembler.assemble_all(&[
            mapping(ClinicalDomain::Drug, &[("chebi", &["CHEBI:1"]), ("vo", &["VO:1"])]),
            mapping(ClinicalDomain::Drug, &[("chebi", &["CHEBI:2"])]),
            ConceptMapping::unmapped("3", ClinicalDomain::Drug),
        ]);
        assert_eq!(
            assembly.summary,
            AssemblySummary {
                unresolved: 1,
                partial: 1,
                complete: 1,
                triple_count: 1
            }
        );
    }
}
