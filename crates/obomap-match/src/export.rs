//! Tabular export of concept mappings and per-ontology coverage statistics.

use std::collections::BTreeMap;
use std::fmt;

use csv::{Terminator, WriterBuilder};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use obomap_core::defaults::SCORE_PRECISION;
use obomap_core::{ClinicalDomain, ConceptMapping, Error, EvidenceType, Provenance, Result};

/// Column header of the mapping table.
pub const MAPPING_TSV_HEADER: &str =
    "clinical_key\tdomain\tontology\tontology_class\tevidence_type\tprovenance\tscore";

/// One row of the mapping table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingRow {
    pub clinical_key: String,
    pub domain: ClinicalDomain,
    pub ontology: String,
    pub ontology_class: String,
    pub evidence_type: EvidenceType,
    pub provenance: Provenance,
    pub score: f32,
}

/// Flatten mappings into rows, keeping concept order and rank order.
pub fn mapping_rows(mappings: &[ConceptMapping]) -> Vec<MappingRow> {
    mappings
        .iter()
        .flat_map(|mapping| {
            mapping.iter().map(move |e| MappingRow {
                clinical_key: mapping.clinical_key.clone(),
                domain: mapping.domain,
                ontology: e.ontology.clone(),
                ontology_class: e.ontology_class.clone(),
                evidence_type: e.evidence_type,
                provenance: e.provenance,
                score: e.score,
            })
        })
        .collect()
}

/// Render rows as tab-separated text with a header and fixed-precision scores.
pub fn rows_to_tsv(rows: &[MappingRow]) -> Result<String> {
    write_tsv(
        MAPPING_TSV_HEADER,
        rows.iter().map(|row| {
            [
                row.clinical_key.clone(),
                row.domain.to_string(),
                row.ontology.clone(),
                row.ontology_class.clone(),
                row.evidence_type.to_string(),
                row.provenance.as_str().to_string(),
                format!("{:.*}", SCORE_PRECISION, row.score),
            ]
        }),
    )
}

/// Write a tab-separated header and records with `\n` line endings.
///
/// Fields containing a tab, quote or line break are quoted, never rewritten.
pub fn write_tsv<R, F>(header: &str, records: impl IntoIterator<Item = R>) -> Result<String>
where
    R: IntoIterator<Item = F>,
    F: AsRef<[u8]>,
{
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(header.split('\t'))?;
    for record in records {
        writer.write_record(record)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Serialization(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| Error::Serialization(e.to_string()))
}

/// SHA-256 hex digest of exported text, for byte-level determinism checks.
pub fn fingerprint(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// How a concept was resolved in one ontology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageLevel {
    Code,
    String,
    Similarity,
    AncestorOnly,
    Unmapped,
}

impl CoverageLevel {
    /// Classify the (ranked) evidence of one concept in one ontology.
    ///
    /// The strongest direct evidence type decides the level; evidence
    /// reached only through a hierarchy is counted as ancestor-only.
    pub fn classify(mapping: &ConceptMapping, ontology: &str) -> Self {
        let evidence = mapping.evidence(ontology);
        if evidence.is_empty() {
            return CoverageLevel::Unmapped;
        }
        match evidence
            .iter()
            .filter(|e| e.provenance.is_direct())
            .map(|e| e.evidence_type)
            .min()
        {
            None => CoverageLevel::AncestorOnly,
            Some(EvidenceType::CodeExact) => CoverageLevel::Code,
            Some(EvidenceType::LabelExact | EvidenceType::SynonymExact) => CoverageLevel::String,
            Some(EvidenceType::Similarity) => CoverageLevel::Similarity,
        }
    }
}

/// Concept counts per resolution level for one ontology.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyCoverage {
    pub code: usize,
    pub string: usize,
    pub similarity: usize,
    pub ancestor_only: usize,
    pub unmapped: usize,
}

impl OntologyCoverage {
    fn record(&mut self, level: CoverageLevel) {
        match level {
            CoverageLevel::Code => self.code += 1,
            CoverageLevel::String => self.string += 1,
            CoverageLevel::Similarity => self.similarity += 1,
            CoverageLevel::AncestorOnly => self.ancestor_only += 1,
            CoverageLevel::Unmapped => self.unmapped += 1,
        }
    }

    pub fn mapped(&self) -> usize {
        self.code + self.string + self.similarity + self.ancestor_only
    }

    pub fn total(&self) -> usize {
        self.mapped() + self.unmapped
    }
}

/// Coverage statistics for a mapping run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub ontologies: BTreeMap<String, OntologyCoverage>,
    pub concept_count: usize,
    /// Concepts with no evidence in any requested ontology
    pub unmapped_count: usize,
}

impl CoverageReport {
    /// Build coverage over the ontologies requested for each concept's domain.
    pub fn build(
        mappings: &[ConceptMapping],
        selected: &BTreeMap<ClinicalDomain, Vec<String>>,
    ) -> Self {
        let mut report = Self {
            concept_count: mappings.len(),
            ..Self::default()
        };
        for mapping in mappings {
            if mapping.is_unmapped() {
                report.unmapped_count += 1;
            }
            for ontology in selected.get(&mapping.domain).into_iter().flatten() {
                report
                    .ontologies
                    .entry(ontology.clone())
                    .or_default()
                    .record(CoverageLevel::classify(mapping, ontology));
            }
        }
        report
    }

    pub fn ontology(&self, name: &str) -> Option<&OntologyCoverage> {
        self.ontologies.get(name)
    }
}

impl fmt::Display for CoverageReport {
    /// One summary line per ontology.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (ontology, c)) in self.ontologies.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(
                f,
                "{}: {} code matches, {} string matches, {} ancestor matches, {} similarity matches - {} NO MATCHES",
                ontology, c.code, c.string, c.ancestor_only, c.similarity, c.unmapped
            )?;
        }
        Ok(())
    }
}
