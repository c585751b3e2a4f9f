//! TF-IDF cosine similarity matching for concepts without exact evidence.

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{debug, trace};

use obomap_core::{ClinicalConcept, MatchEvidence, MatcherConfig};

use crate::index::OntologyIndex;
use crate::string_matcher::clinical_strings;
use crate::tfidf::{FeatureExtractor, TfIdfSpace};

/// Similarity matcher for one ontology, holding its fitted TF-IDF space.
#[derive(Debug, Clone)]
pub struct SimilarityMatcher {
    ontology: String,
    space: TfIdfSpace,
    threshold: f32,
    top_n: usize,
    percentile: Option<f32>,
}

impl SimilarityMatcher {
    /// Fit the TF-IDF space over every label and synonym of the ontology.
    pub fn new(index: &OntologyIndex, config: &MatcherConfig) -> Self {
        let start = Instant::now();
        let strings = index.classes().flat_map(|class| {
            std::iter::once(&class.label)
                .chain(class.synonyms.iter())
                .map(move |text| (class.id.as_str(), text.as_str()))
        });
        let space = TfIdfSpace::fit(FeatureExtractor::from_config(config), strings);

        debug!(
            ontology = %index.name(),
            feature_count = space.feature_count(),
            document_count = space.document_count(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Fitted TF-IDF space"
        );

        Self {
            ontology: index.name().to_string(),
            space,
            threshold: config.similarity_threshold,
            top_n: config.similarity_top_n,
            percentile: config.similarity_percentile,
        }
    }

    pub fn ontology(&self) -> &str {
        &self.ontology
    }

    pub fn space(&self) -> &TfIdfSpace {
        &self.space
    }

    /// Similarity evidence for a concept.
    ///
    /// Each clinical string contributes its single best class when the
    /// cosine reaches the threshold. Candidates are then optionally cut at a
    /// percentile of their scores, reduced to one entry per class, and the
    /// top-N classes are kept. Equal scores go to the smallest class id,
    /// whichever clinical string produced them.
    pub fn match_concept(&self, concept: &ClinicalConcept) -> Vec<MatchEvidence> {
        let mut candidates: Vec<MatchEvidence> = clinical_strings(concept, false)
            .into_iter()
            .filter_map(|clinical| {
                let hit = self.space.best_match(clinical.text)?;
                trace!(
                    clinical_key = %concept.key,
                    ontology = %self.ontology,
                    class = hit.class_id,
                    score = hit.score,
                    "Similarity candidate"
                );
                (hit.score >= self.threshold).then(|| {
                    MatchEvidence::similarity(
                        &concept.key,
                        &self.ontology,
                        hit.class_id,
                        clinical.provenance,
                        hit.score,
                        (clinical.text.to_string(), hit.text.to_string()),
                    )
                })
            })
            .collect();

        if let Some(p) = self.percentile {
            let scores: Vec<f32> = candidates.iter().map(|e| e.score).collect();
            if let Some(cut) = percentile(&scores, p) {
                candidates.retain(|e| e.score >= cut);
            }
        }

        let mut best_per_class: BTreeMap<String, MatchEvidence> = BTreeMap::new();
        for candidate in candidates {
            match best_per_class.get(&candidate.ontology_class) {
                Some(existing) if existing.rank_cmp(&candidate).is_le() => {}
                _ => {
                    best_per_class.insert(candidate.ontology_class.clone(), candidate);
                }
            }
        }

        let mut kept: Vec<MatchEvidence> = best_per_class.into_values().collect();
        kept.sort_by(|a, b| a.rank_cmp(b));
        kept.truncate(self.top_n);
        kept
    }
}

/// Percentile with linear interpolation between closest ranks.
///
/// Returns `None` for an empty slice.
pub fn percentile(values: &[f32], p: f32) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f32;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f32))
}
