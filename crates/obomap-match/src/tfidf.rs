//! TF-IDF vector space over ontology label and synonym strings.
//!
//! The space is fitted once per ontology and is immutable afterwards, so a
//! single fitted space can be shared by every worker through an `Arc`.
//!
//! Weighting follows the common smoothed form:
//!
//! - `tf` = raw feature count in the string
//! - `idf` = `ln((1 + n) / (1 + df)) + 1`
//! - vectors are L2-normalized, so cosine similarity is a dot product

use std::collections::{BTreeMap, BTreeSet, HashMap};

use obomap_core::{MatcherConfig, TokenMode};

use crate::normalize;

/// Sparse L2-normalized vector, entries sorted by feature index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f32)>,
}

impl SparseVector {
    fn from_weights(weights: BTreeMap<usize, f32>) -> Self {
        let norm = weights.values().map(|w| w * w).sum::<f32>().sqrt();
        if norm == 0.0 {
            return Self::default();
        }
        Self {
            entries: weights.into_iter().map(|(i, w)| (i, w / norm)).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Dot product with another sparse vector (cosine for normalized vectors).
    pub fn dot(&self, other: &SparseVector) -> f32 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (a, wa) = self.entries[i];
            let (b, wb) = other.entries[j];
            match a.cmp(&b) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += wa * wb;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }
}

/// How strings are turned into features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureExtractor {
    mode: TokenMode,
    ngram_max: usize,
    char_ngram: usize,
}

impl FeatureExtractor {
    pub fn from_config(config: &MatcherConfig) -> Self {
        Self {
            mode: config.token_mode,
            ngram_max: config.ngram_max.max(1),
            char_ngram: config.char_ngram.max(1),
        }
    }

    /// Feature counts for a string.
    pub fn features(&self, text: &str) -> BTreeMap<String, u32> {
        let words = normalize::tokens(text);
        let mut counts = BTreeMap::new();
        if words.is_empty() {
            return counts;
        }
        match self.mode {
            TokenMode::Word => {
                for n in 1..=self.ngram_max.min(words.len()) {
                    for window in words.windows(n) {
                        *counts.entry(window.join(" ")).or_insert(0) += 1;
                    }
                }
            }
            TokenMode::Char => {
                let padded: Vec<char> = format!(" {} ", words.join(" ")).chars().collect();
                if padded.len() <= self.char_ngram {
                    counts.insert(padded.iter().collect(), 1);
                } else {
                    for window in padded.windows(self.char_ngram) {
                        *counts.entry(window.iter().collect()).or_insert(0) += 1;
                    }
                }
            }
        }
        counts
    }
}

/// One fitted ontology string.
#[derive(Debug, Clone)]
struct Document {
    class_id: String,
    text: String,
}

/// Best-scoring ontology string for a query.
#[derive(Debug, Clone, PartialEq)]
pub struct SpaceHit<'a> {
    pub class_id: &'a str,
    pub text: &'a str,
    pub score: f32,
}

/// Fitted TF-IDF space for one ontology.
#[derive(Debug, Clone)]
pub struct TfIdfSpace {
    extractor: FeatureExtractor,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
    documents: Vec<Document>,
    /// feature index -> (document index, weight), document order
    postings: Vec<Vec<(usize, f32)>>,
}

impl TfIdfSpace {
    /// Fit the space over `(class id, string)` pairs.
    ///
    /// Duplicate pairs are fitted once. Documents are ordered by class id
    /// and string so that the fitted space does not depend on input order.
    pub fn fit<I, S, T>(extractor: FeatureExtractor, strings: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        let unique: BTreeSet<(String, String)> = strings
            .into_iter()
            .map(|(c, t)| (c.into(), t.into()))
            .filter(|(_, t)| !t.trim().is_empty())
            .collect();

        let counted: Vec<(Document, BTreeMap<String, u32>)> = unique
            .into_iter()
            .map(|(class_id, text)| {
                let features = extractor.features(&text);
                (Document { class_id, text }, features)
            })
            .collect();

        let mut df: BTreeMap<&str, u32> = BTreeMap::new();
        for (_, features) in &counted {
            for feature in features.keys() {
                *df.entry(feature.as_str()).or_insert(0) += 1;
            }
        }

        let n = counted.len() as f32;
        let mut vocabulary = HashMap::with_capacity(df.len());
        let mut idf = Vec::with_capacity(df.len());
        for (index, (feature, count)) in df.iter().enumerate() {
            vocabulary.insert((*feature).to_string(), index);
            idf.push(((1.0 + n) / (1.0 + *count as f32)).ln() + 1.0);
        }

        let mut postings: Vec<Vec<(usize, f32)>> = vec![Vec::new(); idf.len()];
        let mut documents = Vec::with_capacity(counted.len());
        for (doc_index, (document, features)) in counted.into_iter().enumerate() {
            let weights: BTreeMap<usize, f32> = features
                .iter()
                .map(|(f, tf)| {
                    let i = vocabulary[f.as_str()];
                    (i, *tf as f32 * idf[i])
                })
                .collect();
            for (feature, weight) in SparseVector::from_weights(weights).entries {
                postings[feature].push((doc_index, weight));
            }
            documents.push(document);
        }

        Self {
            extractor,
            vocabulary,
            idf,
            documents,
            postings,
        }
    }

    /// Number of features in the fitted vocabulary.
    pub fn feature_count(&self) -> usize {
        self.idf.len()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Vectorize a query string with the fitted vocabulary.
    ///
    /// Features unseen during fitting are ignored.
    pub fn vectorize(&self, text: &str) -> SparseVector {
        let weights: BTreeMap<usize, f32> = self
            .extractor
            .features(text)
            .iter()
            .filter_map(|(f, tf)| {
                self.vocabulary
                    .get(f.as_str())
                    .map(|&i| (i, *tf as f32 * self.idf[i]))
            })
            .collect();
        SparseVector::from_weights(weights)
    }

    /// Cosine similarity of the query against every fitted string sharing
    /// at least one feature, as `(document index, score)` in document order.
    fn scores(&self, query: &SparseVector) -> Vec<(usize, f32)> {
        let mut accumulated: BTreeMap<usize, f32> = BTreeMap::new();
        for &(feature, weight) in &query.entries {
            for &(doc, doc_weight) in &self.postings[feature] {
                *accumulated.entry(doc).or_insert(0.0) += weight * doc_weight;
            }
        }
        accumulated.into_iter().collect()
    }

    /// Highest-scoring fitted string for `text`.
    ///
    /// Ties are broken by the smallest class id, then the smallest string.
    /// Returns `None` when the query shares no feature with the space.
    pub fn best_match(&self, text: &str) -> Option<SpaceHit<'_>> {
        let query = self.vectorize(text);
        if query.is_empty() {
            return None;
        }
        // Documents are sorted by (class id, text), so the first document
        // reaching the maximum score is also the tie-break winner.
        let (doc, score) = self
            .scores(&query)
            .into_iter()
            .fold(None, |best: Option<(usize, f32)>, (doc, score)| match best {
                Some((_, best_score)) if score <= best_score => best,
                _ => Some((doc, score)),
            })?;
        let document = &self.documents[doc];
        Some(SpaceHit {
            class_id: &document.class_id,
            text: &document.text,
            score: score.min(1.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_extractor() -> FeatureExtractor {
        FeatureExtractor::from_config(&MatcherConfig::default())
    }

    fn space(strings: &[(&str, &str)]) -> TfIdfSpace {
        TfIdfSpace::fit(word_extractor(), strings.iter().copied())
    }

    #[test]
    fn test_word_features_include_ngrams() {
        let features = word_extractor().features("Increased overbite of teeth");
        assert!(features.contains_key("increased"));
        assert!(features.contains_key("increased overbite"));
        assert!(features.contains_key("increased overbite teeth"));
        assert!(!features.contains_key("of"));
    }

    #[test]
    fn test_char_features() {
        let extractor =
            FeatureExtractor::from_config(&MatcherConfig::default().with_token_mode(TokenMode::Char));
        let features = extractor.features("Ab");
        let keys: Vec<&str> = features.keys().map(String::as_str).collect();
        assert_eq!(keys, vec![" ab", "ab "]);
    }

    #[test]
    fn test_smoothed_idf() {
        let s = space(&[("A:1", "alpha beta"), ("A:2", "alpha gamma")]);
        // "alpha" occurs in both documents: ln(3/3) + 1 = 1
        let alpha = s.vocabulary["alpha"];
        assert!((s.idf[alpha] - 1.0).abs() < 1e-6);
        // "beta" occurs in one: ln(3/2) + 1
        let beta = s.vocabulary["beta"];
        assert!((s.idf[beta] - (1.5f32.ln() + 1.0)).abs() < 1e-6);
    }

    #[test]
    fn test_identical_string_scores_one() {
        let s = space(&[("HP:1", "increased overbite"), ("HP:2", "cleft palate")]);
        let hit = s.best_match("Increased overbite").unwrap();
        assert_eq!(hit.class_id, "HP:1");
        assert!((hit.score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_partial_overlap_scores_between_zero_and_one() {
        let s = space(&[("HP:1", "increased overbite"), ("HP:2", "cleft palate")]);
        let hit = s.best_match("overbite").unwrap();
        assert_eq!(hit.class_id, "HP:1");
        assert!(hit.score > 0.0 && hit.score < 1.0);
    }

    #[test]
    fn test_no_shared_feature_is_none() {
        let s = space(&[("HP:1", "increased overbite")]);
        assert!(s.best_match("zygomatic arch").is_none());
        assert!(s.best_match("").is_none());
    }

    #[test]
    fn test_tie_broken_by_smallest_class_id() {
        let s = space(&[("HP:9", "cleft lip"), ("HP:3", "cleft lip"), ("HP:5", "other thing")]);
        let hit = s.best_match("cleft lip").unwrap();
        assert_eq!(hit.class_id, "HP:3");
    }

    #[test]
    fn test_fit_is_input_order_independent() {
        let a = space(&[("HP:1", "cleft lip"), ("HP:2", "cleft palate"), ("HP:3", "lip pit")]);
        let b = space(&[("HP:3", "lip pit"), ("HP:1", "cleft lip"), ("HP:2", "cleft palate")]);
        assert_eq!(a.best_match("cleft"), b.best_match("cleft"));
        assert_eq!(a.vectorize("cleft lip"), b.vectorize("cleft lip"));
    }

    #[test]
    fn test_vectors_are_normalized() {
        let s = space(&[("HP:1", "cleft lip"), ("HP:2", "cleft palate")]);
        let v = s.vectorize("cleft lip and palate");
        assert!((v.dot(&v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_blank_strings_not_fitted() {
        let s = space(&[("HP:1", "  "), ("HP:2", "cleft palate")]);
        assert_eq!(s.document_count(), 1);
    }
}
