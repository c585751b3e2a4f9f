//! Matcher configuration.
//!
//! Values default to the constants in [`crate::defaults`] and can be
//! overridden programmatically (`with_*` builders) or from `OBOMAP_*`
//! environment variables. [`MatcherConfig::validate`] runs before any
//! matching begins; out-of-range bounds are fatal.

use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, Result};
use crate::models::ClinicalDomain;

/// Feature extraction used by the TF-IDF space.
///
/// The same mode is used for fitting and for query vectorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenMode {
    /// Word n-grams from 1 up to `ngram_max`
    #[default]
    Word,
    /// Character n-grams of width `char_ngram`
    Char,
}

impl FromStr for TokenMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "word" | "words" => Ok(TokenMode::Word),
            "char" | "chars" | "character" => Ok(TokenMode::Char),
            other => Err(Error::Config(format!("unknown token mode: {}", other))),
        }
    }
}

/// Which ontologies are mapped for each clinical domain.
///
/// A domain without an explicit selection maps against every loaded
/// ontology.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainOntologies {
    selections: BTreeMap<ClinicalDomain, Vec<String>>,
}

impl DomainOntologies {
    /// Domain assignment used by the OMOP2OBO mapping sets.
    pub fn omop_defaults() -> Self {
        Self::default()
            .with_domain(ClinicalDomain::Condition, defaults::CONDITION_ONTOLOGIES)
            .with_domain(ClinicalDomain::Drug, defaults::DRUG_ONTOLOGIES)
            .with_domain(ClinicalDomain::Measurement, defaults::MEASUREMENT_ONTOLOGIES)
    }

    pub fn with_domain(mut self, domain: ClinicalDomain, ontologies: &[&str]) -> Self {
        let mut names: Vec<String> = Vec::new();
        for ont in ontologies {
            let name = ont.trim().to_lowercase();
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }
        self.selections.insert(domain, names);
        self
    }

    /// Explicit selection for a domain, if any.
    pub fn requested(&self, domain: ClinicalDomain) -> Option<&[String]> {
        self.selections.get(&domain).map(Vec::as_slice)
    }

    /// Ontologies to map for `domain`, restricted to the loaded ones.
    pub fn resolve<'a>(&self, domain: ClinicalDomain, loaded: &[&'a str]) -> Vec<&'a str> {
        match self.selections.get(&domain) {
            Some(names) => names
                .iter()
                .filter_map(|n| loaded.iter().copied().find(|l| *l == n.as_str()))
                .collect(),
            None => {
                let mut all = loaded.to_vec();
                all.sort_unstable();
                all
            }
        }
    }

    /// Every explicitly requested ontology name, across all domains.
    pub fn all_requested(&self) -> BTreeSet<&str> {
        self.selections
            .values()
            .flatten()
            .map(String::as_str)
            .collect()
    }
}

/// Configuration for the matchers and the mapping pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Minimum cosine similarity for a similarity match (inclusive)
    pub similarity_threshold: f32,
    /// Distinct similarity classes kept per concept per ontology
    pub similarity_top_n: usize,
    /// Drop similarity candidates below this percentile of candidate scores
    pub similarity_percentile: Option<f32>,
    pub token_mode: TokenMode,
    /// Largest word n-gram (word mode)
    pub ngram_max: usize,
    /// Character n-gram width (char mode)
    pub char_ngram: usize,
    /// Also match ancestor codes (evidence marked with ancestor provenance)
    pub match_ancestors: bool,
    /// Add subclasses of directly matched ontology classes (child provenance)
    pub match_hierarchy: bool,
    /// Subclass levels added by hierarchy expansion
    pub hierarchy_depth: u32,
    /// Canonical vocabularies allowed to take part in code matching
    pub vocabulary_filter: Option<BTreeSet<String>>,
    /// Worker partitions for parallel runs
    pub workers: usize,
    pub domains: DomainOntologies,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: defaults::SIMILARITY_THRESHOLD,
            similarity_top_n: defaults::SIMILARITY_TOP_N,
            similarity_percentile: None,
            token_mode: TokenMode::Word,
            ngram_max: defaults::WORD_NGRAM_MAX,
            char_ngram: defaults::CHAR_NGRAM_SIZE,
            match_ancestors: true,
            match_hierarchy: false,
            hierarchy_depth: defaults::HIERARCHY_DEPTH,
            vocabulary_filter: None,
            workers: defaults::WORKERS,
            domains: DomainOntologies::default(),
        }
    }
}

impl MatcherConfig {
    /// Build a configuration from environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// Environment variables:
    /// - `OBOMAP_SIMILARITY_THRESHOLD` (default: 0.5)
    /// - `OBOMAP_SIMILARITY_TOP_N` (default: 1)
    /// - `OBOMAP_SIMILARITY_PERCENTILE` (default: unset)
    /// - `OBOMAP_TOKEN_MODE` (`word` | `char`, default: word)
    /// - `OBOMAP_NGRAM_MAX` (default: 3)
    /// - `OBOMAP_CHAR_NGRAM` (default: 3)
    /// - `OBOMAP_MATCH_ANCESTORS` (default: true)
    /// - `OBOMAP_MATCH_HIERARCHY` (default: false)
    /// - `OBOMAP_HIERARCHY_DEPTH` (default: 1)
    /// - `OBOMAP_VOCABULARY_FILTER` (comma-separated canonical names)
    /// - `OBOMAP_WORKERS` (default: 4)
    ///
    /// Unparseable values are a [`Error::Config`]; out-of-range values are
    /// a [`Error::ThresholdConfig`].
    pub fn from_env() -> Result<Self> {
        let base = Self::default();
        let config = Self {
            similarity_threshold: parse_env("OBOMAP_SIMILARITY_THRESHOLD")?
                .unwrap_or(base.similarity_threshold),
            similarity_top_n: parse_env("OBOMAP_SIMILARITY_TOP_N")?
                .unwrap_or(base.similarity_top_n),
            similarity_percentile: parse_env("OBOMAP_SIMILARITY_PERCENTILE")?,
            token_mode: parse_env("OBOMAP_TOKEN_MODE")?.unwrap_or(base.token_mode),
            ngram_max: parse_env("OBOMAP_NGRAM_MAX")?.unwrap_or(base.ngram_max),
            char_ngram: parse_env("OBOMAP_CHAR_NGRAM")?.unwrap_or(base.char_ngram),
            match_ancestors: parse_bool_env("OBOMAP_MATCH_ANCESTORS", base.match_ancestors),
            match_hierarchy: parse_bool_env("OBOMAP_MATCH_HIERARCHY", base.match_hierarchy),
            hierarchy_depth: parse_env("OBOMAP_HIERARCHY_DEPTH")?.unwrap_or(base.hierarchy_depth),
            vocabulary_filter: env::var("OBOMAP_VOCABULARY_FILTER")
                .ok()
                .map(|v| parse_vocabulary_list(&v))
                .filter(|set| !set.is_empty()),
            workers: parse_env("OBOMAP_WORKERS")?.unwrap_or(base.workers),
            domains: base.domains,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.similarity_top_n = top_n;
        self
    }

    pub fn with_percentile(mut self, percentile: f32) -> Self {
        self.similarity_percentile = Some(percentile);
        self
    }

    pub fn with_token_mode(mut self, mode: TokenMode) -> Self {
        self.token_mode = mode;
        self
    }

    pub fn with_ngram_max(mut self, ngram_max: usize) -> Self {
        self.ngram_max = ngram_max;
        self
    }

    pub fn with_char_ngram(mut self, width: usize) -> Self {
        self.char_ngram = width;
        self
    }

    pub fn with_match_ancestors(mut self, enabled: bool) -> Self {
        self.match_ancestors = enabled;
        self
    }

    /// Enable subclass expansion down to `depth` levels below each direct match.
    pub fn with_hierarchy(mut self, depth: u32) -> Self {
        self.match_hierarchy = true;
        self.hierarchy_depth = depth;
        self
    }

    /// Restrict code matching to these vocabularies (canonical names).
    pub fn with_vocabulary_filter(mut self, vocabularies: &[&str]) -> Self {
        self.vocabulary_filter = Some(
            vocabularies
                .iter()
                .map(|v| v.trim().to_uppercase())
                .filter(|v| !v.is_empty())
                .collect(),
        );
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_domains(mut self, domains: DomainOntologies) -> Self {
        self.domains = domains;
        self
    }

    /// Check every bound; called once at pipeline initialization.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(Error::ThresholdConfig(format!(
                "similarity_threshold must be in [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if self.similarity_top_n == 0 {
            return Err(Error::ThresholdConfig(
                "similarity_top_n must be at least 1".to_string(),
            ));
        }
        if let Some(p) = self.similarity_percentile {
            if !(0.0..=100.0).contains(&p) {
                return Err(Error::ThresholdConfig(format!(
                    "similarity_percentile must be in [0, 100], got {}",
                    p
                )));
            }
        }
        if self.ngram_max == 0 || self.char_ngram == 0 {
            return Err(Error::ThresholdConfig(
                "n-gram sizes must be at least 1".to_string(),
            ));
        }
        if self.hierarchy_depth == 0 {
            return Err(Error::ThresholdConfig(
                "hierarchy_depth must be at least 1".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(Error::ThresholdConfig(
                "workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a canonical vocabulary passes the optional filter.
    pub fn allows_vocabulary(&self, vocabulary: &str) -> bool {
        self.vocabulary_filter
            .as_ref()
            .map_or(true, |filter| filter.contains(vocabulary))
    }
}

fn parse_vocabulary_list(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(|v| v.trim().to_uppercase())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Parses an optional environment variable; empty counts as unset.
fn parse_env<T: FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} has an invalid value: {}", key, raw))),
        _ => Ok(None),
    }
}

/// Recognizes "true", "1", "yes", "on" (case-insensitive) as true and the
/// matching negatives as false. Anything else returns the default.
fn parse_bool_env(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|val| match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}
