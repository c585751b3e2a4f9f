//! Relation table: which cross-ontology edges are allowed per clinical domain.
//!
//! The table is a small comma-separated file with a header row; fields may
//! be quoted:
//!
//! ```text
//! domain,source_ontology,relation,target_ontology
//! drugs,chebi,http://purl.obolibrary.org/obo/RO_0002180,vo
//! conditions,mondo,http://purl.obolibrary.org/obo/RO_0002200,hp
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::defaults::OBO_PURL;
use crate::error::{Error, Result};
use crate::models::ClinicalDomain;
use crate::table::{display_row, read_rows};

/// One permissible edge between two ontologies for a clinical domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationRule {
    pub domain: ClinicalDomain,
    /// Lowercase ontology name of the triple subject
    pub source_ontology: String,
    /// Predicate IRI or OBO local id (e.g. `RO_0002180`)
    pub predicate: String,
    /// Lowercase ontology name of the triple object
    pub target_ontology: String,
}

impl RelationRule {
    pub fn new(
        domain: ClinicalDomain,
        source_ontology: &str,
        predicate: impl Into<String>,
        target_ontology: &str,
    ) -> Self {
        Self {
            domain,
            source_ontology: source_ontology.trim().to_lowercase(),
            predicate: predicate.into().trim().to_string(),
            target_ontology: target_ontology.trim().to_lowercase(),
        }
    }

    /// Predicate as a full IRI; bare OBO ids are expanded with the OBO PURL.
    pub fn predicate_iri(&self) -> String {
        if self.predicate.contains("://") {
            self.predicate.clone()
        } else {
            format!("{}{}", OBO_PURL, self.predicate.replace(':', "_"))
        }
    }
}

const DEFAULT_RULES: &[(ClinicalDomain, &str, &str, &str)] = &[
    (ClinicalDomain::Condition, "mondo", "RO_0002200", "hp"),
    (ClinicalDomain::Drug, "chebi", "RO_0002180", "vo"),
    (ClinicalDomain::Drug, "chebi", "RO_0002180", "pr"),
    (ClinicalDomain::Drug, "vo", "RO_0002162", "ncbitaxon"),
    (ClinicalDomain::Drug, "pr", "RO_0002162", "ncbitaxon"),
    (ClinicalDomain::Measurement, "hp", "RO_0002479", "uberon"),
    (ClinicalDomain::Measurement, "hp", "RO_0002180", "cl"),
    (ClinicalDomain::Measurement, "hp", "RO_0002180", "chebi"),
    (ClinicalDomain::Measurement, "hp", "RO_0002180", "pr"),
    (ClinicalDomain::Measurement, "pr", "RO_0004028", "chebi"),
    (ClinicalDomain::Measurement, "cl", "RO_0002162", "ncbitaxon"),
    (ClinicalDomain::Measurement, "chebi", "RO_0002162", "ncbitaxon"),
    (ClinicalDomain::Measurement, "pr", "RO_0002162", "ncbitaxon"),
    (ClinicalDomain::Measurement, "uberon", "RO_0002162", "ncbitaxon"),
];

/// Static set of relation rules, loaded once before matching begins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationTable {
    rules: Vec<RelationRule>,
}

impl RelationTable {
    /// Build a table from rules; exact duplicates are dropped, order kept.
    pub fn new(rules: impl IntoIterator<Item = RelationRule>) -> Self {
        let mut table = Self::default();
        for rule in rules {
            table.push(rule);
        }
        table
    }

    /// Cross-ontology relations used for OMOP condition, drug, and
    /// measurement definitions.
    pub fn omop_defaults() -> Self {
        Self::new(
            DEFAULT_RULES
                .iter()
                .map(|(domain, source, predicate, target)| {
                    RelationRule::new(*domain, source, *predicate, target)
                }),
        )
    }

    /// Parse the comma-separated relation table.
    ///
    /// The first non-comment line is treated as the header and skipped.
    /// Blank lines and lines starting with `#` are ignored.
    pub fn parse(text: &str) -> Result<Self> {
        let mut table = Self::default();
        for (line, record) in read_rows("relation table", text)? {
            let fields: Vec<&str> = record.iter().collect();
            if fields.len() != 4 || fields.iter().any(|f| f.is_empty()) {
                return Err(Error::InvalidInput(format!(
                    "relation table line {}: expected 4 non-empty fields, got '{}'",
                    line,
                    display_row(&record)
                )));
            }
            let domain: ClinicalDomain = fields[0].parse().map_err(|e: Error| {
                Error::InvalidInput(format!("relation table line {}: {}", line, e))
            })?;
            table.push(RelationRule::new(domain, fields[1], fields[2], fields[3]));
        }
        debug!(rule_count = table.len(), "Parsed relation table");
        Ok(table)
    }

    pub fn push(&mut self, rule: RelationRule) {
        if !self.rules.contains(&rule) {
            self.rules.push(rule);
        }
    }

    pub fn rules(&self) -> &[RelationRule] {
        &self.rules
    }

    /// Rules applicable to a clinical domain, in table order.
    pub fn rules_for(&self, domain: ClinicalDomain) -> impl Iterator<Item = &RelationRule> {
        self.rules.iter().filter(move |r| r.domain == domain)
    }

    /// Every ontology named by at least one rule for the domain.
    pub fn ontologies_for(&self, domain: ClinicalDomain) -> BTreeSet<&str> {
        self.rules_for(domain)
            .flat_map(|r| [r.source_ontology.as_str(), r.target_ontology.as_str()])
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
domain,source_ontology,relation,target_ontology
drugs,CHEBI,http://purl.obolibrary.org/obo/RO_0002180,VO
# measurement rules
measurements,hp,RO_0000052,uberon
measurements,hp,RO_0000052,cl

conditions,mondo,RO_0002200,hp
";

    #[test]
    fn test_parse_skips_header_comments_and_blank_lines() {
        let table = RelationTable::parse(TABLE).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.rules()[0].domain, ClinicalDomain::Drug);
        assert_eq!(table.rules()[0].source_ontology, "chebi");
        assert_eq!(table.rules()[0].target_ontology, "vo");
    }

    #[test]
    fn test_ontologies_for_domain() {
        let table = RelationTable::parse(TABLE).unwrap();
        let onts: Vec<&str> = table
            .ontologies_for(ClinicalDomain::Measurement)
            .into_iter()
            .collect();
        assert_eq!(onts, vec!["cl", "hp", "uberon"]);
        assert_eq!(table.rules_for(ClinicalDomain::Measurement).count(), 2);
    }

    #[test]
    fn test_domain_without_rules() {
        let table = RelationTable::parse("domain,source,relation,target\n").unwrap();
        assert!(table.is_empty());
        assert!(table.ontologies_for(ClinicalDomain::Drug).is_empty());
    }

    #[test]
    fn test_parse_rejects_short_row() {
        let err = RelationTable::parse("header\ndrugs,chebi,RO_0002180\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_quoted_fields() {
        let text = "domain,source_ontology,relation,target_ontology\n\
                    \"drugs\",\"chebi\",\"RO_0002180\",\"vo\"\n\
                    \"conditions\",mondo,\"http://purl.obolibrary.org/obo/RO_0002200\",hp\n";
        let table = RelationTable::parse(text).unwrap();
        assert_eq!(
            table.rules(),
            &[
                RelationRule::new(ClinicalDomain::Drug, "chebi", "RO_0002180", "vo"),
                RelationRule::new(
                    ClinicalDomain::Condition,
                    "mondo",
                    "http://purl.obolibrary.org/obo/RO_0002200",
                    "hp"
                ),
            ]
        );
    }

    #[test]
    fn test_parse_rejects_blank_field() {
        let err = RelationTable::parse("header\ndrugs,chebi,\"\",vo\n").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_rejects_unknown_domain() {
        let err = RelationTable::parse("header\nprocedures,hp,RO_1,mondo\n").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_duplicate_rules_dropped() {
        let rule = RelationRule::new(ClinicalDomain::Drug, "chebi", "RO_0002180", "vo");
        let table = RelationTable::new(vec![rule.clone(), rule]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_predicate_iri_expansion() {
        let rule = RelationRule::new(ClinicalDomain::Drug, "chebi", "RO:0002180", "vo");
        assert_eq!(
            rule.predicate_iri(),
            "http://purl.obolibrary.org/obo/RO_0002180"
        );
        let full = RelationRule::new(
            ClinicalDomain::Drug,
            "chebi",
            "http://purl.obolibrary.org/obo/RO_0002180",
            "vo",
        );
        assert_eq!(full.predicate_iri(), full.predicate);
    }

    #[test]
    fn test_omop_defaults() {
        let table = RelationTable::omop_defaults();
        assert_eq!(table.len(), 14);
        let drug: Vec<&str> = table.ontologies_for(ClinicalDomain::Drug).into_iter().collect();
        assert_eq!(drug, vec!["chebi", "ncbitaxon", "pr", "vo"]);
        let condition: Vec<&RelationRule> = table.rules_for(ClinicalDomain::Condition).collect();
        assert_eq!(
            condition,
            vec![&RelationRule::new(ClinicalDomain::Condition, "mondo", "RO_0002200", "hp")]
        );
    }
}
