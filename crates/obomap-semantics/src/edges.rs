//! Edge-list export of cross-ontology triples.

use serde::{Deserialize, Serialize};

use obomap_core::Result;
use obomap_match::export::write_tsv;

use crate::definition::SemanticDefinition;

pub const EDGE_TSV_HEADER: &str = "subject\tpredicate\tobject\tclinical_key";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRow {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub clinical_key: String,
}

/// One row per triple, in definition order.
pub fn edge_rows(definitions: &[SemanticDefinition]) -> Vec<EdgeRow> {
    definitions
        .iter()
        .flat_map(|definition| {
            definition.triples.iter().map(move |t| EdgeRow {
                subject: t.subject.clone(),
                predicate: t.predicate.clone(),
                object: t.object.clone(),
                clinical_key: definition.clinical_key.clone(),
            })
        })
        .collect()
}

pub fn edges_to_tsv(rows: &[EdgeRow]) -> Result<String> {
    write_tsv(
        EDGE_TSV_HEADER,
        rows.iter()
            .map(|row| [&row.subject, &row.predicate, &row.object, &row.clinical_key]),
    )
}
