//! Parallel runs must be indistinguishable from sequential runs.

mod fixtures;

use obomap_core::{ClinicalConcept, ClinicalDomain, MatcherConfig, VocabularyAliases};
use obomap_match::MappingPipeline;

fn pipeline(workers: usize) -> MappingPipeline {
    MappingPipeline::new(
        fixtures::ontology_set(),
        VocabularyAliases::with_defaults(),
        MatcherConfig::default().with_workers(workers),
    )
    .expect("pipeline should initialize")
}

/// Fixture concepts repeated under fresh keys so every worker gets a share.
fn many_concepts(copies: usize) -> Vec<ClinicalConcept> {
    let mut all = Vec::new();
    for copy in 0..copies {
        for mut concept in fixtures::concepts() {
            if !concept.key.is_empty() {
                concept.key = format!("{}-{}", concept.key, copy);
            }
            all.push(concept);
        }
    }
    all
}

#[tokio::test]
async fn test_parallel_matches_sequential() {
    let p = pipeline(3);
    let concepts = fixtures::concepts();

    let sequential = p.run(&concepts);
    let parallel = p.run_parallel(&concepts).await.unwrap();

    assert_eq!(parallel.to_tsv().unwrap(), sequential.to_tsv().unwrap());
    assert_eq!(parallel.mappings, sequential.mappings);
    assert_eq!(parallel.diagnostics, sequential.diagnostics);
    assert_eq!(parallel.unmapped, sequential.unmapped);
    assert_eq!(parallel.coverage, sequential.coverage);
}

#[tokio::test]
async fn test_parallel_preserves_input_order() {
    let p = pipeline(4);
    let concepts = many_concepts(5);

    let run = p.run_parallel(&concepts).await.unwrap();
    let keys: Vec<&str> = run.mappings.iter().map(|m| m.clinical_key.as_str()).collect();

    let expected: Vec<String> = concepts
        .iter()
        .filter(|c| !c.label.is_empty())
        .map(|c| c.key.clone())
        .collect();
    // Duplicates are only detected within one copy, so all labelled records survive
    // except the repeated 4003 in each copy.
    assert_eq!(keys.len(), expected.len() - 5);
    assert_eq!(keys[0], "70305005-0");
    assert_eq!(*keys.last().unwrap(), "3004410_Normal-4");
}

#[tokio::test]
async fn test_worker_count_does_not_change_output() {
    let concepts = many_concepts(3);
    let baseline = pipeline(1).run(&concepts).fingerprint().unwrap();

    for workers in [1, 2, 7, 64] {
        let run = pipeline(workers).run_parallel(&concepts).await.unwrap();
        assert_eq!(run.fingerprint().unwrap(), baseline, "workers = {}", workers);
    }
}

#[tokio::test]
async fn test_parallel_with_only_invalid_records() {
    let p = pipeline(2);
    let concepts = vec![
        ClinicalConcept::new("", ClinicalDomain::Condition, "no key"),
        ClinicalConcept::new("1", ClinicalDomain::Drug, " "),
    ];
    let run = p.run_parallel(&concepts).await.unwrap();

    assert!(run.mappings.is_empty());
    assert_eq!(run.diagnostics.len(), 2);
}

#[tokio::test]
async fn test_cloned_pipeline_shares_state() {
    let p = pipeline(2);
    let clone = p.clone();
    let concepts = fixtures::concepts();

    let (a, b) = tokio::join!(p.run_parallel(&concepts), clone.run_parallel(&concepts));
    assert_eq!(a.unwrap().fingerprint().unwrap(), b.unwrap().fingerprint().unwrap());
}
