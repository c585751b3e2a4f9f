//! Shared ontology and clinical fixtures for obomap-match integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use obomap_core::{ClinicalConcept, ClinicalDomain, Ingredient, OntologyClass};
use obomap_match::{OntologyIndex, OntologySet};

pub fn hp_classes() -> Vec<OntologyClass> {
    vec![
        OntologyClass::new("HP:0010837", "Increased overbite")
            .with_synonym("Overjet increased")
            .with_xref("SNOMED:70305005")
            .with_ancestor(0, "HP:0000692")
            .with_ancestor(1, "HP:0000118"),
        OntologyClass::new("HP:0000692", "Abnormality of dental position")
            .with_xref("SNOMEDCT_US:1234")
            .with_ancestor(0, "HP:0000118")
            .with_child(0, "HP:0010837"),
        OntologyClass::new("HP:0000204", "Cleft upper lip")
            .with_synonym("Harelip")
            .with_xref("UMLS:C0008924"),
        OntologyClass::new("HP:0410030", "Cleft lip"),
        OntologyClass::new("HP:0000175", "Cleft palate").with_xref("SNOMEDCT_US:87979003"),
        OntologyClass::new("HP:0000118", "Phenotypic abnormality")
            .with_child(0, "HP:0000692")
            .with_child(1, "HP:0010837"),
    ]
}

pub fn mondo_classes() -> Vec<OntologyClass> {
    vec![
        OntologyClass::new("MONDO:0004747", "cleft lip")
            .with_synonym("cleft lip, unspecified")
            .with_xref("UMLS:C0008924"),
        OntologyClass::new("MONDO:0016064", "cleft palate").with_xref("SNOMED:87979003"),
        OntologyClass::new("MONDO:0005148", "type 2 diabetes mellitus")
            .with_synonym("NIDDM")
            .with_xref("ICD10CM:E11"),
    ]
}

pub fn chebi_classes() -> Vec<OntologyClass> {
    vec![
        OntologyClass::new("CHEBI:15365", "acetylsalicylic acid")
            .with_synonym("aspirin")
            .with_xref("DrugBank:DB00945"),
        OntologyClass::new("CHEBI:6801", "metformin").with_xref("DrugBank:DB00331"),
    ]
}

pub fn ontology_set() -> Arc<OntologySet> {
    Arc::new(
        OntologySet::new(vec![
            OntologyIndex::new("hp", hp_classes()).expect("hp index"),
            OntologyIndex::new("mondo", mondo_classes()).expect("mondo index"),
            OntologyIndex::new("chebi", chebi_classes()).expect("chebi index"),
        ])
        .expect("ontology set"),
    )
}

pub fn concepts() -> Vec<ClinicalConcept> {
    vec![
        ClinicalConcept::new("70305005", ClinicalDomain::Condition, "Horizontal overbite")
            .with_code("SNOMED:70305005"),
        ClinicalConcept::new("4001", ClinicalDomain::Condition, "Dental overjet")
            .with_code("SNOMED:99999999")
            .with_synonym("Overjet"),
        ClinicalConcept::new("4002", ClinicalDomain::Condition, "Cleft lip (disorder)")
            .with_code("UMLS:C0008924"),
        ClinicalConcept::new("4003", ClinicalDomain::Condition, "Cleft palate")
            .with_code("SNOMED:87979003"),
        ClinicalConcept::new("4004", ClinicalDomain::Condition, "Type II diabetes")
            .with_code("ICD10CM:E11.9")
            .with_ancestor(0, &["ICD10CM:E11"], Some("Type 2 diabetes mellitus")),
        ClinicalConcept::new("4005", ClinicalDomain::Condition, "Malposition of tooth")
            .with_ancestor(1, &["SNOMED:1234"], None),
        ClinicalConcept::new("4006", ClinicalDomain::Condition, "Zygomatic arch fracture")
            .with_code("LOCALVOCAB:77"),
        ClinicalConcept::new("19019073", ClinicalDomain::Drug, "Aspirin 81 MG Oral Tablet")
            .with_code("RxNorm:19019073")
            .with_ingredient(
                Ingredient::new("1112807", "aspirin").with_code("DrugBank:DB00945"),
            ),
        ClinicalConcept::new("1503297", ClinicalDomain::Drug, "metformin")
            .with_code("RxNorm:1503297"),
        ClinicalConcept::measurement("3004410", "Normal", "Hemoglobin A1c"),
        // skipped: missing label
        ClinicalConcept::new("4999", ClinicalDomain::Condition, ""),
        // skipped: duplicate key in the condition domain
        ClinicalConcept::new("4003", ClinicalDomain::Condition, "Cleft palate again"),
    ]
}
