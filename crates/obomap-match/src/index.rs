//! Read-only ontology indexes.
//!
//! An [`OntologyIndex`] holds the classes of one ontology keyed by id; an
//! [`OntologySet`] holds the indexes a pipeline maps against. Both are built
//! once, before matching, and passed explicitly to whatever needs them.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use obomap_core::{Diagnostic, Error, OntologyClass, Result};

/// Classes of a single ontology, keyed by class id.
#[derive(Debug, Clone)]
pub struct OntologyIndex {
    name: String,
    version: Option<String>,
    classes: BTreeMap<String, OntologyClass>,
    diagnostics: Vec<Diagnostic>,
}

impl OntologyIndex {
    /// Build an index from ontology classes.
    ///
    /// Classes without an id or label are skipped and recorded as
    /// diagnostics. Repeated ids are merged. Fails with
    /// [`Error::EmptyIndex`] when no valid class remains.
    pub fn new(name: &str, classes: impl IntoIterator<Item = OntologyClass>) -> Result<Self> {
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            return Err(Error::InvalidInput("ontology name is empty".to_string()));
        }

        let mut index: BTreeMap<String, OntologyClass> = BTreeMap::new();
        let mut diagnostics = Vec::new();

        for mut class in classes {
            if let Err(e) = class.validate() {
                warn!(
                    ontology = %name,
                    error = %e,
                    "Skipping invalid ontology class"
                );
                diagnostics.push(Diagnostic::from_error(Some(&class.id), &e).with_ontology(&name));
                continue;
            }
            class.id = class.id.trim().to_string();
            match index.get_mut(&class.id) {
                Some(existing) => merge_class(existing, class),
                None => {
                    index.insert(class.id.clone(), class);
                }
            }
        }

        if index.is_empty() {
            return Err(Error::EmptyIndex(name));
        }

        debug!(
            ontology = %name,
            class_count = index.len(),
            diagnostic_count = diagnostics.len(),
            "Built ontology index"
        );

        Ok(Self {
            name,
            version: None,
            classes: index,
            diagnostics,
        })
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn class(&self, id: &str) -> Option<&OntologyClass> {
        self.classes.get(id)
    }

    /// Classes in id order.
    pub fn classes(&self) -> impl Iterator<Item = &OntologyClass> {
        self.classes.values()
    }

    /// Classes skipped while building the index.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Children at an exact distance (0 = direct children).
    pub fn children_at(&self, id: &str, level: u32) -> BTreeSet<&str> {
        self.class(id)
            .and_then(|c| c.children.get(&level))
            .map(|ids| ids.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Loaded subclasses of a class from distance 0 up to `depth - 1`.
    ///
    /// Children listed in the class but absent from the index are skipped.
    pub fn descendants(&self, id: &str, depth: u32) -> BTreeSet<&str> {
        (0..depth)
            .flat_map(|level| self.children_at(id, level))
            .filter_map(|child| self.classes.get_key_value(child).map(|(k, _)| k.as_str()))
            .collect()
    }
}

fn merge_class(existing: &mut OntologyClass, other: OntologyClass) {
    for synonym in other.synonyms {
        if !existing.synonyms.contains(&synonym) {
            existing.synonyms.push(synonym);
        }
    }
    for code in other.codes {
        if !existing.codes.contains(&code) {
            existing.codes.push(code);
        }
    }
    for (level, ids) in other.ancestors {
        existing.ancestors.entry(level).or_default().extend(ids);
    }
    for (level, ids) in other.children {
        existing.children.entry(level).or_default().extend(ids);
    }
}

/// The ontology indexes a pipeline maps against, keyed by ontology name.
#[derive(Debug, Clone)]
pub struct OntologySet {
    indexes: BTreeMap<String, OntologyIndex>,
}

impl OntologySet {
    /// Fails when no index is given or two indexes share a name.
    pub fn new(indexes: impl IntoIterator<Item = OntologyIndex>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for index in indexes {
            let name = index.name().to_string();
            if map.insert(name.clone(), index).is_some() {
                return Err(Error::InvalidInput(format!(
                    "ontology '{}' loaded more than once",
                    name
                )));
            }
        }
        if map.is_empty() {
            return Err(Error::EmptyIndex("no ontologies loaded".to_string()));
        }
        Ok(Self { indexes: map })
    }

    pub fn get(&self, name: &str) -> Option<&OntologyIndex> {
        self.indexes.get(name)
    }

    /// Loaded ontology names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.indexes.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OntologyIndex> {
        self.indexes.values()
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// Total class count across all indexes.
    pub fn class_count(&self) -> usize {
        self.indexes.values().map(OntologyIndex::len).sum()
    }
}
