//! RDF namespace and prefix management
//!
//! Holds the prefix bindings discovered while parsing Turtle, plus the handful
//! of vocabulary IRIs the classifier and projectors look for.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Well-known vocabulary IRIs
pub mod vocab {
    pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
    pub const RDFS_SUBCLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
    pub const OWL_CLASS: &str = "http://www.w3.org/2002/07/owl#Class";
    pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
}

/// Local name of an IRI: the text after the last `#` or `/`.
///
/// Returns the whole IRI when it contains neither separator.
pub fn local_name(iri: &str) -> &str {
    match iri.rfind(|c: char| c == '#' || c == '/') {
        Some(pos) => &iri[pos + 1..],
        None => iri,
    }
}

/// Prefix bindings collected from parsed documents.
///
/// The map only ever grows: a binding stays even when a later document no
/// longer declares it. Re-declaring a prefix rebinds it to the newer IRI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrefixMap {
    prefixes: IndexMap<String, String>,
}

impl PrefixMap {
    /// Create an empty prefix map
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a prefix, returning true if the prefix was not bound before
    pub fn add_prefix(&mut self, prefix: impl Into<String>, iri: impl Into<String>) -> bool {
        self.prefixes.insert(prefix.into(), iri.into()).is_none()
    }

    /// Merge bindings discovered by one parse.
    ///
    /// New prefixes are appended in lexicographic order so the resulting map
    /// does not depend on the parser's hash ordering. Returns how many
    /// prefixes were newly added.
    pub fn merge<'a, I>(&mut self, discovered: I) -> usize
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut sorted: Vec<_> = discovered.into_iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        sorted
            .into_iter()
            .filter(|(prefix, iri)| self.add_prefix(prefix.as_str(), iri.as_str()))
            .count()
    }

    /// Get IRI for a prefix
    pub fn get_iri(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(|s| s.as_str())
    }

    /// First prefix whose namespace the IRI starts with
    pub fn prefix_of(&self, iri: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .find(|(_, ns)| iri.starts_with(ns.as_str()))
            .map(|(prefix, _)| prefix.as_str())
    }

    /// Compact an IRI using known prefixes
    pub fn compact(&self, iri: &str) -> Option<String> {
        self.prefixes
            .iter()
            .find(|(_, ns)| iri.starts_with(ns.as_str()))
            .map(|(prefix, ns)| format!("{}:{}", prefix, &iri[ns.len()..]))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, i)| (p.as_str(), i.as_str()))
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}
