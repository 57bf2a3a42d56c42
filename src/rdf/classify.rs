//! Class detection
//!
//! A purely syntactic pass over the quad index deciding which IRIs are shown
//! as ontology classes. No entailment is performed.

use super::namespace::vocab;
use super::store::QuadIndex;
use indexmap::IndexSet;

/// Which syntactic signal marked an IRI as a class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassRule {
    /// `X rdf:type owl:Class`
    DeclaredOwlClass,
    /// `X rdfs:subClassOf Y`
    SubClassOf,
    /// `Y rdf:type X` with `X` an IRI
    UsedAsType,
}

/// Heuristic class classifier
#[derive(Debug, Clone, Default)]
pub struct Classifier;

impl Classifier {
    pub fn new() -> Self {
        Self
    }

    /// Set of IRIs to treat as classes, in order of first discovery
    pub fn classes_of(&self, index: &QuadIndex) -> IndexSet<String> {
        let mut classes = IndexSet::new();
        self.walk(index, |iri, _| {
            classes.insert(iri.to_string());
        });
        classes
    }

    /// Every (IRI, rule) hit, including repeats; useful to explain why a node
    /// ended up as a class
    pub fn evidence(&self, index: &QuadIndex) -> Vec<(String, ClassRule)> {
        let mut hits = Vec::new();
        self.walk(index, |iri, rule| hits.push((iri.to_string(), rule)));
        hits
    }

    fn walk<F>(&self, index: &QuadIndex, mut hit: F)
    where
        F: FnMut(&str, ClassRule),
    {
        for (subject, quads) in index.iter() {
            for quad in quads {
                let predicate = quad.predicate.as_str();

                if predicate == vocab::RDF_TYPE {
                    if let Some(class_iri) = quad.object.as_iri() {
                        if class_iri == vocab::OWL_CLASS {
                            hit(subject, ClassRule::DeclaredOwlClass);
                        }
                        hit(class_iri, ClassRule::UsedAsType);
                    }
                } else if predicate == vocab::RDFS_SUBCLASS_OF {
                    hit(subject, ClassRule::SubClassOf);
                }
            }
        }
    }
}

/// Convenience wrapper around [`Classifier::classes_of`]
pub fn classes_of(index: &QuadIndex) -> IndexSet<String> {
    Classifier::new().classes_of(index)
}
