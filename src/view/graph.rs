//! Node/link projection of the quad index
//!
//! Every subject becomes a node, every class IRI that is never a subject
//! becomes a node too, and every quad pointing at another node becomes a link.

use crate::rdf::classify::Classifier;
use crate::rdf::namespace::{local_name, PrefixMap};
use crate::rdf::{Quad, QuadIndex};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Whether a node is drawn as a class or an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Instance,
    Class,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Instance => write!(f, "instance"),
            NodeKind::Class => write!(f, "class"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub title: String,
    /// Bound prefix whose namespace the id starts with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

impl Node {
    pub fn is_class(&self) -> bool {
        self.kind == NodeKind::Class
    }
}

/// Directed relation between two nodes; `source` is the quad's subject
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub source: String,
    pub target: String,
    /// Predicate the link came from; `rdf:type` links are not special-cased
    pub predicate: String,
}

impl Link {
    /// Join key used by renderers to match links across redraws
    pub fn key(&self) -> String {
        format!("{}|{}", self.source, self.target)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphView {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

impl GraphView {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Ids of nodes linked to `id` in either direction, without repeats
    pub fn neighbors(&self, id: &str) -> Vec<&str> {
        let mut seen = IndexSet::new();
        for link in &self.links {
            if link.source == id {
                seen.insert(link.target.as_str());
            } else if link.target == id {
                seen.insert(link.source.as_str());
            }
        }
        seen.into_iter().collect()
    }

    pub fn classes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_class())
    }

    pub fn instances(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| !n.is_class())
    }
}

/// Title of a node: a `…/title` (or `…#title`) value if the subject has one,
/// otherwise the IRI fragment, otherwise the full IRI
pub fn title_of(id: &str, quads: &[Quad]) -> String {
    quads
        .iter()
        .find(|q| local_name(q.predicate.as_str()) == "title")
        .map(|q| q.object.value().to_string())
        .unwrap_or_else(|| fragment_or_iri(id).to_string())
}

fn fragment_or_iri(iri: &str) -> &str {
    match iri.rsplit_once('#') {
        Some((_, fragment)) if !fragment.is_empty() => fragment,
        _ => iri,
    }
}

#[derive(Debug, Clone, Default)]
pub struct GraphProjector {
    classifier: Classifier,
    prefixes: Arc<PrefixMap>,
}

impl GraphProjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag nodes with the prefix of their namespace
    pub fn with_prefixes(mut self, prefixes: Arc<PrefixMap>) -> Self {
        self.prefixes = prefixes;
        self
    }

    fn prefix_of(&self, id: &str) -> Option<String> {
        if id.starts_with("_:") {
            return None;
        }
        self.prefixes.prefix_of(id).map(str::to_string)
    }

    /// Classify and project in one go
    pub fn project_index(&self, index: &QuadIndex) -> GraphView {
        let classes = self.classifier.classes_of(index);
        self.project(index, &classes)
    }

    /// Project `index` given a precomputed class set
    pub fn project(&self, index: &QuadIndex, classes: &IndexSet<String>) -> GraphView {
        let kind_of = |id: &str| {
            if classes.contains(id) {
                NodeKind::Class
            } else {
                NodeKind::Instance
            }
        };

        let mut nodes: IndexMap<&str, Node> = IndexMap::new();
        for (subject, quads) in index.iter() {
            nodes.insert(
                subject,
                Node {
                    id: subject.to_string(),
                    kind: kind_of(subject),
                    title: title_of(subject, quads),
                    prefix: self.prefix_of(subject),
                },
            );
        }
        for class_iri in classes {
            if !nodes.contains_key(class_iri.as_str()) {
                nodes.insert(
                    class_iri.as_str(),
                    Node {
                        id: class_iri.clone(),
                        kind: NodeKind::Class,
                        title: title_of(class_iri, &[]),
                        prefix: self.prefix_of(class_iri),
                    },
                );
            }
        }

        let links = index
            .quads()
            .filter_map(|quad| {
                let target = quad.object.as_iri()?;
                nodes.contains_key(target).then(|| Link {
                    source: quad.subject.key(),
                    target: target.to_string(),
                    predicate: quad.predicate.as_str().to_string(),
                })
            })
            .collect();

        GraphView {
            nodes: nodes.into_values().collect(),
            links,
        }
    }
}
