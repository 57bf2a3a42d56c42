//! RDF support
//!
//! This module implements the reactive triple store and its building blocks:
//! - RDF terms and quads (wrapping `oxrdf`)
//! - Turtle parsing and writing (via `rio_turtle`)
//! - Prefix bookkeeping
//! - Heuristic class detection
//!
//! # Example
//!
//! ```rust
//! use provlens::rdf::TripleStore;
//!
//! let store = TripleStore::new();
//! store.parse(
//!     "@prefix ex: <http://ex.org/#> .
//!      @prefix owl: <http://www.w3.org/2002/07/owl#> .
//!      ex:Task1 a ex:Task .
//!      ex:Task a owl:Class .",
//!     true,
//! ).unwrap();
//!
//! let view = store.get_nodes_and_links();
//! assert!(view.node("http://ex.org/#Task").unwrap().is_class());
//! ```

mod types;
mod store;
pub mod classify;
pub mod namespace;
pub mod serialization;

pub use types::{
    RdfSubject, RdfPredicate, RdfObject,
    NamedNode, BlankNode, Literal, Quad,
    RdfError, RdfResult,
};

pub use store::{
    TripleStore, StoreError, StoreResult,
    QuadIndex, Snapshot, StoreUpdate, CommitSummary,
};

pub use classify::{Classifier, ClassRule};

pub use namespace::PrefixMap;

pub use serialization::{
    TurtleReader, TurtleWriter,
    ParseError, ParseResult,
    SerializeError, SerializeResult,
};
