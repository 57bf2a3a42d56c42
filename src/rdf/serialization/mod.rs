//! Turtle parser and writer adapters
//!
//! Parsing collects quads from `rio_turtle` and reports the prefix bindings
//! the document declared. Blank nodes the parser invents get stable labels.
//! Writing emits `@prefix` lines for the store's prefix map followed by the
//! triples, formatted by `rio_turtle`.

mod turtle;

pub use turtle::{TurtleReader, TurtleWriter};

use thiserror::Error;

/// Parse errors
#[derive(Error, Debug)]
pub enum ParseError {
    /// Text is not valid Turtle
    #[error("Syntax error: {0}")]
    Syntax(#[from] rio_turtle::TurtleError),

    /// Term accepted by the parser but rejected by the RDF model
    #[error("Invalid term: {0}")]
    InvalidTerm(#[from] crate::rdf::types::RdfError),

    /// Construct the store cannot hold (e.g. RDF-star quoted triples)
    #[error("Unsupported term: {0}")]
    Unsupported(String),

    /// Base IRI from configuration is not an absolute IRI
    #[error("Invalid base IRI {iri}: {reason}")]
    InvalidBase { iri: String, reason: String },
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Serialization errors
#[derive(Error, Debug)]
pub enum SerializeError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),
}

pub type SerializeResult<T> = Result<T, SerializeError>;
