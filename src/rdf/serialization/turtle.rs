//! Turtle format implementation

use crate::rdf::namespace::{vocab, PrefixMap};
use crate::rdf::{BlankNode, Literal, NamedNode, Quad, RdfObject, RdfPredicate, RdfSubject};
use super::{ParseError, ParseResult, SerializeError, SerializeResult};
use oxiri::Iri;
use rio_api::formatter::TriplesFormatter;
use rio_api::parser::TriplesParser;
use rio_turtle::{TurtleFormatter, TurtleParser};
use std::collections::{HashMap, HashSet};
use std::io::{BufReader, Cursor, Write};

/// Prefix of the labels `rio_turtle` mints for `[]` and collections. The
/// parser also appends `d` to any document label starting with it, so such
/// labels would change on every write/re-parse cycle.
const GENERATED_LABEL_PREFIX: &str = "riog";

/// Turtle reader
pub struct TurtleReader;

impl TurtleReader {
    /// Parse Turtle text, handing every quad to `on_quad` in document order.
    ///
    /// Blank nodes the parser named itself get stable `bN` labels, so the
    /// output of [`TurtleWriter`] parses back to the very same quads.
    ///
    /// Returns the prefix bindings declared by the document. Nothing is
    /// delivered unless the whole document parsed.
    pub fn parse_with<F>(
        input: &str,
        base_iri: Option<&str>,
        mut on_quad: F,
    ) -> ParseResult<HashMap<String, String>>
    where
        F: FnMut(Quad),
    {
        let base = match base_iri {
            Some(iri) => Some(Iri::parse(iri.to_string()).map_err(|e| ParseError::InvalidBase {
                iri: iri.to_string(),
                reason: e.to_string(),
            })?),
            None => None,
        };

        let mut reader = BufReader::new(Cursor::new(input));
        let mut parser = TurtleParser::new(&mut reader, base);

        let mut parsed = Vec::new();
        parser.parse_all(&mut |t| -> Result<(), ParseError> {
            let subject = convert_subject(t.subject)?;
            let predicate = RdfPredicate::new(t.predicate.iri)?;
            let object = convert_object(t.object)?;

            parsed.push(Quad::in_default_graph(subject, predicate, object));
            Ok(())
        })?;

        let mut relabeler = BlankRelabeler::new(&parsed);
        for quad in parsed {
            on_quad(relabeler.relabel_quad(quad)?);
        }

        Ok(parser.prefixes().clone())
    }

    /// Parse Turtle text into a list of quads and the declared prefixes
    pub fn parse(input: &str) -> ParseResult<(Vec<Quad>, HashMap<String, String>)> {
        let mut quads = Vec::new();
        let prefixes = Self::parse_with(input, None, |q| quads.push(q))?;
        Ok((quads, prefixes))
    }
}

/// Turtle writer
pub struct TurtleWriter;

impl TurtleWriter {
    /// Serialize quads to Turtle, preceded by one `@prefix` line per binding.
    ///
    /// IRIs are written in full; the prefix lines are there so that re-parsing
    /// the output with prefix capture restores the bindings. Graph names are
    /// dropped since Turtle has no syntax for them.
    pub fn serialize<'a, I>(prefixes: &PrefixMap, quads: I) -> SerializeResult<String>
    where
        I: IntoIterator<Item = &'a Quad>,
    {
        let mut output = Vec::new();

        for (prefix, iri) in prefixes.iter() {
            writeln!(output, "@prefix {}: <{}> .", prefix, iri)?;
        }
        if !prefixes.is_empty() {
            writeln!(output)?;
        }

        let mut formatter = TurtleFormatter::new(&mut output);

        for quad in quads {
            let subject = match &quad.subject {
                RdfSubject::NamedNode(n) => {
                    rio_api::model::Subject::NamedNode(rio_api::model::NamedNode { iri: n.as_str() })
                }
                RdfSubject::BlankNode(b) => {
                    rio_api::model::Subject::BlankNode(rio_api::model::BlankNode { id: b.as_str() })
                }
            };

            let predicate = rio_api::model::NamedNode { iri: quad.predicate.as_str() };

            let datatype;
            let object = match &quad.object {
                RdfObject::NamedNode(n) => {
                    rio_api::model::Term::NamedNode(rio_api::model::NamedNode { iri: n.as_str() })
                }
                RdfObject::BlankNode(b) => {
                    rio_api::model::Term::BlankNode(rio_api::model::BlankNode { id: b.as_str() })
                }
                RdfObject::Literal(l) => {
                    let literal = if let Some(language) = l.language() {
                        rio_api::model::Literal::LanguageTaggedString { value: l.value(), language }
                    } else {
                        datatype = l.datatype();
                        if datatype.as_str() == vocab::XSD_STRING {
                            rio_api::model::Literal::Simple { value: l.value() }
                        } else {
                            rio_api::model::Literal::Typed {
                                value: l.value(),
                                datatype: rio_api::model::NamedNode { iri: datatype.as_str() },
                            }
                        }
                    };
                    rio_api::model::Term::Literal(literal)
                }
            };

            formatter
                .format(&rio_api::model::Triple { subject, predicate, object })
                .map_err(|e| SerializeError::Serialize(e.to_string()))?;
        }

        formatter
            .finish()
            .map_err(|e| SerializeError::Serialize(e.to_string()))?;

        String::from_utf8(output).map_err(|e| SerializeError::Serialize(e.to_string()))
    }
}

/// Renames parser-generated blank nodes to `b0`, `b1`, ... in first-seen
/// order, skipping labels the document already uses.
struct BlankRelabeler {
    taken: HashSet<String>,
    assigned: HashMap<String, String>,
    next: usize,
}

impl BlankRelabeler {
    fn new(quads: &[Quad]) -> Self {
        let mut taken = HashSet::new();
        for quad in quads {
            if let RdfSubject::BlankNode(b) = &quad.subject {
                taken.insert(b.as_str().to_string());
            }
            if let RdfObject::BlankNode(b) = &quad.object {
                taken.insert(b.as_str().to_string());
            }
        }
        taken.retain(|label| !label.starts_with(GENERATED_LABEL_PREFIX));

        Self {
            taken,
            assigned: HashMap::new(),
            next: 0,
        }
    }

    fn relabel_quad(&mut self, quad: Quad) -> ParseResult<Quad> {
        let subject = match quad.subject {
            RdfSubject::BlankNode(b) => self.relabel(b)?.into(),
            named => named,
        };
        let object = match quad.object {
            RdfObject::BlankNode(b) => self.relabel(b)?.into(),
            other => other,
        };
        Ok(Quad::new(subject, quad.predicate, object, quad.graph))
    }

    fn relabel(&mut self, node: BlankNode) -> ParseResult<BlankNode> {
        if !node.as_str().starts_with(GENERATED_LABEL_PREFIX) {
            return Ok(node);
        }
        if let Some(label) = self.assigned.get(node.as_str()) {
            return Ok(BlankNode::from_label(label)?);
        }

        let label = loop {
            let candidate = format!("b{}", self.next);
            self.next += 1;
            if !self.taken.contains(&candidate) {
                break candidate;
            }
        };
        let relabeled = BlankNode::from_label(&label)?;
        self.assigned.insert(node.as_str().to_string(), label);
        Ok(relabeled)
    }
}

fn convert_subject(s: rio_api::model::Subject) -> ParseResult<RdfSubject> {
    match s {
        rio_api::model::Subject::NamedNode(n) => Ok(NamedNode::new(n.iri)?.into()),
        rio_api::model::Subject::BlankNode(b) => Ok(BlankNode::from_label(b.id)?.into()),
        _ => Err(ParseError::Unsupported("quoted triple as subject".to_string())),
    }
}

fn convert_object(o: rio_api::model::Term) -> ParseResult<RdfObject> {
    match o {
        rio_api::model::Term::NamedNode(n) => Ok(NamedNode::new(n.iri)?.into()),
        rio_api::model::Term::BlankNode(b) => Ok(BlankNode::from_label(b.id)?.into()),
        rio_api::model::Term::Literal(l) => {
            let literal = match l {
                rio_api::model::Literal::Simple { value } => Literal::new_simple_literal(value),
                rio_api::model::Literal::LanguageTaggedString { value, language } => {
                    Literal::new_language_tagged_literal(value, language)?
                }
                rio_api::model::Literal::Typed { value, datatype } => {
                    Literal::new_typed_literal(value, NamedNode::new(datatype.iri)?)
                }
            };
            Ok(literal.into())
        }
        _ => Err(ParseError::Unsupported("quoted triple as object".to_string())),
    }
}
