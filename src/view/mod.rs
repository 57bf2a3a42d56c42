//! Derived views of the store
//!
//! Both projections are pure functions of a [`QuadIndex`](crate::rdf::QuadIndex):
//! nothing is cached between calls.

pub mod graph;
pub mod timeline;

pub use graph::{GraphProjector, GraphView, Link, Node, NodeKind};
pub use timeline::{parse_instant, time_extent, Event, EventProjector};
