//! Provlens
//!
//! A reactive RDF store for editing a small Turtle document while two derived
//! views stay in sync with it: a node/link graph of instances and classes, and
//! a time-ordered list of provenance events.
//!
//! # Architecture
//!
//! - [`rdf::TripleStore`] owns one immutable snapshot (quad index + prefix map)
//!   and swaps it wholesale on every successful parse.
//! - [`rdf::classify`] decides which IRIs are classes.
//! - [`view::graph`] and [`view::timeline`] project a snapshot into
//!   nodes/links and events. They are recomputed on every call.
//! - [`event::ChangeBus`] delivers one update per committed parse to every
//!   listener, in order, isolating listener failures.
//! - [`editor::EditorSession`] debounces edits and rewrites its buffer from
//!   each commit without feeding its own echo back into the store.
//!
//! ## Example Usage
//!
//! ```rust
//! use provlens::{StoreConfig, TripleStore};
//!
//! let store = TripleStore::from_turtle(
//!     r#"@prefix ex: <http://ex.org/#> .
//!        @prefix prov: <http://www.w3.org/ns/prov#> .
//!        ex:Task2 prov:startedAtTime "2023-01-02T00:00:00Z" .
//!        ex:Task1 prov:startedAtTime "2023-01-01T00:00:00Z" ."#,
//!     StoreConfig::default(),
//! ).unwrap();
//!
//! let events = store.get_events();
//! assert_eq!(events[0].subject, "http://ex.org/#Task1");
//!
//! // Invalid text leaves the store untouched
//! assert!(store.parse("ex:Task1 ex:", false).is_err());
//! assert_eq!(store.get_events(), events);
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod editor;
pub mod event;
pub mod rdf;
pub mod view;

// Re-export main types for convenience
pub use config::{Config, ConfigError, EditorConfig, StoreConfig};

pub use editor::{ChangeDisposition, EditorSession};

pub use event::{ChangeBus, ListenerId, NotifyReport, Selection, SelectionBus};

pub use rdf::{
    CommitSummary, PrefixMap, Quad, QuadIndex, Snapshot, StoreError, StoreResult, StoreUpdate,
    TripleStore,
};

pub use view::{Event, GraphView, Link, Node, NodeKind};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(version(), "0.1.0");
    }
}
