//! Subject-indexed triple store
//!
//! The store holds exactly one immutable [`Snapshot`] at a time. A parse
//! builds a fresh [`QuadIndex`] off to the side and, only if the whole text
//! parsed, swaps a new snapshot in and notifies listeners. A failed parse
//! leaves the previous snapshot in place and notifies nobody.

use super::namespace::PrefixMap;
use super::serialization::{ParseError, ParseResult, SerializeResult, TurtleReader, TurtleWriter};
use super::types::Quad;
use crate::config::StoreConfig;
use crate::event::{ChangeBus, ListenerId};
use crate::view::{EventProjector, Event, GraphProjector, GraphView};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, ThreadId};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Text is not valid Turtle; the store is unchanged
    #[error("Parse failed: {0}")]
    Parse(#[from] ParseError),

    /// `parse` was called from inside one of this store's update listeners
    #[error("Store cannot be re-parsed from inside its own update listener")]
    Reentrant,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Quads grouped by subject, in the order subjects were first seen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuadIndex {
    by_subject: IndexMap<String, Vec<Quad>>,
}

impl QuadIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a Turtle document straight into an index, ignoring its prefixes
    pub fn from_turtle(text: &str, base_iri: Option<&str>) -> ParseResult<Self> {
        Ok(Self::parse_document(text, base_iri)?.0)
    }

    /// Parse a Turtle document into an index plus its declared prefixes
    pub fn parse_document(
        text: &str,
        base_iri: Option<&str>,
    ) -> ParseResult<(Self, HashMap<String, String>)> {
        let mut index = Self::new();
        let prefixes = TurtleReader::parse_with(text, base_iri, |quad| index.push(quad))?;
        Ok((index, prefixes))
    }

    /// Append a quad under its subject
    pub fn push(&mut self, quad: Quad) {
        self.by_subject
            .entry(quad.subject.key())
            .or_default()
            .push(quad);
    }

    /// Quads asserted about `subject`
    pub fn get(&self, subject: &str) -> Option<&[Quad]> {
        self.by_subject.get(subject).map(Vec::as_slice)
    }

    pub fn contains_subject(&self, subject: &str) -> bool {
        self.by_subject.contains_key(subject)
    }

    /// Subjects with their quads, in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Quad])> {
        self.by_subject
            .iter()
            .map(|(subject, quads)| (subject.as_str(), quads.as_slice()))
    }

    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.by_subject.keys().map(String::as_str)
    }

    /// All quads, grouped by subject
    pub fn quads(&self) -> impl Iterator<Item = &Quad> {
        self.by_subject.values().flatten()
    }

    /// Order-insensitive view of the quads, for comparing two indexes
    pub fn quad_set(&self) -> HashSet<&Quad> {
        self.quads().collect()
    }

    pub fn subject_count(&self) -> usize {
        self.by_subject.len()
    }

    pub fn quad_count(&self) -> usize {
        self.by_subject.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_subject.is_empty()
    }
}

/// One committed state of the store
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    revision: u64,
    quads: Arc<QuadIndex>,
    prefixes: Arc<PrefixMap>,
}

impl Snapshot {
    /// 0 for an empty store, then +1 per successful parse
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn quads(&self) -> &QuadIndex {
        &self.quads
    }

    pub fn prefixes(&self) -> &PrefixMap {
        &self.prefixes
    }

    /// Graph view of this snapshot
    pub fn nodes_and_links(&self) -> GraphView {
        GraphProjector::new()
            .with_prefixes(self.prefixes.clone())
            .project_index(&self.quads)
    }

    /// Timeline events of this snapshot, oldest first
    pub fn events(&self) -> Vec<Event> {
        EventProjector::new().project(&self.quads)
    }

    /// Serialize this snapshot back to Turtle
    pub fn to_turtle(&self) -> SerializeResult<String> {
        TurtleWriter::serialize(&self.prefixes, self.quads.quads())
    }
}

/// Payload delivered to update listeners
#[derive(Debug, Clone)]
pub struct StoreUpdate {
    pub snapshot: Arc<Snapshot>,
}

impl StoreUpdate {
    pub fn revision(&self) -> u64 {
        self.snapshot.revision()
    }
}

/// Result of a committed parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitSummary {
    /// Revision of the new snapshot
    pub revision: u64,
    /// Distinct subjects in the new index
    pub subjects: usize,
    /// Quads in the new index
    pub quads: usize,
    /// Prefixes that were not bound before this parse
    pub prefixes_added: usize,
    /// Listeners that failed while being notified of this commit
    pub listener_failures: usize,
}

/// Marks the thread currently delivering update notifications
struct NotifyingGuard<'a> {
    slot: &'a Mutex<Option<ThreadId>>,
}

impl<'a> NotifyingGuard<'a> {
    fn enter(slot: &'a Mutex<Option<ThreadId>>) -> Self {
        *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(thread::current().id());
        Self { slot }
    }
}

impl Drop for NotifyingGuard<'_> {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Reactive triple store
///
/// Readers take an `Arc` of the current snapshot and never see a half-built
/// index. Parses are serialized by a commit lock: a second caller waits until
/// the first has swapped its snapshot in and finished notifying.
pub struct TripleStore {
    current: RwLock<Arc<Snapshot>>,
    commit: Mutex<()>,
    notifying: Mutex<Option<ThreadId>>,
    bus: ChangeBus<StoreUpdate>,
    config: StoreConfig,
}

impl TripleStore {
    /// Create an empty store with default configuration
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create an empty store
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::default())),
            commit: Mutex::new(()),
            notifying: Mutex::new(None),
            bus: ChangeBus::new("store"),
            config,
        }
    }

    /// Create a store from an initial document.
    ///
    /// Prefixes of the initial document are captured unless the configuration
    /// says otherwise.
    pub fn from_turtle(text: &str, config: StoreConfig) -> StoreResult<Self> {
        let capture = config.capture_initial_prefixes;
        let store = Self::with_config(config);
        store.parse(text, capture)?;
        Ok(store)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Replace the store contents with the quads of `text`.
    ///
    /// On success the new index replaces the old one wholesale, the prefix
    /// map is extended with the document's prefixes when `capture_prefixes`
    /// is set, and every update listener runs once. On failure nothing
    /// changes and no listener runs.
    pub fn parse(&self, text: &str, capture_prefixes: bool) -> StoreResult<CommitSummary> {
        if self.is_notifying_thread() {
            return Err(StoreError::Reentrant);
        }

        let _commit = self.commit.lock().unwrap_or_else(PoisonError::into_inner);

        let (index, discovered) =
            match QuadIndex::parse_document(text, self.config.base_iri.as_deref()) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(error = %e, "Rejected edit, keeping previous snapshot");
                    return Err(e.into());
                }
            };

        let previous = self.snapshot();
        let (prefixes, prefixes_added) = if capture_prefixes {
            let mut merged = (*previous.prefixes).clone();
            let added = merged.merge(&discovered);
            (Arc::new(merged), added)
        } else {
            (previous.prefixes.clone(), 0)
        };

        let snapshot = Arc::new(Snapshot {
            revision: previous.revision + 1,
            quads: Arc::new(index),
            prefixes,
        });

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = snapshot.clone();

        info!(
            revision = snapshot.revision,
            subjects = snapshot.quads.subject_count(),
            quads = snapshot.quads.quad_count(),
            prefixes_added,
            "Committed store snapshot"
        );

        let report = {
            let _guard = NotifyingGuard::enter(&self.notifying);
            self.bus.notify(&StoreUpdate {
                snapshot: snapshot.clone(),
            })
        };
        debug!(delivered = report.delivered, failed = report.failed, "Notified update listeners");

        Ok(CommitSummary {
            revision: snapshot.revision,
            subjects: snapshot.quads.subject_count(),
            quads: snapshot.quads.quad_count(),
            prefixes_added,
            listener_failures: report.failed,
        })
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Current quad index
    pub fn quad_index(&self) -> Arc<QuadIndex> {
        self.snapshot().quads.clone()
    }

    /// Current prefix map
    pub fn prefix_map(&self) -> Arc<PrefixMap> {
        self.snapshot().prefixes.clone()
    }

    pub fn revision(&self) -> u64 {
        self.snapshot().revision
    }

    /// Register a listener called once per successful parse.
    ///
    /// Listeners run synchronously on the parsing thread, in registration
    /// order. They must not call [`TripleStore::parse`] on this store; doing
    /// so returns [`StoreError::Reentrant`].
    pub fn on_update<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&StoreUpdate) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bus.subscribe(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.bus.unsubscribe(id)
    }

    pub fn listener_count(&self) -> usize {
        self.bus.len()
    }

    /// Graph view of the current snapshot
    pub fn get_nodes_and_links(&self) -> GraphView {
        self.snapshot().nodes_and_links()
    }

    /// Timeline events of the current snapshot
    pub fn get_events(&self) -> Vec<Event> {
        self.snapshot().events()
    }

    /// Serialize the current snapshot to Turtle
    pub fn to_turtle(&self) -> SerializeResult<String> {
        self.snapshot().to_turtle()
    }

    fn is_notifying_thread(&self) -> bool {
        *self.notifying.lock().unwrap_or_else(PoisonError::into_inner) == Some(thread::current().id())
    }
}

impl Default for TripleStore {
    fn default() -> Self {
        Self::new()
    }
}
