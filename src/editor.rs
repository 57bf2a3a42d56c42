//! Text editor session
//!
//! The store-facing half of a Turtle editor widget. Keystrokes are debounced
//! before they reach [`TripleStore::parse`]; every committed snapshot is
//! serialized back into the buffer. While that programmatic write happens the
//! session ignores its own change handler, so the echo never turns into
//! another parse.

use crate::config::EditorConfig;
use crate::event::ListenerId;
use crate::rdf::{CommitSummary, SerializeResult, StoreResult, StoreUpdate, TripleStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// What happened to one change notification from the widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeDisposition {
    /// Edit recorded; it will be parsed once the debounce period elapses
    Scheduled,
    /// Change came from the session's own buffer rewrite and was dropped
    Suppressed,
}

/// Suppression flag held for one update cycle.
///
/// Dropping the guard clears the flag, so an early return or a failed
/// serialization cannot leave the editor deaf to the user.
pub struct SuppressGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> SuppressGuard<'a> {
    pub fn engage(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self { flag }
    }
}

impl Drop for SuppressGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug)]
struct PendingEdit {
    text: String,
    due: Instant,
}

#[derive(Debug, Default)]
struct EditorState {
    buffer: String,
    pending: Option<PendingEdit>,
    last_error: Option<String>,
}

impl EditorState {
    fn initial(serialized: SerializeResult<String>) -> Self {
        match serialized {
            Ok(buffer) => Self {
                buffer,
                ..Self::default()
            },
            Err(e) => {
                warn!(error = %e, "Could not serialize store into a new editor");
                Self {
                    last_error: Some(e.to_string()),
                    ..Self::default()
                }
            }
        }
    }
}

struct EditorInner {
    suppress: AtomicBool,
    state: Mutex<EditorState>,
    debounce: Duration,
    capture_prefixes: bool,
}

impl EditorInner {
    fn state(&self) -> std::sync::MutexGuard<'_, EditorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle_change(&self, text: &str, now: Instant) -> ChangeDisposition {
        if self.suppress.load(Ordering::SeqCst) {
            debug!("Ignoring editor change caused by store update");
            return ChangeDisposition::Suppressed;
        }

        let mut state = self.state();
        state.buffer = text.to_string();
        state.pending = Some(PendingEdit {
            text: text.to_string(),
            due: now + self.debounce,
        });
        ChangeDisposition::Scheduled
    }

    /// Serialize-on-update: rewrite the buffer from the committed snapshot
    fn on_store_update(&self, update: &StoreUpdate) -> anyhow::Result<()> {
        let _guard = SuppressGuard::engage(&self.suppress);
        let text = update.snapshot.to_turtle()?;
        self.state().buffer = text.clone();
        // the widget reports its own setValue as a change; it must be dropped
        self.handle_change(&text, Instant::now());
        Ok(())
    }
}

/// Debounced editor bound to one store
pub struct EditorSession {
    store: Arc<TripleStore>,
    inner: Arc<EditorInner>,
    listener: ListenerId,
}

impl EditorSession {
    /// Bind a session to `store`; the buffer starts as the store's current
    /// Turtle serialization
    ///
    /// If the snapshot cannot be serialized the buffer starts empty and the
    /// failure is kept as [`EditorSession::last_error`].
    pub fn attach(store: Arc<TripleStore>, config: &EditorConfig) -> Self {
        let inner = Arc::new(EditorInner {
            suppress: AtomicBool::new(false),
            state: Mutex::new(EditorState::initial(store.to_turtle())),
            debounce: config.debounce(),
            capture_prefixes: config.capture_prefixes,
        });

        let weak: Weak<EditorInner> = Arc::downgrade(&inner);
        let listener = store.on_update(move |update| match weak.upgrade() {
            Some(inner) => inner.on_store_update(update),
            None => Ok(()),
        });

        Self {
            store,
            inner,
            listener,
        }
    }

    /// Change handler for the widget: record `text` and (re)arm the debounce
    pub fn handle_change(&self, text: &str, now: Instant) -> ChangeDisposition {
        self.inner.handle_change(text, now)
    }

    /// Submit the pending edit if its debounce period has elapsed.
    ///
    /// Returns `None` when nothing was due. A parse failure is kept as
    /// [`EditorSession::last_error`]; the store keeps its last valid snapshot.
    pub fn poll(&self, now: Instant) -> Option<StoreResult<CommitSummary>> {
        let text = {
            let mut state = self.inner.state();
            if !state.pending.as_ref().is_some_and(|p| p.due <= now) {
                return None;
            }
            state.pending.take()?.text
        };
        Some(self.submit(&text))
    }

    /// Submit the pending edit right away, ignoring the debounce period
    pub fn flush(&self) -> Option<StoreResult<CommitSummary>> {
        let text = self.inner.state().pending.take()?.text;
        Some(self.submit(&text))
    }

    fn submit(&self, text: &str) -> StoreResult<CommitSummary> {
        let result = self.store.parse(text, self.inner.capture_prefixes);
        let mut state = self.inner.state();
        match &result {
            Ok(_) => state.last_error = None,
            Err(e) => {
                warn!(error = %e, "Parse error in edited Turtle");
                state.last_error = Some(e.to_string());
            }
        }
        result
    }

    /// Current buffer contents
    pub fn text(&self) -> String {
        self.inner.state().buffer.clone()
    }

    /// Message of the last failed submission, cleared by the next success
    pub fn last_error(&self) -> Option<String> {
        self.inner.state().last_error.clone()
    }

    pub fn has_pending(&self) -> bool {
        self.inner.state().pending.is_some()
    }

    pub fn is_suppressed(&self) -> bool {
        self.inner.suppress.load(Ordering::SeqCst)
    }

    pub fn store(&self) -> &Arc<TripleStore> {
        &self.store
    }
}

impl Drop for EditorSession {
    fn drop(&mut self) {
        self.store.remove_listener(self.listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::rdf::SerializeError;

    const DOC: &str = "@prefix ex: <http://ex.org/#> .\nex:a ex:knows ex:b .\n";

    fn session(debounce_ms: u64) -> EditorSession {
        let store = Arc::new(TripleStore::from_turtle(DOC, StoreConfig::default()).unwrap());
        EditorSession::attach(
            store,
            &EditorConfig {
                debounce_ms,
                capture_prefixes: false,
            },
        )
    }

    #[test]
    fn test_guard_clears_on_early_return() {
        fn fails(flag: &AtomicBool) -> anyhow::Result<()> {
            let _guard = SuppressGuard::engage(flag);
            assert!(flag.load(Ordering::SeqCst));
            anyhow::bail!("serialization failed")
        }

        let flag = AtomicBool::new(false);
        assert!(fails(&flag).is_err());
        assert!(!flag.load(Ordering::SeqCst));
    }

    #[test]
    fn test_initial_buffer_is_serialized_store() {
        let editor = session(500);
        assert!(editor.text().contains("http://ex.org/#knows"));
        assert!(!editor.has_pending());
    }

    #[test]
    fn test_initial_serialization_failure_is_recorded() {
        let state = EditorState::initial(Err(SerializeError::Serialize("bad literal".to_string())));
        assert!(state.buffer.is_empty());
        assert!(state.pending.is_none());
        assert!(state.last_error.unwrap().contains("bad literal"));

        let state = EditorState::initial(Ok("ex:a ex:b ex:c .".to_string()));
        assert_eq!(state.buffer, "ex:a ex:b ex:c .");
        assert!(state.last_error.is_none());
    }

    #[test]
    fn test_edit_waits_for_debounce() {
        let editor = session(500);
        let start = Instant::now();
        let edit = "@prefix ex: <http://ex.org/#> .\nex:c ex:knows ex:d .\n";

        assert_eq!(editor.handle_change(edit, start), ChangeDisposition::Scheduled);
        assert!(editor.poll(start + Duration::from_millis(100)).is_none());
        assert_eq!(editor.store().revision(), 1);

        let summary = editor.poll(start + Duration::from_millis(500)).unwrap().unwrap();
        assert_eq!(summary.revision, 2);
        assert!(editor.store().quad_index().contains_subject("http://ex.org/#c"));
    }

    #[test]
    fn test_newer_keystroke_rearms_debounce() {
        let editor = session(500);
        let start = Instant::now();

        editor.handle_change("first", start);
        editor.handle_change(DOC, start + Duration::from_millis(400));
        assert!(editor.poll(start + Duration::from_millis(600)).is_none());
        assert!(editor.poll(start + Duration::from_millis(900)).unwrap().is_ok());
    }

    #[test]
    fn test_store_update_echo_is_suppressed() {
        let editor = session(0);
        editor.handle_change("@prefix ex: <http://ex.org/#> .\nex:z ex:knows ex:a .\n", Instant::now());
        editor.flush().unwrap().unwrap();

        // the rewrite triggered by the commit did not schedule another parse
        assert!(!editor.has_pending());
        assert!(!editor.is_suppressed());
        assert!(editor.text().contains("http://ex.org/#z"));
        assert_eq!(editor.store().revision(), 2);
    }

    #[test]
    fn test_parse_error_is_recorded_not_fatal() {
        let editor = session(0);
        let before = editor.store().get_nodes_and_links();

        editor.handle_change("ex:broken ex:", Instant::now());
        let result = editor.flush().unwrap();
        assert!(result.is_err());
        assert!(editor.last_error().is_some());
        assert_eq!(editor.store().get_nodes_and_links(), before);

        // the buffer keeps what the user typed
        assert_eq!(editor.text(), "ex:broken ex:");

        editor.handle_change(DOC, Instant::now());
        editor.flush().unwrap().unwrap();
        assert!(editor.last_error().is_none());
    }

    #[test]
    fn test_blank_node_ids_survive_editor_cycles() {
        let editor = session(0);
        editor.handle_change(
            "@prefix ex: <http://ex.org/#> .\nex:a ex:knows [ ex:name \"anon\" ] ; ex:list ( ex:x ex:y ) .\n",
            Instant::now(),
        );
        editor.flush().unwrap().unwrap();
        let first: Vec<String> = editor.store().quad_index().subjects().map(str::to_string).collect();
        assert_eq!(first.len(), 4);

        // resubmitting the rewritten buffer must not rename anything
        for _ in 0..2 {
            editor.handle_change(&editor.text(), Instant::now());
            editor.flush().unwrap().unwrap();
            let again: Vec<String> = editor.store().quad_index().subjects().map(str::to_string).collect();
            assert_eq!(again, first);
        }
    }

    #[test]
    fn test_detach_on_drop() {
        let editor = session(0);
        let store = editor.store().clone();
        assert_eq!(store.listener_count(), 1);
        drop(editor);
        assert_eq!(store.listener_count(), 0);
    }
}
