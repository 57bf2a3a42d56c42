//! Change notification
//!
//! [`ChangeBus`] is a synchronous, ordered fan-out of events to registered
//! listeners. The store publishes one [`StoreUpdate`](crate::rdf::StoreUpdate)
//! per committed parse on it; the timeline publishes [`Selection`]s on a
//! [`SelectionBus`] so other views can highlight the chosen subject.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// Callback registered on a bus.
///
/// Returning `Err` (or panicking) is reported and counted, but never stops
/// delivery to the remaining listeners.
pub type Listener<E> = Arc<dyn Fn(&E) -> anyhow::Result<()> + Send + Sync>;

/// Handle returned by [`ChangeBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListenerId({})", self.0)
    }
}

/// Outcome of one [`ChangeBus::notify`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyReport {
    /// Listeners that returned `Ok`
    pub delivered: usize,
    /// Listeners that returned `Err` or panicked
    pub failed: usize,
}

/// Ordered, synchronous publish/subscribe registry
pub struct ChangeBus<E> {
    name: &'static str,
    listeners: RwLock<Vec<(ListenerId, Listener<E>)>>,
    next_id: AtomicU64,
}

impl<E> ChangeBus<E> {
    /// Create an empty bus; `name` only shows up in log output
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a listener; it runs after every listener registered before it
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        debug!(bus = self.name, %id, "Listener subscribed");
        id
    }

    /// Remove a listener. Returns false if the id was unknown.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        before != listeners.len()
    }

    /// Deliver `event` to every listener, in registration order.
    ///
    /// The listener list is copied before dispatch, so a listener may
    /// subscribe or unsubscribe without deadlocking; such changes take effect
    /// from the next notification.
    pub fn notify(&self, event: &E) -> NotifyReport {
        let listeners: Vec<_> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut report = NotifyReport::default();
        for (id, listener) in listeners {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    warn!(bus = self.name, %id, error = %e, "Listener failed");
                    report.failed += 1;
                }
                Err(payload) => {
                    warn!(bus = self.name, %id, panic = panic_message(payload.as_ref()), "Listener panicked");
                    report.failed += 1;
                }
            }
        }
        report
    }

    pub fn len(&self) -> usize {
        self.listeners.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> fmt::Debug for ChangeBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeBus")
            .field("name", &self.name)
            .field("listeners", &self.len())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// A subject picked in one view, e.g. by activating a timeline marker
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub subject: String,
}

/// Cross-view selection signal
#[derive(Debug)]
pub struct SelectionBus {
    bus: ChangeBus<Selection>,
}

impl SelectionBus {
    pub fn new() -> Self {
        Self {
            bus: ChangeBus::new("selection"),
        }
    }

    /// Broadcast that `subject` was selected
    pub fn select(&self, subject: impl Into<String>) -> NotifyReport {
        self.bus.notify(&Selection {
            subject: subject.into(),
        })
    }

    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Selection) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.bus.unsubscribe(id)
    }
}

impl Default for SelectionBus {
    fn default() -> Self {
        Self::new()
    }
}
