//! Synchronous publish/subscribe for [`EngineEvent`]s.
//!
//! The bus is a lookup table from [`EventKind`] to an ordered list of
//! handlers.  Publishing runs every handler for the event's kind, in the order
//! they subscribed, before returning.
//!
//! A handler that panics is isolated: the panic is caught, logged, and the
//! remaining handlers still run.  [`EventBus::publish`] returns how many
//! handlers faulted so the caller can react (the engine uses this during
//! teardown to restore the native pointer itself).

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use arbiter_core::{EngineEvent, EventKind};
use tracing::warn;

/// A subscriber callback.  Identity is the `Arc` allocation.
pub type Handler = Arc<dyn Fn(&EngineEvent) + Send + Sync>;

/// Compares handlers by allocation, ignoring vtable metadata.
fn same_handler(a: &Handler, b: &Handler) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

#[derive(Default)]
pub struct EventBus {
    handlers: BTreeMap<EventKind, Vec<Handler>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `kind`.
    ///
    /// Returns `false` (and changes nothing) if the same handler is already
    /// registered for that kind.
    pub fn subscribe(&mut self, kind: EventKind, handler: Handler) -> bool {
        let list = self.handlers.entry(kind).or_default();
        if list.iter().any(|h| same_handler(h, &handler)) {
            return false;
        }
        list.push(handler);
        true
    }

    /// Removes `handler` from `kind`.  Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, kind: EventKind, handler: &Handler) -> bool {
        let Some(list) = self.handlers.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|h| !same_handler(h, handler));
        before != list.len()
    }

    /// Delivers `event` to every handler for its kind.
    ///
    /// Returns the number of handlers that panicked.
    pub fn publish(&self, event: &EngineEvent) -> usize {
        let kind = event.kind();
        let Some(list) = self.handlers.get(&kind) else {
            return 0;
        };

        let mut faults = 0;
        for handler in list {
            if panic::catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                faults += 1;
                warn!(event = %kind, "event handler panicked; continuing delivery");
            }
        }
        faults
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: BTreeMap<EventKind, usize> =
            self.handlers.iter().map(|(k, v)| (*k, v.len())).collect();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
