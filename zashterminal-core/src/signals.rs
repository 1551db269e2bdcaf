//! Application event bus
//!
//! Components publish [`AppEvent`]s instead of holding references to each
//! other: the session operations announce changes and the sidebar refreshes
//! itself in response. A [`SignalBus`] is created once by the application and
//! handed to whoever needs it; it is single-threaded, like the GTK main loop
//! it serves.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::Value;

use crate::models::{SessionFolder, SessionItem};

/// Events carried by the bus
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// A session was added
    SessionCreated(SessionItem),
    /// A session changed (payload: name)
    SessionUpdated(String),
    /// A session was removed (payload: name)
    SessionDeleted(String),
    /// A folder was added
    FolderCreated(SessionFolder),
    /// A folder changed (payload: path)
    FolderUpdated(String),
    /// A folder was removed (payload: path)
    FolderDeleted(String),
    /// The session tree should be rebuilt
    RequestTreeRefresh,
    /// Select the named session in the tree
    RequestSessionSelect(String),
    /// A setting changed
    SettingsChanged(String, Value),
    /// The active color scheme index changed
    ColorSchemeChanged(usize),
    /// A terminal was spawned (payload: terminal id)
    TerminalCreated(String),
    /// A terminal was closed
    TerminalClosed(String),
    /// A terminal title changed (terminal id, title)
    TerminalTitleChanged(String, String),
    /// Highlight rules or their enabled state changed
    HighlightRulesChanged,
}

/// Identifies a connected handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler = Rc<dyn Fn(&AppEvent)>;

/// Publish/subscribe hub for [`AppEvent`]s
#[derive(Default)]
pub struct SignalBus {
    handlers: RefCell<Vec<(HandlerId, Handler)>>,
    next_id: Cell<u64>,
}

impl std::fmt::Debug for SignalBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalBus")
            .field("handlers", &self.handlers.borrow().len())
            .finish()
    }
}

impl SignalBus {
    /// Creates an empty bus
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for every event
    pub fn connect(&self, handler: impl Fn(&AppEvent) + 'static) -> HandlerId {
        let id = HandlerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.handlers.borrow_mut().push((id, Rc::new(handler)));
        id
    }

    /// Removes a handler; returns `false` if it was not connected
    pub fn disconnect(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let before = handlers.len();
        handlers.retain(|(hid, _)| *hid != id);
        handlers.len() != before
    }

    /// Delivers `event` to the handlers connected when the call starts.
    ///
    /// Handlers may connect, disconnect or emit from inside the callback.
    pub fn emit(&self, event: &AppEvent) {
        let snapshot: Vec<Handler> = self
            .handlers
            .borrow()
            .iter()
            .map(|(_, h)| Rc::clone(h))
            .collect();
        tracing::trace!(?event, handlers = snapshot.len(), "Emitting event");
        for handler in snapshot {
            handler(event);
        }
    }

    /// Number of connected handlers
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handlers_receive_events() {
        let bus = SignalBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.connect(move |e| sink.borrow_mut().push(e.clone()));
        bus.emit(&AppEvent::RequestTreeRefresh);
        bus.emit(&AppEvent::SessionDeleted("web".into()));
        assert_eq!(
            *seen.borrow(),
            vec![
                AppEvent::RequestTreeRefresh,
                AppEvent::SessionDeleted("web".into())
            ]
        );
    }

    #[test]
    fn disconnect_stops_delivery() {
        let bus = SignalBus::new();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let id = bus.connect(move |_| c.set(c.get() + 1));
        bus.emit(&AppEvent::RequestTreeRefresh);
        assert!(bus.disconnect(id));
        assert!(!bus.disconnect(id));
        bus.emit(&AppEvent::RequestTreeRefresh);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn handlers_connected_during_emit_wait_for_next_event() {
        let bus = Rc::new(SignalBus::new());
        let late_calls = Rc::new(Cell::new(0));
        let bus_ref = Rc::clone(&bus);
        let late = Rc::clone(&late_calls);
        bus.connect(move |_| {
            let late = Rc::clone(&late);
            bus_ref.connect(move |_| late.set(late.get() + 1));
        });
        bus.emit(&AppEvent::RequestTreeRefresh);
        assert_eq!(late_calls.get(), 0);
        bus.emit(&AppEvent::RequestTreeRefresh);
        assert_eq!(late_calls.get(), 1);
    }
}
