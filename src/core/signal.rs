//! Event notification sources for edge-triggered conditions.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Callback registered on an [`EventSource`].
pub type Listener = Rc<dyn Fn()>;

/// Handle returned by [`EventSource::add_listener`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A subscribable notification source.
///
/// Hosts that already have their own event primitive implement this trait
/// to drive latch conditions from it. Notifications must be delivered on the
/// thread that drives the machine.
pub trait EventSource {
    /// Register a listener, returning an id for later removal.
    fn add_listener(&self, listener: Listener) -> ListenerId;

    /// Remove a listener. Unknown ids are ignored.
    fn remove_listener(&self, id: ListenerId);
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, Listener)>,
}

/// Single-threaded multicast event.
///
/// Clones share the same listener list.
///
/// # Example
///
/// ```rust
/// use hfsm::core::{EventSource, Signal};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let hits = Rc::new(Cell::new(0));
/// let signal = Signal::new();
///
/// let counter = Rc::clone(&hits);
/// let id = signal.add_listener(Rc::new(move || counter.set(counter.get() + 1)));
///
/// signal.emit();
/// signal.remove_listener(id);
/// signal.emit();
///
/// assert_eq!(hits.get(), 1);
/// ```
#[derive(Clone, Default)]
pub struct Signal {
    listeners: Rc<RefCell<Listeners>>,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notify every listener registered at the time of the call.
    pub fn emit(&self) {
        let snapshot: Vec<Listener> = self
            .listeners
            .borrow()
            .entries
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();

        for listener in snapshot {
            listener();
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().entries.len()
    }
}

impl EventSource for Signal {
    fn add_listener(&self, listener: Listener) -> ListenerId {
        let mut listeners = self.listeners.borrow_mut();
        let id = ListenerId(listeners.next_id);
        listeners.next_id += 1;
        listeners.entries.push((id, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners
            .borrow_mut()
            .entries
            .retain(|(existing, _)| *existing != id);
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn emit_reaches_all_listeners() {
        let signal = Signal::new();
        let hits = Rc::new(Cell::new(0));

        for _ in 0..3 {
            let hits = Rc::clone(&hits);
            signal.add_listener(Rc::new(move || hits.set(hits.get() + 1)));
        }

        signal.emit();
        assert_eq!(hits.get(), 3);
    }

    #[test]
    fn removed_listener_is_not_called() {
        let signal = Signal::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let id = signal.add_listener(Rc::new(move || counter.set(counter.get() + 1)));

        signal.remove_listener(id);
        signal.emit();

        assert_eq!(hits.get(), 0);
        assert_eq!(signal.listener_count(), 0);
    }

    #[test]
    fn removing_unknown_id_is_ignored() {
        let signal = Signal::new();
        let id = signal.add_listener(Rc::new(|| {}));
        signal.remove_listener(id);
        signal.remove_listener(id);
        assert_eq!(signal.listener_count(), 0);
    }

    #[test]
    fn listener_may_unsubscribe_while_firing() {
        let signal = Signal::new();
        let slot: Rc<Cell<Option<ListenerId>>> = Rc::new(Cell::new(None));

        let source = signal.clone();
        let own_id = Rc::clone(&slot);
        let id = signal.add_listener(Rc::new(move || {
            if let Some(id) = own_id.get() {
                source.remove_listener(id);
            }
        }));
        slot.set(Some(id));

        signal.emit();
        assert_eq!(signal.listener_count(), 0);
    }

    #[test]
    fn clones_share_listeners() {
        let signal = Signal::new();
        let alias = signal.clone();
        alias.add_listener(Rc::new(|| {}));
        assert_eq!(signal.listener_count(), 1);
    }
}
