//! Guard conditions for controlling transitions.
//!
//! A condition is either polled on demand or latched by an external
//! notification. Latches only listen while armed: the machine arms the
//! conditions of the current node's transitions on entry and disarms them on
//! exit, so stale notifications never leak into a later visit.

use super::signal::{EventSource, ListenerId};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Guard attached to a transition.
///
/// # Example
///
/// ```rust
/// use hfsm::core::{Condition, Signal};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let alert = Rc::new(Cell::new(false));
/// let flag = Rc::clone(&alert);
/// let polled = Condition::poll(move || flag.get());
/// assert!(!polled.is_true());
/// alert.set(true);
/// assert!(polled.is_true());
///
/// let signal = Signal::new();
/// let latched = Condition::latch(signal.clone());
/// latched.activate();
/// signal.emit();
/// assert!(latched.is_true());
/// ```
pub enum Condition {
    /// Predicate evaluated every time the condition is queried.
    Poll(Box<dyn Fn() -> bool>),
    /// Flag set by an external notification while armed.
    Latch(Latch),
}

impl Condition {
    /// Create a polled condition from a predicate.
    pub fn poll<F>(predicate: F) -> Self
    where
        F: Fn() -> bool + 'static,
    {
        Condition::Poll(Box::new(predicate))
    }

    /// Condition that is always satisfied.
    pub fn always() -> Self {
        Condition::poll(|| true)
    }

    /// Create an edge-triggered condition listening on `source`.
    pub fn latch<E>(source: E) -> Self
    where
        E: EventSource + 'static,
    {
        Condition::Latch(Latch::new(Rc::new(source)))
    }

    pub fn is_true(&self) -> bool {
        match self {
            Condition::Poll(predicate) => predicate(),
            Condition::Latch(latch) => latch.is_triggered(),
        }
    }

    /// Arm the condition. Idempotent.
    pub fn activate(&self) {
        if let Condition::Latch(latch) = self {
            latch.arm();
        }
    }

    /// Disarm the condition. Safe to call when it was never armed.
    pub fn deactivate(&self) {
        if let Condition::Latch(latch) = self {
            latch.disarm();
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Poll(_) => f.write_str("Poll"),
            Condition::Latch(latch) => f
                .debug_struct("Latch")
                .field("armed", &latch.is_armed())
                .field("triggered", &latch.is_triggered())
                .finish(),
        }
    }
}

/// Edge-triggered flag backed by an [`EventSource`] subscription.
pub struct Latch {
    source: Rc<dyn EventSource>,
    triggered: Rc<Cell<bool>>,
    listener: Cell<Option<ListenerId>>,
}

impl Latch {
    fn new(source: Rc<dyn EventSource>) -> Self {
        Self {
            source,
            triggered: Rc::new(Cell::new(false)),
            listener: Cell::new(None),
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.get()
    }

    pub fn is_armed(&self) -> bool {
        self.listener.get().is_some()
    }

    fn arm(&self) {
        self.triggered.set(false);
        if self.listener.get().is_some() {
            return;
        }

        let triggered = Rc::clone(&self.triggered);
        let id = self
            .source
            .add_listener(Rc::new(move || triggered.set(true)));
        self.listener.set(Some(id));
    }

    fn disarm(&self) {
        if let Some(id) = self.listener.take() {
            self.source.remove_listener(id);
        }
        self.triggered.set(false);
    }
}

/// A dropped latch stops listening, so a long-lived source does not keep
/// callbacks for machines that are gone.
impl Drop for Latch {
    fn drop(&mut self) {
        self.disarm();
    }
}
