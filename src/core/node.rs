//! Node capability trait and shared node handles.
//!
//! Every entity that can be registered into a machine implements [`Node`].
//! Machines never own nodes by value: they hold [`NodeRef`] handles, which
//! compare by identity so the same node can be recognized anywhere in a
//! machine tree.

use crate::machine::Fsm;
use std::cell::{RefCell, RefMut};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Trait for machine nodes.
///
/// Hooks default to no-ops, so a node only overrides what it needs. The two
/// `machine` accessors return `Some` only for nodes that are themselves
/// machines; the engine uses them to walk nested trees.
///
/// # Example
///
/// ```rust
/// use hfsm::core::{Node, NodeRef};
///
/// struct Idle {
///     ticks: u32,
/// }
///
/// impl Node for Idle {
///     fn name(&self) -> &str {
///         "Idle"
///     }
///
///     fn on_update(&mut self) {
///         self.ticks += 1;
///     }
/// }
///
/// let idle = NodeRef::new(Idle { ticks: 0 });
/// assert_eq!(idle.name(), "Idle");
/// ```
pub trait Node: 'static {
    /// Display name used in logs and snapshots.
    fn name(&self) -> &str;

    /// Called when the node becomes current.
    fn on_enter(&mut self) {}

    /// Called on every update tick while the node is current and no
    /// transition fired.
    fn on_update(&mut self) {}

    /// Called on every fixed-update tick while the node is current.
    fn on_fixed_update(&mut self) {}

    /// Called when the node stops being current.
    fn on_exit(&mut self) {}

    /// Nested machine view, if this node is a machine.
    fn machine(&self) -> Option<&Fsm> {
        None
    }

    /// Mutable nested machine view, if this node is a machine.
    fn machine_mut(&mut self) -> Option<&mut Fsm> {
        None
    }
}

/// Process-wide unique node identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        NodeId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value of the id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shared handle to a registered node.
///
/// Cloning a `NodeRef` clones the handle, not the node. Equality and hashing
/// use the [`NodeId`] only, so two handles are equal exactly when they point
/// at the same node.
#[derive(Clone)]
pub struct NodeRef {
    id: NodeId,
    name: Rc<str>,
    cell: Rc<RefCell<dyn Node>>,
}

impl NodeRef {
    /// Wrap a node into a fresh handle with a new identity.
    pub fn new<N: Node>(node: N) -> Self {
        let name: Rc<str> = Rc::from(node.name());
        let cell: Rc<RefCell<dyn Node>> = Rc::new(RefCell::new(node));
        Self {
            id: NodeId::next(),
            name,
            cell,
        }
    }

    pub(crate) fn from_shared(id: NodeId, name: &str, cell: Rc<RefCell<dyn Node>>) -> Self {
        Self {
            id,
            name: Rc::from(name),
            cell,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Name captured when the handle was created.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn borrow_mut(&self) -> RefMut<'_, dyn Node> {
        self.cell.borrow_mut()
    }

    /// Whether the node is a nested machine.
    ///
    /// Returns `false` while the node is executing one of its own hooks,
    /// since it cannot be inspected from inside itself.
    pub fn is_machine(&self) -> bool {
        self.with_machine(|_| ()).is_some()
    }

    /// Run `f` against the nested machine, if this node is one and is not
    /// currently executing.
    pub fn with_machine<R>(&self, f: impl FnOnce(&Fsm) -> R) -> Option<R> {
        let node = self.cell.try_borrow().ok()?;
        node.machine().map(f)
    }

    pub(crate) fn with_machine_mut<R>(&self, f: impl FnOnce(&mut Fsm) -> R) -> Option<R> {
        let mut node = self.cell.try_borrow_mut().ok()?;
        node.machine_mut().map(f)
    }

    /// Whether the node is borrowed right now, i.e. one of its hooks is on
    /// the call stack.
    pub(crate) fn is_busy(&self) -> bool {
        self.cell.try_borrow_mut().is_err()
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for NodeRef {}

impl Hash for NodeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl AsRef<NodeRef> for NodeRef {
    fn as_ref(&self) -> &NodeRef {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Counter {
        entered: Rc<Cell<u32>>,
    }

    impl Node for Counter {
        fn name(&self) -> &str {
            "Counter"
        }

        fn on_enter(&mut self) {
            self.entered.set(self.entered.get() + 1);
        }
    }

    #[test]
    fn handles_compare_by_identity() {
        let a = NodeRef::new(Counter {
            entered: Rc::default(),
        });
        let b = NodeRef::new(Counter {
            entered: Rc::default(),
        });

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.name(), b.name());
    }

    #[test]
    fn ids_are_unique() {
        let first = NodeId::next();
        let second = NodeId::next();
        assert_ne!(first, second);
        assert!(second > first);
    }

    #[test]
    fn hooks_reach_the_shared_node() {
        let entered = Rc::new(Cell::new(0));
        let node = NodeRef::new(Counter {
            entered: Rc::clone(&entered),
        });
        let alias = node.clone();

        node.borrow_mut().on_enter();
        alias.borrow_mut().on_enter();

        assert_eq!(entered.get(), 2);
    }

    #[test]
    fn leaf_is_not_a_machine() {
        let node = NodeRef::new(Counter {
            entered: Rc::default(),
        });
        assert!(!node.is_machine());
        assert!(node.with_machine(|m| m.node_count()).is_none());
    }

    #[test]
    fn busy_while_borrowed() {
        let node = NodeRef::new(Counter {
            entered: Rc::default(),
        });
        assert!(!node.is_busy());
        let _guard = node.borrow_mut();
        assert!(node.is_busy());
    }
}
