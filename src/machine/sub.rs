//! Nested machines.

use crate::config::FsmConfig;
use crate::core::{Node, NodeId, NodeRef};
use crate::machine::Fsm;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

/// A machine that can be registered as a node of another machine.
///
/// The handle is cheap to clone. It gives access to the inner [`Fsm`] for
/// registration, and to a [`NodeRef`] for use as a transition endpoint in the
/// enclosing machine. Entering the node starts the inner machine and leaving
/// it stops the inner machine.
///
/// # Example
///
/// ```rust
/// use hfsm::core::{ActionNode, Condition, NodeRef};
/// use hfsm::{Fsm, SubFsm};
///
/// let attack = NodeRef::new(ActionNode::new("Attack"));
/// let combat = SubFsm::new("Combat");
/// combat
///     .borrow_mut()
///     .add_transition_to_exit(&attack, Condition::always())
///     .unwrap();
///
/// let idle = NodeRef::new(ActionNode::new("Idle"));
/// let mut fsm = Fsm::new("Guard");
/// fsm.add_transition(&combat, &idle, Condition::poll({
///     let combat = combat.clone();
///     move || combat.is_finished()
/// }))
/// .unwrap();
///
/// fsm.start().unwrap();
/// assert_eq!(combat.current_node(), Some(attack));
///
/// fsm.update(); // inner machine reaches its exit
/// fsm.update(); // outer machine notices
/// assert_eq!(fsm.current_node(), Some(&idle));
/// ```
#[derive(Clone)]
pub struct SubFsm {
    node: NodeRef,
    machine: Rc<RefCell<Fsm>>,
    finished: Rc<Cell<bool>>,
}

impl SubFsm {
    /// Create a nested machine with the default history capacity.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(FsmConfig::default().with_name(name))
    }

    /// Create a nested machine from a [`FsmConfig`]. The handle gets its own
    /// node identity.
    pub fn with_config(config: FsmConfig) -> Self {
        let id = NodeId::next();
        let mut fsm = Fsm::with_config(config);
        fsm.bind_node(id);

        let finished = fsm.finished_flag();
        let name = fsm.name().to_string();
        let machine = Rc::new(RefCell::new(fsm));
        let cell: Rc<RefCell<dyn Node>> = machine.clone();

        Self {
            node: NodeRef::from_shared(id, &name, cell),
            machine,
            finished,
        }
    }

    /// Handle used to reference this machine from an enclosing machine.
    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    /// Borrow the inner machine for queries.
    ///
    /// # Panics
    ///
    /// Panics if the machine is mutably borrowed, e.g. from inside one of
    /// its own nodes' hooks.
    pub fn borrow(&self) -> Ref<'_, Fsm> {
        self.machine.borrow()
    }

    /// Borrow the inner machine for registration.
    ///
    /// # Panics
    ///
    /// Panics if the machine is already borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, Fsm> {
        self.machine.borrow_mut()
    }

    /// Whether the inner machine reached its exit.
    ///
    /// Safe to call from conditions evaluated while the machine is running.
    pub fn is_finished(&self) -> bool {
        self.finished.get()
    }

    /// Current inner node, or `None` while parked or finished.
    pub fn current_node(&self) -> Option<NodeRef> {
        self.machine.borrow().current_node().cloned()
    }

    /// Whether the machine is registered in another machine.
    pub fn has_owner(&self) -> bool {
        self.machine.borrow().has_owner()
    }
}

impl AsRef<NodeRef> for SubFsm {
    fn as_ref(&self) -> &NodeRef {
        &self.node
    }
}

impl From<SubFsm> for NodeRef {
    fn from(sub: SubFsm) -> Self {
        sub.node
    }
}

impl fmt::Debug for SubFsm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubFsm")
            .field("node", &self.node)
            .field("finished", &self.finished.get())
            .finish()
    }
}
