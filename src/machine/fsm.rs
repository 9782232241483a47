//! The state machine engine.

use crate::config::FsmConfig;
use crate::core::{Condition, History, Node, NodeId, NodeRef};
use crate::error::{FsmError, NodeViolation};
use crate::machine::registry::Registry;
use crate::machine::transition::{Cursor, Source, Target, Transition};
use crate::snapshot::MachineSnapshot;
use chrono::Utc;
use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use tracing::{debug, trace, warn};

const NO_TRANSITIONS: &[Transition] = &[];

type NodeCheck = Validation<(), NonEmptyVec<NodeViolation>>;

/// A resolved transition, ready to commit.
struct Step {
    destination: Cursor,
    trace_back: bool,
}

/// Hierarchical finite state machine.
///
/// Nodes are registered through transitions (or [`Fsm::add_node`]); the first
/// node added becomes the entry point unless [`Fsm::set_entry`] overrides it.
/// A driver calls [`Fsm::start`] once, then [`Fsm::update`] and
/// [`Fsm::fixed_update`] every tick.
///
/// Registration never panics on misuse: refused operations return an
/// [`FsmError`], log a warning, and leave the machine unchanged.
///
/// # Example
///
/// ```rust
/// use hfsm::core::{ActionNode, Condition, NodeRef};
/// use hfsm::Fsm;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let alarm = Rc::new(Cell::new(false));
/// let patrol = NodeRef::new(ActionNode::new("Patrol"));
/// let chase = NodeRef::new(ActionNode::new("Chase"));
///
/// let mut fsm = Fsm::new("Guard");
/// let raised = Rc::clone(&alarm);
/// fsm.add_transition(&patrol, &chase, Condition::poll(move || raised.get()))
///     .unwrap();
///
/// fsm.start().unwrap();
/// assert_eq!(fsm.current_node(), Some(&patrol));
///
/// alarm.set(true);
/// fsm.update();
/// assert_eq!(fsm.current_node(), Some(&chase));
/// ```
pub struct Fsm {
    name: String,
    max_history: usize,
    nodes: Vec<NodeRef>,
    transitions: HashMap<NodeId, Vec<Transition>>,
    entry: Vec<Transition>,
    any_node: Vec<Transition>,
    cursor: Cursor,
    history: History<Cursor>,
    finished: Rc<Cell<bool>>,
    registry: Registry,
    owner: Option<String>,
    self_id: Option<NodeId>,
}

impl Fsm {
    /// Create a machine with the default history capacity.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(FsmConfig::default().with_name(name))
    }

    /// Create a machine from a [`FsmConfig`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use hfsm::{Fsm, FsmConfig};
    ///
    /// let fsm = Fsm::with_config(FsmConfig::default().with_name("Scout").with_max_history(4));
    /// assert_eq!(fsm.name(), "Scout");
    /// assert_eq!(fsm.max_history(), 4);
    /// ```
    pub fn with_config(config: FsmConfig) -> Self {
        if config.max_history == 0 {
            warn!(machine = %config.name, "history capacity of 0 raised to 1");
        }

        let mut history = History::new(config.max_history);
        history.push(Cursor::Selector);

        Self {
            name: config.name,
            max_history: history.capacity(),
            nodes: Vec::new(),
            transitions: HashMap::new(),
            entry: Vec::new(),
            any_node: Vec::new(),
            cursor: Cursor::Selector,
            history,
            finished: Rc::new(Cell::new(false)),
            registry: Registry::new(),
            owner: None,
            self_id: None,
        }
    }

    /// Display name used in logs and snapshots.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of registered nodes, pseudo-positions excluded.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Capacity of the trace-back history, at least 1.
    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Current position, including the selector and exit.
    pub fn current(&self) -> &Cursor {
        &self.cursor
    }

    /// Current node, or `None` while on the selector or the exit.
    pub fn current_node(&self) -> Option<&NodeRef> {
        self.cursor.node()
    }

    /// Registered nodes in registration order.
    pub fn nodes(&self) -> &[NodeRef] {
        &self.nodes
    }

    /// Transitions owned by the current position.
    ///
    /// Any-node transitions are kept separately, see
    /// [`Fsm::any_node_transitions`].
    pub fn current_transitions(&self) -> &[Transition] {
        match &self.cursor {
            Cursor::Selector => &self.entry,
            Cursor::Node(node) => self.own_transitions(node),
            Cursor::Exit => NO_TRANSITIONS,
        }
    }

    /// Outgoing transitions of a direct member.
    pub fn transitions_from(&self, node: impl AsRef<NodeRef>) -> Option<&[Transition]> {
        self.transitions
            .get(&node.as_ref().id())
            .map(Vec::as_slice)
    }

    /// Entry transitions, evaluated from the selector.
    pub fn entry_transitions(&self) -> &[Transition] {
        &self.entry
    }

    /// Transitions checked from every node ahead of its own, in
    /// registration order.
    pub fn any_node_transitions(&self) -> &[Transition] {
        &self.any_node
    }

    /// Visited positions, oldest first. The newest entry is always the
    /// current position.
    pub fn history(&self) -> &History<Cursor> {
        &self.history
    }

    /// Whether the machine reached its exit since it was last started.
    pub fn is_finished(&self) -> bool {
        self.finished.get()
    }

    /// Whether this machine is nested in another machine tree.
    pub fn has_owner(&self) -> bool {
        self.owner.is_some()
    }

    /// Name of the enclosing machine, if this machine is nested.
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Add a node. The first node added becomes the implicit entry.
    pub fn add_node(&mut self, node: impl AsRef<NodeRef>) -> Result<(), FsmError> {
        let node = node.as_ref();
        if let Err(err) = self.validate_node(node) {
            return Err(self.refuse(err));
        }
        self.insert_node(node);
        Ok(())
    }

    /// Remove a node from this machine or from whichever nested machine
    /// holds it, together with every transition leading to it.
    ///
    /// Removing the node a machine is currently on is refused.
    pub fn remove_node(&mut self, node: impl AsRef<NodeRef>) -> Result<(), FsmError> {
        self.detach(node.as_ref()).map_err(|err| self.refuse(err))
    }

    /// Add a guarded transition from `source` to `destination`, adding either
    /// endpoint that is not a member yet.
    ///
    /// Transitions of one source are evaluated in the order they were added.
    ///
    /// # Errors
    ///
    /// Returns [`FsmError::InvalidNode`] when an endpoint cannot join this
    /// machine tree; nothing is registered in that case.
    pub fn add_transition(
        &mut self,
        source: impl AsRef<NodeRef>,
        destination: impl AsRef<NodeRef>,
        condition: Condition,
    ) -> Result<(), FsmError> {
        let (source, destination) = (source.as_ref(), destination.as_ref());
        self.admit(&[source, destination])?;
        self.register(
            Transition::new(
                Source::Node(source.clone()),
                Target::Node(destination.clone()),
                condition,
            ),
            false,
        );
        Ok(())
    }

    /// Add a transition that fires from every node except `destination`,
    /// ahead of each node's own transitions.
    pub fn add_transition_from_any(
        &mut self,
        destination: impl AsRef<NodeRef>,
        condition: Condition,
    ) -> Result<(), FsmError> {
        let destination = destination.as_ref();
        if self.any_node.iter().any(|t| t.points_to(destination)) {
            return Err(self.refuse(FsmError::DuplicateAnyNode {
                machine: self.name.clone(),
                node: destination.name().to_string(),
            }));
        }

        self.admit(&[destination])?;
        self.register(
            Transition::new(Source::AnyNode, Target::Node(destination.clone()), condition),
            false,
        );
        Ok(())
    }

    /// Add a transition back to whichever position was active before
    /// `source`.
    pub fn add_transition_to_previous(
        &mut self,
        source: impl AsRef<NodeRef>,
        condition: Condition,
    ) -> Result<(), FsmError> {
        let source = source.as_ref();
        self.admit(&[source])?;
        self.register(
            Transition::new(Source::Node(source.clone()), Target::TraceBack, condition),
            false,
        );
        Ok(())
    }

    /// Add a transition that finishes the machine when it fires from
    /// `source`.
    pub fn add_transition_to_exit(
        &mut self,
        source: impl AsRef<NodeRef>,
        condition: Condition,
    ) -> Result<(), FsmError> {
        let source = source.as_ref();
        self.admit(&[source])?;
        self.register(
            Transition::new(Source::Node(source.clone()), Target::Exit, condition),
            false,
        );
        Ok(())
    }

    /// Add a conditional entry transition.
    pub fn add_transition_from_selector(
        &mut self,
        destination: impl AsRef<NodeRef>,
        condition: Condition,
    ) -> Result<(), FsmError> {
        let destination = destination.as_ref();
        self.admit(&[destination])?;
        self.register(
            Transition::new(Source::Selector, Target::Node(destination.clone()), condition),
            false,
        );
        Ok(())
    }

    /// Make `node` the unconditional entry point, ahead of every other entry
    /// transition.
    pub fn set_entry(&mut self, node: impl AsRef<NodeRef>) -> Result<(), FsmError> {
        let node = node.as_ref();
        if !self.is_member(node) {
            return Err(self.refuse(FsmError::UnknownNode {
                machine: self.name.clone(),
                node: node.name().to_string(),
            }));
        }

        self.register(
            Transition::new(Source::Selector, Target::Node(node.clone()), Condition::always()),
            true,
        );
        Ok(())
    }

    /// Check whether `node` could join this machine tree.
    ///
    /// Every violation is collected, not just the first one.
    pub fn validate_node(&self, node: impl AsRef<NodeRef>) -> Result<(), FsmError> {
        let node = node.as_ref();
        match self.check_node(node) {
            Validation::Success(_) => Ok(()),
            Validation::Failure(reasons) => Err(FsmError::InvalidNode {
                machine: self.name.clone(),
                node: node.name().to_string(),
                reasons: reasons.iter().cloned().collect(),
            }),
        }
    }

    /// Shorthand for [`Fsm::validate_node`] when the reasons do not matter.
    pub fn is_valid_node(&self, node: impl AsRef<NodeRef>) -> bool {
        self.check_node(node.as_ref()).is_success()
    }

    /// Whether `node` belongs to this machine or to any nested machine.
    pub fn contains(&self, node: impl AsRef<NodeRef>) -> bool {
        let node = node.as_ref();
        self.is_member(node)
            || self
                .nodes
                .iter()
                .any(|n| n.with_machine(|m| m.contains(node)).unwrap_or(false))
    }

    /// Whether `node` is a member here, or is a machine sharing members with
    /// this machine or with any nested machine.
    pub fn intersect(&self, node: impl AsRef<NodeRef>) -> bool {
        let node = node.as_ref();
        self.is_member(node) || self.intersect_nested(node)
    }

    /// Enter the machine through the first satisfied entry transition.
    pub fn start(&mut self) -> Result<(), FsmError> {
        if self.cursor != Cursor::Selector {
            return Err(self.refuse(FsmError::AlreadyStarted {
                machine: self.name.clone(),
            }));
        }

        self.finished.set(false);
        match self.resolve() {
            Some(step) => {
                self.commit(step);
                Ok(())
            }
            None => Err(self.refuse(FsmError::NoEntry {
                machine: self.name.clone(),
            })),
        }
    }

    /// Fire the first qualified transition, or update the current node when
    /// none qualifies.
    pub fn update(&mut self) {
        if let Some(step) = self.resolve() {
            self.commit(step);
            return;
        }

        if let Cursor::Node(node) = &self.cursor {
            node.borrow_mut().on_update();
        }
    }

    /// Forward the fixed-rate tick to the current node. Never transitions.
    pub fn fixed_update(&mut self) {
        if let Cursor::Node(node) = &self.cursor {
            node.borrow_mut().on_fixed_update();
        }
    }

    /// Leave the current node, forget the history and park on the selector.
    pub fn stop(&mut self) {
        self.leave();
        self.history.clear();
        self.enter(Cursor::Selector);
        debug!(machine = %self.name, "machine stopped");
    }

    /// Read-only view of this machine and every nested machine.
    pub fn snapshot(&self) -> MachineSnapshot {
        MachineSnapshot {
            name: self.name.clone(),
            current: self.cursor.to_string(),
            node_count: self.node_count(),
            finished: self.is_finished(),
            owner: self.owner.clone(),
            history: self
                .history
                .path()
                .into_iter()
                .map(ToString::to_string)
                .collect(),
            nested: self
                .nodes
                .iter()
                .filter_map(|n| n.with_machine(Fsm::snapshot))
                .collect(),
            taken_at: Utc::now(),
        }
    }

    pub(crate) fn bind_node(&mut self, id: NodeId) {
        self.self_id = Some(id);
    }

    pub(crate) fn finished_flag(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.finished)
    }

    fn is_member(&self, node: &NodeRef) -> bool {
        self.transitions.contains_key(&node.id())
    }

    fn own_transitions(&self, node: &NodeRef) -> &[Transition] {
        self.transitions
            .get(&node.id())
            .map_or(NO_TRANSITIONS, Vec::as_slice)
    }

    fn refuse(&self, err: FsmError) -> FsmError {
        warn!(machine = %self.name, error = %err, "operation refused");
        for reason in err.violations() {
            warn!(machine = %self.name, %reason, "node violation");
        }
        err
    }

    fn check_node(&self, node: &NodeRef) -> NodeCheck {
        let label = node.name().to_string();
        let mut checks: Vec<NodeCheck> = Vec::new();

        let unique = if self.registry.contains(node.id()) {
            Validation::fail(NodeViolation::AlreadyRegistered {
                node: label.clone(),
            })
        } else {
            Validation::success(())
        };
        checks.push(unique);

        // A node whose hooks are running is this machine or one of its
        // ancestors.
        if self.self_id == Some(node.id()) || node.is_busy() {
            checks.push(Validation::fail(NodeViolation::SelfReference {
                node: label,
            }));
        } else if let Some(nested) = node.with_machine(|other| self.check_machine(&label, other)) {
            checks.extend(nested);
        }

        Validation::all_vec(checks).map(|_| ())
    }

    fn check_machine(&self, label: &str, other: &Fsm) -> Vec<NodeCheck> {
        let mut checks = Vec::new();

        if other.registry.same_tree(&self.registry) {
            checks.push(Validation::fail(NodeViolation::SelfReference {
                node: label.to_string(),
            }));
            return checks;
        }

        if let Some(owner) = &other.owner {
            checks.push(Validation::fail(NodeViolation::AlreadyOwned {
                node: label.to_string(),
                owner: owner.clone(),
            }));
        }

        if !other.registry.is_disjoint(&self.registry) {
            checks.push(Validation::fail(NodeViolation::Overlapping {
                node: label.to_string(),
            }));
        }

        checks
    }

    fn intersect_nested(&self, node: &NodeRef) -> bool {
        let overlaps = node
            .with_machine(|other| other.nodes.iter().any(|n| self.is_member(n)))
            .unwrap_or(false);

        overlaps
            || self
                .nodes
                .iter()
                .filter(|n| *n != node)
                .any(|n| n.with_machine(|m| m.intersect(node)).unwrap_or(false))
    }

    /// Validate and add every endpoint that is not a direct member yet.
    /// Either all of them join or none does.
    fn admit(&mut self, nodes: &[&NodeRef]) -> Result<(), FsmError> {
        let mut added: Vec<&NodeRef> = Vec::new();

        for &node in nodes {
            if self.is_member(node) {
                continue;
            }
            if let Err(err) = self.validate_node(node) {
                for rollback in added {
                    let rolled_back = self.detach(rollback);
                    debug_assert!(rolled_back.is_ok(), "a node admitted just now is never current");
                }
                return Err(self.refuse(err));
            }
            self.insert_node(node);
            added.push(node);
        }

        Ok(())
    }

    fn insert_node(&mut self, node: &NodeRef) {
        if self.nodes.is_empty() {
            self.register(
                Transition::new(Source::Selector, Target::Node(node.clone()), Condition::always()),
                false,
            );
        }

        self.nodes.push(node.clone());
        self.transitions.insert(node.id(), Vec::new());
        self.registry.insert(node.id());

        let owner = self.name.clone();
        let registry = self.registry.clone();
        node.with_machine_mut(|machine| {
            registry.extend(machine.subtree_ids());
            machine.adopt(Some(&owner), &registry);
        });

        debug!(machine = %self.name, node = %node, "node added");
    }

    fn detach(&mut self, node: &NodeRef) -> Result<(), FsmError> {
        if !self.is_member(node) {
            for nested in &self.nodes {
                match nested.with_machine_mut(|machine| machine.detach(node)) {
                    Some(Ok(())) => return Ok(()),
                    Some(Err(FsmError::UnknownNode { .. })) | None => {}
                    Some(Err(err)) => return Err(err),
                }
            }
            return Err(FsmError::UnknownNode {
                machine: self.name.clone(),
                node: node.name().to_string(),
            });
        }

        if self.cursor.is_node(node) {
            return Err(FsmError::ActiveNode {
                machine: self.name.clone(),
                node: node.name().to_string(),
            });
        }

        self.nodes.retain(|n| n != node);
        if let Some(outgoing) = self.transitions.remove(&node.id()) {
            outgoing.iter().for_each(Transition::deactivate_condition);
        }

        let purge = |list: &mut Vec<Transition>| {
            list.retain(|t| {
                let keep = !t.points_to(node);
                if !keep {
                    t.deactivate_condition();
                }
                keep
            })
        };
        purge(&mut self.entry);
        purge(&mut self.any_node);
        self.transitions.values_mut().for_each(purge);

        // Dropping a position can bring two visits of one node together.
        self.history.retain(|position| !position.is_node(node));
        self.history.dedup_adjacent();
        self.registry.remove(node.id());

        let registry = &self.registry;
        node.with_machine_mut(|machine| {
            let subtree = machine.subtree_ids();
            for id in &subtree {
                registry.remove(*id);
            }
            machine.adopt(None, &Registry::with_ids(subtree));
        });

        debug!(machine = %self.name, node = %node, "node removed");
        Ok(())
    }

    /// Ids of every node reachable from this machine.
    fn subtree_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        for node in &self.nodes {
            ids.push(node.id());
            if let Some(nested) = node.with_machine(Fsm::subtree_ids) {
                ids.extend(nested);
            }
        }
        ids
    }

    /// Attach this machine and every machine nested in it to `registry`.
    /// Nested machines are owned by `owner` too, or by this machine once it
    /// is detached.
    fn adopt(&mut self, owner: Option<&str>, registry: &Registry) {
        self.owner = owner.map(str::to_string);
        self.registry = registry.clone();

        let nested_owner = owner.unwrap_or(&self.name).to_string();
        for node in &self.nodes {
            node.with_machine_mut(|machine| machine.adopt(Some(&nested_owner), registry));
        }
    }

    fn register(&mut self, transition: Transition, at_front: bool) {
        if self.is_armed_source(transition.source()) {
            transition.activate_condition();
        }

        debug!(
            machine = %self.name,
            target = %transition.target(),
            "transition registered"
        );

        let list = match transition.source() {
            Source::Selector => &mut self.entry,
            Source::AnyNode => &mut self.any_node,
            Source::Node(node) => {
                let id = node.id();
                self.transitions.entry(id).or_default()
            }
        };

        if at_front {
            list.insert(0, transition);
        } else {
            list.push(transition);
        }
    }

    fn is_armed_source(&self, source: &Source) -> bool {
        match (source, &self.cursor) {
            (Source::Selector, Cursor::Selector) => true,
            (Source::AnyNode, Cursor::Node(_)) => true,
            (Source::Node(node), Cursor::Node(current)) => node == current,
            _ => false,
        }
    }

    /// Transitions evaluated from the current position, in priority order.
    fn candidates(&self) -> impl Iterator<Item = &Transition> {
        let (shared, own): (&[Transition], &[Transition]) = match &self.cursor {
            Cursor::Selector => (NO_TRANSITIONS, self.entry.as_slice()),
            Cursor::Node(node) => (self.any_node.as_slice(), self.own_transitions(node)),
            Cursor::Exit => (NO_TRANSITIONS, NO_TRANSITIONS),
        };
        shared.iter().chain(own)
    }

    fn resolve(&self) -> Option<Step> {
        self.candidates().find_map(|t| self.qualify(t))
    }

    fn qualify(&self, transition: &Transition) -> Option<Step> {
        if !transition.condition().is_true() {
            return None;
        }

        let (destination, trace_back) = match transition.target() {
            Target::Node(node) => (Cursor::Node(node.clone()), false),
            Target::Exit => (Cursor::Exit, false),
            Target::TraceBack => (self.history.previous()?.clone(), true),
        };

        (destination != self.cursor).then_some(Step {
            destination,
            trace_back,
        })
    }

    fn commit(&mut self, step: Step) {
        debug!(
            machine = %self.name,
            from = %self.cursor,
            to = %step.destination,
            trace_back = step.trace_back,
            "transition"
        );

        self.leave();
        if step.trace_back {
            self.history.pop();
            self.history.pop();
        }
        self.enter(step.destination);
    }

    fn leave(&mut self) {
        self.set_armed(false);
        if let Cursor::Node(node) = &self.cursor {
            node.borrow_mut().on_exit();
        }
    }

    fn enter(&mut self, destination: Cursor) {
        self.cursor = destination;
        self.history.push(self.cursor.clone());
        self.set_armed(true);

        match &self.cursor {
            Cursor::Node(node) => node.borrow_mut().on_enter(),
            Cursor::Exit => self.finished.set(true),
            Cursor::Selector => {}
        }
    }

    fn set_armed(&self, armed: bool) {
        trace!(machine = %self.name, position = %self.cursor, armed, "arming conditions");
        for transition in self.candidates() {
            if armed {
                transition.activate_condition();
            } else {
                transition.deactivate_condition();
            }
        }
    }
}

impl Default for Fsm {
    fn default() -> Self {
        Self::with_config(FsmConfig::default())
    }
}

impl fmt::Debug for Fsm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fsm")
            .field("name", &self.name)
            .field("current", &self.cursor)
            .field("nodes", &self.nodes)
            .field("history", &self.history.len())
            .field("owner", &self.owner)
            .finish()
    }
}

/// A machine is itself a node, which is how machines nest.
impl Node for Fsm {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_enter(&mut self) {
        // Refusals are already logged by `start`.
        let _ = self.start();
    }

    fn on_update(&mut self) {
        self.update();
    }

    fn on_fixed_update(&mut self) {
        self.fixed_update();
    }

    fn on_exit(&mut self) {
        self.stop();
    }

    fn machine(&self) -> Option<&Fsm> {
        Some(self)
    }

    fn machine_mut(&mut self) -> Option<&mut Fsm> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ActionNode, Signal};
    use std::cell::RefCell;

    fn node(name: &str) -> NodeRef {
        NodeRef::new(ActionNode::new(name))
    }

    fn flag() -> (Rc<Cell<bool>>, Condition) {
        let flag = Rc::new(Cell::new(false));
        let reading = Rc::clone(&flag);
        (flag, Condition::poll(move || reading.get()))
    }

    /// Node that records its hook calls into a shared log.
    fn recorded(name: &str, log: &Rc<RefCell<Vec<String>>>) -> NodeRef {
        let (enter, update, exit) = (Rc::clone(log), Rc::clone(log), Rc::clone(log));
        let (a, b, c) = (name.to_string(), name.to_string(), name.to_string());
        NodeRef::new(
            ActionNode::new(name)
                .with_enter(move |_| enter.borrow_mut().push(format!("enter {a}")))
                .with_update(move |_| update.borrow_mut().push(format!("update {b}")))
                .with_exit(move |_| exit.borrow_mut().push(format!("exit {c}"))),
        )
    }

    #[test]
    fn new_machine_is_parked_on_selector() {
        let fsm = Fsm::new("Guard");
        assert_eq!(fsm.current(), &Cursor::Selector);
        assert_eq!(fsm.node_count(), 0);
        assert_eq!(fsm.history().len(), 1);
        assert_eq!(fsm.max_history(), crate::config::DEFAULT_MAX_HISTORY);
        assert!(!fsm.is_finished());
    }

    #[test]
    fn zero_history_capacity_is_raised() {
        let fsm = Fsm::with_config(FsmConfig::default().with_max_history(0));
        assert_eq!(fsm.max_history(), 1);
    }

    #[test]
    fn first_node_becomes_entry() {
        let a = node("A");
        let b = node("B");
        let mut fsm = Fsm::new("Guard");

        fsm.add_node(&a).unwrap();
        fsm.add_node(&b).unwrap();
        assert_eq!(fsm.entry_transitions().len(), 1);

        fsm.start().unwrap();
        assert_eq!(fsm.current_node(), Some(&a));
    }

    #[test]
    fn start_without_nodes_is_refused() {
        let mut fsm = Fsm::new("Guard");
        let err = fsm.start().unwrap_err();
        assert!(matches!(err, FsmError::NoEntry { .. }));
        assert_eq!(fsm.current(), &Cursor::Selector);
    }

    #[test]
    fn start_twice_is_refused() {
        let mut fsm = Fsm::new("Guard");
        fsm.add_node(node("A")).unwrap();
        fsm.start().unwrap();
        assert!(matches!(
            fsm.start(),
            Err(FsmError::AlreadyStarted { .. })
        ));
    }

    #[test]
    fn set_entry_takes_precedence() {
        let a = node("A");
        let b = node("B");
        let mut fsm = Fsm::new("Guard");
        fsm.add_node(&a).unwrap();
        fsm.add_node(&b).unwrap();

        fsm.set_entry(&b).unwrap();
        fsm.start().unwrap();
        assert_eq!(fsm.current_node(), Some(&b));
    }

    #[test]
    fn set_entry_requires_membership() {
        let mut fsm = Fsm::new("Guard");
        let err = fsm.set_entry(node("Stranger")).unwrap_err();
        assert!(matches!(err, FsmError::UnknownNode { .. }));
        assert!(fsm.entry_transitions().is_empty());
    }

    #[test]
    fn conditional_entry_remains_after_implicit_entry_is_removed() {
        let a = node("A");
        let b = node("B");
        let (wake, condition) = flag();
        let mut fsm = Fsm::new("Guard");

        fsm.add_node(&a).unwrap();
        fsm.add_transition_from_selector(&b, condition).unwrap();
        assert_eq!(fsm.entry_transitions().len(), 2);

        fsm.remove_node(&a).unwrap();
        assert_eq!(fsm.entry_transitions().len(), 1);
        assert!(fsm.start().is_err());

        wake.set(true);
        fsm.start().unwrap();
        assert_eq!(fsm.current_node(), Some(&b));
    }

    #[test]
    fn update_runs_current_node_when_nothing_fires() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = recorded("A", &log);
        let b = recorded("B", &log);
        let (go, condition) = flag();
        let mut fsm = Fsm::new("Guard");
        fsm.add_transition(&a, &b, condition).unwrap();

        fsm.start().unwrap();
        fsm.update();
        go.set(true);
        fsm.update();

        assert_eq!(
            *log.borrow(),
            vec!["enter A", "update A", "exit A", "enter B"]
        );
    }

    #[test]
    fn transition_into_current_node_never_fires() {
        let a = node("A");
        let mut fsm = Fsm::new("Guard");
        fsm.add_transition(&a, &a, Condition::always()).unwrap();

        fsm.start().unwrap();
        fsm.update();
        assert_eq!(fsm.current_node(), Some(&a));
        assert_eq!(fsm.history().len(), 2);
    }

    #[test]
    fn trace_back_returns_to_previous_node() {
        let a = node("A");
        let b = node("B");
        let c = node("C");
        let (forward, to_c) = flag();
        let (back, to_previous) = flag();
        let mut fsm = Fsm::new("Guard");
        fsm.add_transition(&a, &b, Condition::always()).unwrap();
        fsm.add_transition(&b, &c, to_c).unwrap();
        fsm.add_transition_to_previous(&c, to_previous).unwrap();

        fsm.start().unwrap();
        fsm.update();
        forward.set(true);
        fsm.update();
        assert_eq!(fsm.current_node(), Some(&c));
        let before = fsm.history().len();

        forward.set(false);
        back.set(true);
        fsm.update();

        assert_eq!(fsm.current_node(), Some(&b));
        assert_eq!(fsm.history().len(), before - 1);
    }

    #[test]
    fn exit_finishes_machine() {
        let a = node("A");
        let mut fsm = Fsm::new("Guard");
        fsm.add_transition_to_exit(&a, Condition::always()).unwrap();

        fsm.start().unwrap();
        fsm.update();

        assert_eq!(fsm.current(), &Cursor::Exit);
        assert!(fsm.is_finished());
        assert!(fsm.current_transitions().is_empty());
    }

    #[test]
    fn stop_parks_and_start_resumes_from_entry() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = recorded("A", &log);
        let b = recorded("B", &log);
        let mut fsm = Fsm::new("Guard");
        fsm.add_transition(&a, &b, Condition::always()).unwrap();

        fsm.start().unwrap();
        fsm.update();
        fsm.stop();

        assert_eq!(fsm.current(), &Cursor::Selector);
        assert_eq!(fsm.history().path(), vec![&Cursor::Selector]);
        assert_eq!(log.borrow().last().map(String::as_str), Some("exit B"));

        fsm.start().unwrap();
        assert_eq!(fsm.current_node(), Some(&a));
    }

    // Arming follows the cursor: a node's conditions are armed once it is
    // current and disarmed before its exit hook, never based on which node
    // was current at the time of reassignment.
    #[test]
    fn latch_is_armed_only_while_source_is_current() {
        let a = node("A");
        let b = node("B");
        let alarm = Signal::new();
        let mut fsm = Fsm::new("Guard");
        fsm.add_transition(&a, &b, Condition::latch(alarm.clone()))
            .unwrap();
        assert_eq!(alarm.listener_count(), 0);

        fsm.start().unwrap();
        assert_eq!(alarm.listener_count(), 1);

        alarm.emit();
        fsm.update();
        assert_eq!(fsm.current_node(), Some(&b));
        assert_eq!(alarm.listener_count(), 0);
    }

    #[test]
    fn transition_added_on_current_node_is_armed_at_once() {
        let a = node("A");
        let b = node("B");
        let alarm = Signal::new();
        let mut fsm = Fsm::new("Guard");
        fsm.add_node(&a).unwrap();
        fsm.start().unwrap();

        fsm.add_transition(&a, &b, Condition::latch(alarm.clone()))
            .unwrap();
        alarm.emit();
        fsm.update();

        assert_eq!(fsm.current_node(), Some(&b));
    }

    #[test]
    fn any_node_transition_beats_own_transition() {
        let a = node("A");
        let b = node("B");
        let panic_room = node("Hide");
        let mut fsm = Fsm::new("Guard");
        fsm.add_transition(&a, &b, Condition::always()).unwrap();
        fsm.add_transition_from_any(&panic_room, Condition::always())
            .unwrap();

        fsm.start().unwrap();
        fsm.update();
        assert_eq!(fsm.current_node(), Some(&panic_room));

        // Already there, so the own list is never consulted either.
        fsm.update();
        assert_eq!(fsm.current_node(), Some(&panic_room));
    }

    #[test]
    fn duplicate_any_node_destination_is_refused() {
        let a = node("A");
        let mut fsm = Fsm::new("Guard");
        fsm.add_transition_from_any(&a, Condition::always()).unwrap();
        let err = fsm
            .add_transition_from_any(&a, Condition::always())
            .unwrap_err();
        assert!(matches!(err, FsmError::DuplicateAnyNode { .. }));
        assert_eq!(fsm.any_node_transitions().len(), 1);
    }

    #[test]
    fn duplicate_node_reports_violation() {
        let a = node("A");
        let mut fsm = Fsm::new("Guard");
        fsm.add_node(&a).unwrap();

        let err = fsm.add_node(&a).unwrap_err();
        assert_eq!(
            err.violations(),
            &[NodeViolation::AlreadyRegistered {
                node: "A".to_string()
            }]
        );
        assert_eq!(fsm.node_count(), 1);
        assert!(!fsm.is_valid_node(&a));
    }

    #[test]
    fn removing_node_purges_incoming_transitions_and_history() {
        let a = node("A");
        let b = node("B");
        let c = node("C");
        let mut fsm = Fsm::new("Guard");
        fsm.add_transition(&a, &b, Condition::always()).unwrap();
        fsm.add_transition(&b, &c, Condition::always()).unwrap();
        fsm.add_transition_from_any(&b, Condition::poll(|| false))
            .unwrap();

        fsm.start().unwrap();
        fsm.update();
        fsm.update();
        assert_eq!(fsm.current_node(), Some(&c));

        fsm.remove_node(&b).unwrap();

        assert_eq!(fsm.node_count(), 2);
        assert!(fsm.transitions_from(&a).unwrap().is_empty());
        assert!(fsm.transitions_from(&b).is_none());
        assert!(fsm.any_node_transitions().is_empty());
        assert!(fsm.history().path().iter().all(|p| !p.is_node(&b)));
        assert!(fsm.is_valid_node(&b));
    }

    #[test]
    fn removing_active_node_is_refused() {
        let a = node("A");
        let mut fsm = Fsm::new("Guard");
        fsm.add_node(&a).unwrap();
        fsm.start().unwrap();

        let err = fsm.remove_node(&a).unwrap_err();
        assert!(matches!(err, FsmError::ActiveNode { .. }));
        assert_eq!(fsm.node_count(), 1);
    }

    #[test]
    fn removing_unknown_node_is_refused() {
        let mut fsm = Fsm::new("Guard");
        let err = fsm.remove_node(node("Ghost")).unwrap_err();
        assert!(matches!(err, FsmError::UnknownNode { .. }));
    }

    #[test]
    fn machine_cannot_contain_itself() {
        let inner = crate::machine::SubFsm::new("Inner");
        let err = inner.borrow_mut().add_node(inner.node()).unwrap_err();
        assert!(err
            .violations()
            .iter()
            .any(|v| matches!(v, NodeViolation::SelfReference { .. })));
    }

    #[test]
    fn snapshot_describes_nested_machines() {
        let a = node("A");
        let inner = crate::machine::SubFsm::new("Inner");
        inner.borrow_mut().add_node(&a).unwrap();

        let mut fsm = Fsm::new("Outer");
        fsm.add_node(&inner).unwrap();
        fsm.start().unwrap();

        let snapshot = fsm.snapshot();
        assert_eq!(snapshot.current, "Inner");
        assert_eq!(snapshot.history, vec!["<selector>", "Inner"]);
        assert_eq!(snapshot.nested.len(), 1);
        assert_eq!(snapshot.nested[0].current, "A");
        assert_eq!(snapshot.nested[0].owner.as_deref(), Some("Outer"));
    }
}
