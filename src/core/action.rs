//! Closure-backed leaf nodes.

use super::node::Node;
use serde::{Deserialize, Serialize};

/// Result of ticking a leaf behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Running,
    Success,
    Failure,
}

type Hook<C> = Box<dyn FnMut(&mut C)>;
type TickHook<C> = Box<dyn FnMut(&mut C) -> Status>;

/// Leaf node whose behavior is supplied as closures over a context `C`.
///
/// Unset hooks do nothing; an unset tick reports [`Status::Failure`].
///
/// # Example
///
/// ```rust
/// use hfsm::core::{ActionNode, NodeRef};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let entered = Rc::new(Cell::new(false));
/// let flag = Rc::clone(&entered);
/// let alert = ActionNode::new("Alert").with_enter(move |_| flag.set(true));
/// let alert = NodeRef::new(alert);
/// # let _ = alert;
/// ```
pub struct ActionNode<C: 'static = ()> {
    name: String,
    context: C,
    enter: Option<Hook<C>>,
    update: Option<Hook<C>>,
    fixed_update: Option<Hook<C>>,
    exit: Option<Hook<C>>,
    tick: Option<TickHook<C>>,
}

impl ActionNode<()> {
    /// Create a context-free action node.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_context(name, ())
    }
}

impl<C: 'static> ActionNode<C> {
    /// Create an action node whose hooks receive `context`.
    pub fn with_context(name: impl Into<String>, context: C) -> Self {
        Self {
            name: name.into(),
            context,
            enter: None,
            update: None,
            fixed_update: None,
            exit: None,
            tick: None,
        }
    }

    pub fn with_enter(mut self, hook: impl FnMut(&mut C) + 'static) -> Self {
        self.enter = Some(Box::new(hook));
        self
    }

    pub fn with_update(mut self, hook: impl FnMut(&mut C) + 'static) -> Self {
        self.update = Some(Box::new(hook));
        self
    }

    pub fn with_fixed_update(mut self, hook: impl FnMut(&mut C) + 'static) -> Self {
        self.fixed_update = Some(Box::new(hook));
        self
    }

    pub fn with_exit(mut self, hook: impl FnMut(&mut C) + 'static) -> Self {
        self.exit = Some(Box::new(hook));
        self
    }

    pub fn with_tick(mut self, hook: impl FnMut(&mut C) -> Status + 'static) -> Self {
        self.tick = Some(Box::new(hook));
        self
    }

    /// Run the tick hook, for behavior-tree hosts.
    pub fn tick(&mut self) -> Status {
        match self.tick.as_mut() {
            Some(hook) => hook(&mut self.context),
            None => Status::Failure,
        }
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }
}

fn run<C>(hook: &mut Option<Hook<C>>, context: &mut C) {
    if let Some(hook) = hook.as_mut() {
        hook(context);
    }
}

impl<C: 'static> Node for ActionNode<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_enter(&mut self) {
        run(&mut self.enter, &mut self.context);
    }

    fn on_update(&mut self) {
        run(&mut self.update, &mut self.context);
    }

    fn on_fixed_update(&mut self) {
        run(&mut self.fixed_update, &mut self.context);
    }

    fn on_exit(&mut self) {
        run(&mut self.exit, &mut self.context);
    }
}
