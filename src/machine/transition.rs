//! Transition edges and machine positions.
//!
//! The selector, exit and trace-back positions are tags rather than hidden
//! node instances, so stepping code matches on them explicitly.

use crate::core::{Condition, NodeRef};
use std::fmt;

/// Where a machine currently is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cursor {
    /// Before entry, or after a reset.
    Selector,
    /// On a registered node.
    Node(NodeRef),
    /// The machine reached its exit and is finished.
    Exit,
}

impl Cursor {
    pub fn node(&self) -> Option<&NodeRef> {
        match self {
            Cursor::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn is_node(&self, node: &NodeRef) -> bool {
        self.node() == Some(node)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cursor::Selector => f.write_str("<selector>"),
            Cursor::Node(node) => write!(f, "{node}"),
            Cursor::Exit => f.write_str("<exit>"),
        }
    }
}

/// Origin of a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    /// Entry transitions, evaluated from the selector.
    Selector,
    /// Applies from every registered node except the destination.
    AnyNode,
    Node(NodeRef),
}

/// Destination of a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Node(NodeRef),
    /// Return to whichever position was active before the current one.
    TraceBack,
    /// Finish the machine.
    Exit,
}

impl Target {
    pub fn node(&self) -> Option<&NodeRef> {
        match self {
            Target::Node(node) => Some(node),
            _ => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Node(node) => write!(f, "{node}"),
            Target::TraceBack => f.write_str("<trace-back>"),
            Target::Exit => f.write_str("<exit>"),
        }
    }
}

/// Guarded edge between two positions. Immutable once built.
#[derive(Debug)]
pub struct Transition {
    source: Source,
    target: Target,
    condition: Condition,
}

impl Transition {
    pub fn new(source: Source, target: Target, condition: Condition) -> Self {
        Self {
            source,
            target,
            condition,
        }
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn activate_condition(&self) {
        self.condition.activate();
    }

    pub fn deactivate_condition(&self) {
        self.condition.deactivate();
    }

    /// Whether the transition leads to `node`.
    pub fn points_to(&self, node: &NodeRef) -> bool {
        self.target.node() == Some(node)
    }
}
