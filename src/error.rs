//! Errors reported by machine registration and stepping.
//!
//! Every error here describes a refused operation: the machine is left
//! exactly as it was before the call, and the refusal is also logged.

use thiserror::Error;

/// Reasons a node cannot join a machine tree.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NodeViolation {
    #[error("node '{node}' already exists in this machine tree")]
    AlreadyRegistered { node: String },

    #[error("machine '{node}' cannot contain itself")]
    SelfReference { node: String },

    #[error("machine '{node}' is already owned by '{owner}'")]
    AlreadyOwned { node: String, owner: String },

    #[error("machine '{node}' shares nodes with this machine tree")]
    Overlapping { node: String },
}

/// Errors returned by [`Fsm`](crate::machine::Fsm) operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FsmError {
    #[error("{machine}: node '{node}' rejected ({} violation(s))", .reasons.len())]
    InvalidNode {
        machine: String,
        node: String,
        reasons: Vec<NodeViolation>,
    },

    #[error("{machine}: node '{node}' is not part of this machine")]
    UnknownNode { machine: String, node: String },

    #[error("{machine}: node '{node}' is active and cannot be removed")]
    ActiveNode { machine: String, node: String },

    #[error("{machine}: node '{node}' is already reachable from any node")]
    DuplicateAnyNode { machine: String, node: String },

    #[error("{machine}: does not have any node to start with")]
    NoEntry { machine: String },

    #[error("{machine}: already started")]
    AlreadyStarted { machine: String },
}

impl FsmError {
    /// Violations behind an [`FsmError::InvalidNode`], empty otherwise.
    pub fn violations(&self) -> &[NodeViolation] {
        match self {
            FsmError::InvalidNode { reasons, .. } => reasons,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_node_message_counts_reasons() {
        let err = FsmError::InvalidNode {
            machine: "Guard".to_string(),
            node: "Patrol".to_string(),
            reasons: vec![
                NodeViolation::AlreadyRegistered {
                    node: "Patrol".to_string(),
                },
                NodeViolation::Overlapping {
                    node: "Patrol".to_string(),
                },
            ],
        };

        assert_eq!(
            err.to_string(),
            "Guard: node 'Patrol' rejected (2 violation(s))"
        );
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn other_errors_have_no_violations() {
        let err = FsmError::NoEntry {
            machine: "Guard".to_string(),
        };
        assert!(err.violations().is_empty());
        assert_eq!(err.to_string(), "Guard: does not have any node to start with");
    }
}
