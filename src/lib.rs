//! hfsm: hierarchical finite state machines for game-loop style hosts
//!
//! A machine is a set of nodes joined by guarded transitions. The host drives
//! it with `update` and `fixed_update` calls; each update either fires the
//! first qualified transition or updates the current node.
//!
//! # Core Concepts
//!
//! - **Node**: Anything with enter/update/fixed-update/exit hooks, shared via `NodeRef`
//! - **Condition**: A polled predicate, or a latch armed only while its source is current
//! - **Transition**: Node to node, plus any-node, trace-back, exit and entry variants
//! - **SubFsm**: A machine registered as a node of another machine
//!
//! # Example
//!
//! ```rust
//! use hfsm::core::{ActionNode, Condition, NodeRef, Signal};
//! use hfsm::Fsm;
//!
//! let spotted = Signal::new();
//! let patrol = NodeRef::new(ActionNode::new("Patrol"));
//! let chase = NodeRef::new(ActionNode::new("Chase"));
//!
//! let mut fsm = Fsm::new("Guard");
//! fsm.add_transition(&patrol, &chase, Condition::latch(spotted.clone()))
//!     .unwrap();
//! fsm.add_transition_to_previous(&chase, Condition::always())
//!     .unwrap();
//!
//! fsm.start().unwrap();
//! spotted.emit();
//! fsm.update();
//! assert_eq!(fsm.current_node(), Some(&chase));
//!
//! fsm.update();
//! assert_eq!(fsm.current_node(), Some(&patrol));
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod machine;
pub mod snapshot;

// Re-export commonly used types
pub use config::FsmConfig;
pub use core::{ActionNode, Condition, Node, NodeRef, Signal};
pub use error::{FsmError, NodeViolation};
pub use machine::{Cursor, Fsm, SubFsm, Transition};
pub use snapshot::MachineSnapshot;
