//! Building blocks shared by every machine.
//!
//! This module contains the pieces a machine is assembled from:
//! - the `Node` capability trait and identity-compared `NodeRef` handles
//! - closure-backed `ActionNode` leaves
//! - `Condition` guards, polled or latched by an `EventSource`
//! - the bounded `History` used for trace-back

mod action;
mod condition;
mod history;
mod node;
mod signal;

pub use action::{ActionNode, Status};
pub use condition::{Condition, Latch};
pub use history::{History, HistoryEntry};
pub use node::{Node, NodeId, NodeRef};
pub use signal::{EventSource, Listener, ListenerId, Signal};
