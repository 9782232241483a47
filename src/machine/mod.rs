//! Machines and the transitions between their nodes.

mod fsm;
mod registry;
mod sub;
mod transition;

pub use fsm::Fsm;
pub use sub::SubFsm;
pub use transition::{Cursor, Source, Target, Transition};
