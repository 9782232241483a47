//! Read-only diagnostic views of a running machine tree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time description of a machine and its nested machines.
///
/// Positions are recorded by display name; the selector and exit show up as
/// `<selector>` and `<exit>`. Snapshots describe, they do not restore.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MachineSnapshot {
    pub name: String,

    /// Current position.
    pub current: String,

    pub node_count: usize,

    pub finished: bool,

    /// Enclosing machine, if nested.
    pub owner: Option<String>,

    /// Positions from oldest to newest.
    pub history: Vec<String>,

    /// Snapshots of nested machines, in registration order.
    pub nested: Vec<MachineSnapshot>,

    pub taken_at: DateTime<Utc>,
}

impl MachineSnapshot {
    /// Active positions from this machine down through nested machines,
    /// e.g. `["Combat", "Attack"]`.
    pub fn active_path(&self) -> Vec<&str> {
        let mut path = vec![self.current.as_str()];
        if let Some(inner) = self.find_nested(&self.current) {
            path.extend(inner.active_path());
        }
        path
    }

    pub fn find_nested(&self, name: &str) -> Option<&MachineSnapshot> {
        self.nested.iter().find(|nested| nested.name == name)
    }
}
