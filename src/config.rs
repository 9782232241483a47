//! Machine configuration.

use serde::{Deserialize, Serialize};

/// History capacity used when none is configured.
pub const DEFAULT_MAX_HISTORY: usize = 20;

/// Construction parameters for a machine.
///
/// Deserializable so hosts can keep machine settings next to the rest of
/// their configuration; missing fields fall back to the defaults.
///
/// # Example
///
/// ```rust
/// use hfsm::FsmConfig;
///
/// let config = FsmConfig::default()
///     .with_name("Guard")
///     .with_max_history(8);
///
/// assert_eq!(config.name, "Guard");
/// assert_eq!(config.max_history, 8);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsmConfig {
    /// Display name used in logs and snapshots.
    pub name: String,

    /// Capacity of the trace-back history. Zero is raised to one.
    pub max_history: usize,
}

impl Default for FsmConfig {
    fn default() -> Self {
        Self {
            name: "FSM".to_string(),
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

impl FsmConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }
}
