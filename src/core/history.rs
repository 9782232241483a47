//! Bounded history of visited positions.
//!
//! The history behaves as a stack for trace-back (push and pop at the tail)
//! and as a FIFO for capacity: once full, every push silently evicts the
//! oldest entry.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// One visited position and when it was entered.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry<T> {
    pub position: T,
    pub entered_at: DateTime<Utc>,
}

/// Fixed-capacity record of recently visited positions.
///
/// # Example
///
/// ```rust
/// use hfsm::core::History;
///
/// let mut history = History::new(2);
/// history.push("patrol");
/// history.push("chase");
/// history.push("attack");
///
/// assert_eq!(history.len(), 2);
/// assert_eq!(history.path(), vec![&"chase", &"attack"]);
/// assert_eq!(history.previous(), Some(&"chase"));
/// ```
#[derive(Clone, Debug)]
pub struct History<T> {
    entries: VecDeque<HistoryEntry<T>>,
    capacity: usize,
}

impl<T> History<T> {
    /// Create an empty history. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a position, evicting the oldest entry when full.
    pub fn push(&mut self, position: T) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEntry {
            position,
            entered_at: Utc::now(),
        });
    }

    /// Remove and return the most recent position.
    pub fn pop(&mut self) -> Option<T> {
        self.entries.pop_back().map(|entry| entry.position)
    }

    /// Most recent position.
    pub fn last(&self) -> Option<&T> {
        self.entries.back().map(|entry| &entry.position)
    }

    /// Position recorded just before the most recent one.
    pub fn previous(&self) -> Option<&T> {
        let len = self.entries.len();
        if len < 2 {
            return None;
        }
        self.entries.get(len - 2).map(|entry| &entry.position)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop every entry whose position fails `keep`.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.entries.retain(|entry| keep(&entry.position));
    }

    /// Collapse runs of the same position into their oldest entry.
    pub fn dedup_adjacent(&mut self)
    where
        T: PartialEq,
    {
        let mut kept: VecDeque<HistoryEntry<T>> = VecDeque::with_capacity(self.capacity);
        for entry in self.entries.drain(..) {
            if kept.back().map_or(true, |last| last.position != entry.position) {
                kept.push_back(entry);
            }
        }
        self.entries = kept;
    }

    /// Entries from oldest to newest.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry<T>> {
        self.entries.iter()
    }

    /// Positions from oldest to newest.
    pub fn path(&self) -> Vec<&T> {
        self.entries.iter().map(|entry| &entry.position).collect()
    }
}
