//! Tree-wide node membership.
//!
//! Every machine in one machine tree holds a clone of the same registry, so
//! a uniqueness check is a single set lookup no matter how deep the tree is.

use crate::core::NodeId;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

#[derive(Clone, Debug, Default)]
pub(crate) struct Registry {
    ids: Rc<RefCell<HashSet<NodeId>>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_ids(ids: impl IntoIterator<Item = NodeId>) -> Self {
        let registry = Self::new();
        registry.extend(ids);
        registry
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.ids.borrow().contains(&id)
    }

    pub(crate) fn insert(&self, id: NodeId) {
        self.ids.borrow_mut().insert(id);
    }

    pub(crate) fn remove(&self, id: NodeId) {
        self.ids.borrow_mut().remove(&id);
    }

    pub(crate) fn extend(&self, ids: impl IntoIterator<Item = NodeId>) {
        self.ids.borrow_mut().extend(ids);
    }

    pub(crate) fn is_disjoint(&self, other: &Registry) -> bool {
        self.ids.borrow().is_disjoint(&other.ids.borrow())
    }

    /// Whether both handles share one set, i.e. belong to the same tree.
    pub(crate) fn same_tree(&self, other: &Registry) -> bool {
        Rc::ptr_eq(&self.ids, &other.ids)
    }
}
