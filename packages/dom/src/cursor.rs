use std::collections::VecDeque;

use crate::tree::{Dom, NodeId};

/// Outcome of a cursor filter for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    /// Yield the node to the caller; its children are still traversed.
    Accept,
    /// Pass over the node but traverse its children.
    Skip,
    /// Pass over the node and its whole subtree.
    Reject,
}

/// Forward pre-order cursor over a mutating tree.
///
/// The cursor keeps an explicit pending-visit queue instead of walking the
/// live tree: a popped node has its current children queued ahead of
/// everything else, and nodes that were detached between queueing and
/// popping are dropped. Callers therefore control re-visiting purely by
/// where they insert: nodes placed before an already-popped position are
/// never seen (leading insertion), while queued children that get moved
/// elsewhere in the tree keep their turn (trailing promotion).
#[derive(Debug)]
pub struct TreeCursor {
    roots: Vec<NodeId>,
    queue: VecDeque<NodeId>,
}

impl TreeCursor {
    pub fn new(roots: impl IntoIterator<Item = NodeId>) -> Self {
        let roots: Vec<NodeId> = roots.into_iter().collect();
        let queue = roots.iter().copied().collect();
        Self { roots, queue }
    }

    /// Advance to the next node the filter accepts, or `None` when the
    /// traversal is exhausted.
    pub fn next<F>(&mut self, dom: &Dom, filter: F) -> Option<NodeId>
    where
        F: Fn(&Dom, NodeId) -> FilterDecision,
    {
        while let Some(id) = self.queue.pop_front() {
            if !self.is_connected(dom, id) {
                continue;
            }

            let decision = filter(dom, id);

            if decision != FilterDecision::Reject {
                for (offset, &child) in dom.children(id).iter().enumerate() {
                    self.queue.insert(offset, child);
                }
            }

            if decision == FilterDecision::Accept {
                return Some(id);
            }
        }
        None
    }

    // A node is connected when walking up its parent chain ends at one of
    // the traversal roots.
    fn is_connected(&self, dom: &Dom, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if self.roots.contains(&current) {
                return true;
            }
            match dom.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }
}
