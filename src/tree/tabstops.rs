//! Lookup of tabstops by number, and navigation between them.

use super::SnippetTree;
use crate::arena::NodeId;
use crate::core::Position;

impl SnippetTree {
    /// The children of `id` which are containers, in order
    pub fn editable_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&c| self.node(c).map_or(false, |n| n.is_container()))
    }

    /// Returns the deepest container whose span contains `pos` (as `start <= pos < end`).  This is
    /// where a new node starting at `pos` should be added.  Falls back to the root.
    pub fn find_parent_for_new_to(&self, pos: Position) -> NodeId {
        let mut current = self.root;
        'descend: loop {
            for child in self.editable_children(current) {
                if self.node(child).map_or(false, |n| n.contains(pos)) {
                    current = child;
                    continue 'descend;
                }
            }
            return current;
        }
    }

    /// Finds the tabstop with the smallest number greater than `n` anywhere under `id`.  A
    /// container's own tabstops win ties against those of its descendants.
    pub fn next_tab(&self, id: NodeId, n: u32) -> Option<(u32, NodeId)> {
        let container = self.node(id)?.as_container()?;
        let own = n
            .checked_add(1)
            .and_then(|first| container.tabstops.range(first..).next())
            .map(|(&number, &ts)| (number, ts));
        self.editable_children(id)
            .filter_map(|child| self.next_tab(child, n))
            .fold(own, |best, candidate| match best {
                Some(best) if best.0 <= candidate.0 => Some(best),
                _ => Some(candidate),
            })
    }

    /// Finds the tabstop with the largest number which is smaller than `n` (but not `0`) anywhere
    /// under `id`
    pub fn prev_tab(&self, id: NodeId, n: u32) -> Option<(u32, NodeId)> {
        let container = self.node(id)?.as_container()?;
        let own = if n > 1 {
            container
                .tabstops
                .range(1..n)
                .next_back()
                .map(|(&number, &ts)| (number, ts))
        } else {
            None
        };
        self.editable_children(id)
            .filter_map(|child| self.prev_tab(child, n))
            .fold(own, |best, candidate| match best {
                Some(best) if best.0 >= candidate.0 => Some(best),
                _ => Some(candidate),
            })
    }

    /// Looks for tabstop `n`, first in the own tabstops of `id`, then in its child containers and
    /// finally in its parent.  `requester` is the node which asked `id`, and is never asked back.
    pub fn get_tabstop(&self, id: NodeId, requester: Option<NodeId>, n: u32) -> Option<NodeId> {
        let node = self.node(id)?;
        if let Some(&ts) = node.as_container().and_then(|c| c.tabstops.get(&n)) {
            return Some(ts);
        }
        for child in self.editable_children(id) {
            if Some(child) == requester {
                continue;
            }
            if let Some(ts) = self.get_tabstop(child, Some(id), n) {
                return Some(ts);
            }
        }
        match node.parent() {
            Some(parent) if Some(parent) != requester => self.get_tabstop(parent, Some(id), n),
            _ => None,
        }
    }

    /// Looks up tabstop `n` anywhere in the tree
    pub fn tabstop(&self, n: u32) -> Option<NodeId> {
        self.get_tabstop(self.root, None, n)
    }

    /// Every tabstop in the order that the user would visit them by jumping forwards from the
    /// start of the snippet
    pub fn tabstop_order(&self) -> Vec<(u32, NodeId)> {
        let mut order = Vec::new();
        let mut n = 0;
        while let Some((number, ts)) = self.next_tab(self.root, n) {
            order.push((number, ts));
            n = number;
        }
        order
    }
}
