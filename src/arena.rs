//! Module containing the 'arena' that stores the nodes of a [`SnippetTree`].
//!
//! [`SnippetTree`]: crate::tree::SnippetTree

use index_vec::IndexVec;

index_vec::define_index_type! {
    /// A stable reference to a node stored in an [`Arena`].  `NodeId`s are never reused, so an
    /// id which refers to a destroyed node will never start referring to a different node.
    pub struct NodeId = usize;
}

/// An arena allocator for the nodes of a tree.  Nodes are addressed by [`NodeId`] rather than by
/// reference, which lets nodes refer to their parents and children without any shared mutable
/// references.
///
/// This differs from a standard arena allocator in the following ways:
/// - Nodes can be freed.  Their slot is left empty, and any [`NodeId`] pointing at it will resolve
///   to [`None`] from then on.
/// - Freed slots are never handed out again.  Snippet trees are short-lived (they only exist whilst
///   the user is filling in a snippet), so the wasted slots are not worth recycling.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    slots: IndexVec<NodeId, Option<T>>,
}

impl<T> Arena<T> {
    /// Creates an empty `Arena` of a given type.
    pub fn new() -> Arena<T> {
        Arena {
            slots: IndexVec::new(),
        }
    }

    /// Add a new node to the `Arena`, and return its [`NodeId`].
    pub fn alloc(&mut self, node: T) -> NodeId {
        self.slots.push(Some(node))
    }

    /// Gets a node from its id, returning [`None`] if the node was freed.
    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.slots.get(id).and_then(Option::as_ref)
    }

    /// Mutable version of [`Arena::get`]
    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.slots.get_mut(id).and_then(Option::as_mut)
    }

    /// Removes a node from the `Arena`, returning it if it hadn't already been freed.
    pub fn free(&mut self, id: NodeId) -> Option<T> {
        self.slots.get_mut(id).and_then(Option::take)
    }

    /// Iterates over all the nodes which haven't been freed, in order of allocation
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &T)> + '_ {
        self.slots
            .iter_enumerated()
            .filter_map(|(id, slot)| slot.as_ref().map(|node| (id, node)))
    }

    /// The number of nodes which haven't been freed
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Returns `true` if every node has been freed (or none were allocated)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}
