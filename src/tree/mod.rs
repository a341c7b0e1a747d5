//! The tree of spans which keeps track of a snippet whilst the user is filling it in.
//!
//! Every node owns a `[start, end)` span of the live buffer.  [`Container`] nodes own an ordered
//! list of non-overlapping children and receive the user's edits; leaf nodes are atomic and get
//! destroyed by any edit which lands inside them.  Edits are routed through the tree by
//! [`SnippetTree::dispatch`] (see the [`routing`] module), and tabstops are looked up and
//! navigated by the methods in the [`tabstops`] module.

mod routing;
mod tabstops;

use std::collections::HashSet;

use crate::arena::{Arena, NodeId};
use crate::buffer::{char_slice, TextBuffer};
use crate::core::{Delta, Position, Size};
use crate::edit::{EditCmd, EditError};
use crate::node::{Container, LeafKind, Node, NodeKind, SpanInit};

/// The ways that operations on a [`SnippetTree`] can fail
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Error {
    /// An [`EditCmd`] was malformed
    Edit(EditError),
    /// The buffer doesn't contain the span `start..end` any more
    Range {
        /// Start of the missing span
        start: Position,
        /// End of the missing span
        end: Position,
    },
    /// An [`EditCmd`] was dispatched to a node whose span doesn't contain it
    OutsideSpan {
        /// The rejected command
        cmd: EditCmd,
        /// Start of the node's span
        start: Position,
        /// End of the node's span
        end: Position,
    },
    /// The node has been destroyed (or never existed)
    UnknownNode(NodeId),
    /// Tried to give a child to, or route an edit into, a leaf node
    NotAContainer(NodeId),
    /// Tried to remove a node from a container which doesn't own it
    NotAChild {
        /// The container
        parent: NodeId,
        /// The node which isn't one of its children
        child: NodeId,
    },
    /// The container already owns a tabstop with this number
    DuplicateTabstop {
        /// The container
        parent: NodeId,
        /// The tabstop number which is already taken
        number: u32,
    },
    /// The settle pass was still making progress after this many sweeps
    DidNotConverge {
        /// How many sweeps were run
        sweeps: usize,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Edit(e) => write!(f, "{}", e),
            Error::Range { start, end } => {
                write!(f, "Buffer no longer contains the span {}..{}", start, end)
            }
            Error::OutsideSpan { cmd, start, end } => write!(
                f,
                "Edit {} doesn't fit inside the span {}..{}",
                cmd, start, end
            ),
            Error::UnknownNode(id) => write!(f, "Node {:?} doesn't exist", id),
            Error::NotAContainer(id) => write!(f, "Node {:?} can't have children", id),
            Error::NotAChild { parent, child } => {
                write!(f, "Node {:?} isn't a child of {:?}", child, parent)
            }
            Error::DuplicateTabstop { parent, number } => {
                write!(f, "Node {:?} already owns tabstop {}", parent, number)
            }
            Error::DidNotConverge { sweeps } => write!(
                f,
                "Snippet content didn't converge after {} sweeps; check for cyclic mirrors",
                sweeps
            ),
        }
    }
}

impl std::error::Error for Error {}

impl From<EditError> for Error {
    fn from(e: EditError) -> Self {
        Error::Edit(e)
    }
}

/// The ways that the structure of a [`SnippetTree`] can be inconsistent.  None of these should
/// ever be produced; [`SnippetTree::check_invariants`] exists so that tests can prove it.
#[derive(Debug, Clone, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum InvariantError {
    /// A node ends before it starts
    InvertedSpan {
        node: NodeId,
        start: Position,
        end: Position,
    },
    /// A child id refers to a destroyed node
    DanglingChild { parent: NodeId, child: NodeId },
    /// A child doesn't point back at the container which owns it
    WrongParent {
        child: NodeId,
        expected: NodeId,
        found: Option<NodeId>,
    },
    /// A child's span isn't inside its parent's span
    ChildOutsideParent { parent: NodeId, child: NodeId },
    /// Two siblings are out of order
    Unsorted {
        parent: NodeId,
        first: NodeId,
        second: NodeId,
    },
    /// Two siblings' spans overlap
    Overlap {
        parent: NodeId,
        first: NodeId,
        second: NodeId,
    },
    /// A tabstop entry which doesn't point at a child with that number
    StrayTabstop { parent: NodeId, number: u32 },
}

impl std::fmt::Display for InvariantError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvariantError::InvertedSpan { node, start, end } => {
                write!(f, "Node {:?} ends ({}) before it starts ({})", node, end, start)
            }
            InvariantError::DanglingChild { parent, child } => {
                write!(f, "Node {:?} has destroyed child {:?}", parent, child)
            }
            InvariantError::WrongParent {
                child,
                expected,
                found,
            } => write!(
                f,
                "Node {:?} is a child of {:?} but points to {:?}",
                child, expected, found
            ),
            InvariantError::ChildOutsideParent { parent, child } => {
                write!(f, "Node {:?} sticks out of its parent {:?}", child, parent)
            }
            InvariantError::Unsorted {
                parent,
                first,
                second,
            } => write!(
                f,
                "Children {:?} and {:?} of {:?} are out of order",
                first, second, parent
            ),
            InvariantError::Overlap {
                parent,
                first,
                second,
            } => write!(
                f,
                "Children {:?} and {:?} of {:?} overlap",
                first, second, parent
            ),
            InvariantError::StrayTabstop { parent, number } => {
                write!(f, "Tabstop {} of {:?} isn't one of its children", number, parent)
            }
        }
    }
}

impl std::error::Error for InvariantError {}

/// A tree of nodes anchored in a text buffer.  The tree doesn't own the buffer; every operation
/// which reads or writes text takes it as an argument.
#[derive(Debug, Clone)]
pub struct SnippetTree {
    arena: Arena<Node>,
    /// **Invariant**: the root always exists and is a [`Container`]
    root: NodeId,
}

impl SnippetTree {
    /// Creates a tree containing only a root container with a given span
    pub fn new(root: SpanInit) -> Self {
        let mut arena = Arena::new();
        let root = arena.alloc(Node::new(
            root.into_span(),
            None,
            None,
            NodeKind::Container(Container::default()),
        ));
        SnippetTree { arena, root }
    }

    ///////////////
    // ACCESSORS //
    ///////////////

    /// The root container, which spans the whole snippet
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Gets a node, returning [`None`] if it has been destroyed
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.arena.get(id)
    }

    /// `true` if `id` refers to a node which hasn't been destroyed
    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.get(id).is_some()
    }

    /// The children of a node, in order.  Leaves and destroyed nodes have no children.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.arena.get(id) {
            Some(node) => node.children(),
            None => &[],
        }
    }

    /// The parent of a node, or [`None`] for the root and destroyed nodes
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id).and_then(Node::parent)
    }

    /// The number of nodes in the tree, including the root
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Always `false`, since a tree always has a root
    pub fn is_empty(&self) -> bool {
        false
    }

    pub(crate) fn get(&self, id: NodeId) -> Result<&Node, Error> {
        self.arena.get(id).ok_or(Error::UnknownNode(id))
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut Node, Error> {
        self.arena.get_mut(id).ok_or(Error::UnknownNode(id))
    }

    fn container_mut(&mut self, id: NodeId) -> Result<&mut Container, Error> {
        self.get_mut(id)?
            .as_container_mut()
            .ok_or(Error::NotAContainer(id))
    }

    /// Returns the parent of `id` along with the index of `id` in its parent's children
    pub(crate) fn index_in_parent(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(id)?;
        let idx = self.children(parent).iter().position(|&c| c == id)?;
        Some((parent, idx))
    }

    /// All the nodes in the tree, parents before their children
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        order
    }

    /// All the nodes in the tree, children (in order) before their parents
    pub fn postorder(&self) -> Vec<NodeId> {
        fn walk(tree: &SnippetTree, id: NodeId, order: &mut Vec<NodeId>) {
            for &child in tree.children(id) {
                walk(tree, child, order);
            }
            order.push(id);
        }

        let mut order = Vec::with_capacity(self.len());
        walk(self, self.root, &mut order);
        order
    }

    //////////////////
    // CONSTRUCTION //
    //////////////////

    /// Adds a new editable node under `parent`
    pub fn add_container(&mut self, parent: NodeId, init: SpanInit) -> Result<NodeId, Error> {
        self.insert_node(
            parent,
            init,
            None,
            NodeKind::Container(Container::default()),
        )
    }

    /// Adds a new editable node under `parent`, and registers it as tabstop `number` of `parent`
    pub fn add_tabstop(
        &mut self,
        parent: NodeId,
        number: u32,
        init: SpanInit,
    ) -> Result<NodeId, Error> {
        self.insert_node(
            parent,
            init,
            Some(number),
            NodeKind::Container(Container::default()),
        )
    }

    /// Adds a new node of fixed text under `parent`
    pub fn add_leaf(&mut self, parent: NodeId, init: SpanInit) -> Result<NodeId, Error> {
        self.insert_node(parent, init, None, NodeKind::Leaf(LeafKind::Text))
    }

    /// Adds a new node under `parent` which mirrors the contents of tabstop `number`
    pub fn add_mirror(
        &mut self,
        parent: NodeId,
        number: u32,
        init: SpanInit,
    ) -> Result<NodeId, Error> {
        self.insert_node(parent, init, None, NodeKind::Leaf(LeafKind::Mirror { number }))
    }

    fn insert_node(
        &mut self,
        parent: NodeId,
        init: SpanInit,
        number: Option<u32>,
        kind: NodeKind,
    ) -> Result<NodeId, Error> {
        let container = self
            .get(parent)?
            .as_container()
            .ok_or(Error::NotAContainer(parent))?;
        if let Some(number) = number {
            if container.tabstops.contains_key(&number) {
                return Err(Error::DuplicateTabstop { parent, number });
            }
        }

        let id = self
            .arena
            .alloc(Node::new(init.into_span(), Some(parent), number, kind));
        self.add_child(parent, id)?;
        if let Some(number) = number {
            self.container_mut(parent)?.tabstops.insert(number, id);
        }
        log::trace!("Added {:?} under {:?}", id, parent);
        Ok(id)
    }

    /// Inserts `child` into the children of `parent`, keeping them sorted.  Children with equal
    /// keys stay in the order they were added.
    pub(crate) fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), Error> {
        let key = self.get(child)?.order_key();
        let idx = self.children(parent).partition_point(|&c| {
            self.arena
                .get(c)
                .map_or(true, |node| node.order_key() <= key)
        });
        self.container_mut(parent)?.children.insert(idx, child);
        self.get_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Detaches `child` from `parent`, drops any tabstop entry for it and destroys it along with
    /// all its descendants.
    pub fn del_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), Error> {
        let container = self.container_mut(parent)?;
        let idx = container
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or(Error::NotAChild { parent, child })?;
        container.children.remove(idx);
        container.tabstops.retain(|_, id| *id != child);

        log::debug!("Destroying {:?} (child of {:?})", child, parent);
        let mut stack = vec![child];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.arena.free(id) {
                stack.extend_from_slice(node.children());
            }
        }
        Ok(())
    }

    /////////////////
    // BUFFER SYNC //
    /////////////////

    /// Reads the text currently in the buffer across the span of a node
    pub fn current_text(&self, id: NodeId, buf: &impl TextBuffer) -> Result<String, Error> {
        let node = self.get(id)?;
        read_span(buf, node.start(), node.end())
    }

    /// Replaces the buffer contents of a node's span with `text` (or the node's initial text if
    /// `text` is [`None`]) and tells the ancestors that the node has changed size.  Children of
    /// the node are **not** moved.
    ///
    /// Nothing happens if the buffer already contains the right text, so this can be called as
    /// often as needed.  Returns `true` if the buffer was changed.
    pub fn overwrite(
        &mut self,
        id: NodeId,
        buf: &mut impl TextBuffer,
        text: Option<&str>,
    ) -> Result<bool, Error> {
        let node = self.get(id)?;
        let target = text.unwrap_or_else(|| node.initial_text()).to_owned();
        if self.current_text(id, &*buf)? == target {
            return Ok(false);
        }

        let (start, old_end) = (node.start(), node.end());
        let new_end = write_span(buf, start, old_end, &target)?;
        self.get_mut(id)?.span.end = new_end;
        log::debug!(
            "Overwrote {:?} with {:?} ({}..{} is now {}..{})",
            id,
            target,
            start,
            old_end,
            start,
            new_end
        );

        if let Some((parent, idx)) = self.index_in_parent(id) {
            self.child_has_moved(
                parent,
                Some(idx),
                std::cmp::min(old_end, new_end),
                new_end.delta_from(old_end),
            );
        }
        Ok(true)
    }

    /// Writes the initial text of every node into the buffer, parents before children.  When the
    /// initial texts agree with each other (as they do when they all come from one expanded
    /// snippet) only the root actually writes anything.
    pub fn materialize(&mut self, buf: &mut impl TextBuffer) -> Result<usize, Error> {
        let mut writes = 0;
        for id in self.preorder() {
            if self.contains(id) && self.overwrite(id, buf, None)? {
                writes += 1;
            }
        }
        Ok(writes)
    }

    //////////////////////
    // MOVE PROPAGATION //
    //////////////////////

    /// Called when the child at index `idx` of `id` (or the container itself, if `idx` is
    /// [`None`]) has absorbed an edit at `pivot` which moved the text after it by `delta`.  This
    /// grows or shrinks `id`, moves every later child, and continues up to the root.
    pub(crate) fn child_has_moved(
        &mut self,
        id: NodeId,
        idx: Option<usize>,
        pivot: Position,
        delta: Delta,
    ) {
        let mut current = id;
        let mut idx = idx;
        loop {
            let later_children = match self.arena.get_mut(current) {
                Some(node) => {
                    node.span.end.shift(pivot, delta);
                    let first_later = idx.map_or(0, |i| i + 1);
                    node.children().get(first_later..).unwrap_or(&[]).to_vec()
                }
                None => return,
            };
            for child in later_children {
                self.shift_subtree(child, pivot, delta);
            }

            match self.index_in_parent(current) {
                Some((parent, idx_in_parent)) => {
                    current = parent;
                    idx = Some(idx_in_parent);
                }
                None => break,
            }
        }
    }

    /// Moves a node and all of its descendants
    fn shift_subtree(&mut self, id: NodeId, pivot: Position, delta: Delta) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.arena.get_mut(id) {
                node.span.shift(pivot, delta);
                stack.extend_from_slice(node.children());
            }
        }
    }

    ////////////
    // SETTLE //
    ////////////

    /// Tries to bring one node up to date for the current edit cycle.  Nodes which have settled
    /// are added to `done`.  Returns `false` if the node is waiting for other nodes to settle
    /// first.
    ///
    /// - Containers settle once all their children are in `done`.
    /// - Text leaves settle immediately.
    /// - Mirrors wait for their tabstop to settle, then copy its text.  A mirror whose tabstop
    ///   has been destroyed blanks itself and is removed from the tree.
    pub fn settle(
        &mut self,
        id: NodeId,
        buf: &mut impl TextBuffer,
        done: &mut HashSet<NodeId>,
    ) -> Result<bool, Error> {
        let node = self.get(id)?;
        match node.kind {
            NodeKind::Container(ref container) => {
                if container.children.iter().all(|c| done.contains(c)) {
                    done.insert(id);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            NodeKind::Leaf(LeafKind::Text) => {
                done.insert(id);
                Ok(true)
            }
            NodeKind::Leaf(LeafKind::Mirror { number }) => {
                let parent = match node.parent {
                    Some(parent) => parent,
                    None => {
                        done.insert(id);
                        return Ok(true);
                    }
                };
                match self.get_tabstop(parent, Some(id), number) {
                    Some(source) if !done.contains(&source) => Ok(false),
                    Some(source) => {
                        let text = self.current_text(source, &*buf)?;
                        self.overwrite(id, buf, Some(&text))?;
                        done.insert(id);
                        Ok(true)
                    }
                    None => {
                        log::debug!("Tabstop {} of mirror {:?} is gone", number, id);
                        self.overwrite(id, buf, Some(""))?;
                        self.del_child(parent, id)?;
                        Ok(true)
                    }
                }
            }
        }
    }

    ///////////
    // DEBUG //
    ///////////

    /// A one-line description of a node, e.g. `TabStop[1]((0,4)->(0,7),"foo")`.  Spans which
    /// can't be read from the buffer are shown as `<err>`.
    pub fn describe(&self, id: NodeId, buf: &impl TextBuffer) -> String {
        let node = match self.node(id) {
            Some(node) => node,
            None => return format!("<destroyed {:?}>", id),
        };
        let text = match self.current_text(id, buf) {
            Ok(text) => format!("{:?}", text),
            Err(_) => "<err>".to_owned(),
        };
        format!(
            "{}({}->{},{})",
            node.display_name(),
            node.start(),
            node.end(),
            text
        )
    }

    /// Build a tree view of every node, similar to the output of the Unix command 'tree'
    pub fn tree_view(&self, buf: &impl TextBuffer) -> String {
        let mut s = String::new();
        let mut indentation_string = String::new();
        self.write_tree_view_recursive(self.root, buf, &mut s, &mut indentation_string);
        // Pop the unnecessary newline at the end
        let popped_char = s.pop();
        debug_assert_eq!(Some('\n'), popped_char);
        s
    }

    fn write_tree_view_recursive(
        &self,
        id: NodeId,
        buf: &impl TextBuffer,
        string: &mut String,
        indentation_string: &mut String,
    ) {
        string.push_str(indentation_string);
        string.push_str(&self.describe(id, buf));
        string.push('\n');
        // Indent by two spaces
        indentation_string.push_str("  ");
        for &child in self.children(id) {
            self.write_tree_view_recursive(child, buf, string, indentation_string);
        }
        // Reset indentation
        for _ in 0..2 {
            indentation_string.pop();
        }
    }

    /// Checks every structural invariant of the tree: spans aren't inverted, children are sorted,
    /// don't overlap, lie inside their parent and point back to it, and every tabstop entry is a
    /// child with the right number.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        for id in self.preorder() {
            let node = self
                .arena
                .get(id)
                .ok_or(InvariantError::DanglingChild {
                    parent: self.parent(id).unwrap_or(self.root),
                    child: id,
                })?;
            if node.start() > node.end() {
                return Err(InvariantError::InvertedSpan {
                    node: id,
                    start: node.start(),
                    end: node.end(),
                });
            }

            let container = match node.as_container() {
                Some(container) => container,
                None => continue,
            };
            let mut prev: Option<(NodeId, &Node)> = None;
            for &child_id in &container.children {
                let child = self.arena.get(child_id).ok_or(InvariantError::DanglingChild {
                    parent: id,
                    child: child_id,
                })?;
                if child.parent != Some(id) {
                    return Err(InvariantError::WrongParent {
                        child: child_id,
                        expected: id,
                        found: child.parent,
                    });
                }
                if child.start() < node.start() || child.end() > node.end() {
                    return Err(InvariantError::ChildOutsideParent {
                        parent: id,
                        child: child_id,
                    });
                }
                if let Some((prev_id, prev_node)) = prev {
                    if prev_node.order_key() > child.order_key() {
                        return Err(InvariantError::Unsorted {
                            parent: id,
                            first: prev_id,
                            second: child_id,
                        });
                    }
                    if prev_node.end() > child.start() {
                        return Err(InvariantError::Overlap {
                            parent: id,
                            first: prev_id,
                            second: child_id,
                        });
                    }
                }
                prev = Some((child_id, child));
            }

            for (&number, tabstop) in &container.tabstops {
                let is_child = container.children.contains(tabstop);
                let has_number = self.arena.get(*tabstop).and_then(Node::number) == Some(number);
                if !is_child || !has_number {
                    return Err(InvariantError::StrayTabstop { parent: id, number });
                }
            }
        }
        Ok(())
    }
}

/// Reads the text of the span `start..end` out of a buffer
fn read_span(buf: &impl TextBuffer, start: Position, end: Position) -> Result<String, Error> {
    let range_err = || Error::Range { start, end };
    let line = |n: usize| buf.line(n).ok_or_else(range_err);

    if start.line == end.line {
        return char_slice(line(start.line)?, start.col, Some(end.col))
            .map(str::to_owned)
            .ok_or_else(range_err);
    }
    if start.line > end.line {
        return Err(range_err());
    }

    let mut text = char_slice(line(start.line)?, start.col, None)
        .ok_or_else(range_err)?
        .to_owned();
    for n in start.line + 1..end.line {
        text.push('\n');
        text.push_str(line(n)?);
    }
    text.push('\n');
    text.push_str(char_slice(line(end.line)?, 0, Some(end.col)).ok_or_else(range_err)?);
    Ok(text)
}

/// Replaces the span `start..end` of a buffer with `text`, returning where the new text ends.
/// The cursor is left at `start`, and any folds there are opened.
fn write_span(
    buf: &mut impl TextBuffer,
    start: Position,
    end: Position,
    text: &str,
) -> Result<Position, Error> {
    let range_err = || Error::Range { start, end };
    let before = buf
        .line(start.line)
        .and_then(|l| char_slice(l, 0, Some(start.col)))
        .ok_or_else(range_err)?
        .to_owned();
    let after = buf
        .line(end.line)
        .and_then(|l| char_slice(l, end.col, None))
        .ok_or_else(range_err)?
        .to_owned();

    let mut new_lines: Vec<String> = text.split('\n').map(str::to_owned).collect();
    // `split` always yields at least one item
    new_lines[0].insert_str(0, &before);
    if let Some(last) = new_lines.last_mut() {
        last.push_str(&after);
    }
    buf.set_lines(start.line, end.line + 1, new_lines);

    buf.set_cursor(start);
    buf.open_folds_at(start);
    Ok(start + Size::from(text))
}

#[cfg(test)]
mod tests {
    use super::{Error, SnippetTree};
    use crate::buffer::{LineBuffer, TextBuffer};
    use crate::core::Position;
    use crate::edit::EditCmd;
    use crate::node::SpanInit;

    fn pos(line: usize, col: usize) -> Position {
        Position::new(line, col)
    }

    fn span(start: (usize, usize), end: (usize, usize), text: &str) -> SpanInit {
        SpanInit::new(Position::from(start), Position::from(end), text)
    }

    /// Applies a command to the buffer and then tells the tree about it, as the host editor would
    #[track_caller]
    fn edit(tree: &mut SnippetTree, buf: &mut LineBuffer, cmd: EditCmd) {
        assert!(buf.apply(&cmd), "{} doesn't fit {:?}", cmd, buf.text());
        tree.dispatch(&cmd).unwrap();
        tree.check_invariants().unwrap();
    }

    #[track_caller]
    fn assert_span(tree: &SnippetTree, id: crate::arena::NodeId, start: Position, end: Position) {
        let node = tree.node(id).unwrap();
        assert_eq!((node.start(), node.end()), (start, end));
    }

    /* CONSTRUCTION */

    #[test]
    fn children_stay_sorted() {
        let mut tree = SnippetTree::new(span((0, 0), (0, 20), ""));
        let root = tree.root();
        let c = tree.add_leaf(root, span((0, 10), (0, 12), "")).unwrap();
        let a = tree.add_leaf(root, span((0, 0), (0, 2), "")).unwrap();
        let e = tree
            .add_container(root, span((0, 5), (0, 5), "").with_tiebreaker(pos(0, 1)))
            .unwrap();
        // Same start as `e`, but a smaller (default) tiebreaker
        let b = tree.add_container(root, span((0, 5), (0, 5), "")).unwrap();
        // Same start and tiebreaker as `b`, so goes after it
        let d = tree.add_container(root, span((0, 5), (0, 5), "")).unwrap();
        assert_eq!(tree.children(root), &[a, b, d, e, c]);
        assert_eq!(tree.parent(e), Some(root));
        tree.check_invariants().unwrap();
    }

    #[test]
    fn construction_errors() {
        let mut tree = SnippetTree::new(span((0, 0), (0, 10), ""));
        let root = tree.root();
        tree.add_tabstop(root, 1, span((0, 0), (0, 2), "")).unwrap();
        assert_eq!(
            tree.add_tabstop(root, 1, span((0, 4), (0, 6), "")),
            Err(Error::DuplicateTabstop {
                parent: root,
                number: 1
            })
        );
        let leaf = tree.add_leaf(root, span((0, 7), (0, 8), "")).unwrap();
        assert_eq!(
            tree.add_leaf(leaf, span((0, 7), (0, 8), "")),
            Err(Error::NotAContainer(leaf))
        );
        // The failed additions didn't leave anything behind
        assert_eq!(tree.len(), 3);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn del_child_destroys_subtree() {
        let mut tree = SnippetTree::new(span((0, 0), (0, 10), ""));
        let root = tree.root();
        let ts = tree.add_tabstop(root, 1, span((0, 2), (0, 8), "")).unwrap();
        let inner = tree.add_tabstop(ts, 2, span((0, 3), (0, 5), "")).unwrap();
        let leaf = tree.add_leaf(inner, span((0, 3), (0, 4), "")).unwrap();
        assert_eq!(tree.tabstop(2), Some(inner));

        tree.del_child(root, ts).unwrap();
        for id in [ts, inner, leaf] {
            assert!(!tree.contains(id));
        }
        assert!(tree.children(root).is_empty());
        assert_eq!(tree.tabstop(1), None);
        assert_eq!(tree.tabstop(2), None);
        assert_eq!(
            tree.del_child(root, ts),
            Err(Error::NotAChild {
                parent: root,
                child: ts
            })
        );
        tree.check_invariants().unwrap();
    }

    /* BUFFER SYNC */

    #[test]
    fn current_text() {
        let buf = LineBuffer::from_text("ab\ncdef\ngh");
        let mut tree = SnippetTree::new(span((0, 0), (2, 2), ""));
        let root = tree.root();
        let multi = tree.add_leaf(root, span((0, 1), (2, 1), "")).unwrap();
        let single = tree.add_leaf(root, span((2, 1), (2, 2), "")).unwrap();
        assert_eq!(tree.current_text(root, &buf).unwrap(), "ab\ncdef\ngh");
        assert_eq!(tree.current_text(multi, &buf).unwrap(), "b\ncdef\ng");
        assert_eq!(tree.current_text(single, &buf).unwrap(), "h");

        let too_long = SnippetTree::new(span((1, 2), (4, 0), ""));
        assert_eq!(
            too_long.current_text(too_long.root(), &buf),
            Err(Error::Range {
                start: pos(1, 2),
                end: pos(4, 0)
            })
        );
    }

    #[test]
    fn overwrite_is_idempotent() {
        let mut buf = LineBuffer::from_text("a(x)b");
        let mut tree = SnippetTree::new(span((0, 0), (0, 5), "a(x)b"));
        let root = tree.root();
        let ts = tree.add_tabstop(root, 1, span((0, 2), (0, 3), "x")).unwrap();
        let leaf = tree.add_leaf(root, span((0, 3), (0, 5), ")b")).unwrap();

        // Writing the text which is already there does nothing
        assert_eq!(tree.overwrite(ts, &mut buf, None), Ok(false));
        assert_eq!(buf.writes(), 0);

        assert_eq!(tree.overwrite(ts, &mut buf, Some("1\n22")), Ok(true));
        assert_eq!(buf.text(), "a(1\n22)b");
        assert_eq!(buf.writes(), 1);
        assert_eq!(buf.cursor(), pos(0, 2));
        assert_eq!(buf.opened_folds(), &[pos(0, 2)]);
        assert_span(&tree, ts, pos(0, 2), pos(1, 2));
        assert_span(&tree, leaf, pos(1, 2), pos(1, 4));
        assert_span(&tree, root, pos(0, 0), pos(1, 4));
        assert_eq!(tree.current_text(leaf, &buf).unwrap(), ")b");

        assert_eq!(tree.overwrite(ts, &mut buf, Some("1\n22")), Ok(false));
        assert_eq!(buf.writes(), 1);

        // ... and back again
        assert_eq!(tree.overwrite(ts, &mut buf, None), Ok(true));
        assert_eq!(buf.text(), "a(x)b");
        assert_span(&tree, leaf, pos(0, 3), pos(0, 5));
        assert_span(&tree, root, pos(0, 0), pos(0, 5));
        tree.check_invariants().unwrap();
    }

    #[test]
    fn materialize() {
        let mut buf = LineBuffer::from_text("");
        let mut tree = SnippetTree::new(span((0, 0), (0, 0), "ab(cd)ef"));
        let root = tree.root();
        let leaf = tree.add_leaf(root, span((0, 0), (0, 2), "ab")).unwrap();
        let ts = tree.add_tabstop(root, 1, span((0, 3), (0, 5), "cd")).unwrap();

        // Only the root needs to write anything
        assert_eq!(tree.materialize(&mut buf), Ok(1));
        assert_eq!(buf.text(), "ab(cd)ef");
        assert_eq!(tree.current_text(leaf, &buf).unwrap(), "ab");
        assert_eq!(tree.current_text(ts, &buf).unwrap(), "cd");
        tree.check_invariants().unwrap();
        assert_eq!(tree.materialize(&mut buf), Ok(0));
    }

    #[test]
    fn tree_view() {
        let buf = LineBuffer::from_text("ab(cd)ef");
        let mut tree = SnippetTree::new(span((0, 0), (0, 8), ""));
        let root = tree.root();
        tree.add_leaf(root, span((0, 0), (0, 2), "")).unwrap();
        let ts = tree.add_tabstop(root, 1, span((0, 3), (0, 5), "")).unwrap();
        tree.add_mirror(ts, 2, span((0, 4), (0, 4), "")).unwrap();
        tree.add_container(root, span((0, 7), (0, 12), "")).unwrap();
        assert_eq!(
            tree.tree_view(&buf),
            r#"Container((0,0)->(0,8),"ab(cd)ef")
  Text((0,0)->(0,2),"ab")
  TabStop[1]((0,3)->(0,5),"cd")
    Mirror[2]((0,4)->(0,4),"")
  Container((0,7)->(0,12),<err>)"#
        );
    }

    /* ROUTING */

    #[test]
    fn insert_inside_leaf_destroys_it() {
        let mut buf = LineBuffer::from_text("abxxxfghij");
        let mut tree = SnippetTree::new(span((0, 0), (0, 10), "abxxxfghij"));
        let root = tree.root();
        let leaf = tree.add_leaf(root, span((0, 2), (0, 5), "xxx")).unwrap();

        edit(&mut tree, &mut buf, EditCmd::insert(pos(0, 3), "Y").unwrap());
        assert!(!tree.contains(leaf));
        assert!(tree.children(root).is_empty());
        assert_eq!(buf.text(), "abxYxxfghij");
        assert_span(&tree, root, pos(0, 0), pos(0, 11));
        assert_eq!(tree.current_text(root, &buf).unwrap(), buf.text());
    }

    #[test]
    fn delete_inside_leaf_destroys_it() {
        let mut buf = LineBuffer::from_text("abxxxfghij");
        let mut tree = SnippetTree::new(span((0, 0), (0, 10), "abxxxfghij"));
        let root = tree.root();
        let leaf = tree.add_leaf(root, span((0, 2), (0, 5), "xxx")).unwrap();

        edit(&mut tree, &mut buf, EditCmd::delete(pos(0, 3), "x").unwrap());
        assert!(!tree.contains(leaf));
        assert!(tree.children(root).is_empty());
        assert_eq!(buf.text(), "abxxfghij");
        assert_span(&tree, root, pos(0, 0), pos(0, 9));
    }

    #[test]
    fn delete_over_leaf_start_destroys_it() {
        let mut buf = LineBuffer::from_text("abcdefghij");
        let mut tree = SnippetTree::new(span((0, 0), (0, 10), "abcdefghij"));
        let root = tree.root();
        let leaf = tree.add_leaf(root, span((0, 6), (0, 9), "ghi")).unwrap();
        let ts = tree.add_tabstop(root, 1, span((0, 9), (0, 10), "j")).unwrap();

        // "f" is the root's, "g" lands inside the leaf
        edit(&mut tree, &mut buf, EditCmd::delete(pos(0, 5), "fg").unwrap());
        assert!(!tree.contains(leaf));
        assert_eq!(tree.children(root), &[ts]);
        assert_eq!(buf.text(), "abcdehij");
        assert_span(&tree, ts, pos(0, 7), pos(0, 8));
        assert_span(&tree, root, pos(0, 0), pos(0, 8));
        assert_eq!(tree.current_text(ts, &buf).unwrap(), "j");
    }

    #[test]
    fn insert_at_leaf_boundaries_keeps_it() {
        let mut buf = LineBuffer::from_text("ab");
        let mut tree = SnippetTree::new(span((0, 0), (0, 2), "ab"));
        let root = tree.root();
        let leaf = tree.add_leaf(root, span((0, 0), (0, 2), "ab")).unwrap();

        edit(&mut tree, &mut buf, EditCmd::insert(pos(0, 0), "X").unwrap());
        assert_span(&tree, leaf, pos(0, 1), pos(0, 3));
        edit(&mut tree, &mut buf, EditCmd::insert(pos(0, 3), "Y").unwrap());
        assert_span(&tree, leaf, pos(0, 1), pos(0, 3));
        assert_span(&tree, root, pos(0, 0), pos(0, 4));
        assert_eq!(buf.text(), "XabY");
        assert_eq!(tree.current_text(leaf, &buf).unwrap(), "ab");
    }

    #[test]
    fn insert_grows_tabstop() {
        let mut buf = LineBuffer::from_text("f(ab)g");
        let mut tree = SnippetTree::new(span((0, 0), (0, 6), "f(ab)g"));
        let root = tree.root();
        let ts = tree.add_tabstop(root, 1, span((0, 2), (0, 4), "ab")).unwrap();
        let leaf = tree.add_leaf(root, span((0, 4), (0, 6), ")g")).unwrap();

        // Typing at the end of a tabstop extends it
        edit(&mut tree, &mut buf, EditCmd::insert(pos(0, 4), "cd").unwrap());
        assert_eq!(tree.current_text(ts, &buf).unwrap(), "abcd");
        assert_eq!(tree.current_text(leaf, &buf).unwrap(), ")g");

        // Splitting the tabstop over two lines moves everything after it down
        edit(&mut tree, &mut buf, EditCmd::insert(pos(0, 3), "\n").unwrap());
        assert_eq!(buf.text(), "f(a\nbcd)g");
        assert_span(&tree, ts, pos(0, 2), pos(1, 3));
        assert_span(&tree, leaf, pos(1, 3), pos(1, 5));
        assert_span(&tree, root, pos(0, 0), pos(1, 5));
        assert_eq!(tree.current_text(ts, &buf).unwrap(), "a\nbcd");

        // ... and joining the lines again moves it back
        edit(&mut tree, &mut buf, EditCmd::delete(pos(0, 3), "\n").unwrap());
        assert_eq!(buf.text(), "f(abcd)g");
        assert_span(&tree, ts, pos(0, 2), pos(0, 6));
        assert_span(&tree, leaf, pos(0, 6), pos(0, 8));
        assert_span(&tree, root, pos(0, 0), pos(0, 8));
    }

    #[test]
    fn line_break_before_node_moves_it_down() {
        let mut buf = LineBuffer::from_text("ab(cd)");
        let mut tree = SnippetTree::new(span((0, 0), (0, 6), "ab(cd)"));
        let root = tree.root();
        let ts = tree.add_tabstop(root, 1, span((0, 3), (0, 5), "cd")).unwrap();

        edit(&mut tree, &mut buf, EditCmd::insert(pos(0, 1), "\n").unwrap());
        assert_eq!(buf.text(), "a\nb(cd)");
        assert_span(&tree, ts, pos(1, 2), pos(1, 4));
        assert_eq!(tree.current_text(ts, &buf).unwrap(), "cd");
    }

    #[test]
    fn delete_straddling_gap_and_next_child() {
        let mut buf = LineBuffer::from_text("abc12def");
        let mut tree = SnippetTree::new(span((0, 0), (0, 8), "abc12def"));
        let root = tree.root();
        let first = tree.add_container(root, span((0, 0), (0, 3), "abc")).unwrap();
        let second = tree.add_container(root, span((0, 5), (0, 8), "def")).unwrap();

        edit(&mut tree, &mut buf, EditCmd::delete(pos(0, 3), "12d").unwrap());
        assert_eq!(buf.text(), "abcef");
        assert_span(&tree, first, pos(0, 0), pos(0, 3));
        assert_span(&tree, second, pos(0, 3), pos(0, 5));
        assert_span(&tree, root, pos(0, 0), pos(0, 5));
        assert_eq!(tree.current_text(second, &buf).unwrap(), "ef");
    }

    #[test]
    fn delete_straddling_child_end() {
        let mut buf = LineBuffer::from_text("(abc)de");
        let mut tree = SnippetTree::new(span((0, 0), (0, 7), "(abc)de"));
        let root = tree.root();
        let ts = tree.add_tabstop(root, 1, span((0, 1), (0, 4), "abc")).unwrap();

        edit(&mut tree, &mut buf, EditCmd::delete(pos(0, 3), "c)d").unwrap());
        assert_eq!(buf.text(), "(abe");
        assert_span(&tree, ts, pos(0, 1), pos(0, 3));
        assert_span(&tree, root, pos(0, 0), pos(0, 4));
        assert_eq!(tree.current_text(ts, &buf).unwrap(), "ab");
    }

    #[test]
    fn delete_consuming_children() {
        let mut buf = LineBuffer::from_text("a[b]c[d]e");
        let mut tree = SnippetTree::new(span((0, 0), (0, 9), "a[b]c[d]e"));
        let root = tree.root();
        let leaf = tree.add_leaf(root, span((0, 1), (0, 4), "[b]")).unwrap();
        let ts = tree.add_tabstop(root, 1, span((0, 6), (0, 7), "d")).unwrap();
        let last = tree.add_leaf(root, span((0, 8), (0, 9), "e")).unwrap();

        edit(&mut tree, &mut buf, EditCmd::delete(pos(0, 1), "[b]c[d]").unwrap());
        assert_eq!(buf.text(), "ae");
        assert!(!tree.contains(leaf));
        assert!(!tree.contains(ts));
        assert_eq!(tree.tabstop(1), None);
        assert_eq!(tree.children(root), &[last]);
        assert_span(&tree, last, pos(0, 1), pos(0, 2));
        assert_span(&tree, root, pos(0, 0), pos(0, 2));
    }

    #[test]
    fn delete_inside_nested_tabstops() {
        let mut buf = LineBuffer::from_text("<(abc)>");
        let mut tree = SnippetTree::new(span((0, 0), (0, 7), "<(abc)>"));
        let root = tree.root();
        let outer = tree.add_tabstop(root, 1, span((0, 1), (0, 6), "(abc)")).unwrap();
        let inner = tree.add_tabstop(outer, 2, span((0, 2), (0, 5), "abc")).unwrap();
        let close = tree.add_leaf(outer, span((0, 5), (0, 6), ")")).unwrap();

        edit(&mut tree, &mut buf, EditCmd::delete(pos(0, 3), "b").unwrap());
        assert_eq!(buf.text(), "<(ac)>");
        assert_span(&tree, inner, pos(0, 2), pos(0, 4));
        assert_span(&tree, close, pos(0, 4), pos(0, 5));
        assert_span(&tree, outer, pos(0, 1), pos(0, 5));
        assert_span(&tree, root, pos(0, 0), pos(0, 6));

        // Emptying a tabstop leaves it in place with zero width
        edit(&mut tree, &mut buf, EditCmd::delete(pos(0, 2), "ac").unwrap());
        assert_eq!(buf.text(), "<()>");
        assert_span(&tree, inner, pos(0, 2), pos(0, 2));
        assert_eq!(tree.current_text(outer, &buf).unwrap(), "()");

        // ... and typing into it fills it again
        edit(&mut tree, &mut buf, EditCmd::insert(pos(0, 2), "xy").unwrap());
        assert_eq!(tree.current_text(inner, &buf).unwrap(), "xy");
        assert_eq!(tree.current_text(close, &buf).unwrap(), ")");
    }

    #[test]
    fn empty_commands_change_nothing() {
        let buf = LineBuffer::from_text("abc");
        let mut tree = SnippetTree::new(span((0, 0), (0, 3), "abc"));
        let root = tree.root();
        let leaf = tree.add_leaf(root, span((0, 0), (0, 3), "abc")).unwrap();
        let before = tree.clone();
        let insert = EditCmd::insert(pos(0, 1), "").unwrap();
        let delete = EditCmd::delete(pos(0, 1), "").unwrap();
        tree.dispatch(&insert).unwrap();
        tree.dispatch(&delete).unwrap();
        assert!(tree.contains(leaf));
        assert_eq!(tree.node(root), before.node(root));
        assert_eq!(tree.node(leaf), before.node(leaf));
        assert_eq!(tree.current_text(root, &buf).unwrap(), buf.text());
    }

    #[test]
    fn rejects_edits_outside_root() {
        let mut tree = SnippetTree::new(span((0, 2), (0, 5), "abc"));
        for cmd in [
            EditCmd::insert(pos(0, 6), "x").unwrap(),
            EditCmd::insert(pos(0, 1), "x").unwrap(),
            EditCmd::delete(pos(0, 4), "xy").unwrap(),
        ] {
            assert!(matches!(
                tree.dispatch(&cmd),
                Err(Error::OutsideSpan { .. })
            ));
        }
        assert_span(&tree, tree.root(), pos(0, 2), pos(0, 5));
    }

    #[test]
    fn dispatch_at_checks_the_container_span() {
        let mut buf = LineBuffer::from_text("a(bc)d");
        let mut tree = SnippetTree::new(span((0, 0), (0, 6), "a(bc)d"));
        let root = tree.root();
        let ts = tree.add_tabstop(root, 1, span((0, 2), (0, 4), "bc")).unwrap();
        let leaf = tree.add_leaf(root, span((0, 5), (0, 6), "d")).unwrap();

        for cmd in [
            EditCmd::insert(pos(0, 5), "x").unwrap(),
            EditCmd::insert(pos(0, 1), "x").unwrap(),
            EditCmd::delete(pos(0, 3), "c)").unwrap(),
        ] {
            assert!(matches!(
                tree.dispatch_at(ts, &cmd),
                Err(Error::OutsideSpan { .. })
            ));
        }
        let cmd = EditCmd::insert(pos(0, 5), "x").unwrap();
        assert_eq!(tree.dispatch_at(leaf, &cmd), Err(Error::NotAContainer(leaf)));
        assert_span(&tree, ts, pos(0, 2), pos(0, 4));
        assert_span(&tree, root, pos(0, 0), pos(0, 6));

        let cmd = EditCmd::insert(pos(0, 3), "x").unwrap();
        assert!(buf.apply(&cmd));
        tree.dispatch_at(ts, &cmd).unwrap();
        assert_span(&tree, ts, pos(0, 2), pos(0, 5));
        assert_span(&tree, leaf, pos(0, 6), pos(0, 7));
        assert_span(&tree, root, pos(0, 0), pos(0, 7));
        assert_eq!(tree.current_text(ts, &buf).unwrap(), "bxc");
        tree.check_invariants().unwrap();
    }

    #[test]
    fn multi_line_text_as_several_commands() {
        let mut buf = LineBuffer::from_text("f()");
        let mut tree = SnippetTree::new(span((0, 0), (0, 3), "f()"));
        let root = tree.root();
        let ts = tree.add_tabstop(root, 1, span((0, 2), (0, 2), "")).unwrap();
        let close = tree.add_leaf(root, span((0, 2), (0, 3), ")")).unwrap();

        for cmd in EditCmd::for_text(crate::edit::EditKind::Insert, pos(0, 2), "x,\n  y") {
            edit(&mut tree, &mut buf, cmd);
        }
        assert_eq!(buf.text(), "f(x,\n  y)");
        assert_eq!(tree.current_text(ts, &buf).unwrap(), "x,\n  y");
        assert_span(&tree, close, pos(1, 3), pos(1, 4));

        for cmd in EditCmd::for_text(crate::edit::EditKind::Delete, pos(0, 2), "x,\n  y") {
            edit(&mut tree, &mut buf, cmd);
        }
        assert_eq!(buf.text(), "f()");
        assert_span(&tree, ts, pos(0, 2), pos(0, 2));
        assert_span(&tree, close, pos(0, 2), pos(0, 3));
        assert_eq!(buf.line_count(), 1);
    }

    /* TABSTOPS */

    /// `(a(b))(c)`, with tabstop 1 and 5 in the root and tabstop 3 inside tabstop 1
    fn nested_tabstops() -> (SnippetTree, [crate::arena::NodeId; 3]) {
        let mut tree = SnippetTree::new(span((0, 0), (0, 9), "(a(b))(c)"));
        let root = tree.root();
        let ts1 = tree.add_tabstop(root, 1, span((0, 0), (0, 6), "(a(b))")).unwrap();
        let ts3 = tree.add_tabstop(ts1, 3, span((0, 3), (0, 4), "b")).unwrap();
        let ts5 = tree.add_tabstop(root, 5, span((0, 6), (0, 9), "(c)")).unwrap();
        (tree, [ts1, ts3, ts5])
    }

    #[test]
    fn next_and_prev_tab() {
        let (tree, [ts1, ts3, ts5]) = nested_tabstops();
        let root = tree.root();
        assert_eq!(tree.next_tab(root, 0), Some((1, ts1)));
        assert_eq!(tree.next_tab(root, 1), Some((3, ts3)));
        assert_eq!(tree.next_tab(root, 2), Some((3, ts3)));
        assert_eq!(tree.next_tab(root, 3), Some((5, ts5)));
        assert_eq!(tree.next_tab(root, 5), None);
        assert_eq!(tree.next_tab(root, u32::MAX), None);

        assert_eq!(tree.prev_tab(root, 5), Some((3, ts3)));
        assert_eq!(tree.prev_tab(root, 3), Some((1, ts1)));
        assert_eq!(tree.prev_tab(root, 1), None);
        assert_eq!(tree.prev_tab(root, 0), None);

        assert_eq!(tree.tabstop_order(), vec![(1, ts1), (3, ts3), (5, ts5)]);
    }

    #[test]
    fn own_tabstops_win_ties() {
        let mut tree = SnippetTree::new(span((0, 0), (0, 9), ""));
        let root = tree.root();
        let outer = tree.add_tabstop(root, 1, span((0, 0), (0, 4), "")).unwrap();
        tree.add_tabstop(outer, 2, span((0, 1), (0, 2), "")).unwrap();
        let own = tree.add_tabstop(root, 2, span((0, 5), (0, 6), "")).unwrap();
        assert_eq!(tree.next_tab(root, 1), Some((2, own)));
        assert_eq!(tree.prev_tab(root, 3), Some((2, own)));
    }

    #[test]
    fn get_tabstop_searches_whole_tree() {
        let (tree, [ts1, ts3, ts5]) = nested_tabstops();
        // From deep inside the tree, via the parents
        assert_eq!(tree.get_tabstop(ts3, None, 5), Some(ts5));
        assert_eq!(tree.get_tabstop(ts5, None, 3), Some(ts3));
        assert_eq!(tree.get_tabstop(ts1, None, 1), Some(ts1));
        assert_eq!(tree.tabstop(3), Some(ts3));
        // Missing tabstops are still found to be missing
        assert_eq!(tree.get_tabstop(ts3, None, 7), None);
        assert_eq!(tree.tabstop(0), None);
    }

    #[test]
    fn find_parent_for_new_to() {
        let (tree, [ts1, ts3, ts5]) = nested_tabstops();
        assert_eq!(tree.find_parent_for_new_to(pos(0, 0)), ts1);
        assert_eq!(tree.find_parent_for_new_to(pos(0, 3)), ts3);
        assert_eq!(tree.find_parent_for_new_to(pos(0, 4)), ts1);
        assert_eq!(tree.find_parent_for_new_to(pos(0, 6)), ts5);
        assert_eq!(tree.find_parent_for_new_to(pos(0, 9)), tree.root());
    }
}
