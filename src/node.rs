//! The records stored for each node of a [`SnippetTree`].
//!
//! [`SnippetTree`]: crate::tree::SnippetTree

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::arena::NodeId;
use crate::core::{Delta, Position};

/// The span-related data shared by every kind of node
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Span {
    pub(crate) start: Position,
    pub(crate) end: Position,
    /// Only used to order nodes which start at the same [`Position`]
    pub(crate) tiebreaker: Position,
    /// The text this node gets when it is first written into the buffer
    pub(crate) initial_text: String,
}

impl Span {
    /// Move this span to account for the text at and after `pivot` moving by `delta`
    pub fn shift(&mut self, pivot: Position, delta: Delta) {
        self.start.shift(pivot, delta);
        self.end.shift(pivot, delta);
    }
}

/// A token produced by the snippet-definition parser, giving the extent and initial text of
/// something which will become a node.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct Token {
    /// Where the token starts
    pub start: Position,
    /// Where the token ends (exclusive)
    pub end: Position,
    /// The text the node will be created with
    #[serde(default)]
    pub initial_text: String,
}

/// A request to create a node
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SpanInit {
    /// Where the node starts
    pub start: Position,
    /// Where the node ends (exclusive)
    pub end: Position,
    /// The text written when the node is materialized
    pub initial_text: String,
    /// Defaults to `(start.line, end.line)` if not given
    pub tiebreaker: Option<Position>,
}

impl SpanInit {
    /// Creates a `SpanInit` with the default tiebreaker
    pub fn new(start: Position, end: Position, initial_text: impl Into<String>) -> Self {
        SpanInit {
            start,
            end,
            initial_text: initial_text.into(),
            tiebreaker: None,
        }
    }

    /// Overrides the tiebreaker used to order this node against siblings with the same start
    pub fn with_tiebreaker(mut self, tiebreaker: Position) -> Self {
        self.tiebreaker = Some(tiebreaker);
        self
    }

    pub(crate) fn into_span(self) -> Span {
        let SpanInit {
            start,
            end,
            initial_text,
            tiebreaker,
        } = self;
        Span {
            start,
            end,
            tiebreaker: tiebreaker.unwrap_or(Position::new(start.line, end.line)),
            initial_text,
        }
    }
}

impl From<&Token> for SpanInit {
    fn from(token: &Token) -> Self {
        SpanInit::new(token.start, token.end, token.initial_text.clone())
    }
}

/// The editable variant of a node: one that owns child nodes and receives the user's edits.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Container {
    /// **Invariant**: sorted by [`Node::order_key`], and no two spans overlap
    pub(crate) children: Vec<NodeId>,
    /// The tabstops owned directly by this container.  Every value is also in `children`.
    pub(crate) tabstops: BTreeMap<u32, NodeId>,
}

impl Container {
    /// The children of this container, in buffer order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Maps tabstop numbers to the children registered under them
    pub fn tabstops(&self) -> &BTreeMap<u32, NodeId> {
        &self.tabstops
    }
}

/// The different kinds of atomic, non-editable nodes
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum LeafKind {
    /// Fixed text which is placed once and never changes
    Text,
    /// Text which repeats the current contents of the tabstop with a given number
    Mirror {
        /// The number of the mirrored tabstop
        number: u32,
    },
}

/// Whether a node is editable (and can own children) or atomic
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum NodeKind {
    /// An editable node, such as a tabstop or the snippet's root
    Container(Container),
    /// An atomic node, which is destroyed if an edit lands inside it
    Leaf(LeafKind),
}

/// A single node of a [`SnippetTree`](crate::tree::SnippetTree)
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Node {
    pub(crate) span: Span,
    pub(crate) parent: Option<NodeId>,
    /// `Some(n)` if this node is registered as tabstop `n` in its parent
    pub(crate) number: Option<u32>,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub(crate) fn new(
        span: Span,
        parent: Option<NodeId>,
        number: Option<u32>,
        kind: NodeKind,
    ) -> Self {
        Node {
            span,
            parent,
            number,
            kind,
        }
    }

    /// The first [`Position`] covered by this node
    pub fn start(&self) -> Position {
        self.span.start
    }

    /// The [`Position`] just after the end of this node
    pub fn end(&self) -> Position {
        self.span.end
    }

    /// Orders this node against siblings with the same start
    pub fn tiebreaker(&self) -> Position {
        self.span.tiebreaker
    }

    /// The text this node was created with
    pub fn initial_text(&self) -> &str {
        &self.span.initial_text
    }

    /// The container which owns this node, or [`None`] for the root
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// The tabstop number of this node, if it is a tabstop
    pub fn number(&self) -> Option<u32> {
        self.number
    }

    /// What sort of node this is
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Returns `true` if this node can own children and receive edits
    pub fn is_container(&self) -> bool {
        matches!(self.kind, NodeKind::Container(_))
    }

    /// Returns `true` if this node is atomic
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    /// The [`Container`] data of this node, if it is one
    pub fn as_container(&self) -> Option<&Container> {
        match &self.kind {
            NodeKind::Container(c) => Some(c),
            NodeKind::Leaf(_) => None,
        }
    }

    pub(crate) fn as_container_mut(&mut self) -> Option<&mut Container> {
        match &mut self.kind {
            NodeKind::Container(c) => Some(c),
            NodeKind::Leaf(_) => None,
        }
    }

    /// The children of this node.  Leaves have none.
    pub fn children(&self) -> &[NodeId] {
        match self.as_container() {
            Some(container) => &container.children,
            None => &[],
        }
    }

    /// The key by which sibling nodes are ordered: `(start, tiebreaker)`, compared
    /// lexicographically.
    pub fn order_key(&self) -> (Position, Position) {
        (self.span.start, self.span.tiebreaker)
    }

    /// `true` if `pos` lies in `[start, end)`
    pub fn contains(&self, pos: Position) -> bool {
        self.span.start <= pos && pos < self.span.end
    }

    /// A short name for the kind of this node, used when displaying trees
    pub fn display_name(&self) -> String {
        match (&self.kind, self.number) {
            (NodeKind::Container(_), Some(n)) => format!("TabStop[{}]", n),
            (NodeKind::Container(_), None) => "Container".to_owned(),
            (NodeKind::Leaf(LeafKind::Text), _) => "Text".to_owned(),
            (NodeKind::Leaf(LeafKind::Mirror { number }), _) => format!("Mirror[{}]", number),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SpanInit, Token};
    use crate::core::Position;

    #[test]
    fn default_tiebreaker() {
        let span = SpanInit::new(Position::new(2, 4), Position::new(5, 1), "").into_span();
        assert_eq!(span.tiebreaker, Position::new(2, 5));

        let span = SpanInit::new(Position::new(2, 4), Position::new(5, 1), "")
            .with_tiebreaker(Position::new(0, 7))
            .into_span();
        assert_eq!(span.tiebreaker, Position::new(0, 7));
    }

    #[test]
    fn from_token() {
        let token: Token = serde_json::from_value(serde_json::json!({
            "start": { "line": 0, "col": 3 },
            "end": { "line": 0, "col": 6 },
            "initial_text": "foo",
        }))
        .unwrap();
        let init = SpanInit::from(&token);
        assert_eq!(init.start, Position::new(0, 3));
        assert_eq!(init.end, Position::new(0, 6));
        assert_eq!(init.initial_text, "foo");
        assert_eq!(init.tiebreaker, None);
    }
}
