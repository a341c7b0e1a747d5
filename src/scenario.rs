//! The JSON files replayed by the binary.  A scenario gives the text of the buffer, the tree of
//! nodes produced by expanding a snippet in it, and the edits the user made afterwards.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use snipsync::{EditCmd, NodeId, Position, SnippetTree, SpanInit, Token};

/// A recorded snippet session
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// The contents of the buffer before the snippet is expanded
    #[serde(default)]
    pub buffer: String,
    pub root: NodeSpec,
    #[serde(default)]
    pub edits: Vec<EditCmd>,
}

/// The different kinds of node which can appear in a scenario file
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Container,
    Tabstop,
    Text,
    Mirror,
}

/// One node of the tree, along with its children.  Positions can be written either as
/// `{ "line": 0, "col": 3 }` or as `[0, 3]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeSpec {
    pub kind: NodeType,
    /// The tabstop number of a `tabstop` or `mirror`
    #[serde(default)]
    pub number: Option<u32>,
    pub start: Position,
    pub end: Position,
    #[serde(default)]
    pub initial_text: String,
    #[serde(default)]
    pub tiebreaker: Option<Position>,
    #[serde(default)]
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    fn span_init(&self) -> SpanInit {
        let token = Token {
            start: self.start,
            end: self.end,
            initial_text: self.initial_text.clone(),
        };
        let init = SpanInit::from(&token);
        match self.tiebreaker {
            Some(tiebreaker) => init.with_tiebreaker(tiebreaker),
            None => init,
        }
    }

    fn number(&self) -> Result<u32, Error> {
        self.number.ok_or(Error::MissingNumber(self.kind))
    }
}

impl Scenario {
    pub fn load_json_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let json =
            std::fs::read_to_string(path).map_err(|e| Error::Io(path.to_owned(), e))?;
        Self::from_json(&json)
    }

    pub fn from_json(s: &str) -> Result<Self, Error> {
        serde_json::from_str(s).map_err(Error::Json)
    }

    /// Builds the [`SnippetTree`] described by this scenario.  The root must be a `container`.
    pub fn build_tree(&self) -> Result<SnippetTree, Error> {
        if self.root.kind != NodeType::Container {
            return Err(Error::RootNotContainer(self.root.kind));
        }
        let mut tree = SnippetTree::new(self.root.span_init());
        let root = tree.root();
        add_children(&mut tree, root, &self.root.children)?;
        Ok(tree)
    }
}

fn add_children(
    tree: &mut SnippetTree,
    parent: NodeId,
    children: &[NodeSpec],
) -> Result<(), Error> {
    for spec in children {
        let init = spec.span_init();
        let id = match spec.kind {
            NodeType::Container => tree.add_container(parent, init)?,
            NodeType::Tabstop => tree.add_tabstop(parent, spec.number()?, init)?,
            NodeType::Text => tree.add_leaf(parent, init)?,
            NodeType::Mirror => tree.add_mirror(parent, spec.number()?, init)?,
        };
        add_children(tree, id, &spec.children)?;
    }
    Ok(())
}

/// The ways that loading a [`Scenario`] can fail
#[derive(Debug)]
pub enum Error {
    Io(PathBuf, std::io::Error),
    Json(serde_json::Error),
    RootNotContainer(NodeType),
    /// A `tabstop` or `mirror` without a `number`
    MissingNumber(NodeType),
    Tree(snipsync::Error),
}

impl From<snipsync::Error> for Error {
    fn from(e: snipsync::Error) -> Self {
        Error::Tree(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(path, e) => write!(f, "Couldn't read {}: {}", path.display(), e),
            Error::Json(e) => write!(f, "Invalid scenario: {}", e),
            Error::RootNotContainer(kind) => {
                write!(f, "The root node must be a container, not a {:?}", kind)
            }
            Error::MissingNumber(kind) => write!(f, "Every {:?} node needs a number", kind),
            Error::Tree(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {}
