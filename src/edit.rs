//! The atomic unit of buffer change which gets fed into a [`SnippetTree`].
//!
//! [`SnippetTree`]: crate::tree::SnippetTree

use serde::Deserialize;

use crate::core::{Delta, Position};

/// Whether an [`EditCmd`] adds or removes text
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    /// Text was typed or pasted
    Insert,
    /// Text was removed
    Delete,
}

/// One atomic change to the buffer.  An `EditCmd` is either confined to a single line, or is
/// exactly one line break being inserted (splitting a line) or deleted (joining two lines).
///
/// For deletions, only the number of [`char`]s in `text` matters to the tree; the text itself is
/// carried along so that commands can be logged and split.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize)]
#[serde(try_from = "RawEditCmd")]
pub struct EditCmd {
    kind: EditKind,
    line: usize,
    col: usize,
    text: String,
}

/// The possible ways an [`EditCmd`] can be malformed
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum EditError {
    /// The text contains a line break but isn't a bare line break
    EmbeddedLineBreak {
        /// The offending text
        text: String,
    },
}

impl std::fmt::Display for EditError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditError::EmbeddedLineBreak { text } => write!(
                f,
                "Edit text {:?} contains a line break but isn't a single line break",
                text
            ),
        }
    }
}

impl std::error::Error for EditError {}

impl EditCmd {
    /// Creates a new `EditCmd`, checking that `text` is either a single line or exactly `"\n"`.
    pub fn new(
        kind: EditKind,
        pos: Position,
        text: impl Into<String>,
    ) -> Result<Self, EditError> {
        let text = text.into();
        if text.contains('\n') && text != "\n" {
            return Err(EditError::EmbeddedLineBreak { text });
        }
        Ok(EditCmd {
            kind,
            line: pos.line,
            col: pos.col,
            text,
        })
    }

    /// Creates an insertion of `text` at `pos`
    pub fn insert(pos: Position, text: impl Into<String>) -> Result<Self, EditError> {
        Self::new(EditKind::Insert, pos, text)
    }

    /// Creates a deletion of `text`, which starts at `pos`
    pub fn delete(pos: Position, text: impl Into<String>) -> Result<Self, EditError> {
        Self::new(EditKind::Delete, pos, text)
    }

    /// Splits an arbitrary (possibly multi-line) piece of text into the sequence of valid
    /// `EditCmd`s which, applied in order, insert or delete it at `pos`.
    ///
    /// Insertions advance through the text (every line break moves the next command onto the next
    /// line), whereas deletions all happen at `pos` because the text after it keeps moving back.
    pub fn for_text(kind: EditKind, pos: Position, text: &str) -> Vec<EditCmd> {
        let mut cmds = Vec::new();
        let mut cursor = pos;
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                cmds.push(EditCmd::raw(kind, cursor, "\n".to_owned()));
                if kind == EditKind::Insert {
                    cursor = Position::new(cursor.line + 1, 0);
                }
            }
            if !line.is_empty() {
                cmds.push(EditCmd::raw(kind, cursor, line.to_owned()));
                if kind == EditKind::Insert {
                    cursor = cursor.right(line.chars().count());
                }
            }
        }
        cmds
    }

    /// Builds a command whose text is already known to be well-formed
    pub(crate) fn raw(kind: EditKind, pos: Position, text: String) -> Self {
        debug_assert!(!text.contains('\n') || text == "\n");
        EditCmd {
            kind,
            line: pos.line,
            col: pos.col,
            text,
        }
    }

    /// Re-checks the line-break rule.  Commands built through [`EditCmd::new`] or deserialized
    /// always pass this.
    pub fn validate(&self) -> Result<(), EditError> {
        if self.text.contains('\n') && !self.is_line_break() {
            return Err(EditError::EmbeddedLineBreak {
                text: self.text.clone(),
            });
        }
        Ok(())
    }

    /// Whether this command inserts or deletes
    pub fn kind(&self) -> EditKind {
        self.kind
    }

    /// Where the inserted or deleted text starts
    pub fn pos(&self) -> Position {
        Position::new(self.line, self.col)
    }

    /// The inserted or deleted text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns `true` if this command splits or joins a line
    pub fn is_line_break(&self) -> bool {
        self.text == "\n"
    }

    /// Number of [`char`]s in the text (a line break counts as one)
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    /// Returns `true` if this command has no text, and so changes nothing
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The (exclusive) end of the region removed by a deletion.  For a line break this is the
    /// start of the next line.
    pub fn del_end(&self) -> Position {
        if self.is_line_break() {
            Position::new(self.line + 1, 0)
        } else {
            self.pos().right(self.len())
        }
    }

    /// How far the text after this command moves once it has been applied
    pub fn delta(&self) -> Delta {
        let delta = if self.is_line_break() {
            Delta::LINE_BREAK
        } else {
            Delta::cols(self.len())
        };
        match self.kind {
            EditKind::Insert => delta,
            EditKind::Delete => -delta,
        }
    }

    /// Splits this command's text after `n` [`char`]s, returning two commands of the same kind
    /// at the same position.
    pub(crate) fn split_at(&self, n: usize) -> (EditCmd, EditCmd) {
        let byte_idx = self
            .text
            .char_indices()
            .nth(n)
            .map_or(self.text.len(), |(idx, _)| idx);
        let (head, tail) = self.text.split_at(byte_idx);
        (
            EditCmd::raw(self.kind, self.pos(), head.to_owned()),
            EditCmd::raw(self.kind, self.pos(), tail.to_owned()),
        )
    }
}

impl std::fmt::Display for EditCmd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let c = match self.kind {
            EditKind::Insert => 'I',
            EditKind::Delete => 'D',
        };
        write!(f, "{}{} {:?}", c, self.pos(), self.text)
    }
}

/// The unchecked shape of an [`EditCmd`] as it appears in scenario files
#[derive(Debug, Clone, Deserialize)]
struct RawEditCmd {
    kind: EditKind,
    line: usize,
    col: usize,
    text: String,
}

impl TryFrom<RawEditCmd> for EditCmd {
    type Error = EditError;

    fn try_from(raw: RawEditCmd) -> Result<Self, Self::Error> {
        EditCmd::new(raw.kind, Position::new(raw.line, raw.col), raw.text)
    }
}
