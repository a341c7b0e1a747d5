//! The interface to the live text buffer which the tree of spans is anchored in, along with a
//! simple in-memory implementation of it.

use crate::core::Position;
use crate::edit::{EditCmd, EditKind};

/// A line-oriented text buffer with a cursor, as provided by the host editor.  Lines never contain
/// their trailing line break.
pub trait TextBuffer {
    /// Returns line `n`, or [`None`] if the buffer doesn't have that many lines
    fn line(&self, n: usize) -> Option<&str>;

    /// The number of lines in the buffer, which is always at least one
    fn line_count(&self) -> usize;

    /// Replaces lines `start..end` with `lines`
    fn set_lines(&mut self, start: usize, end: usize, lines: Vec<String>);

    /// Where the cursor currently is
    fn cursor(&self) -> Position;

    /// Moves the cursor to `pos`
    fn set_cursor(&mut self, pos: Position);

    /// Makes sure that text at `pos` isn't hidden inside a closed fold.  Buffers without folding
    /// can ignore this.
    fn open_folds_at(&mut self, _pos: Position) {}
}

/// Returns the [`char`]-indexed slice `from..to` of `s`, or [`None`] if it is out of range.
/// `to = None` slices to the end of the string.
pub fn char_slice(s: &str, from: usize, to: Option<usize>) -> Option<&str> {
    let byte_idx = |n: usize| {
        if n == 0 {
            Some(0)
        } else {
            s.char_indices()
                .map(|(idx, _)| idx)
                .chain(std::iter::once(s.len()))
                .nth(n)
        }
    };
    let start = byte_idx(from)?;
    let end = match to {
        Some(to) if to < from => return None,
        Some(to) => byte_idx(to)?,
        None => s.len(),
    };
    Some(&s[start..end])
}

/// A [`TextBuffer`] which stores its lines in memory.  This also records how many times it has been
/// written to and where folds were opened, which makes it useful for checking that the tree only
/// touches the buffer when it needs to.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LineBuffer {
    lines: Vec<String>,
    cursor: Position,
    writes: usize,
    opened_folds: Vec<Position>,
}

impl LineBuffer {
    /// Creates a `LineBuffer` from some text, splitting it on `\n`.  The empty string makes a
    /// buffer containing one empty line, like a freshly opened file.
    pub fn from_text(text: &str) -> Self {
        Self::from_lines(text.split('\n').map(str::to_owned).collect())
    }

    /// Creates a `LineBuffer` from its lines.  No lines at all makes a buffer with one empty
    /// line.
    pub fn from_lines(lines: Vec<String>) -> Self {
        let lines = if lines.is_empty() {
            vec![String::new()]
        } else {
            lines
        };
        LineBuffer {
            lines,
            cursor: Position::default(),
            writes: 0,
            opened_folds: Vec::new(),
        }
    }

    /// The whole contents of the buffer, with lines joined by `\n`
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// The lines of the buffer, without their line breaks
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The number of times [`TextBuffer::set_lines`] has been called
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Every position passed to [`TextBuffer::open_folds_at`], oldest first
    pub fn opened_folds(&self) -> &[Position] {
        &self.opened_folds
    }

    /// The position just after the last [`char`] in the buffer
    pub fn end(&self) -> Position {
        match self.lines.last() {
            Some(line) => Position::new(self.lines.len() - 1, line.chars().count()),
            None => Position::default(),
        }
    }

    /// Performs the change described by an [`EditCmd`] on this buffer, as if the user had typed
    /// it.  This is how the host editor would change the buffer before telling the tree about it.
    ///
    /// Returns `false` (leaving the buffer untouched) if the command doesn't fit the buffer.
    pub fn apply(&mut self, cmd: &EditCmd) -> bool {
        let pos = cmd.pos();
        let line = match self.lines.get(pos.line) {
            Some(line) => line,
            None => return false,
        };
        let (before, after) = match (
            char_slice(line, 0, Some(pos.col)),
            char_slice(line, pos.col, None),
        ) {
            (Some(before), Some(after)) => (before.to_owned(), after.to_owned()),
            _ => return false,
        };

        match (cmd.kind(), cmd.is_line_break()) {
            (EditKind::Insert, true) => {
                self.set_lines(pos.line, pos.line + 1, vec![before, after]);
            }
            (EditKind::Insert, false) => {
                let new_line = before + cmd.text() + &after;
                self.set_lines(pos.line, pos.line + 1, vec![new_line]);
            }
            (EditKind::Delete, true) => {
                if !after.is_empty() || pos.line + 1 >= self.lines.len() {
                    return false;
                }
                let joined = before + &self.lines[pos.line + 1];
                self.set_lines(pos.line, pos.line + 2, vec![joined]);
            }
            (EditKind::Delete, false) => {
                let remaining = match char_slice(&after, cmd.len(), None) {
                    Some(remaining) => remaining,
                    None => return false,
                };
                let new_line = before + remaining;
                self.set_lines(pos.line, pos.line + 1, vec![new_line]);
            }
        }
        true
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::from_lines(Vec::new())
    }
}

impl TextBuffer for LineBuffer {
    fn line(&self, n: usize) -> Option<&str> {
        self.lines.get(n).map(String::as_str)
    }

    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn set_lines(&mut self, start: usize, end: usize, lines: Vec<String>) {
        let end = end.min(self.lines.len());
        let start = start.min(end);
        self.lines.splice(start..end, lines);
        if self.lines.is_empty() {
            self.lines.push(String::new());
        }
        self.writes += 1;
    }

    fn cursor(&self) -> Position {
        self.cursor
    }

    fn set_cursor(&mut self, pos: Position) {
        self.cursor = pos;
    }

    fn open_folds_at(&mut self, pos: Position) {
        self.opened_folds.push(pos);
    }
}

#[cfg(test)]
mod tests {
    use super::{char_slice, LineBuffer, TextBuffer};
    use crate::core::Position;
    use crate::edit::{EditCmd, EditKind};

    #[test]
    fn char_slicing() {
        assert_eq!(char_slice("hello", 1, Some(3)), Some("el"));
        assert_eq!(char_slice("hello", 0, None), Some("hello"));
        assert_eq!(char_slice("hello", 5, None), Some(""));
        assert_eq!(char_slice("hello", 5, Some(5)), Some(""));
        assert_eq!(char_slice("hello", 6, None), None);
        assert_eq!(char_slice("hello", 2, Some(9)), None);
        assert_eq!(char_slice("hello", 3, Some(2)), None);
        assert_eq!(char_slice("zäöü!", 1, Some(4)), Some("äöü"));
    }

    #[test]
    fn apply_edits() {
        #[track_caller]
        fn check(before: &str, kind: EditKind, pos: (usize, usize), text: &str, after: &str) {
            let mut buf = LineBuffer::from_text(before);
            let cmd = EditCmd::new(kind, Position::from(pos), text).unwrap();
            assert!(buf.apply(&cmd));
            assert_eq!(buf.text(), after);
        }

        check("abc", EditKind::Insert, (0, 1), "XY", "aXYbc");
        check("abc", EditKind::Insert, (0, 3), "!", "abc!");
        check("abc\ndef", EditKind::Insert, (0, 1), "\n", "a\nbc\ndef");
        check("abcdef", EditKind::Delete, (0, 1), "bcd", "aef");
        check("abc\ndef", EditKind::Delete, (0, 3), "\n", "abcdef");
        check("äbc", EditKind::Delete, (0, 0), "ä", "bc");
    }

    #[test]
    fn apply_rejects_bad_edits() {
        let mut buf = LineBuffer::from_text("abc\ndef");
        assert!(!buf.apply(&EditCmd::insert(Position::new(5, 0), "x").unwrap()));
        assert!(!buf.apply(&EditCmd::insert(Position::new(0, 9), "x").unwrap()));
        assert!(!buf.apply(&EditCmd::delete(Position::new(0, 2), "xyz").unwrap()));
        // Can't join lines from the middle of a line
        assert!(!buf.apply(&EditCmd::delete(Position::new(0, 1), "\n").unwrap()));
        assert_eq!(buf.text(), "abc\ndef");
        assert_eq!(buf.writes(), 0);
    }

    #[test]
    fn end() {
        assert_eq!(LineBuffer::from_text("").end(), Position::new(0, 0));
        assert_eq!(LineBuffer::default().end(), Position::new(0, 0));
        assert_eq!(LineBuffer::from_text("ab\ncde").end(), Position::new(1, 3));
    }

    #[test]
    fn default_has_one_empty_line() {
        let buf = LineBuffer::default();
        assert_eq!(buf.line_count(), 1);
        assert_eq!(buf.line(0), Some(""));
        assert_eq!(buf, LineBuffer::from_text(""));
    }

    #[test]
    fn set_lines_counts_writes() {
        let mut buf = LineBuffer::from_text("a\nb\nc");
        buf.set_lines(1, 2, vec!["x".to_owned(), "y".to_owned()]);
        assert_eq!(buf.text(), "a\nx\ny\nc");
        assert_eq!(buf.line_count(), 4);
        assert_eq!(buf.writes(), 1);
    }
}
