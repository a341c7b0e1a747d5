//! Line/column coordinates and the signed shifts which move them around.

use serde::Deserialize;

/// A location in the text buffer.  Both fields are zero-indexed, and columns count [`char`]s
/// rather than bytes.
///
/// `Position`s are ordered lexicographically by `(line, col)`.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize)]
pub struct Position {
    /// The line index
    pub line: usize,
    /// The column, in [`char`]s from the start of the line
    pub col: usize,
}

/// A signed shift between two [`Position`]s.  This is how far the text after an edit has moved.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Delta {
    /// How many lines the text moves down (negative for up)
    pub line: isize,
    /// How many columns the text moves right (negative for left)
    pub col: isize,
}

impl Delta {
    /// Creates a `Delta` from its parts
    pub const fn new(line: isize, col: isize) -> Self {
        Delta { line, col }
    }

    /// The shift caused by inserting a single line break
    pub const LINE_BREAK: Delta = Delta::new(1, 0);

    /// The shift caused by inserting `len` [`char`]s on a single line
    pub fn cols(len: usize) -> Self {
        Delta::new(0, len as isize)
    }

    /// Returns `true` if this `Delta` doesn't move anything
    pub fn is_zero(&self) -> bool {
        self.line == 0 && self.col == 0
    }
}

impl std::ops::Neg for Delta {
    type Output = Delta;

    fn neg(self) -> Delta {
        Delta::new(-self.line, -self.col)
    }
}

impl Position {
    /// Creates a `Position` from a zero-indexed line and column
    pub const fn new(line: usize, col: usize) -> Self {
        Position { line, col }
    }

    /// Move this `Position` to account for the text at and after `pivot` having moved by `delta`.
    /// Positions strictly before `pivot` are never affected.
    ///
    /// - A single-line shift only changes the column of positions on the pivot's line; positions
    ///   on later lines don't move at all.
    /// - Splitting a line (`delta.line > 0`) moves positions down, and positions which were on the
    ///   pivot's line get their column re-based onto the start of the new line.
    /// - Joining lines (`delta.line < 0`) moves positions up, and positions which land on the
    ///   pivot's line get re-based onto the end of it.
    pub fn shift(&mut self, pivot: Position, delta: Delta) {
        if *self < pivot {
            return;
        }
        if delta.line == 0 {
            if self.line == pivot.line {
                self.col = self.col.saturating_add_signed(delta.col);
            }
        } else if delta.line > 0 {
            if self.line == pivot.line {
                self.col = self
                    .col
                    .saturating_add_signed(delta.col - pivot.col as isize);
            }
            self.line = self.line.saturating_add_signed(delta.line);
        } else {
            self.line = self.line.saturating_add_signed(delta.line);
            if self.line == pivot.line {
                self.col = self
                    .col
                    .saturating_add_signed(pivot.col as isize - delta.col);
            }
        }
    }

    /// Returns the [`Delta`] which moves `other` onto `self`, in the form expected by
    /// [`Position::shift`] when `other` is used as the pivot.
    pub fn delta_from(self, other: Position) -> Delta {
        let lines = self.line as isize - other.line as isize;
        if lines == 0 {
            Delta::new(0, self.col as isize - other.col as isize)
        } else if self > other {
            Delta::new(lines, self.col as isize)
        } else {
            Delta::new(lines, other.col as isize)
        }
    }

    /// Returns this `Position` moved `n` columns to the right
    pub fn right(self, n: usize) -> Position {
        Position::new(self.line, self.col + n)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.line, self.col)
    }
}

impl From<(usize, usize)> for Position {
    fn from((line, col): (usize, usize)) -> Self {
        Position::new(line, col)
    }
}
