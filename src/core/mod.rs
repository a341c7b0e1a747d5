//! Coordinates in the text buffer, and the arithmetic needed to keep them correct whilst the
//! buffer is being edited.

mod position;
pub use position::{Delta, Position};

/// The `Size` of the empty string
pub const ZERO: Size = Size::new(0, 0);

/// The 'shape' of a piece of text: how many line breaks it contains and how long its last line
/// is.  This is all that's needed to work out where a piece of text ends once it has been written
/// into the buffer, without caring what the text actually is.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Size {
    lines: usize,
    last_line_length: usize,
}

impl Size {
    /// Constructs a new `Size` from its parts
    pub const fn new(lines: usize, last_line_length: usize) -> Size {
        Size {
            lines,
            last_line_length,
        }
    }

    /// Returns how many `\n` characters this text contains.  For example, `foo` occupies `0`
    /// lines, whereas
    /// ```text
    /// if $1 {
    ///     $2
    /// }
    /// ```
    /// occupies `2` lines.
    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Returns how many [`char`]s the last line of this `Size` occupies.
    pub fn last_line_length(&self) -> usize {
        self.last_line_length
    }
}

impl From<&str> for Size {
    fn from(string: &str) -> Size {
        let lines = string.chars().filter(|x| *x == '\n').count();
        let last_line_length = string.chars().rev().take_while(|x| *x != '\n').count();
        Size::new(lines, last_line_length)
    }
}

impl std::ops::Add for Size {
    type Output = Size;

    fn add(mut self, other: Size) -> Size {
        self += other;
        self
    }
}

impl std::ops::AddAssign for Size {
    fn add_assign(&mut self, other: Size) {
        if other.lines == 0 {
            // Text without line breaks gets stuck onto the end of the last line
            self.last_line_length += other.last_line_length;
        } else {
            // Otherwise the length of our last line doesn't matter any more
            self.lines += other.lines;
            self.last_line_length = other.last_line_length;
        }
    }
}

/// Writing text of a given [`Size`] at a [`Position`] leaves the end of that text at the returned
/// [`Position`].
impl std::ops::Add<Size> for Position {
    type Output = Position;

    fn add(self, size: Size) -> Position {
        if size.lines == 0 {
            Position::new(self.line, self.col + size.last_line_length)
        } else {
            Position::new(self.line + size.lines, size.last_line_length)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Position, Size, ZERO};

    #[test]
    fn from_str() {
        for (string, lines, last_line_length) in &[
            ("", 0, 0),
            ("foo", 0, 3),
            ("\n", 1, 0),
            ("\n,", 1, 1),
            ("Some text\n", 1, 0),
            ("if x {\n    $1\n}", 2, 1),
            ("ünïcödé", 0, 7),
        ] {
            assert_eq!(Size::from(*string), Size::new(*lines, *last_line_length));
        }
    }

    #[test]
    fn add() {
        let tests: &[&[&str]] = &[
            &["[", "]"],
            &["for ", "i", " in ", "xs"],
            &["fn ", "name", "(", ") {\n    ", "body", "\n}"],
            &["\n\t\r", "bang", "\n\n\n\n last line here!\r"],
        ];
        for strings in tests {
            let mut total_size = ZERO;
            let mut full_string = String::new();
            for s in *strings {
                total_size = total_size + Size::from(*s);
                full_string.push_str(s);
            }
            assert_eq!(total_size, Size::from(full_string.as_str()));
        }
    }

    #[test]
    fn end_of_written_text() {
        #[track_caller]
        fn check(start: (usize, usize), text: &str, end: (usize, usize)) {
            let start = Position::new(start.0, start.1);
            assert_eq!(start + Size::from(text), Position::new(end.0, end.1));
        }

        check((0, 0), "", (0, 0));
        check((3, 4), "abc", (3, 7));
        check((3, 4), "abc\n", (4, 0));
        check((3, 4), "abc\nde", (4, 2));
        check((0, 2), "a\n\nxyz", (2, 3));
    }
}
