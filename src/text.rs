//! Indexed, line-addressable view over assembly source. Positions are plain
//! (line, column) values, 0-based internally and rendered 1-based, so spans
//! survive being copied across the parse/assemble boundary without borrowing
//! the source buffer.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pos {
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.col + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: Pos,
    pub end: Pos,
}

impl Span {
    pub fn on_line(line: u32, col_start: u32, col_end: u32) -> Self {
        Self {
            start: Pos { line, col: col_start },
            end: Pos { line, col: col_end },
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Diagnostics point at the start; the end is for tooling.
        write!(f, "{}", self.start)
    }
}

/// Owned source text with a prebuilt line index.
pub struct SourceText {
    text: String,
    // Byte offset of each line start, plus one past-the-end sentinel.
    line_starts: Vec<usize>,
}

impl SourceText {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        line_starts.push(text.len() + 1);
        Self { text, line_starts }
    }

    pub fn num_lines(&self) -> usize {
        self.line_starts.len() - 1
    }

    /// One physical line without its newline terminator.
    pub fn line(&self, idx: usize) -> &str {
        let start = self.line_starts[idx];
        let end = (self.line_starts[idx + 1] - 1).min(self.text.len());
        self.text[start..end].trim_end_matches('\r')
    }

    pub fn lines(&self) -> impl Iterator<Item = (usize, &str)> {
        (0..self.num_lines()).map(move |i| (i, self.line(i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_stable_and_newline_free() {
        let src = SourceText::new("one\ntwo\r\n\nlast");
        let got: Vec<_> = src.lines().map(|(_, l)| l).collect();
        assert_eq!(got, vec!["one", "two", "", "last"]);
    }

    #[test]
    fn positions_render_one_based() {
        let span = Span::on_line(0, 4, 7);
        assert_eq!(span.to_string(), "1:5");
    }

    #[test]
    fn empty_source_is_empty() {
        let src = SourceText::new("");
        assert_eq!(src.num_lines(), 1);
        assert_eq!(src.line(0), "");
    }
}
