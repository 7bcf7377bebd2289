use serde::{Deserialize, Serialize};

/// Source position, both coordinates 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

impl Default for Span {
    fn default() -> Self {
        Self { line: 1, col: 1 }
    }
}

impl Span {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }

    /// Position right after `text`, when `text` starts at `self`.
    pub fn advance(self, text: &str) -> Self {
        match text.rfind('\n') {
            Some(last) => Self {
                line: self.line + text.matches('\n').count(),
                col: text[last + 1..].chars().count() + 1,
            },
            None => Self {
                line: self.line,
                col: self.col + text.chars().count(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_within_a_line() {
        assert_eq!(Span::default().advance("let"), Span::new(1, 4));
    }

    #[test]
    fn resets_column_after_newlines() {
        assert_eq!(Span::new(2, 9).advance("  \n\n   "), Span::new(4, 4));
        assert_eq!(Span::new(1, 5).advance("// note\n"), Span::new(2, 1));
    }
}
