/// Byte offset into the source text a node was parsed from. The parser
/// annotates every node with one; the checker and verifier only carry it
/// through to diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Loc {
    pub offset: usize,
}

impl Loc {
    pub fn new(offset: usize) -> Self {
        Self { offset }
    }

    /// 1-based line and column of this location in `source`.
    pub fn line_col(&self, source: &str) -> (usize, usize) {
        let upto = &source[..self.offset.min(source.len())];
        let line = upto.matches('\n').count() + 1;
        let col = upto.chars().rev().take_while(|&c| c != '\n').count() + 1;
        (line, col)
    }

    /// Renders `line:col: message` followed by the offending source line and
    /// a caret under the column.
    pub fn render(&self, source: &str, message: &str) -> String {
        let (line, col) = self.line_col(source);
        let text = source.lines().nth(line - 1).unwrap_or("");
        format!("{line}:{col}: {message}\n{text}\n{caret:>col$}", caret = '^')
    }
}
