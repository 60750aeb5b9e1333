//! Byte offset to line/column mapping.

use serde::{Deserialize, Serialize};

/// A position in a file. Both fields are zero-based byte offsets, so columns are
/// not Unicode-aware: a multi-byte character before the position counts once per byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: usize,
    #[serde(rename = "col")]
    pub column: usize,
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Byte offsets of every line start in a file.
///
/// `starts[0]` is always 0 and the table is strictly increasing. A line
/// terminator always opens a new line, so `"a\n"` has two lines: `"a"` and
/// the empty line after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    /// Builds the index in a single pass over `content`
    pub fn build(content: &str) -> Self {
        let mut starts = Vec::with_capacity(content.len() / 32 + 1);
        starts.push(0);
        starts.extend(
            content
                .bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { starts }
    }

    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    /// Byte offset of the first byte of `line`
    pub fn line_start(&self, line: usize) -> usize {
        self.starts[line]
    }

    pub fn starts(&self) -> &[usize] {
        &self.starts
    }

    /// Maps a byte offset to its line and column
    pub fn locate(&self, offset: usize) -> SourceLocation {
        // First start strictly greater than offset; the line before it contains offset
        let next = self.starts.partition_point(|&start| start <= offset);
        let line = next - 1;
        SourceLocation {
            line,
            column: offset - self.starts[line],
        }
    }
}
