use serde::{Deserialize, Serialize};

use super::lines::LineIndex;

/// Lines of context kept above and below a match by default
pub const DEFAULT_CONTEXT_LINES: usize = 2;

/// The text around a match. `start` and `end` locate the match within `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Snippet {
    /// The matched slice of the snippet text.
    ///
    /// A match that runs into the file's final newline ends past the trimmed
    /// text; the slice is clamped to what the snippet holds.
    pub fn matched(&self) -> &str {
        let end = self.end.min(self.text.len());
        self.text.get(self.start.min(end)..end).unwrap_or("")
    }
}

/// Expands the match `range` into whole lines plus up to `context_before` lines
/// above and `context_after` lines below, clamped to the file.
pub fn build_snippet(
    content: &str,
    index: &LineIndex,
    range: (usize, usize),
    context_before: usize,
    context_after: usize,
) -> Snippet {
    let (start, end) = range;
    let last_line = index.line_count() - 1;

    let first = index.locate(start).line.saturating_sub(context_before);
    let last = index
        .locate(end)
        .line
        .saturating_add(context_after)
        .min(last_line);

    let window_start = index.line_start(first);
    let window_end = if last == last_line {
        content.len()
    } else {
        index.line_start(last + 1)
    };

    let mut text = &content[window_start..window_end];
    text = text.strip_suffix('\n').unwrap_or(text);

    Snippet {
        start: start - window_start,
        end: end - window_start,
        text: text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "l0\nl1\nl2\nl3 target\nl4\nl5\nl6\n";

    fn snippet_for(content: &str, needle: &str, before: usize, after: usize) -> Snippet {
        let index = LineIndex::build(content);
        let start = content.find(needle).unwrap();
        build_snippet(content, &index, (start, start + needle.len()), before, after)
    }

    #[test]
    fn test_window_in_middle() {
        let snippet = snippet_for(SAMPLE, "target", 2, 2);
        assert_eq!(snippet.text, "l1\nl2\nl3 target\nl4\nl5");
        assert_eq!(snippet.matched(), "target");
    }

    #[test]
    fn test_clamped_at_first_line() {
        let snippet = snippet_for(SAMPLE, "l0", 2, 2);
        assert_eq!(snippet.text, "l0\nl1\nl2");
        assert_eq!((snippet.start, snippet.end), (0, 2));
    }

    #[test]
    fn test_clamped_at_last_line() {
        let content = "a\nb\nc\nlast";
        let snippet = snippet_for(content, "last", 2, 2);
        assert_eq!(snippet.text, "b\nc\nlast");
        assert_eq!(snippet.matched(), "last");
    }

    #[test]
    fn test_trailing_newline_trimmed_once() {
        let snippet = snippet_for(SAMPLE, "l6", 2, 2);
        assert_eq!(snippet.text, "l4\nl5\nl6");

        let snippet = snippet_for("only\n", "only", 2, 2);
        assert_eq!(snippet.text, "only");

        let snippet = snippet_for("a\n\n", "a", 2, 2);
        assert_eq!(snippet.text, "a\n");

        let snippet = snippet_for("x\ny\n", "x", 0, 0);
        assert_eq!(snippet.text, "x");
    }

    #[test]
    fn test_match_ending_at_final_newline() {
        let content = "ab\n";
        let index = LineIndex::build(content);
        let snippet = build_snippet(content, &index, (1, 3), 2, 2);
        assert_eq!(snippet.text, "ab");
        assert_eq!((snippet.start, snippet.end), (1, 3));
        assert_eq!(snippet.matched(), "b");

        let snippet = build_snippet(content, &index, (3, 3), 0, 0);
        assert_eq!(snippet.matched(), "");
    }

    #[test]
    fn test_zero_context() {
        let snippet = snippet_for(SAMPLE, "target", 0, 0);
        assert_eq!(snippet.text, "l3 target");
        assert_eq!((snippet.start, snippet.end), (3, 9));
    }

    #[test]
    fn test_match_spanning_lines() {
        let content = "one\ntwo\nthree\nfour\nfive\n";
        let index = LineIndex::build(content);
        let start = content.find("two").unwrap();
        let end = content.find("three").unwrap() + "three".len();
        let snippet = build_snippet(content, &index, (start, end), 0, 0);
        assert_eq!(snippet.text, "two\nthree");
        assert_eq!(snippet.matched(), "two\nthree");
    }

    #[test]
    fn test_empty_match_at_end_of_file() {
        let content = "abc";
        let index = LineIndex::build(content);
        let snippet = build_snippet(content, &index, (3, 3), 2, 2);
        assert_eq!(snippet.text, "abc");
        assert_eq!((snippet.start, snippet.end), (3, 3));
    }

    #[test]
    fn test_window_never_leaves_file() {
        let content = "a\nb\nc";
        let index = LineIndex::build(content);
        for offset in 0..content.len() {
            let snippet = build_snippet(content, &index, (offset, offset + 1), 100, 100);
            assert_eq!(snippet.text, content);
            assert_eq!(snippet.start, offset);
        }
    }
}
