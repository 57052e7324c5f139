use rustpython_ast::TextSize;
use std::collections::HashSet;

/// Comment marker that silences every detector on its line.
pub const PRAGMA: &str = "pragma: no review";

/// A utility struct to convert byte offsets to line numbers.
///
/// The parser works with byte offsets, findings are reported with 1-based lines.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Stores the byte index of the start of each line.
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Creates a new `LineIndex` by scanning the source code for newlines.
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, ch) in source.char_indices() {
            if ch == '\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// Converts a `TextSize` (byte offset) to a 1-indexed line number.
    pub fn line_index(&self, offset: TextSize) -> usize {
        self.line_of(offset.to_usize())
    }

    /// Converts a raw byte offset to a 1-indexed line number.
    pub fn line_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line + 1,
            Err(line) => line,
        }
    }

    /// Converts a byte offset to a 1-indexed `(line, column)` pair.
    ///
    /// The column counts characters, not bytes.
    pub fn line_col(&self, source: &str, offset: usize) -> (usize, usize) {
        let offset = offset.min(source.len());
        let line = self.line_of(offset);
        let start = self.line_starts[line - 1];
        let column = source
            .get(start..offset)
            .map_or(0, |prefix| prefix.chars().count());
        (line, column + 1)
    }

    /// Returns the text of a 1-indexed line without its line terminator.
    pub fn line_text<'s>(&self, source: &'s str, line: usize) -> Option<&'s str> {
        let start = *self.line_starts.get(line.checked_sub(1)?)?;
        let end = self
            .line_starts
            .get(line)
            .map_or(source.len(), |next| next - 1);
        source
            .get(start..end.max(start))
            .map(|text| text.trim_end_matches('\r'))
    }

    /// Number of lines in the indexed source (at least 1).
    pub fn line_count(&self, source: &str) -> usize {
        let count = self.line_starts.len();
        // A trailing newline opens an empty line that holds no code.
        if count > 1 && source.ends_with('\n') {
            count - 1
        } else {
            count
        }
    }
}

/// Detects lines with a `# pragma: no review` comment.
///
/// Returns a set of line numbers (1-indexed) on which detectors stay silent.
pub fn get_ignored_lines(source: &str) -> HashSet<usize> {
    source
        .lines()
        .enumerate()
        .filter(|(_, line)| line.contains(PRAGMA))
        .map(|(i, _)| i + 1)
        .collect()
}

/// Normalizes a raw docstring the way `inspect.cleandoc` does.
///
/// Tabs become spaces, the first line loses its leading whitespace, the common
/// indentation of the remaining lines is removed and blank lines at both ends
/// are dropped.
pub fn clean_docstring(raw: &str) -> String {
    let expanded = raw.replace('\t', "        ");
    let lines: Vec<&str> = expanded.lines().collect();
    let margin = lines
        .iter()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut cleaned: Vec<&str> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                line.trim_start()
            } else {
                line.get(margin..).unwrap_or("").trim_end()
            }
        })
        .collect();

    while cleaned.first().is_some_and(|line| line.trim().is_empty()) {
        cleaned.remove(0);
    }
    while cleaned.last().is_some_and(|line| line.trim().is_empty()) {
        cleaned.pop();
    }
    cleaned.join("\n")
}
