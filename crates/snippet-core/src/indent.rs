//! Indentation adapter.
//!
//! Templates are written without knowledge of where they end up. When a multi-line template is
//! inserted, every line after the first receives the indentation of the insertion line, and
//! literal tabs in the template follow the document's [`IndentSettings`]. The first line is left
//! alone: it continues whatever text already precedes the insertion column.

use crate::config::IndentSettings;
use crate::text::leading_whitespace;

/// The indentation a template inherits from the line it is inserted into.
///
/// This is the leading whitespace of `line`, cut at the insertion column so that inserting in
/// the middle of an indent does not inherit whitespace to the right of the cursor.
pub fn insertion_indent(line: &str, column: usize) -> String {
    leading_whitespace(line).chars().take(column).collect()
}

/// Streaming indentation adapter.
///
/// Text is pushed chunk by chunk so callers can record character offsets between chunks (the
/// insertion engine uses this to locate placeholders in the adjusted text).
#[derive(Debug, Clone)]
pub struct IndentAdapter {
    base_indent: String,
    tab: String,
    text: String,
    char_len: usize,
}

impl IndentAdapter {
    /// Create an adapter for text inserted on a line indented with `base_indent`.
    pub fn new(base_indent: &str, settings: &IndentSettings) -> Self {
        Self {
            base_indent: base_indent.to_string(),
            tab: settings.unit(),
            text: String::new(),
            char_len: 0,
        }
    }

    /// Append a chunk of template text.
    pub fn push(&mut self, chunk: &str) {
        for ch in chunk.chars() {
            match ch {
                '\n' => {
                    self.push_raw("\n");
                    let indent = std::mem::take(&mut self.base_indent);
                    self.push_raw(&indent);
                    self.base_indent = indent;
                }
                '\t' => {
                    let tab = std::mem::take(&mut self.tab);
                    self.push_raw(&tab);
                    self.tab = tab;
                }
                _ => {
                    self.text.push(ch);
                    self.char_len += 1;
                }
            }
        }
    }

    fn push_raw(&mut self, text: &str) {
        self.text.push_str(text);
        self.char_len += text.chars().count();
    }

    /// Length of the adjusted text so far, in characters.
    pub fn char_len(&self) -> usize {
        self.char_len
    }

    /// The adjusted text.
    pub fn finish(self) -> String {
        self.text
    }
}

/// Re-indent a rendered multi-line text for insertion on a line indented with `base_indent`.
pub fn adjust_indentation(text: &str, base_indent: &str, settings: &IndentSettings) -> String {
    let mut adapter = IndentAdapter::new(base_indent, settings);
    adapter.push(text);
    adapter.finish()
}
