//! Structured text change deltas.
//!
//! Every document edit observed by the snippet engine is described as an ordered list of
//! [`TextDeltaEdit`]s expressed in **character offsets** (Unicode scalar values). Tracked
//! placeholder ranges are mapped through these edits one by one, so no diffing of old/new text
//! is ever needed.

use std::ops::Range;

/// A single text edit expressed in character offsets.
///
/// Semantics:
/// - `start` is a character offset in the document **at the time this edit is applied**.
/// - The deleted range is defined by the length (in `char`s) of `deleted_text`.
/// - Edits inside a [`TextDelta`] must be applied **in order** to transform the "before" document
///   into the "after" document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDeltaEdit {
    /// Start character offset of the edit.
    pub start: usize,
    /// Exact deleted text (may be empty).
    pub deleted_text: String,
    /// Exact inserted text (may be empty).
    pub inserted_text: String,
}

impl TextDeltaEdit {
    /// Create an edit from its parts.
    pub fn new(
        start: usize,
        deleted_text: impl Into<String>,
        inserted_text: impl Into<String>,
    ) -> Self {
        Self {
            start,
            deleted_text: deleted_text.into(),
            inserted_text: inserted_text.into(),
        }
    }

    /// Length of `deleted_text` in characters.
    pub fn deleted_len(&self) -> usize {
        self.deleted_text.chars().count()
    }

    /// Length of `inserted_text` in characters.
    pub fn inserted_len(&self) -> usize {
        self.inserted_text.chars().count()
    }

    /// Exclusive end character offset in the pre-edit document.
    pub fn end(&self) -> usize {
        self.start.saturating_add(self.deleted_len())
    }

    /// The replaced span in pre-edit coordinates.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }

    /// Returns `true` for a pure insertion (nothing deleted).
    pub fn is_insertion(&self) -> bool {
        self.deleted_text.is_empty()
    }

    /// Map a single offset through this edit.
    ///
    /// Offsets inside the deleted span collapse to `start`. An offset sitting exactly at the edit
    /// point of a pure insertion stays put unless `after_insert` is set, in which case it moves
    /// past the inserted text.
    pub fn map_offset(&self, offset: usize, after_insert: bool) -> usize {
        let end = self.end();
        if offset < self.start {
            return offset;
        }
        if offset > end {
            return offset - self.deleted_len() + self.inserted_len();
        }
        if self.is_insertion() {
            return if after_insert {
                offset + self.inserted_len()
            } else {
                offset
            };
        }
        if offset == end {
            self.start + self.inserted_len()
        } else {
            self.start
        }
    }
}

/// A structured description of a document text change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDelta {
    /// Character count before applying `edits`.
    pub before_char_count: usize,
    /// Character count after applying `edits`.
    pub after_char_count: usize,
    /// Ordered list of edits that transforms the "before" document into the "after" document.
    pub edits: Vec<TextDeltaEdit>,
    /// If known, the undo group id associated with this change.
    pub undo_group_id: Option<usize>,
}

impl TextDelta {
    /// Returns `true` if this delta contains no edits.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Map an offset through every edit of this delta, in order.
    pub fn map_offset(&self, offset: usize, after_insert: bool) -> usize {
        self.edits
            .iter()
            .fold(offset, |offset, edit| edit.map_offset(offset, after_insert))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_offset_around_replacement() {
        let edit = TextDeltaEdit::new(4, "abc", "xy");

        assert_eq!(edit.map_offset(2, false), 2);
        assert_eq!(edit.map_offset(4, true), 4);
        assert_eq!(edit.map_offset(5, false), 4);
        assert_eq!(edit.map_offset(7, false), 6);
        assert_eq!(edit.map_offset(10, false), 9);
    }

    #[test]
    fn test_map_offset_at_insertion_point() {
        let edit = TextDeltaEdit::new(3, "", "hello");

        assert_eq!(edit.map_offset(3, false), 3);
        assert_eq!(edit.map_offset(3, true), 8);
        assert_eq!(edit.map_offset(4, false), 9);
    }

    #[test]
    fn test_delta_maps_sequentially() {
        let delta = TextDelta {
            before_char_count: 10,
            after_char_count: 12,
            edits: vec![TextDeltaEdit::new(8, "", "!"), TextDeltaEdit::new(0, "", ">")],
            undo_group_id: None,
        };

        assert_eq!(delta.map_offset(9, false), 11);
        assert_eq!(delta.map_offset(5, false), 6);
    }
}
