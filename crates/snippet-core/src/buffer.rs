//! Reference in-memory host document.
//!
//! [`TextBuffer`] implements [`SnippetHost`] on top of a [`ropey::Rope`], with multi-selection
//! editing, grouped undo/redo and event subscriptions. Embedders that already have a document
//! model implement the trait themselves; the buffer is also what the test-suite drives.
//!
//! # Example
//!
//! ```rust
//! use snippet_core::{Selection, SnippetHost, TextBuffer};
//!
//! let mut buffer = TextBuffer::new("fn main() {}\n");
//! buffer.set_cursor(11);
//! buffer.insert_text("\n    ").unwrap();
//! assert_eq!(buffer.text(), "fn main() {\n    }\n");
//! assert_eq!(buffer.selections(), vec![Selection::caret(16)]);
//!
//! buffer.undo();
//! assert_eq!(buffer.text(), "fn main() {}\n");
//! ```

use crate::config::IndentSettings;
use crate::delta::{TextDelta, TextDeltaEdit};
use crate::document::{
    DocumentEvent, EditOrigin, EditRequest, EventSource, HistoryKind, Position, Selection,
    SequencedEvent, SnippetHost, SubscriptionId, UndoPolicy,
};
use crate::error::HostError;
use crate::text::char_len;
use ropey::Rope;
use std::collections::{BTreeMap, VecDeque};
use std::ops::Range;
use std::sync::Arc;
use tracing::trace;

#[derive(Debug, Clone)]
struct AppliedEdit {
    start_before: usize,
    start_after: usize,
    deleted_text: String,
    inserted_text: String,
}

impl AppliedEdit {
    fn deleted_len(&self) -> usize {
        char_len(&self.deleted_text)
    }

    fn inserted_len(&self) -> usize {
        char_len(&self.inserted_text)
    }
}

#[derive(Debug, Clone)]
struct UndoStep {
    group_id: usize,
    edits: Vec<AppliedEdit>,
    before_selection: Vec<Selection>,
    after_selection: Vec<Selection>,
}

#[derive(Debug)]
struct UndoRedoManager {
    undo_stack: Vec<UndoStep>,
    redo_stack: Vec<UndoStep>,
    max_undo: usize,
    next_group_id: usize,
}

impl UndoRedoManager {
    fn new(max_undo: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_undo,
            next_group_id: 0,
        }
    }

    fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    fn push_step(&mut self, mut step: UndoStep, policy: UndoPolicy) -> usize {
        self.redo_stack.clear();

        let merge_into = match policy {
            UndoPolicy::MergeWithPrevious => self.undo_stack.last().map(|s| s.group_id),
            UndoPolicy::Record => None,
        };

        step.group_id = match merge_into {
            Some(group_id) => group_id,
            None => {
                let group_id = self.next_group_id;
                self.next_group_id = self.next_group_id.wrapping_add(1);
                group_id
            }
        };

        if merge_into.is_none() && self.undo_stack.len() >= self.max_undo {
            let oldest = self.undo_stack[0].group_id;
            self.undo_stack.retain(|s| s.group_id != oldest);
        }

        let group_id = step.group_id;
        self.undo_stack.push(step);
        group_id
    }

    fn pop_group(stack: &mut Vec<UndoStep>) -> Option<Vec<UndoStep>> {
        let last_group_id = stack.last().map(|s| s.group_id)?;
        let mut steps = Vec::new();
        while stack.last().is_some_and(|s| s.group_id == last_group_id) {
            steps.extend(stack.pop());
        }
        Some(steps)
    }
}

#[derive(Debug)]
struct Subscription {
    source: EventSource,
    queue: VecDeque<SequencedEvent>,
}

/// In-memory document implementing [`SnippetHost`].
#[derive(Debug)]
pub struct TextBuffer {
    rope: Rope,
    selections: Vec<Selection>,
    indent: IndentSettings,
    undo_redo: UndoRedoManager,
    subscriptions: BTreeMap<SubscriptionId, Subscription>,
    next_subscription: u64,
    next_seq: u64,
    version: u64,
    attached: bool,
}

impl TextBuffer {
    /// Create a buffer with the caret at the start of the document.
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            selections: vec![Selection::caret(0)],
            indent: IndentSettings::default(),
            undo_redo: UndoRedoManager::new(1000),
            subscriptions: BTreeMap::new(),
            next_subscription: 0,
            next_seq: 0,
            version: 0,
            attached: true,
        }
    }

    /// Use the given indentation settings.
    pub fn with_indent_settings(mut self, indent: IndentSettings) -> Self {
        self.indent = indent;
        self
    }

    /// Full document text.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Incremented on every text change.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns `false` after [`detach`](Self::detach).
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Collapse the selection set to a single caret.
    pub fn set_cursor(&mut self, offset: usize) {
        let offset = offset.min(self.rope.len_chars());
        self.set_selections(vec![Selection::caret(offset)], EditOrigin::User);
    }

    /// Type or paste `text` at every selection, replacing selected text.
    pub fn insert_text(&mut self, text: &str) -> Result<(), HostError> {
        let requests = self
            .selections
            .iter()
            .map(|selection| EditRequest::replace(selection.range(), text))
            .collect();
        self.commit(requests, UndoPolicy::Record, EditOrigin::User, true)
            .map(|_| ())
    }

    /// Delete the selected text, or the character before each caret.
    pub fn backspace(&mut self) -> Result<(), HostError> {
        let requests: Vec<EditRequest> = self
            .selections
            .iter()
            .filter_map(|selection| {
                if !selection.is_empty() {
                    Some(EditRequest::delete(selection.range()))
                } else if selection.head > 0 {
                    Some(EditRequest::delete(selection.head - 1..selection.head))
                } else {
                    None
                }
            })
            .collect();
        if requests.is_empty() {
            return Ok(());
        }
        self.commit(requests, UndoPolicy::Record, EditOrigin::User, true)
            .map(|_| ())
    }

    /// Replace a char range with `text` as a user edit.
    pub fn replace_range(&mut self, range: Range<usize>, text: &str) -> Result<(), HostError> {
        self.commit(
            vec![EditRequest::replace(range, text)],
            UndoPolicy::Record,
            EditOrigin::User,
            false,
        )
        .map(|_| ())
    }

    /// Delete `count` whole lines starting at `first`.
    pub fn delete_lines(&mut self, first: usize, count: usize) -> Result<(), HostError> {
        let line_count = self.rope.len_lines();
        if count == 0 || first >= line_count {
            return Err(HostError::InvalidRange {
                start: first,
                end: first + count,
            });
        }

        let last = first + count;
        let range = if last < line_count {
            self.rope.line_to_char(first)..self.rope.line_to_char(last)
        } else if first > 0 {
            // Removing the tail: take the line break that precedes it.
            self.rope.line_to_char(first) - 1..self.rope.len_chars()
        } else {
            0..self.rope.len_chars()
        };
        self.replace_range(range, "")
    }

    /// Insert `lines` (without a trailing line break) as new lines before line `before`.
    ///
    /// `before == line_count()` appends after the last line.
    pub fn insert_lines(&mut self, before: usize, lines: &str) -> Result<(), HostError> {
        let line_count = self.rope.len_lines();
        if before > line_count {
            return Err(HostError::InvalidRange {
                start: before,
                end: before,
            });
        }

        if before == line_count {
            let end = self.rope.len_chars();
            self.replace_range(end..end, &format!("\n{lines}"))
        } else {
            let start = self.rope.line_to_char(before);
            self.replace_range(start..start, &format!("{lines}\n"))
        }
    }

    /// Undo the most recent undo group. Returns `false` if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(steps) = UndoRedoManager::pop_group(&mut self.undo_redo.undo_stack) else {
            return false;
        };

        self.emit(DocumentEvent::History(HistoryKind::Undo));
        let before_char_count = self.rope.len_chars();
        let mut delta_edits = Vec::new();
        let mut selection = self.selections.clone();

        // `steps` is newest first.
        for step in &steps {
            let mut inverse: Vec<&AppliedEdit> = step.edits.iter().collect();
            inverse.sort_by_key(|edit| std::cmp::Reverse(edit.start_after));
            for edit in inverse {
                let end = edit.start_after + edit.inserted_len();
                self.rope.remove(edit.start_after..end);
                self.rope.insert(edit.start_after, &edit.deleted_text);
                delta_edits.push(TextDeltaEdit::new(
                    edit.start_after,
                    edit.inserted_text.clone(),
                    edit.deleted_text.clone(),
                ));
            }
            selection = step.before_selection.clone();
        }

        let group_id = steps.first().map(|s| s.group_id);
        for step in steps {
            self.undo_redo.redo_stack.push(step);
        }

        self.finish_history(before_char_count, delta_edits, group_id, selection);
        true
    }

    /// Redo the most recently undone group. Returns `false` if there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(steps) = UndoRedoManager::pop_group(&mut self.undo_redo.redo_stack) else {
            return false;
        };

        self.emit(DocumentEvent::History(HistoryKind::Redo));
        let before_char_count = self.rope.len_chars();
        let mut delta_edits = Vec::new();
        let mut selection = self.selections.clone();

        // `steps` is oldest first.
        for step in &steps {
            let mut forward: Vec<&AppliedEdit> = step.edits.iter().collect();
            forward.sort_by_key(|edit| std::cmp::Reverse(edit.start_before));
            for edit in forward {
                let end = edit.start_before + edit.deleted_len();
                self.rope.remove(edit.start_before..end);
                self.rope.insert(edit.start_before, &edit.inserted_text);
                delta_edits.push(TextDeltaEdit::new(
                    edit.start_before,
                    edit.deleted_text.clone(),
                    edit.inserted_text.clone(),
                ));
            }
            selection = step.after_selection.clone();
        }

        let group_id = steps.first().map(|s| s.group_id);
        for step in steps {
            self.undo_redo.undo_stack.push(step);
        }

        self.finish_history(before_char_count, delta_edits, group_id, selection);
        true
    }

    /// Swap the whole content. History is cleared.
    pub fn replace_buffer(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        self.selections = vec![Selection::caret(0)];
        self.undo_redo.clear();
        self.version += 1;
        self.emit(DocumentEvent::BufferReplaced);
    }

    /// Detach the document from its editing context. Later edits fail.
    pub fn detach(&mut self) {
        self.attached = false;
        self.emit(DocumentEvent::Detached);
    }

    /// Announce that the owning editing context is going away.
    pub fn dispose(&mut self) {
        self.emit(DocumentEvent::Disposed);
    }

    fn finish_history(
        &mut self,
        before_char_count: usize,
        edits: Vec<TextDeltaEdit>,
        undo_group_id: Option<usize>,
        selection: Vec<Selection>,
    ) {
        self.version += 1;
        let delta = TextDelta {
            before_char_count,
            after_char_count: self.rope.len_chars(),
            edits,
            undo_group_id,
        };
        self.emit(DocumentEvent::Edited {
            delta: Arc::new(delta),
            origin: EditOrigin::History,
        });
        self.set_selections(selection, EditOrigin::History);
    }

    fn commit(
        &mut self,
        mut requests: Vec<EditRequest>,
        undo: UndoPolicy,
        origin: EditOrigin,
        collapse_selections: bool,
    ) -> Result<TextDelta, HostError> {
        if !self.attached {
            return Err(HostError::Detached);
        }

        let char_count = self.rope.len_chars();
        requests.sort_by_key(|r| (r.range.start, r.range.end));
        for request in &requests {
            if request.range.start > request.range.end || request.range.end > char_count {
                return Err(HostError::InvalidRange {
                    start: request.range.start,
                    end: request.range.end,
                });
            }
        }
        for pair in requests.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.range.start < prev.range.end
                || (next.range.start == prev.range.start && prev.range.is_empty())
            {
                return Err(HostError::OverlappingEdits);
            }
        }

        // Final offsets: each edit moves by the net length change of the edits before it.
        let mut applied = Vec::with_capacity(requests.len());
        let mut shift: isize = 0;
        for request in &requests {
            let deleted_text = self.rope.slice(request.range.clone()).to_string();
            let start_after = request.range.start.saturating_add_signed(shift);
            shift += char_len(&request.text) as isize - request.range.len() as isize;
            applied.push(AppliedEdit {
                start_before: request.range.start,
                start_after,
                deleted_text,
                inserted_text: request.text.clone(),
            });
        }

        let before_selection = self.selections.clone();
        let mut delta_edits = Vec::with_capacity(applied.len());
        for edit in applied.iter().rev() {
            let end = edit.start_before + edit.deleted_len();
            self.rope.remove(edit.start_before..end);
            self.rope.insert(edit.start_before, &edit.inserted_text);
            delta_edits.push(TextDeltaEdit::new(
                edit.start_before,
                edit.deleted_text.clone(),
                edit.inserted_text.clone(),
            ));
        }

        let mut delta = TextDelta {
            before_char_count: char_count,
            after_char_count: self.rope.len_chars(),
            edits: delta_edits,
            undo_group_id: None,
        };

        let selections: Vec<Selection> = before_selection
            .iter()
            .map(|selection| {
                if collapse_selections {
                    Selection::caret(delta.map_offset(selection.end(), true))
                } else {
                    Selection {
                        anchor: delta.map_offset(selection.anchor, true),
                        head: delta.map_offset(selection.head, true),
                    }
                }
            })
            .collect();

        let step = UndoStep {
            group_id: 0,
            edits: applied,
            before_selection,
            after_selection: selections.clone(),
        };
        delta.undo_group_id = Some(self.undo_redo.push_step(step, undo));
        self.version += 1;

        trace!(
            edits = delta.edits.len(),
            version = self.version,
            ?origin,
            "buffer edit applied"
        );

        self.emit(DocumentEvent::Edited {
            delta: Arc::new(delta.clone()),
            origin,
        });
        self.set_selections(selections, origin);
        Ok(delta)
    }

    fn emit(&mut self, event: DocumentEvent) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let source = event.source();
        for subscription in self.subscriptions.values_mut() {
            if subscription.source == source {
                subscription.queue.push_back(SequencedEvent {
                    seq,
                    event: event.clone(),
                });
            }
        }
    }
}

impl SnippetHost for TextBuffer {
    fn char_count(&self) -> usize {
        self.rope.len_chars()
    }

    fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    fn line_text(&self, line: usize) -> Option<String> {
        if line >= self.rope.len_lines() {
            return None;
        }
        let mut text = self.rope.line(line).to_string();
        if text.ends_with('\n') {
            text.pop();
        }
        if text.ends_with('\r') {
            text.pop();
        }
        Some(text)
    }

    fn slice(&self, range: Range<usize>) -> String {
        let len = self.rope.len_chars();
        let end = range.end.min(len);
        let start = range.start.min(end);
        self.rope.slice(start..end).to_string()
    }

    fn position_to_offset(&self, position: Position) -> Option<usize> {
        let line = self.line_text(position.line)?;
        if position.column > char_len(&line) {
            return None;
        }
        Some(self.rope.line_to_char(position.line) + position.column)
    }

    fn offset_to_position(&self, offset: usize) -> Position {
        let offset = offset.min(self.rope.len_chars());
        let line = self.rope.char_to_line(offset);
        Position::new(line, offset - self.rope.line_to_char(line))
    }

    fn indent_settings(&self) -> IndentSettings {
        self.indent
    }

    fn apply_edits(
        &mut self,
        edits: Vec<EditRequest>,
        undo: UndoPolicy,
        origin: EditOrigin,
    ) -> Result<TextDelta, HostError> {
        self.commit(edits, undo, origin, false)
    }

    fn selections(&self) -> Vec<Selection> {
        self.selections.clone()
    }

    fn set_selections(&mut self, selections: Vec<Selection>, origin: EditOrigin) {
        let len = self.rope.len_chars();
        let mut selections: Vec<Selection> = selections
            .into_iter()
            .map(|s| Selection {
                anchor: s.anchor.min(len),
                head: s.head.min(len),
            })
            .collect();
        if selections.is_empty() {
            selections.push(Selection::caret(0));
        }
        if selections == self.selections {
            return;
        }
        self.selections = selections.clone();
        self.emit(DocumentEvent::SelectionChanged { selections, origin });
    }

    fn subscribe(&mut self, source: EventSource) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscriptions.insert(
            id,
            Subscription {
                source,
                queue: VecDeque::new(),
            },
        );
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.remove(&id).is_some()
    }

    fn poll_events(&mut self, id: SubscriptionId) -> Vec<SequencedEvent> {
        self.subscriptions
            .get_mut(&id)
            .map(|subscription| subscription.queue.drain(..).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_text_moves_caret() {
        let mut buffer = TextBuffer::new("Hello");
        buffer.set_cursor(5);
        buffer.insert_text(" World").unwrap();

        assert_eq!(buffer.text(), "Hello World");
        assert_eq!(buffer.selections(), vec![Selection::caret(11)]);
    }

    #[test]
    fn test_insert_text_replaces_every_selection() {
        let mut buffer = TextBuffer::new("a-b-c");
        buffer.set_selections(
            vec![Selection::new(0, 1), Selection::new(4, 5)],
            EditOrigin::User,
        );
        buffer.insert_text("xy").unwrap();

        assert_eq!(buffer.text(), "xy-b-xy");
        assert_eq!(
            buffer.selections(),
            vec![Selection::caret(2), Selection::caret(7)]
        );
    }

    #[test]
    fn test_batch_edits_are_one_undo_step() {
        let mut buffer = TextBuffer::new("one two three");
        let delta = buffer
            .apply_edits(
                vec![
                    EditRequest::replace(0..3, "1"),
                    EditRequest::replace(8..13, "3"),
                ],
                UndoPolicy::Record,
                EditOrigin::User,
            )
            .unwrap();

        assert_eq!(buffer.text(), "1 two 3");
        // Applied back to front so every start is valid when applied.
        assert_eq!(delta.edits[0].start, 8);
        assert_eq!(delta.edits[1].start, 0);

        assert!(buffer.undo());
        assert_eq!(buffer.text(), "one two three");
        assert!(buffer.redo());
        assert_eq!(buffer.text(), "1 two 3");
    }

    #[test]
    fn test_merge_with_previous_undoes_together() {
        let mut buffer = TextBuffer::new("ab");
        buffer.replace_range(0..0, "x").unwrap();
        buffer
            .apply_edits(
                vec![EditRequest::insert(3, "x")],
                UndoPolicy::MergeWithPrevious,
                EditOrigin::Snippet,
            )
            .unwrap();
        assert_eq!(buffer.text(), "xabx");

        assert!(buffer.undo());
        assert_eq!(buffer.text(), "ab");
        assert!(!buffer.undo());
    }

    #[test]
    fn test_overlapping_edits_rejected() {
        let mut buffer = TextBuffer::new("abcdef");
        let result = buffer.apply_edits(
            vec![
                EditRequest::replace(0..3, "x"),
                EditRequest::replace(2..4, "y"),
            ],
            UndoPolicy::Record,
            EditOrigin::User,
        );
        assert_eq!(result, Err(HostError::OverlappingEdits));
        assert_eq!(buffer.text(), "abcdef");
    }

    #[test]
    fn test_invalid_range_rejected() {
        let mut buffer = TextBuffer::new("abc");
        let result = buffer.replace_range(2..9, "x");
        assert_eq!(result, Err(HostError::InvalidRange { start: 2, end: 9 }));
    }

    #[test]
    fn test_line_helpers() {
        let mut buffer = TextBuffer::new("a\nb\nc");
        buffer.delete_lines(1, 1).unwrap();
        assert_eq!(buffer.text(), "a\nc");

        buffer.insert_lines(0, "top").unwrap();
        assert_eq!(buffer.text(), "top\na\nc");

        buffer.insert_lines(3, "bottom").unwrap();
        assert_eq!(buffer.text(), "top\na\nc\nbottom");

        buffer.delete_lines(3, 1).unwrap();
        assert_eq!(buffer.text(), "top\na\nc");
    }

    #[test]
    fn test_positions() {
        let buffer = TextBuffer::new("ab\ncde\n");
        assert_eq!(buffer.line_count(), 3);
        assert_eq!(buffer.position_to_offset(Position::new(1, 3)), Some(6));
        assert_eq!(buffer.position_to_offset(Position::new(1, 4)), None);
        assert_eq!(buffer.position_to_offset(Position::new(2, 0)), Some(7));
        assert_eq!(buffer.position_to_offset(Position::new(3, 0)), None);
        assert_eq!(buffer.offset_to_position(4), Position::new(1, 1));
    }

    #[test]
    fn test_events_reach_matching_subscriptions() {
        let mut buffer = TextBuffer::new("abc");
        let edits = buffer.subscribe(EventSource::Edits);
        let history = buffer.subscribe(EventSource::History);
        let lifecycle = buffer.subscribe(EventSource::Lifecycle);

        buffer.replace_range(0..1, "x").unwrap();
        buffer.undo();
        buffer.replace_buffer("new");

        let edit_events = buffer.poll_events(edits);
        assert_eq!(edit_events.len(), 2);
        assert!(matches!(
            edit_events[1].event,
            DocumentEvent::Edited {
                origin: EditOrigin::History,
                ..
            }
        ));

        let history_events = buffer.poll_events(history);
        assert_eq!(history_events.len(), 1);
        assert!(history_events[0].seq < edit_events[1].seq);

        let lifecycle_events = buffer.poll_events(lifecycle);
        assert_eq!(lifecycle_events[0].event, DocumentEvent::BufferReplaced);

        assert!(buffer.poll_events(edits).is_empty());
        assert!(buffer.unsubscribe(edits));
        assert!(!buffer.unsubscribe(edits));
        assert_eq!(buffer.subscriber_count(), 2);
    }

    #[test]
    fn test_detached_buffer_rejects_edits() {
        let mut buffer = TextBuffer::new("abc");
        buffer.detach();
        assert_eq!(buffer.insert_text("x"), Err(HostError::Detached));
        assert!(!buffer.is_attached());
    }
}
