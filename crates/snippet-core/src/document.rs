//! The document collaborator.
//!
//! The snippet engine never owns text. It reads and edits a host document through
//! [`SnippetHost`] and learns about changes by polling event subscriptions. Hosts with their own
//! buffer implement the trait; [`TextBuffer`](crate::TextBuffer) is a ready-made implementation.

use crate::config::IndentSettings;
use crate::delta::TextDelta;
use crate::error::HostError;
use std::cmp::Ordering;
use std::ops::Range;
use std::sync::Arc;

/// Position coordinates (line and column numbers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    /// Zero-based logical line index.
    pub line: usize,
    /// Zero-based column in characters within the logical line.
    pub column: usize,
}

impl Position {
    /// Create a new logical position.
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.line
            .cmp(&other.line)
            .then_with(|| self.column.cmp(&other.column))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A selection in character offsets. `anchor == head` is a caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Selection {
    /// Fixed end of the selection.
    pub anchor: usize,
    /// Moving end of the selection (where the caret is drawn).
    pub head: usize,
}

impl Selection {
    /// A forward selection covering `start..end`.
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            anchor: start,
            head: end,
        }
    }

    /// An empty selection (caret) at `offset`.
    pub fn caret(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    /// Lower bound.
    pub fn start(&self) -> usize {
        self.anchor.min(self.head)
    }

    /// Upper bound.
    pub fn end(&self) -> usize {
        self.anchor.max(self.head)
    }

    /// The covered span.
    pub fn range(&self) -> Range<usize> {
        self.start()..self.end()
    }

    /// Returns `true` for a caret.
    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }
}

/// A replacement of `range` (pre-batch char offsets) by `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    /// Replaced span.
    pub range: Range<usize>,
    /// Replacement text (may be empty).
    pub text: String,
}

impl EditRequest {
    /// Replace `range` with `text`.
    pub fn replace(range: Range<usize>, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }

    /// Insert `text` at `offset`.
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self::replace(offset..offset, text)
    }

    /// Delete `range`.
    pub fn delete(range: Range<usize>) -> Self {
        Self::replace(range, String::new())
    }
}

/// How an edit batch is recorded in the host's undo history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoPolicy {
    /// Record a new undo step.
    Record,
    /// Join the most recent undo step, so both undo as a single unit.
    MergeWithPrevious,
}

/// Who caused an edit or selection change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOrigin {
    /// The user (typing, commands, other plugins).
    User,
    /// The snippet engine itself (insertion, mirroring, navigation).
    Snippet,
    /// Undo or redo restoring earlier text.
    History,
}

/// Direction of a history operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    /// An undo step was applied.
    Undo,
    /// A redo step was applied.
    Redo,
}

/// A change notification emitted by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentEvent {
    /// Text changed.
    Edited {
        /// The applied edits.
        delta: Arc<TextDelta>,
        /// Who caused them.
        origin: EditOrigin,
    },
    /// The selection set changed (explicitly or because edits moved it).
    SelectionChanged {
        /// New selections, primary first.
        selections: Vec<Selection>,
        /// Who caused the change.
        origin: EditOrigin,
    },
    /// Undo or redo is about to restore text. Emitted before the matching `Edited` event.
    History(HistoryKind),
    /// The whole buffer was swapped for new content.
    BufferReplaced,
    /// The document was detached from its editing context.
    Detached,
    /// The editing context was disposed.
    Disposed,
}

impl DocumentEvent {
    /// The subscription source this event is delivered to.
    pub fn source(&self) -> EventSource {
        match self {
            DocumentEvent::Edited { .. } => EventSource::Edits,
            DocumentEvent::SelectionChanged { .. } => EventSource::Selections,
            DocumentEvent::History(_) => EventSource::History,
            DocumentEvent::BufferReplaced | DocumentEvent::Detached | DocumentEvent::Disposed => {
                EventSource::Lifecycle
            }
        }
    }
}

/// Event stream a subscription listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventSource {
    /// [`DocumentEvent::Edited`].
    Edits,
    /// [`DocumentEvent::SelectionChanged`].
    Selections,
    /// [`DocumentEvent::History`].
    History,
    /// Buffer replacement, detach and disposal.
    Lifecycle,
}

impl EventSource {
    /// Every source, in the order a snippet session subscribes to them.
    pub const ALL: [EventSource; 4] = [
        EventSource::Edits,
        EventSource::Selections,
        EventSource::History,
        EventSource::Lifecycle,
    ];
}

/// Handle of a live subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

/// An event stamped with the host's emission sequence number.
#[derive(Debug, Clone, PartialEq)]
pub struct SequencedEvent {
    /// Monotonically increasing across all sources of one host.
    pub seq: u64,
    /// The event.
    pub event: DocumentEvent,
}

/// The host document, cursor and settings consumed by the snippet engine.
pub trait SnippetHost {
    /// Total character count.
    fn char_count(&self) -> usize;

    /// Total line count (a trailing newline starts a final empty line).
    fn line_count(&self) -> usize;

    /// Text of a line without its line break.
    fn line_text(&self, line: usize) -> Option<String>;

    /// Text of a char range; out-of-range bounds are clamped.
    fn slice(&self, range: Range<usize>) -> String;

    /// Char offset of a position, or `None` if the position is not addressable.
    fn position_to_offset(&self, position: Position) -> Option<usize>;

    /// Position of a char offset (clamped to the document end).
    fn offset_to_position(&self, offset: usize) -> Position;

    /// Indentation settings of the document.
    fn indent_settings(&self) -> IndentSettings;

    /// Apply non-overlapping edits, given in pre-batch coordinates, as one atomic operation.
    ///
    /// On success the returned delta lists the edits in application order and an
    /// [`DocumentEvent::Edited`] event is emitted.
    fn apply_edits(
        &mut self,
        edits: Vec<EditRequest>,
        undo: UndoPolicy,
        origin: EditOrigin,
    ) -> Result<TextDelta, HostError>;

    /// Current selections, primary first.
    fn selections(&self) -> Vec<Selection>;

    /// Replace the selection set; the first selection becomes primary.
    fn set_selections(&mut self, selections: Vec<Selection>, origin: EditOrigin);

    /// Primary caret offset.
    fn primary_cursor(&self) -> usize {
        self.selections().first().map_or(0, |selection| selection.head)
    }

    /// Start delivering events of `source` to a new subscription.
    fn subscribe(&mut self, source: EventSource) -> SubscriptionId;

    /// Drop a subscription. Returns `false` if it was not alive.
    fn unsubscribe(&mut self, id: SubscriptionId) -> bool;

    /// Take the events queued for a subscription, oldest first.
    fn poll_events(&mut self, id: SubscriptionId) -> Vec<SequencedEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_ordering() {
        assert!(Position::new(1, 0) > Position::new(0, 10));
        assert!(Position::new(2, 3) < Position::new(2, 4));
    }

    #[test]
    fn test_selection_bounds() {
        let selection = Selection {
            anchor: 9,
            head: 4,
        };
        assert_eq!(selection.range(), 4..9);
        assert!(!selection.is_empty());
        assert!(Selection::caret(3).is_empty());
    }

    #[test]
    fn test_event_sources() {
        assert_eq!(DocumentEvent::Disposed.source(), EventSource::Lifecycle);
        assert_eq!(
            DocumentEvent::History(HistoryKind::Undo).source(),
            EventSource::History
        );
    }
}
