//! Invalidation watchdog.
//!
//! Decides when an active session can no longer be trusted. Rules, by precedence:
//!
//! 1. The editing context was disposed, or the buffer was detached or replaced.
//! 2. Undo or redo restored earlier text.
//! 3. An edit touched text outside the snippet envelope (this covers inserting or deleting
//!    lines above or below the snippet).
//! 4. The primary cursor moved strictly outside the envelope.
//!
//! After mirroring, a session whose ranges are no longer ordered or whose linked occurrences
//! disagree is ill-formed and is invalidated as well.

use crate::delta::TextDeltaEdit;
use crate::document::{DocumentEvent, HistoryKind, SequencedEvent, Selection, SnippetHost};
use crate::placeholders::{OccurrenceId, PlaceholderIndex};
use crate::tracking::RangeTracker;
use std::fmt;

/// Why a session was invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidationReason {
    /// The owning editing context was disposed (or the controller itself).
    Disposed,
    /// The document was detached from its editing context.
    Detached,
    /// The whole buffer was replaced.
    BufferReplaced,
    /// An undo step was applied.
    Undo,
    /// A redo step was applied.
    Redo,
    /// An edit touched text outside the snippet envelope.
    EditOutsideEnvelope,
    /// The primary cursor left the snippet envelope.
    CursorOutsideEnvelope,
    /// Tracked ranges or linked occurrences became inconsistent.
    IllFormed,
    /// The host rejected a mirrored edit.
    EditFailed,
}

impl fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            InvalidationReason::Disposed => "disposed",
            InvalidationReason::Detached => "document detached",
            InvalidationReason::BufferReplaced => "buffer replaced",
            InvalidationReason::Undo => "undo",
            InvalidationReason::Redo => "redo",
            InvalidationReason::EditOutsideEnvelope => "edit outside snippet",
            InvalidationReason::CursorOutsideEnvelope => "cursor outside snippet",
            InvalidationReason::IllFormed => "snippet ranges inconsistent",
            InvalidationReason::EditFailed => "mirrored edit failed",
        };
        f.write_str(reason)
    }
}

/// Rules 1 and 2: lifecycle and history notifications anywhere in a batch invalidate before
/// any edit in it is looked at.
pub fn screen_batch(events: &[SequencedEvent]) -> Option<InvalidationReason> {
    let lifecycle = events.iter().find_map(|e| match e.event {
        DocumentEvent::Disposed => Some(InvalidationReason::Disposed),
        DocumentEvent::Detached => Some(InvalidationReason::Detached),
        DocumentEvent::BufferReplaced => Some(InvalidationReason::BufferReplaced),
        _ => None,
    });
    lifecycle.or_else(|| {
        events.iter().find_map(|e| match e.event {
            DocumentEvent::History(HistoryKind::Undo) => Some(InvalidationReason::Undo),
            DocumentEvent::History(HistoryKind::Redo) => Some(InvalidationReason::Redo),
            _ => None,
        })
    })
}

/// Rule 3, for one user edit and the occurrence that owns it.
pub fn check_edit(
    tracker: &RangeTracker,
    edit: &TextDeltaEdit,
    owner: Option<OccurrenceId>,
) -> Option<InvalidationReason> {
    tracker
        .is_outside_envelope(edit, owner)
        .then_some(InvalidationReason::EditOutsideEnvelope)
}

/// Rule 4.
pub fn check_selections(
    tracker: &RangeTracker,
    selections: &[Selection],
) -> Option<InvalidationReason> {
    let primary = selections.first()?;
    let envelope = tracker.envelope();
    (primary.head < envelope.start || primary.head > envelope.end)
        .then_some(InvalidationReason::CursorOutsideEnvelope)
}

/// Consistency check run after mirroring.
pub fn check_consistency<H: SnippetHost + ?Sized>(
    index: &PlaceholderIndex,
    tracker: &RangeTracker,
    host: &H,
) -> Option<InvalidationReason> {
    if !tracker.is_well_formed() || tracker.envelope().end > host.char_count() {
        return Some(InvalidationReason::IllFormed);
    }

    let diverged = index.groups().iter().filter(|g| g.is_linked()).any(|group| {
        let primary = host.slice(tracker.range(group.primary()));
        group.occurrences[1..]
            .iter()
            .any(|occurrence| host.slice(tracker.range(*occurrence)) != primary)
    });
    diverged.then_some(InvalidationReason::IllFormed)
}
