//! Insertion engine and session state.
//!
//! Inserting a snippet goes through two phases so that a failure never leaves a half-done
//! edit behind:
//!
//! 1. [`prepare`] validates the insertion point, parses and renders the template. It only
//!    reads from the host.
//! 2. [`insert`] applies the rendered text as one atomic edit and, if the template has tab
//!    stops, creates the [`SnippetSession`] that tracks them.

use crate::config::IndentSettings;
use crate::document::{
    EditOrigin, EditRequest, EventSource, Position, Selection, SequencedEvent, SnippetHost,
    SubscriptionId, UndoPolicy,
};
use crate::error::SnippetError;
use crate::indent::{IndentAdapter, insertion_indent};
use crate::navigation::{self, Navigator};
use crate::placeholders::{OccurrenceId, PlaceholderIndex};
use crate::template::{Segment, Template};
use crate::text::char_len;
use crate::tracking::RangeTracker;
use std::ops::Range;

/// A template rendered for one insertion point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedSnippet {
    /// Indentation-adjusted text.
    pub text: String,
    /// Char range of every occurrence within `text`, indexed by [`OccurrenceId`].
    pub occurrences: Vec<Range<usize>>,
}

impl RenderedSnippet {
    /// Length of the rendered text in characters.
    pub fn char_len(&self) -> usize {
        char_len(&self.text)
    }
}

/// Render `template` for a line indented with `base_indent`.
///
/// Placeholders show their identifier as default text. A synthesized final placeholder is an
/// empty range at the end.
pub fn render(
    template: &Template,
    index: &PlaceholderIndex,
    base_indent: &str,
    settings: &IndentSettings,
) -> RenderedSnippet {
    let mut adapter = IndentAdapter::new(base_indent, settings);
    let mut occurrences = Vec::with_capacity(index.occurrence_count());

    for segment in template.segments() {
        match segment {
            Segment::Text(text) => adapter.push(text),
            Segment::Placeholder(name) => {
                let start = adapter.char_len();
                adapter.push(name);
                occurrences.push(start..adapter.char_len());
            }
        }
    }
    if index.has_implicit_final() {
        let end = adapter.char_len();
        occurrences.push(end..end);
    }

    RenderedSnippet {
        text: adapter.finish(),
        occurrences,
    }
}

/// A validated, rendered insertion that has not touched the document yet.
#[derive(Debug, Clone)]
pub struct PreparedInsertion {
    index: PlaceholderIndex,
    rendered: RenderedSnippet,
    replace: Range<usize>,
}

impl PreparedInsertion {
    /// The span that will be replaced by the rendered text.
    pub fn replaced_range(&self) -> Range<usize> {
        self.replace.clone()
    }
}

/// Validate the insertion point and render `template` against the host's current content.
pub fn prepare<H: SnippetHost + ?Sized>(
    host: &H,
    template: &str,
    position: Position,
    overwrite_before: usize,
    overwrite_after: usize,
    settings: &IndentSettings,
) -> Result<PreparedInsertion, SnippetError> {
    let invalid = SnippetError::InvalidPosition {
        line: position.line,
        column: position.column,
    };
    let offset = host
        .position_to_offset(position)
        .ok_or_else(|| invalid.clone())?;
    let start = offset
        .checked_sub(overwrite_before)
        .ok_or_else(|| invalid.clone())?;
    let end = offset
        .checked_add(overwrite_after)
        .filter(|end| *end <= host.char_count())
        .ok_or(invalid)?;

    let template = Template::parse(template)?;
    let index = PlaceholderIndex::build(&template);

    // The overwritten span may reach back over line breaks; indent like the line it starts on.
    let anchor = host.offset_to_position(start);
    let line = host.line_text(anchor.line).unwrap_or_default();
    let base_indent = insertion_indent(&line, anchor.column);
    let rendered = render(&template, &index, &base_indent, settings);

    Ok(PreparedInsertion {
        index,
        rendered,
        replace: start..end,
    })
}

/// Apply a prepared insertion.
///
/// Returns the new session, or `None` when the template has no tab stop besides the final
/// placeholder; the caret is then left at the final placeholder.
pub fn insert<H: SnippetHost + ?Sized>(
    host: &mut H,
    prepared: PreparedInsertion,
    select_all: bool,
) -> Result<Option<SnippetSession>, SnippetError> {
    let PreparedInsertion {
        index,
        rendered,
        replace,
    } = prepared;

    let base = replace.start;
    let len = rendered.char_len();
    host.apply_edits(
        vec![EditRequest::replace(replace, rendered.text)],
        UndoPolicy::Record,
        EditOrigin::Snippet,
    )?;

    let ranges: Vec<Range<usize>> = rendered
        .occurrences
        .iter()
        .map(|range| base + range.start..base + range.end)
        .collect();
    let tracker = RangeTracker::new(ranges, base..base + len);

    if index.only_final() {
        let selection = navigation::accept_selection(&index, &tracker);
        host.set_selections(vec![selection], EditOrigin::Snippet);
        return Ok(None);
    }

    let subscriptions = EventSource::ALL
        .iter()
        .map(|source| host.subscribe(*source))
        .collect();
    let session = SnippetSession {
        navigator: Navigator::new(index.group_count()),
        index,
        tracker,
        select_all,
        subscriptions,
    };
    session.select_current(host);
    Ok(Some(session))
}

/// State of an active snippet: placeholder groups, their tracked ranges, the current group and
/// the host subscriptions that feed it.
#[derive(Debug)]
pub struct SnippetSession {
    index: PlaceholderIndex,
    tracker: RangeTracker,
    navigator: Navigator,
    select_all: bool,
    subscriptions: Vec<SubscriptionId>,
}

impl SnippetSession {
    /// Placeholder groups in navigation order.
    pub fn index(&self) -> &PlaceholderIndex {
        &self.index
    }

    /// Tracked ranges and envelope.
    pub fn tracker(&self) -> &RangeTracker {
        &self.tracker
    }

    pub(crate) fn parts_mut(&mut self) -> (&PlaceholderIndex, &mut RangeTracker) {
        (&self.index, &mut self.tracker)
    }

    /// Span of the whole inserted snippet.
    pub fn envelope(&self) -> Range<usize> {
        self.tracker.envelope()
    }

    /// Navigation index of the current group.
    pub fn current_group(&self) -> usize {
        self.navigator.current()
    }

    /// Current ranges of every occurrence of `group`, in document order.
    pub fn group_ranges(&self, group: usize) -> Vec<Range<usize>> {
        self.index
            .group(group)
            .map(|g| {
                g.occurrences
                    .iter()
                    .map(|occurrence| self.tracker.range(*occurrence))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Occurrences of the current group.
    pub fn current_occurrences(&self) -> Vec<OccurrenceId> {
        self.index
            .group(self.navigator.current())
            .map(|g| g.occurrences.clone())
            .unwrap_or_default()
    }

    /// Whether visiting a group selects all of its occurrences.
    pub fn selects_all_occurrences(&self) -> bool {
        self.select_all
    }

    /// Live subscriptions held by this session.
    pub fn subscriptions(&self) -> &[SubscriptionId] {
        &self.subscriptions
    }

    pub(crate) fn navigator_mut(&mut self) -> &mut Navigator {
        &mut self.navigator
    }

    /// Select the current group's occurrence(s).
    pub(crate) fn select_current<H: SnippetHost + ?Sized>(&self, host: &mut H) {
        let Some(group) = self.index.group(self.navigator.current()) else {
            return;
        };
        let selections = navigation::group_selections(group, &self.tracker, self.select_all);
        host.set_selections(selections, EditOrigin::Snippet);
    }

    /// Where accepting leaves the selection.
    pub(crate) fn accept_selection(&self) -> Selection {
        navigation::accept_selection(&self.index, &self.tracker)
    }

    /// Where leaving puts the caret.
    pub(crate) fn leave_selection(&self) -> Option<Selection> {
        navigation::leave_selection(&self.index, &self.tracker, &self.navigator)
    }

    /// Everything queued on the session's subscriptions, in emission order.
    pub(crate) fn drain_events<H: SnippetHost + ?Sized>(
        &self,
        host: &mut H,
    ) -> Vec<SequencedEvent> {
        let mut events: Vec<SequencedEvent> = self
            .subscriptions
            .iter()
            .flat_map(|id| host.poll_events(*id))
            .collect();
        events.sort_by_key(|e| e.seq);
        events
    }

    /// Drop every subscription. Safe to call more than once.
    pub(crate) fn release<H: SnippetHost + ?Sized>(&mut self, host: &mut H) {
        for id in self.subscriptions.drain(..) {
            host.unsubscribe(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::TextBuffer;
    use crate::error::TemplateErrorKind;
    use pretty_assertions::assert_eq;

    fn rendered(source: &str, indent: &str) -> RenderedSnippet {
        let template = Template::parse(source).unwrap();
        let index = PlaceholderIndex::build(&template);
        render(&template, &index, indent, &IndentSettings::tabs())
    }

    #[test]
    fn test_render_ranges() {
        let out = rendered("let {{name}} = {{value}};", "");
        assert_eq!(out.text, "let name = value;");
        assert_eq!(out.occurrences, vec![4..8, 11..16, 17..17]);
    }

    #[test]
    fn test_render_ranges_after_indentation() {
        let out = rendered("{\n\t{{body}}\n}{{}}", "  ");
        assert_eq!(out.text, "{\n  \tbody\n  }");
        assert_eq!(out.occurrences, vec![5..9, 13..13]);
    }

    #[test]
    fn test_prepare_rejects_bad_positions() {
        let host = TextBuffer::new("ab\ncd");
        let settings = IndentSettings::tabs();

        let err = prepare(&host, "x", Position::new(5, 0), 0, 0, &settings).unwrap_err();
        assert_eq!(err, SnippetError::InvalidPosition { line: 5, column: 0 });

        let err = prepare(&host, "x", Position::new(1, 1), 5, 0, &settings).unwrap_err();
        assert_eq!(err, SnippetError::InvalidPosition { line: 1, column: 1 });

        let err = prepare(&host, "x", Position::new(1, 1), 0, 2, &settings).unwrap_err();
        assert_eq!(err, SnippetError::InvalidPosition { line: 1, column: 1 });

        let prepared = prepare(&host, "x", Position::new(1, 1), 2, 1, &settings).unwrap();
        assert_eq!(prepared.replaced_range(), 2..5);
    }

    #[test]
    fn test_prepare_indents_like_line_where_overwrite_starts() {
        let host = TextBuffer::new("    a\nb");
        let prepared = prepare(
            &host,
            "{{x}}\nz",
            Position::new(1, 0),
            1,
            0,
            &IndentSettings::tabs(),
        )
        .unwrap();
        assert_eq!(prepared.replaced_range(), 5..6);
        assert_eq!(prepared.rendered.text, "x\n    z");
    }

    #[test]
    fn test_prepare_reports_malformed_template() {
        let host = TextBuffer::new("");
        let err = prepare(&host, "{{a", Position::new(0, 0), 0, 0, &IndentSettings::tabs())
            .unwrap_err();
        assert!(matches!(
            err,
            SnippetError::MalformedTemplate(e) if e.kind == TemplateErrorKind::UnclosedPlaceholder
        ));
    }

    #[test]
    fn test_insert_creates_session() {
        let mut host = TextBuffer::new("x = ;");
        let prepared = prepare(
            &host,
            "{{a}} + {{a}}",
            Position::new(0, 4),
            0,
            0,
            &IndentSettings::tabs(),
        )
        .unwrap();

        let session = insert(&mut host, prepared, true).unwrap().unwrap();
        assert_eq!(host.text(), "x = a + a;");
        assert_eq!(session.envelope(), 4..9);
        assert_eq!(session.group_ranges(0), vec![4..5, 8..9]);
        assert_eq!(session.subscriptions().len(), 4);
        assert_eq!(
            host.selections(),
            vec![Selection::new(4, 5), Selection::new(8, 9)]
        );
    }

    #[test]
    fn test_insert_plain_text_has_no_session() {
        let mut host = TextBuffer::new("ab");
        let prepared = prepare(
            &host,
            "X{{}}Y",
            Position::new(0, 1),
            0,
            0,
            &IndentSettings::tabs(),
        )
        .unwrap();

        assert!(insert(&mut host, prepared, false).unwrap().is_none());
        assert_eq!(host.text(), "aXYb");
        assert_eq!(host.selections(), vec![Selection::caret(2)]);
        assert_eq!(host.subscriber_count(), 0);
    }
}
