//! Mirror synchronizer.
//!
//! When a user edit lands inside an occurrence of a linked group, that occurrence becomes the
//! *source* and every sibling is rewritten to match it. The rewrite is a minimal diff against
//! each sibling (common prefix and suffix are kept), so the relative offset of the edit inside
//! the occurrence is preserved and unrelated characters are never touched.
//!
//! Several occurrences of one group may be edited between two syncs. They are mirrored only if
//! they ended up with the same text (typing into all occurrences at once); otherwise there is no
//! single source to copy from and [`reconcile`] reports the conflict.

use crate::delta::TextDelta;
use crate::document::{EditOrigin, EditRequest, SnippetHost, UndoPolicy};
use crate::error::HostError;
use crate::placeholders::{OccurrenceId, PlaceholderIndex};
use crate::text::{char_len, char_slice, common_affixes};
use crate::tracking::RangeTracker;
use std::collections::BTreeMap;
use tracing::trace;

/// Linked groups touched by the current event batch, with every occurrence edited in each, in
/// the order they were first edited.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MirrorQueue {
    dirty: BTreeMap<usize, Vec<OccurrenceId>>,
}

impl MirrorQueue {
    /// Record that `source`, an occurrence of `group`, was edited.
    pub fn mark(&mut self, group: usize, source: OccurrenceId) {
        let sources = self.dirty.entry(group).or_default();
        if !sources.contains(&source) {
            sources.push(source);
        }
    }

    /// Returns `true` if nothing needs mirroring.
    pub fn is_empty(&self) -> bool {
        self.dirty.is_empty()
    }

    /// Take the queued groups in navigation order.
    pub fn drain(&mut self) -> Vec<(usize, Vec<OccurrenceId>)> {
        std::mem::take(&mut self.dirty).into_iter().collect()
    }
}

/// Pick the occurrence to mirror from when `sources` of one group were edited in the same batch.
///
/// Returns `None` if the edited occurrences now hold different text.
pub fn reconcile<H: SnippetHost + ?Sized>(
    host: &H,
    tracker: &RangeTracker,
    sources: &[OccurrenceId],
) -> Option<OccurrenceId> {
    let (&last, rest) = sources.split_last()?;
    let text = host.slice(tracker.range(last));
    rest.iter()
        .all(|source| host.slice(tracker.range(*source)) == text)
        .then_some(last)
}

/// Edits that make every sibling of `source` in `group` equal to it, in ascending document
/// order. When two edits would collide the later one is kept.
pub fn plan<H: SnippetHost + ?Sized>(
    host: &H,
    index: &PlaceholderIndex,
    tracker: &RangeTracker,
    group: usize,
    source: OccurrenceId,
) -> Vec<EditRequest> {
    let Some(group) = index.group(group) else {
        return Vec::new();
    };
    let source_text = host.slice(tracker.range(source));
    let source_len = char_len(&source_text);

    let mut edits: Vec<EditRequest> = Vec::new();
    for sibling in group.occurrences.iter().filter(|o| **o != source) {
        let range = tracker.range(*sibling);
        let text = host.slice(range.clone());
        if text == source_text {
            continue;
        }

        let (prefix, suffix) = common_affixes(&text, &source_text);
        let edit = EditRequest::replace(
            range.start + prefix..range.end - suffix,
            char_slice(&source_text, prefix, source_len - suffix),
        );

        // Later occurrences take precedence over earlier ones they collide with.
        while edits.last().is_some_and(|last| collides(last, &edit)) {
            edits.pop();
        }
        edits.push(edit);
    }
    edits
}

fn collides(earlier: &EditRequest, later: &EditRequest) -> bool {
    later.range.start < earlier.range.end
        || (later.range.start == earlier.range.start && earlier.range.is_empty())
}

/// Mirror `source` into the rest of its group and map the tracked ranges through the result.
///
/// The edits join the undo step of the edit that triggered them, so undo reverts both at once.
pub fn propagate<H: SnippetHost + ?Sized>(
    host: &mut H,
    index: &PlaceholderIndex,
    tracker: &mut RangeTracker,
    group: usize,
    source: OccurrenceId,
) -> Result<Option<TextDelta>, HostError> {
    let edits = plan(&*host, index, tracker, group, source);
    if edits.is_empty() {
        return Ok(None);
    }

    trace!(group, source = source.0, edits = edits.len(), "mirroring placeholder");
    let delta = host.apply_edits(edits, UndoPolicy::MergeWithPrevious, EditOrigin::Snippet)?;

    let siblings: Vec<OccurrenceId> = index
        .group(group)
        .map(|g| g.occurrences.iter().copied().filter(|o| *o != source).collect())
        .unwrap_or_default();
    for edit in &delta.edits {
        tracker.track(edit, &siblings);
    }
    Ok(Some(delta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::TextBuffer;
    use crate::template::Template;
    use pretty_assertions::assert_eq;

    fn linked() -> (PlaceholderIndex, RangeTracker) {
        // "ab = ab + ab"
        let index = PlaceholderIndex::build(&Template::parse("{{x}} = {{x}} + {{x}}").unwrap());
        let tracker = RangeTracker::new(vec![0..2, 5..7, 10..12, 12..12], 0..12);
        (index, tracker)
    }

    #[test]
    fn test_plan_keeps_common_affixes() {
        let (index, mut tracker) = linked();
        let mut host = TextBuffer::new("ab = ab + ab");
        host.replace_range(1..1, "Z").unwrap();
        tracker.track(&crate::delta::TextDeltaEdit::new(1, "", "Z"), &[]);

        let edits = plan(&host, &index, &tracker, 0, OccurrenceId(0));
        assert_eq!(
            edits,
            vec![EditRequest::insert(7, "Z"), EditRequest::insert(12, "Z")]
        );
    }

    #[test]
    fn test_propagate_updates_siblings_and_ranges() {
        let (index, mut tracker) = linked();
        let mut host = TextBuffer::new("ab = ab + ab");
        host.replace_range(5..7, "value").unwrap();
        tracker.track(&crate::delta::TextDeltaEdit::new(5, "ab", "value"), &[]);

        let delta = propagate(&mut host, &index, &mut tracker, 0, OccurrenceId(1)).unwrap();
        assert!(delta.is_some());
        assert_eq!(host.text(), "value = value + value");
        assert_eq!(tracker.ranges(), &[0..5, 8..13, 16..21, 21..21]);

        // Mirrored edits undo together with the edit that caused them.
        assert!(host.undo());
        assert_eq!(host.text(), "ab = ab + ab");
    }

    #[test]
    fn test_propagate_without_difference_is_noop() {
        let (index, mut tracker) = linked();
        let mut host = TextBuffer::new("ab = ab + ab");
        let before = host.version();

        let delta = propagate(&mut host, &index, &mut tracker, 0, OccurrenceId(0)).unwrap();
        assert_eq!(delta, None);
        assert_eq!(host.version(), before);
    }

    #[test]
    fn test_queue_collects_distinct_sources() {
        let mut queue = MirrorQueue::default();
        queue.mark(1, OccurrenceId(2));
        queue.mark(0, OccurrenceId(0));
        queue.mark(1, OccurrenceId(4));
        queue.mark(1, OccurrenceId(2));
        assert_eq!(
            queue.drain(),
            vec![
                (0, vec![OccurrenceId(0)]),
                (1, vec![OccurrenceId(2), OccurrenceId(4)])
            ]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_reconcile_sources() {
        let (_, tracker) = linked();

        let host = TextBuffer::new("ab = ab + cd");
        let sources = [OccurrenceId(0), OccurrenceId(1)];
        assert_eq!(reconcile(&host, &tracker, &sources), Some(OccurrenceId(1)));
        assert_eq!(reconcile(&host, &tracker, &[OccurrenceId(2)]), Some(OccurrenceId(2)));

        let sources = [OccurrenceId(1), OccurrenceId(2)];
        assert_eq!(reconcile(&host, &tracker, &sources), None);
    }
}
