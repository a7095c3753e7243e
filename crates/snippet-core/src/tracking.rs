//! Tracked ranges.
//!
//! A session keeps one char range per placeholder occurrence plus the *envelope* (the span of
//! the whole inserted snippet) and maps all of them through every [`TextDeltaEdit`].
//!
//! Mapping rules:
//! - An edit is *owned* by an occurrence whose range contains it
//!   (`start <= edit.start && edit.end <= end`). Among several candidates (adjacent or empty
//!   ranges) a preferred occurrence wins, then the earliest one.
//! - The owner keeps its start and its end moves by the net length change, so typing at either
//!   edge of a placeholder (empty or not) extends it.
//! - Any other range sitting at the edit point stays on its side of the owner: ranges before the
//!   owner stay left of inserted text, ranges after it move right.
//! - Offsets inside a deleted span collapse to the start of the edit.
//! - The envelope grows with owned edits. An unowned insertion at an envelope edge lands
//!   outside of it.

use crate::delta::TextDeltaEdit;
use crate::placeholders::OccurrenceId;
use std::ops::Range;

/// Occurrence ranges and envelope of one snippet session, in char offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeTracker {
    ranges: Vec<Range<usize>>,
    envelope: Range<usize>,
}

impl RangeTracker {
    /// Track `ranges` (indexed by [`OccurrenceId`], in document order) inside `envelope`.
    pub fn new(ranges: Vec<Range<usize>>, envelope: Range<usize>) -> Self {
        Self { ranges, envelope }
    }

    /// Current range of an occurrence.
    pub fn range(&self, occurrence: OccurrenceId) -> Range<usize> {
        self.ranges[occurrence.0].clone()
    }

    /// All occurrence ranges, indexed by occurrence id.
    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    /// Current envelope.
    pub fn envelope(&self) -> Range<usize> {
        self.envelope.clone()
    }

    /// Find the occurrence that owns `edit`.
    ///
    /// `preferred` breaks ties when several ranges contain the edit (for example the end of one
    /// placeholder touching the start of the next).
    pub fn locate(
        &self,
        edit: &TextDeltaEdit,
        preferred: &[OccurrenceId],
    ) -> Option<OccurrenceId> {
        let (start, end) = (edit.start, edit.end());
        let mut candidates = self
            .ranges
            .iter()
            .enumerate()
            .filter(|(_, range)| range.start <= start && end <= range.end)
            .map(|(idx, _)| OccurrenceId(idx));

        let first = candidates.next()?;
        if preferred.contains(&first) {
            return Some(first);
        }
        Some(
            candidates
                .find(|candidate| preferred.contains(candidate))
                .unwrap_or(first),
        )
    }

    /// Returns `true` if an edit with the given owner touches text outside the envelope.
    pub fn is_outside_envelope(&self, edit: &TextDeltaEdit, owner: Option<OccurrenceId>) -> bool {
        if owner.is_some() {
            return false;
        }
        let (start, end) = (edit.start, edit.end());
        if start < self.envelope.start || end > self.envelope.end {
            return true;
        }
        edit.is_insertion() && (start == self.envelope.start || start == self.envelope.end)
    }

    /// Map every range and the envelope through `edit`, attributed to `owner`.
    pub fn apply(&mut self, edit: &TextDeltaEdit, owner: Option<OccurrenceId>) {
        let growth = edit.inserted_len() as isize - edit.deleted_len() as isize;

        for (idx, range) in self.ranges.iter_mut().enumerate() {
            match owner {
                Some(owner) if owner.0 == idx => {
                    range.end = range.end.saturating_add_signed(growth);
                }
                _ => {
                    let after = match owner {
                        Some(owner) => idx > owner.0,
                        None => range.start >= edit.start,
                    };
                    range.start = edit.map_offset(range.start, after);
                    range.end = edit.map_offset(range.end, after);
                }
            }
        }

        if owner.is_some() || !self.is_outside_envelope(edit, owner) {
            self.envelope.end = self.envelope.end.saturating_add_signed(growth);
        } else {
            self.envelope.start = edit.map_offset(self.envelope.start, true);
            self.envelope.end = edit.map_offset(self.envelope.end, false);
        }
    }

    /// Locate the owner of `edit` and map through it. Returns the owner.
    pub fn track(
        &mut self,
        edit: &TextDeltaEdit,
        preferred: &[OccurrenceId],
    ) -> Option<OccurrenceId> {
        let owner = self.locate(edit, preferred);
        self.apply(edit, owner);
        owner
    }

    /// Returns `true` if every range is ordered, disjoint and inside the envelope.
    pub fn is_well_formed(&self) -> bool {
        let envelope = &self.envelope;
        if envelope.start > envelope.end {
            return false;
        }
        let inside = self.ranges.iter().all(|range| {
            range.start <= range.end && envelope.start <= range.start && range.end <= envelope.end
        });
        inside
            && self
                .ranges
                .windows(2)
                .all(|pair| pair[0].end <= pair[1].start)
    }
}
