//! Navigation between placeholder groups.

use crate::document::Selection;
use crate::placeholders::{PlaceholderGroup, PlaceholderIndex};
use crate::tracking::RangeTracker;

/// Which placeholder group of an active session is current.
///
/// Starts at group 0. Moving past either end is a no-op, so repeated jumps at the final group
/// (or back at the first) are idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigator {
    current: usize,
    group_count: usize,
}

impl Navigator {
    /// Navigator over `group_count` groups, positioned on the first one.
    pub fn new(group_count: usize) -> Self {
        Self {
            current: 0,
            group_count,
        }
    }

    /// Current group index.
    pub fn current(&self) -> usize {
        self.current
    }

    /// Returns `true` when the final group is current.
    pub fn is_at_last(&self) -> bool {
        self.current + 1 >= self.group_count
    }

    /// Advance to the next group. Returns `false` at the last group.
    pub fn next(&mut self) -> bool {
        if self.is_at_last() {
            return false;
        }
        self.current += 1;
        true
    }

    /// Go back to the previous group. Returns `false` at the first group.
    pub fn prev(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current -= 1;
        true
    }
}

/// Selections that activate `group`: every occurrence (primary first) when `select_all` is set,
/// otherwise only the primary occurrence.
pub fn group_selections(
    group: &PlaceholderGroup,
    tracker: &RangeTracker,
    select_all: bool,
) -> Vec<Selection> {
    let occurrences = if select_all {
        &group.occurrences[..]
    } else {
        &group.occurrences[..1]
    };
    occurrences
        .iter()
        .map(|occurrence| {
            let range = tracker.range(*occurrence);
            Selection::new(range.start, range.end)
        })
        .collect()
}

/// Selection placed by accepting a snippet: the final placeholder's range.
pub fn accept_selection(index: &PlaceholderIndex, tracker: &RangeTracker) -> Selection {
    let range = tracker.range(index.final_group().primary());
    Selection::new(range.start, range.end)
}

/// Caret placed by leaving a snippet: the end of the current group's primary occurrence.
pub fn leave_selection(
    index: &PlaceholderIndex,
    tracker: &RangeTracker,
    navigator: &Navigator,
) -> Option<Selection> {
    let group = index.group(navigator.current())?;
    Some(Selection::caret(tracker.range(group.primary()).end))
}
