//! Placeholder index: groups occurrences by identifier and fixes the navigation order.

use crate::template::{Segment, Template};

/// Identifies one placeholder occurrence; occurrences are numbered in template (and therefore
/// document) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OccurrenceId(pub usize);

/// All occurrences sharing one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderGroup {
    /// The identifier; empty for the final placeholder.
    pub name: String,
    /// Occurrences in ascending document order. The first one is the primary occurrence.
    pub occurrences: Vec<OccurrenceId>,
}

impl PlaceholderGroup {
    /// Returns `true` for the final placeholder group.
    pub fn is_final(&self) -> bool {
        self.name.is_empty()
    }

    /// The occurrence that receives the cursor when the group is visited.
    pub fn primary(&self) -> OccurrenceId {
        self.occurrences[0]
    }

    /// Returns `true` if edits to one occurrence must be mirrored to others.
    pub fn is_linked(&self) -> bool {
        self.occurrences.len() > 1
    }
}

/// Placeholder groups of a template, in navigation order.
///
/// Groups are ordered by their first occurrence; the final placeholder group always comes last.
/// When the template declares no `{{}}`, a final occurrence is synthesized after every other
/// occurrence. The order never changes for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderIndex {
    groups: Vec<PlaceholderGroup>,
    /// Group index of every occurrence, indexed by `OccurrenceId`.
    owners: Vec<usize>,
    implicit_final: bool,
}

impl PlaceholderIndex {
    /// Build the index for a parsed template.
    pub fn build(template: &Template) -> Self {
        let mut named: Vec<PlaceholderGroup> = Vec::new();
        let mut final_occurrence = None;
        let mut next = 0usize;

        for segment in template.segments() {
            let Segment::Placeholder(name) = segment else {
                continue;
            };
            let id = OccurrenceId(next);
            next += 1;

            if name.is_empty() {
                final_occurrence = Some(id);
            } else if let Some(group) = named.iter_mut().find(|g| &g.name == name) {
                group.occurrences.push(id);
            } else {
                named.push(PlaceholderGroup {
                    name: name.clone(),
                    occurrences: vec![id],
                });
            }
        }

        let implicit_final = final_occurrence.is_none();
        let final_occurrence = final_occurrence.unwrap_or(OccurrenceId(next));
        named.push(PlaceholderGroup {
            name: String::new(),
            occurrences: vec![final_occurrence],
        });

        let mut owners = vec![0; next + usize::from(implicit_final)];
        for (group_index, group) in named.iter().enumerate() {
            for occurrence in &group.occurrences {
                owners[occurrence.0] = group_index;
            }
        }

        Self {
            groups: named,
            owners,
            implicit_final,
        }
    }

    /// Groups in navigation order.
    pub fn groups(&self) -> &[PlaceholderGroup] {
        &self.groups
    }

    /// Group at a navigation index.
    pub fn group(&self, index: usize) -> Option<&PlaceholderGroup> {
        self.groups.get(index)
    }

    /// Number of groups, including the final one.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Navigation index of the final group (always the last one).
    pub fn final_group_index(&self) -> usize {
        self.groups.len() - 1
    }

    /// The final placeholder group.
    pub fn final_group(&self) -> &PlaceholderGroup {
        &self.groups[self.final_group_index()]
    }

    /// Total number of occurrences, including a synthesized final one.
    pub fn occurrence_count(&self) -> usize {
        self.owners.len()
    }

    /// Navigation index of the group owning `occurrence`.
    pub fn group_of(&self, occurrence: OccurrenceId) -> usize {
        self.owners[occurrence.0]
    }

    /// Returns `true` if the final occurrence was synthesized at the end of the template.
    pub fn has_implicit_final(&self) -> bool {
        self.implicit_final
    }

    /// Returns `true` if the only tab stop is the final placeholder.
    pub fn only_final(&self) -> bool {
        self.groups.len() == 1
    }
}
