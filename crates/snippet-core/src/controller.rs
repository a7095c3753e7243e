//! Snippet controller: the public entry point of the engine.
//!
//! A [`SnippetController`] is either [`State::Inactive`] or [`State::Active`] with exactly one
//! [`SnippetSession`]. Host changes reach the session through [`SnippetController::sync`], which
//! drains the session's event subscriptions and then, in this order:
//!
//! 1. invalidates on lifecycle or history notifications;
//! 2. maps every user edit through the tracked ranges, invalidating on edits outside the
//!    snippet and on the primary cursor leaving it;
//! 3. mirrors linked placeholders that were edited, invalidating if two occurrences of one
//!    group were edited to different text;
//! 4. invalidates the session if its ranges or linked occurrences became inconsistent.
//!
//! Navigation calls `sync` before acting, so they never see stale ranges.

use crate::config::SnippetConfig;
use crate::document::{DocumentEvent, EditOrigin, Position, SequencedEvent, SnippetHost};
use crate::error::SnippetError;
use crate::mirror::{self, MirrorQueue};
use crate::session::{self, SnippetSession};
use crate::watchdog::{self, InvalidationReason};
use tracing::{debug, trace, warn};

/// Controller state.
#[derive(Debug, Default)]
pub enum State {
    /// No snippet is being edited.
    #[default]
    Inactive,
    /// A snippet session is live.
    Active(Box<SnippetSession>),
}

/// How the most recent session (or template insertion) ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionExit {
    /// `accept_snippet` moved to the final placeholder and ended the session.
    Accepted,
    /// `leave_snippet` ended the session in place.
    Left,
    /// A new `run` replaced the session.
    Replaced,
    /// The template had no tab stops, so no session was started.
    Completed,
    /// The watchdog ended the session.
    Invalidated(InvalidationReason),
}

/// Inserts snippet templates and drives the resulting session.
#[derive(Debug, Default)]
pub struct SnippetController {
    state: State,
    config: SnippetConfig,
    last_exit: Option<SessionExit>,
}

impl SnippetController {
    /// Create an inactive controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an inactive controller with the given configuration.
    pub fn with_config(config: SnippetConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// The controller configuration.
    pub fn config(&self) -> &SnippetConfig {
        &self.config
    }

    /// Current state.
    pub fn state(&self) -> &State {
        &self.state
    }

    /// The live session, if any.
    pub fn session(&self) -> Option<&SnippetSession> {
        match &self.state {
            State::Active(session) => Some(&**session),
            State::Inactive => None,
        }
    }

    /// Returns `true` while a snippet session is active.
    pub fn is_in_snippet_mode(&self) -> bool {
        matches!(self.state, State::Active(_))
    }

    /// Navigation index of the current placeholder group.
    pub fn current_group(&self) -> Option<usize> {
        self.session().map(SnippetSession::current_group)
    }

    /// How the last session ended.
    pub fn last_exit(&self) -> Option<SessionExit> {
        self.last_exit
    }

    /// Insert `template` at `position`, replacing `overwrite_before` characters before and
    /// `overwrite_after` characters after it, and start a session on its first placeholder.
    ///
    /// A running session is replaced. If the template or position is rejected, the document and
    /// any running session are left untouched; if the host rejects the insertion itself, a
    /// running session ends as [`InvalidationReason::EditFailed`].
    pub fn run<H: SnippetHost + ?Sized>(
        &mut self,
        host: &mut H,
        template: &str,
        position: Position,
        overwrite_before: usize,
        overwrite_after: usize,
        select_all_occurrences: bool,
    ) -> Result<(), SnippetError> {
        self.sync(host);

        let settings = self
            .config
            .indent
            .unwrap_or_else(|| host.indent_settings());
        let prepared = session::prepare(
            &*host,
            template,
            position,
            overwrite_before,
            overwrite_after,
            &settings,
        )?;

        let inserted = session::insert(host, prepared, select_all_occurrences);
        let exit = match inserted {
            Ok(_) => SessionExit::Replaced,
            Err(_) => SessionExit::Invalidated(InvalidationReason::EditFailed),
        };
        self.teardown(host, exit);

        match inserted? {
            Some(session) => {
                debug!(
                    groups = session.index().group_count(),
                    occurrences = session.index().occurrence_count(),
                    envelope = ?session.envelope(),
                    "snippet session started"
                );
                self.state = State::Active(Box::new(session));
            }
            None => {
                debug!("snippet inserted without placeholders");
                self.last_exit = Some(SessionExit::Completed);
            }
        }
        Ok(())
    }

    /// Move to the next placeholder group. No-op at the final group or when inactive.
    pub fn jump_to_next_placeholder<H: SnippetHost + ?Sized>(&mut self, host: &mut H) {
        self.sync(host);
        let State::Active(session) = &mut self.state else {
            return;
        };
        if session.navigator_mut().next() {
            trace!(group = session.current_group(), "jumped to next placeholder");
            session.select_current(host);
        }
    }

    /// Move to the previous placeholder group. No-op at the first group or when inactive.
    pub fn jump_to_prev_placeholder<H: SnippetHost + ?Sized>(&mut self, host: &mut H) {
        self.sync(host);
        let State::Active(session) = &mut self.state else {
            return;
        };
        if session.navigator_mut().prev() {
            trace!(group = session.current_group(), "jumped to previous placeholder");
            session.select_current(host);
        }
    }

    /// Select the final placeholder and end the session. No-op when inactive.
    pub fn accept_snippet<H: SnippetHost + ?Sized>(&mut self, host: &mut H) {
        self.sync(host);
        let State::Active(session) = &self.state else {
            return;
        };
        let selection = session.accept_selection();
        host.set_selections(vec![selection], EditOrigin::Snippet);
        self.teardown(host, SessionExit::Accepted);
    }

    /// Put the caret after the current placeholder and end the session. No-op when inactive.
    pub fn leave_snippet<H: SnippetHost + ?Sized>(&mut self, host: &mut H) {
        self.sync(host);
        let State::Active(session) = &self.state else {
            return;
        };
        if let Some(selection) = session.leave_selection() {
            host.set_selections(vec![selection], EditOrigin::Snippet);
        }
        self.teardown(host, SessionExit::Left);
    }

    /// End any session and release its subscriptions. Safe to call repeatedly.
    pub fn dispose<H: SnippetHost + ?Sized>(&mut self, host: &mut H) {
        self.teardown(host, SessionExit::Invalidated(InvalidationReason::Disposed));
    }

    /// Process everything the host reported since the last call.
    pub fn sync<H: SnippetHost + ?Sized>(&mut self, host: &mut H) {
        let State::Active(session) = &mut self.state else {
            return;
        };
        let events = session.drain_events(host);
        if events.is_empty() {
            return;
        }
        if let Err(reason) = process_batch(session, host, &events) {
            self.teardown(host, SessionExit::Invalidated(reason));
        }
    }

    fn teardown<H: SnippetHost + ?Sized>(&mut self, host: &mut H, exit: SessionExit) {
        let State::Active(mut session) = std::mem::take(&mut self.state) else {
            return;
        };
        session.release(host);
        debug!(?exit, "snippet session ended");
        self.last_exit = Some(exit);
    }
}

fn process_batch<H: SnippetHost + ?Sized>(
    session: &mut SnippetSession,
    host: &mut H,
    events: &[SequencedEvent],
) -> Result<(), InvalidationReason> {
    if let Some(reason) = watchdog::screen_batch(events) {
        return Err(reason);
    }

    let preferred = session.current_occurrences();
    let mut queue = MirrorQueue::default();

    for sequenced in events {
        match &sequenced.event {
            // Edits issued by the session were tracked when they were applied.
            DocumentEvent::Edited {
                origin: EditOrigin::Snippet,
                ..
            }
            | DocumentEvent::SelectionChanged {
                origin: EditOrigin::Snippet,
                ..
            } => {}
            DocumentEvent::Edited { delta, .. } => {
                let (index, tracker) = session.parts_mut();
                for edit in &delta.edits {
                    let owner = tracker.locate(edit, &preferred);
                    if let Some(reason) = watchdog::check_edit(tracker, edit, owner) {
                        return Err(reason);
                    }
                    if let Some(owner) = owner {
                        let group = index.group_of(owner);
                        if index.group(group).is_some_and(|g| g.is_linked()) {
                            queue.mark(group, owner);
                        }
                    }
                    tracker.apply(edit, owner);
                }
            }
            DocumentEvent::SelectionChanged { selections, .. } => {
                if let Some(reason) = watchdog::check_selections(session.tracker(), selections) {
                    return Err(reason);
                }
            }
            _ => {}
        }
    }

    for (group, sources) in queue.drain() {
        let (index, tracker) = session.parts_mut();
        let Some(source) = mirror::reconcile(&*host, tracker, &sources) else {
            debug!(group, sources = sources.len(), "linked occurrences edited apart");
            return Err(InvalidationReason::IllFormed);
        };
        mirror::propagate(host, index, tracker, group, source).map_err(|err| {
            warn!(%err, group, "mirroring placeholder failed");
            InvalidationReason::EditFailed
        })?;
    }

    match watchdog::check_consistency(session.index(), session.tracker(), &*host) {
        Some(reason) => Err(reason),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::TextBuffer;
    use crate::document::Selection;
    use pretty_assertions::assert_eq;

    fn started(text: &str, template: &str, position: Position) -> (TextBuffer, SnippetController) {
        let mut host = TextBuffer::new(text);
        let mut controller = SnippetController::new();
        controller
            .run(&mut host, template, position, 0, 0, false)
            .unwrap();
        (host, controller)
    }

    #[test]
    fn test_run_selects_first_group() {
        let (host, controller) = started("", "{{a}} {{b}}", Position::new(0, 0));
        assert!(controller.is_in_snippet_mode());
        assert_eq!(controller.current_group(), Some(0));
        assert_eq!(host.selections(), vec![Selection::new(0, 1)]);
    }

    #[test]
    fn test_sync_mirrors_user_edit() {
        let (mut host, mut controller) = started("", "{{a}}={{a}}", Position::new(0, 0));
        host.insert_text("bc").unwrap();
        controller.sync(&mut host);

        assert_eq!(host.text(), "bc=bc");
        assert!(controller.is_in_snippet_mode());
        assert_eq!(host.selections(), vec![Selection::caret(2)]);
    }

    #[test]
    fn test_sync_with_no_events_is_noop() {
        let (mut host, mut controller) = started("", "{{a}}", Position::new(0, 0));
        let version = host.version();
        controller.sync(&mut host);
        controller.sync(&mut host);
        assert_eq!(host.version(), version);
        assert!(controller.is_in_snippet_mode());
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let (mut host, mut controller) = started("", "{{a}}", Position::new(0, 0));
        controller.dispose(&mut host);
        controller.dispose(&mut host);
        assert!(!controller.is_in_snippet_mode());
        assert_eq!(
            controller.last_exit(),
            Some(SessionExit::Invalidated(InvalidationReason::Disposed))
        );
        assert_eq!(host.subscriber_count(), 0);
    }

    #[test]
    fn test_run_replaces_session() {
        let (mut host, mut controller) = started("", "{{a}}", Position::new(0, 0));
        controller
            .run(&mut host, "{{b}}", Position::new(0, 1), 0, 0, false)
            .unwrap();
        assert_eq!(controller.last_exit(), Some(SessionExit::Replaced));
        assert_eq!(host.subscriber_count(), 4);
        assert_eq!(host.text(), "ab");
    }

    #[test]
    fn test_config_indent_overrides_host() {
        let mut host = TextBuffer::new("    x");
        let json = r#"{"indent": {"behavior": "spaces", "tab_width": 2}}"#;
        let config = SnippetConfig::from_json(json).unwrap();
        let mut controller = SnippetController::with_config(config);
        controller
            .run(&mut host, "{\n\t{{}}\n}", Position::new(0, 4), 0, 0, false)
            .unwrap();
        assert_eq!(host.text(), "    {\n      \n    }x");
        assert_eq!(controller.last_exit(), Some(SessionExit::Completed));
    }
}
