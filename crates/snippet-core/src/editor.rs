//! A host paired with its snippet controller.
//!
//! [`SnippetEditor`] owns both halves and dispatches host events synchronously: every mutation
//! made through [`SnippetEditor::edit`] is tracked, mirrored and checked by the watchdog before
//! `edit` returns, so callers never observe a half-processed session.

use crate::config::SnippetConfig;
use crate::controller::{SessionExit, SnippetController};
use crate::document::{Position, SnippetHost};
use crate::error::SnippetError;
use crate::session::SnippetSession;

/// A [`SnippetHost`] and the [`SnippetController`] driving snippets in it.
#[derive(Debug)]
pub struct SnippetEditor<H: SnippetHost> {
    host: H,
    controller: SnippetController,
}

impl<H: SnippetHost> SnippetEditor<H> {
    /// Pair `host` with an inactive controller.
    pub fn new(host: H) -> Self {
        Self::with_config(host, SnippetConfig::default())
    }

    /// Pair `host` with a controller using `config`.
    pub fn with_config(host: H, config: SnippetConfig) -> Self {
        Self {
            host,
            controller: SnippetController::with_config(config),
        }
    }

    /// The host document.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// The controller.
    pub fn controller(&self) -> &SnippetController {
        &self.controller
    }

    /// Mutate the host, then process the resulting events before returning.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut H) -> R) -> R {
        let result = f(&mut self.host);
        self.controller.sync(&mut self.host);
        result
    }

    /// See [`SnippetController::run`].
    pub fn run(
        &mut self,
        template: &str,
        position: Position,
        overwrite_before: usize,
        overwrite_after: usize,
        select_all_occurrences: bool,
    ) -> Result<(), SnippetError> {
        self.controller.run(
            &mut self.host,
            template,
            position,
            overwrite_before,
            overwrite_after,
            select_all_occurrences,
        )
    }

    /// Insert at the primary cursor without overwriting anything.
    pub fn run_at_cursor(&mut self, template: &str) -> Result<(), SnippetError> {
        let position = self.host.offset_to_position(self.host.primary_cursor());
        self.run(template, position, 0, 0, false)
    }

    /// Move to the next placeholder group.
    pub fn jump_to_next_placeholder(&mut self) {
        self.controller.jump_to_next_placeholder(&mut self.host);
    }

    /// Move to the previous placeholder group.
    pub fn jump_to_prev_placeholder(&mut self) {
        self.controller.jump_to_prev_placeholder(&mut self.host);
    }

    /// Accept the snippet at its final placeholder.
    pub fn accept_snippet(&mut self) {
        self.controller.accept_snippet(&mut self.host);
    }

    /// Leave the snippet at the current placeholder.
    pub fn leave_snippet(&mut self) {
        self.controller.leave_snippet(&mut self.host);
    }

    /// Returns `true` while a snippet session is active.
    pub fn is_in_snippet_mode(&self) -> bool {
        self.controller.is_in_snippet_mode()
    }

    /// The live session, if any.
    pub fn session(&self) -> Option<&SnippetSession> {
        self.controller.session()
    }

    /// How the last session ended.
    pub fn last_exit(&self) -> Option<SessionExit> {
        self.controller.last_exit()
    }

    /// End any session and release its subscriptions.
    pub fn dispose(&mut self) {
        self.controller.dispose(&mut self.host);
    }

    /// End any session and hand the host back.
    pub fn into_host(mut self) -> H {
        self.controller.dispose(&mut self.host);
        self.host
    }
}
