#![warn(missing_docs)]
//! Snippet Core - Headless Snippet Lifecycle Engine
//!
//! # Overview
//!
//! `snippet-core` inserts parameterized code templates into a host document and keeps them
//! editable as a unit. Templates mark placeholders with `{{name}}`; `{{}}` marks where the
//! cursor ends up. After insertion the engine lets the user tab between placeholders, keeps
//! every occurrence of the same placeholder in sync as the user types, and ends the session as
//! soon as an edit, undo or cursor move makes the snippet's tracked state untrustworthy.
//!
//! The engine never owns text. It talks to the document through the [`SnippetHost`] trait;
//! [`TextBuffer`] is a complete in-memory host.
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  SnippetEditor / SnippetController          │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Navigation · Mirroring · Watchdog          │  ← Session lifecycle
//! ├─────────────────────────────────────────────┤
//! │  Tracked Ranges                             │  ← Position mapping
//! ├─────────────────────────────────────────────┤
//! │  Template · Placeholder Index · Indentation │  ← Insertion engine
//! ├─────────────────────────────────────────────┤
//! │  SnippetHost (TextBuffer: Rope + undo)      │  ← Document collaborator
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use snippet_core::{Position, SnippetEditor, TextBuffer};
//!
//! let mut editor = SnippetEditor::new(TextBuffer::new(""));
//! editor
//!     .run("let {{name}} = {{name}};{{}}", Position::new(0, 0), 0, 0, false)
//!     .unwrap();
//!
//! // Typing over the selected first occurrence updates the second one too.
//! editor.edit(|host| host.insert_text("count")).unwrap();
//! assert_eq!(editor.host().text(), "let count = count;");
//!
//! editor.accept_snippet();
//! assert!(!editor.is_in_snippet_mode());
//! ```
//!
//! # Module Description
//!
//! - [`template`] - Template parser
//! - [`placeholders`] - Placeholder groups and navigation order
//! - [`indent`] - Indentation adapter
//! - [`session`] - Insertion engine and session state
//! - [`mirror`] - Mirror synchronizer
//! - [`navigation`] - Navigation between placeholder groups
//! - [`watchdog`] - Invalidation rules
//! - [`tracking`] - Tracked ranges mapped through edits
//! - [`controller`] - Public API and event processing
//! - [`editor`] - Host and controller pairing
//! - [`document`] - Host collaborator trait and events
//! - [`buffer`] - In-memory host

pub mod buffer;
pub mod config;
pub mod controller;
pub mod delta;
pub mod document;
pub mod editor;
pub mod error;
pub mod indent;
pub mod mirror;
pub mod navigation;
pub mod placeholders;
pub mod session;
pub mod template;
mod text;
pub mod tracking;
pub mod watchdog;

pub use buffer::TextBuffer;
pub use config::{IndentSettings, SnippetConfig, TabKeyBehavior};
pub use controller::{SessionExit, SnippetController, State};
pub use delta::{TextDelta, TextDeltaEdit};
pub use document::{
    DocumentEvent, EditOrigin, EditRequest, EventSource, HistoryKind, Position, Selection,
    SequencedEvent, SnippetHost, SubscriptionId, UndoPolicy,
};
pub use editor::SnippetEditor;
pub use error::{ConfigError, HostError, SnippetError, TemplateError, TemplateErrorKind};
pub use indent::{IndentAdapter, adjust_indentation, insertion_indent};
pub use placeholders::{OccurrenceId, PlaceholderGroup, PlaceholderIndex};
pub use session::{RenderedSnippet, SnippetSession};
pub use template::{Segment, Template};
pub use tracking::RangeTracker;
pub use watchdog::InvalidationReason;
