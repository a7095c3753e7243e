//! Error types surfaced by the snippet engine and its host collaborators.

use thiserror::Error;

/// Why a template could not be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateErrorKind {
    /// A `{{` was never closed.
    UnclosedPlaceholder,
    /// A `{{` appeared inside an open placeholder.
    NestedPlaceholder,
    /// A `}}` appeared outside of any placeholder.
    UnmatchedClose,
    /// More than one `{{}}` marker was declared.
    DuplicateFinalPlaceholder,
}

impl std::fmt::Display for TemplateErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            TemplateErrorKind::UnclosedPlaceholder => "unclosed placeholder",
            TemplateErrorKind::NestedPlaceholder => "nested placeholder",
            TemplateErrorKind::UnmatchedClose => "unmatched placeholder close",
            TemplateErrorKind::DuplicateFinalPlaceholder => "more than one final placeholder",
        };
        f.write_str(message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at character {offset}")]
/// A template failed to parse.
pub struct TemplateError {
    /// Character offset of the offending delimiter in the template.
    pub offset: usize,
    /// What went wrong.
    pub kind: TemplateErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors reported by a [`SnippetHost`](crate::SnippetHost) when applying edits.
pub enum HostError {
    #[error("invalid range: {start}..{end}")]
    /// An edit range is inverted or not addressable in the current document.
    InvalidRange {
        /// Inclusive start character offset.
        start: usize,
        /// Exclusive end character offset.
        end: usize,
    },

    #[error("edits in one batch overlap")]
    /// Two edits of the same batch touch the same characters.
    OverlappingEdits,

    #[error("document is detached")]
    /// The document was detached from its editing context.
    Detached,
}

#[derive(Debug, Error)]
/// Errors produced while loading configuration.
pub enum ConfigError {
    #[error("JSON parse error: {0}")]
    /// JSON parsing failed.
    Json(#[from] serde_json::Error),

    #[error("tab width must be greater than 0")]
    /// `tab_width` was zero.
    ZeroTabWidth,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors returned by [`SnippetController::run`](crate::SnippetController::run).
pub enum SnippetError {
    #[error("malformed template: {0}")]
    /// The template has unbalanced or nested delimiters. The document was not touched.
    MalformedTemplate(#[from] TemplateError),

    #[error("invalid position: line {line}, column {column}")]
    /// The insertion point (or the overwrite span around it) is not addressable.
    InvalidPosition {
        /// Logical line index.
        line: usize,
        /// Column in characters.
        column: usize,
    },

    #[error("document edit failed: {0}")]
    /// The host rejected the insertion edit.
    Edit(#[from] HostError),
}
