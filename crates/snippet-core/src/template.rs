//! Template parser.
//!
//! A template is plain text with placeholder markers delimited by `{{` and `}}`:
//!
//! ```text
//! for (var {{index}}; {{index}} < {{array}}.length; {{index}}++) {
//!     {{}}
//! }
//! ```
//!
//! The text between the delimiters is the placeholder's identifier; every marker with the same
//! identifier belongs to the same group. An empty identifier (`{{}}`) marks the final
//! placeholder. Single braces are ordinary text.

use crate::error::{TemplateError, TemplateErrorKind};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// One piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text, inserted verbatim (modulo indentation).
    Text(String),
    /// A placeholder marker; an empty identifier is the final placeholder.
    Placeholder(String),
}

/// A parsed snippet template: an ordered list of segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse a template string in a single pass.
    ///
    /// Fails on an unclosed `{{`, a `{{` inside an open placeholder, a `}}` outside of any
    /// placeholder, or a second `{{}}`.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        // (char offset of the opening delimiter, identifier so far)
        let mut open: Option<(usize, String)> = None;
        let mut has_final = false;

        let mut rest = source;
        let mut offset = 0usize;
        while !rest.is_empty() {
            if rest.starts_with(OPEN) {
                if open.is_some() {
                    return Err(TemplateError {
                        offset,
                        kind: TemplateErrorKind::NestedPlaceholder,
                    });
                }
                if !literal.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut literal)));
                }
                open = Some((offset, String::new()));
                rest = &rest[OPEN.len()..];
                offset += 2;
                continue;
            }

            if rest.starts_with(CLOSE) {
                let Some((start, identifier)) = open.take() else {
                    return Err(TemplateError {
                        offset,
                        kind: TemplateErrorKind::UnmatchedClose,
                    });
                };
                if identifier.is_empty() {
                    if has_final {
                        return Err(TemplateError {
                            offset: start,
                            kind: TemplateErrorKind::DuplicateFinalPlaceholder,
                        });
                    }
                    has_final = true;
                }
                segments.push(Segment::Placeholder(identifier));
                rest = &rest[CLOSE.len()..];
                offset += 2;
                continue;
            }

            let mut chars = rest.chars();
            let Some(ch) = chars.next() else { break };
            match open.as_mut() {
                Some((_, identifier)) => identifier.push(ch),
                None => literal.push(ch),
            }
            rest = chars.as_str();
            offset += 1;
        }

        if let Some((start, _)) = open {
            return Err(TemplateError {
                offset: start,
                kind: TemplateErrorKind::UnclosedPlaceholder,
            });
        }
        if !literal.is_empty() {
            segments.push(Segment::Text(literal));
        }

        Ok(Self { segments })
    }

    /// The parsed segments, in template order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}
