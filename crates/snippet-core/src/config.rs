//! Indentation settings and controller configuration.
//!
//! The engine does not own persisted settings; hosts hand them over either through
//! [`SnippetHost::indent_settings`](crate::SnippetHost::indent_settings) or by building a
//! [`SnippetConfig`], typically deserialized from the host's own JSON settings file.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Which character a level of indentation is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabKeyBehavior {
    /// Indent with a literal tab character (`'\t'`).
    #[default]
    Tab,
    /// Indent with `tab_width` spaces.
    Spaces,
}

/// Document-wide indentation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndentSettings {
    /// Tab or spaces.
    pub behavior: TabKeyBehavior,
    /// Width of one indentation level in spaces (must be greater than 0).
    pub tab_width: usize,
}

impl Default for IndentSettings {
    fn default() -> Self {
        Self {
            behavior: TabKeyBehavior::Tab,
            tab_width: 4,
        }
    }
}

impl IndentSettings {
    /// Tab-based indentation.
    pub fn tabs() -> Self {
        Self::default()
    }

    /// Space-based indentation with the given width.
    pub fn spaces(tab_width: usize) -> Self {
        Self {
            behavior: TabKeyBehavior::Spaces,
            tab_width,
        }
    }

    /// Parse settings from JSON, e.g. `{"behavior": "spaces", "tab_width": 2}`.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check the settings for values the indentation adapter cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tab_width == 0 {
            return Err(ConfigError::ZeroTabWidth);
        }
        Ok(())
    }

    /// The text of one indentation level. A zero `tab_width` counts as one space.
    pub fn unit(&self) -> String {
        match self.behavior {
            TabKeyBehavior::Tab => "\t".to_string(),
            TabKeyBehavior::Spaces => " ".repeat(self.tab_width.max(1)),
        }
    }
}

/// Configuration of a [`SnippetController`](crate::SnippetController).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnippetConfig {
    /// When set, overrides the indentation settings reported by the host.
    pub indent: Option<IndentSettings>,
}

impl SnippetConfig {
    /// Parse a controller configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        if let Some(indent) = &config.indent {
            indent.validate()?;
        }
        Ok(config)
    }
}
