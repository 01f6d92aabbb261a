//! Command output formats.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context as _, Result, bail};
use serde::Serialize;

/// How a command prints its result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed JSON, the same shape the library returns.
    Json,
    /// Short human-readable summary.
    #[default]
    Text,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            other => bail!("unknown output format '{other}'; expected json or text"),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Text => "text",
        })
    }
}

impl OutputFormat {
    /// Render `data`: serialized for [`OutputFormat::Json`], via `text` for
    /// [`OutputFormat::Text`]. `text` is only called when needed.
    ///
    /// # Errors
    /// JSON serialization failure.
    pub fn render<T: Serialize>(self, data: &T, text: impl FnOnce() -> String) -> Result<String> {
        match self {
            Self::Json => serde_json::to_string_pretty(data).context("Failed to serialize output"),
            Self::Text => Ok(text()),
        }
    }
}
