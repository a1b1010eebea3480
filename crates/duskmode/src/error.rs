//! Error types for preference persistence and theme configuration.
//!
//! The resolver itself never fails: malformed preferences and missing platform
//! capabilities are absorbed with a conservative fallback. These errors only
//! surface from the edges that touch the filesystem or serialize data.

use std::io;
use std::path::PathBuf;

/// Errors raised by a [`PreferenceStore`](crate::PreferenceStore) write.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("Failed to access preference file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The backing file exists but does not hold a JSON object of strings.
    #[error("Preference file {} is not a string map: {message}", path.display())]
    Format { path: PathBuf, message: String },
}

/// Errors raised while loading theme configuration or rendering the head script.
#[derive(Debug, thiserror::Error)]
pub enum ThemeError {
    /// The theme configuration could not be parsed.
    #[error("Failed to parse theme config{}: {message}", location(path))]
    Parse {
        /// Source file, when loaded from disk.
        path: Option<PathBuf>,
        /// Message from the YAML/JSON parser.
        message: String,
    },

    /// The theme configuration file could not be read.
    #[error("Failed to read theme config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file extension is not one of the supported config formats.
    #[error("Unsupported theme config format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// The configuration could not be serialized for embedding.
    #[error("Failed to serialize theme config: {0}")]
    Serialize(String),

    /// The head script template failed to render.
    #[error("Failed to render head script: {0}")]
    Template(#[from] minijinja::Error),
}

impl ThemeError {
    /// Create a parse error without a source file.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            path: None,
            message: message.into(),
        }
    }
}

fn location(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" {}", p.display()))
        .unwrap_or_default()
}
