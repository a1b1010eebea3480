//! Theme token configuration supplied by the hosting application.
//!
//! A configuration has exactly two top-level modes, `dark` and `light`, each an
//! arbitrarily nested [`TokenTree`]. Either may be omitted and defaults to an
//! empty tree.
//!
//! ```rust
//! use duskmode::{ColorMode, ThemeConfig};
//!
//! let config = ThemeConfig::from_yaml(r##"
//! light:
//!   colors:
//!     background: "#ffffff"
//!     text: "#1a1a1a"
//! dark:
//!   colors:
//!     background: "#121212"
//!     text: "#f0f0f0"
//! "##).unwrap();
//!
//! let dark = config.tokens(ColorMode::Dark);
//! assert!(dark.get("colors.background").is_some());
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ThemeError;
use crate::setting::ColorMode;
use crate::tokens::TokenTree;

/// File extensions accepted by [`ThemeConfig::from_file`], in lookup order.
pub const CONFIG_EXTENSIONS: &[&str] = &[".yaml", ".yml", ".json"];

/// Per-mode theme tokens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThemeConfig {
    #[serde(default)]
    pub dark: TokenTree,
    #[serde(default)]
    pub light: TokenTree,
}

impl ThemeConfig {
    pub fn new(light: TokenTree, dark: TokenTree) -> Self {
        Self { dark, light }
    }

    /// The token tree for `mode`.
    pub fn tokens(&self, mode: ColorMode) -> &TokenTree {
        match mode {
            ColorMode::Light => &self.light,
            ColorMode::Dark => &self.dark,
        }
    }

    /// Parses YAML content.
    pub fn from_yaml(yaml: &str) -> Result<Self, ThemeError> {
        // An empty document means "no tokens", not a parse error.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| ThemeError::parse(e.to_string()))?;
        config.warn_on_collisions();
        Ok(config)
    }

    /// Parses JSON content.
    pub fn from_json(json: &str) -> Result<Self, ThemeError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ThemeError::parse(e.to_string()))?;
        config.warn_on_collisions();
        Ok(config)
    }

    /// Loads a configuration file, choosing the parser by extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ThemeError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
            .filter(|e| CONFIG_EXTENSIONS.contains(&e.as_str()))
            .ok_or_else(|| ThemeError::UnsupportedFormat(path.to_path_buf()))?;

        let content = std::fs::read_to_string(path).map_err(|source| ThemeError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let parsed = if extension == ".json" {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        };

        parsed.map_err(|e| match e {
            ThemeError::Parse { message, .. } => ThemeError::Parse {
                path: Some(path.to_path_buf()),
                message,
            },
            other => other,
        })
    }

    /// Serializes the configuration as compact JSON.
    pub fn to_json(&self) -> Result<String, ThemeError> {
        serde_json::to_string(self).map_err(|e| ThemeError::Serialize(e.to_string()))
    }

    /// Leaf keys that collide within either mode.
    pub fn variable_collisions(&self) -> Vec<String> {
        let mut keys = self.light.variable_collisions();
        keys.extend(self.dark.variable_collisions());
        keys.sort();
        keys.dedup();
        keys
    }

    fn warn_on_collisions(&self) {
        let collisions = self.variable_collisions();
        if !collisions.is_empty() {
            tracing::warn!(
                "theme tokens share CSS variable names: {}",
                collisions.join(", ")
            );
        }
    }
}
