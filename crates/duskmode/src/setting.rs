//! Theme settings, resolved color modes, and persisted preference parsing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The user's declared theme preference.
///
/// Persisted verbatim as its lowercase string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeSetting {
    /// Always render light.
    Light,
    /// Always render dark.
    Dark,
    /// Follow the operating system's color scheme.
    #[default]
    System,
}

impl ThemeSetting {
    /// All settings, in display order.
    pub const ALL: [ThemeSetting; 3] = [
        ThemeSetting::Light,
        ThemeSetting::Dark,
        ThemeSetting::System,
    ];

    /// The string written to the preference store.
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeSetting::Light => "light",
            ThemeSetting::Dark => "dark",
            ThemeSetting::System => "system",
        }
    }

    /// The explicit setting matching a dark/light choice.
    pub fn explicit(dark: bool) -> Self {
        if dark {
            ThemeSetting::Dark
        } else {
            ThemeSetting::Light
        }
    }

    /// Resolves this setting against the system signal.
    ///
    /// Explicit settings always win; only `System` defers to `system_dark`.
    pub fn resolve(&self, system_dark: bool) -> ColorMode {
        match self {
            ThemeSetting::Light => ColorMode::Light,
            ThemeSetting::Dark => ColorMode::Dark,
            ThemeSetting::System => ColorMode::from_dark(system_dark),
        }
    }
}

impl fmt::Display for ThemeSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not a theme setting or color mode name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized theme value '{0}'")]
pub struct UnknownThemeValue(pub String);

impl FromStr for ThemeSetting {
    type Err = UnknownThemeValue;

    /// Parses a setting name, ignoring case, surrounding whitespace and quotes.
    ///
    /// Older revisions wrote upper-case names (`"DARK"`), which still parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_stored(s);
        ThemeSetting::ALL
            .into_iter()
            .find(|setting| setting.as_str() == normalized)
            .ok_or_else(|| UnknownThemeValue(s.to_string()))
    }
}

/// Canonical form of a stored string before it is classified.
///
/// Trims whitespace and any surrounding quote characters, then lowercases.
/// The head script applies the same steps in JavaScript.
pub(crate) fn normalize_stored(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_lowercase()
}

/// The effective rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Light mode (light background, dark text).
    Light,
    /// Dark mode (dark background, light text).
    Dark,
}

impl ColorMode {
    pub fn from_dark(dark: bool) -> Self {
        if dark {
            ColorMode::Dark
        } else {
            ColorMode::Light
        }
    }

    pub fn is_dark(&self) -> bool {
        matches!(self, ColorMode::Dark)
    }

    /// The token recorded in `--initial-color-mode` and used as the config key.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorMode::Light => "light",
            ColorMode::Dark => "dark",
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorMode {
    type Err = UnknownThemeValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_stored(s).as_str() {
            "dark" => Ok(ColorMode::Dark),
            "light" => Ok(ColorMode::Light),
            _ => Err(UnknownThemeValue(s.to_string())),
        }
    }
}

/// The classified content of a persisted preference string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredPreference {
    /// A current-format setting name.
    Setting(ThemeSetting),
    /// The legacy boolean format (`"true"` = dark).
    Legacy(bool),
    /// Neither; treated as if nothing were stored.
    Malformed(String),
}

impl StoredPreference {
    /// Classifies a raw stored value. Never fails.
    ///
    /// Setting names and the legacy booleans are matched case-insensitively
    /// with surrounding whitespace and quotes removed, so `"TRUE"` and
    /// `"\"dark\""` are both usable.
    pub fn parse(raw: &str) -> Self {
        if let Ok(setting) = raw.parse::<ThemeSetting>() {
            return StoredPreference::Setting(setting);
        }
        match normalize_stored(raw).as_str() {
            "true" => StoredPreference::Legacy(true),
            "false" => StoredPreference::Legacy(false),
            _ => StoredPreference::Malformed(raw.to_string()),
        }
    }

    /// The setting this value stands for, if it is usable.
    pub fn setting(&self) -> Option<ThemeSetting> {
        match self {
            StoredPreference::Setting(setting) => Some(*setting),
            StoredPreference::Legacy(dark) => Some(ThemeSetting::explicit(*dark)),
            StoredPreference::Malformed(_) => None,
        }
    }
}
