//! Pre-hydration theme application.
//!
//! Before the UI mounts, a blocking script in the page head resolves the theme
//! and writes one CSS custom property per token onto the document root, plus
//! `--initial-color-mode` recording the mode it picked. The first paint is then
//! already correct, and [`ThemeManager::init_from_style_attribute`] reads the
//! recorded mode back instead of resolving again.
//!
//! This module provides that script ([`HeadScript::render`]) and the same
//! resolution in Rust ([`HeadScript::apply`], [`apply_initial_theme`]) for
//! server-side rendering and tests. The document root is abstracted by
//! [`StyleRoot`].
//!
//! [`ThemeManager::init_from_style_attribute`]: crate::ThemeManager::init_from_style_attribute

use std::collections::BTreeMap;

use cssparser::{
    AtRuleParser, CowRcStr, DeclarationParser, ParseError, Parser, ParserInput,
    QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser,
};
use minijinja::{context, Environment, Value};

use crate::config::ThemeConfig;
use crate::error::ThemeError;
use crate::probe::SystemProbe;
use crate::setting::{ColorMode, StoredPreference, ThemeSetting};
use crate::store::{PreferenceStore, DEFAULT_STORAGE_KEY, LEGACY_STORAGE_KEY};
use crate::tokens::{css_value, custom_property};

/// Custom property recording the mode chosen before hydration.
pub const INITIAL_COLOR_MODE_PROPERTY: &str = "--initial-color-mode";

/// The inline style of the document root element.
pub trait StyleRoot {
    /// Reads a property value.
    fn property(&self, name: &str) -> Option<String>;

    /// Sets a property value.
    fn set_property(&mut self, name: &str, value: &str);
}

/// An in-process inline style declaration block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineStyle {
    properties: BTreeMap<String, String>,
}

impl InlineStyle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a `style` attribute value such as `"--bg: #fff; color: red"`.
    ///
    /// Values are kept as written, quotes included. Invalid or empty
    /// declarations are skipped.
    pub fn parse(declarations: &str) -> Self {
        let mut input = ParserInput::new(declarations);
        let mut parser = Parser::new(&mut input);
        let mut declaration_parser = InlineDeclarationParser;
        let properties = RuleBodyParser::new(&mut parser, &mut declaration_parser)
            .flatten()
            .collect();
        Self { properties }
    }

    pub fn with_property(mut self, name: &str, value: &str) -> Self {
        self.set_property(name, value);
        self
    }

    pub fn remove_property(&mut self, name: &str) -> Option<String> {
        self.properties.remove(name)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Renders the block as a `style` attribute value, properties sorted.
    pub fn to_css(&self) -> String {
        self.properties
            .iter()
            .map(|(name, value)| format!("{}: {};", name, value))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl StyleRoot for InlineStyle {
    fn property(&self, name: &str) -> Option<String> {
        self.properties.get(name).cloned()
    }

    fn set_property(&mut self, name: &str, value: &str) {
        self.properties.insert(name.to_string(), value.to_string());
    }
}

struct InlineDeclarationParser;

impl<'i> DeclarationParser<'i> for InlineDeclarationParser {
    type Declaration = (String, String);
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Declaration, ParseError<'i, Self::Error>> {
        let start = input.position();
        while input.next_including_whitespace_and_comments().is_ok() {}
        let value = input.slice_from(start).trim();
        if value.is_empty() {
            return Err(input.new_custom_error(()));
        }
        Ok((name.as_ref().to_string(), value.to_string()))
    }
}

impl<'i> AtRuleParser<'i> for InlineDeclarationParser {
    type Prelude = ();
    type AtRule = (String, String);
    type Error = ();
}

impl<'i> QualifiedRuleParser<'i> for InlineDeclarationParser {
    type Prelude = ();
    type QualifiedRule = (String, String);
    type Error = ();
}

impl<'i> RuleBodyItemParser<'i, (String, String), ()> for InlineDeclarationParser {
    fn parse_declarations(&self) -> bool {
        true
    }
    fn parse_qualified(&self) -> bool {
        false
    }
}

/// Normalized stored strings that pin a mode. Anything else follows the system.
///
/// Embedded in the head script so both sides classify values identically.
fn explicit_modes() -> BTreeMap<&'static str, ColorMode> {
    ["light", "dark", "system", "true", "false"]
        .into_iter()
        .filter_map(|raw| match StoredPreference::parse(raw).setting()? {
            ThemeSetting::System => None,
            setting => Some((raw, setting.resolve(false))),
        })
        .collect()
}

/// Resolves the mode to paint before hydration.
///
/// Matches [`ThemeManager::init_from_storage`](crate::ThemeManager::init_from_storage):
/// explicit settings win, `system` and anything unusable follow the probe.
pub fn resolve_initial_mode(stored: Option<&str>, probe: &dyn SystemProbe) -> ColorMode {
    match stored.map(StoredPreference::parse).and_then(|p| p.setting()) {
        Some(setting) => setting.resolve(probe.currently_dark()),
        None => ColorMode::from_dark(probe.currently_dark()),
    }
}

/// Writes the resolved mode's tokens and `--initial-color-mode` onto `root`.
pub fn apply_initial_theme(
    root: &mut dyn StyleRoot,
    config: &ThemeConfig,
    stored: Option<&str>,
    probe: &dyn SystemProbe,
) -> ColorMode {
    let mode = resolve_initial_mode(stored, probe);
    for (key, value) in config.tokens(mode).leaves() {
        if let Some(css) = css_value(value) {
            root.set_property(&custom_property(key), &css);
        }
    }
    root.set_property(INITIAL_COLOR_MODE_PROPERTY, mode.as_str());
    mode
}

const SCRIPT_TEMPLATE: &str = r#"(function () {
  var theme = {{ theme }};
  var storageKey = {{ storage_key }};
  var legacyKey = {{ legacy_key }};
  var explicitModes = {{ explicit_modes }};
  var stored = null;
  try {
    stored = window.localStorage.getItem(storageKey);
    if (stored === null && legacyKey !== null) {
      stored = window.localStorage.getItem(legacyKey);
    }
  } catch (e) {}
  var normalized = stored === null
    ? ""
    : String(stored).trim().replace(/^["']+|["']+$/g, "").trim().toLowerCase();
  var mode = Object.prototype.hasOwnProperty.call(explicitModes, normalized)
    ? explicitModes[normalized]
    : null;
  if (mode === null) {
    var query = window.matchMedia ? window.matchMedia("(prefers-color-scheme: dark)") : null;
    mode = query && query.matches ? "dark" : "light";
  }
  var root = document.documentElement;
  var iterate = function (tokens) {
    Object.keys(tokens).forEach(function (key) {
      var value = tokens[key];
      if (value === null) return;
      if (typeof value === "object" && !Array.isArray(value)) {
        iterate(value);
      } else {
        root.style.setProperty("--" + key, typeof value === "string" ? value : JSON.stringify(value));
      }
    });
  };
  iterate(theme[mode] || {});
  root.style.setProperty({{ initial_property }}, mode);
})();"#;

/// The pre-hydration head script for a theme configuration.
#[derive(Debug, Clone)]
pub struct HeadScript<'a> {
    config: &'a ThemeConfig,
    storage_key: String,
    legacy_key: Option<String>,
}

impl<'a> HeadScript<'a> {
    /// A script reading [`DEFAULT_STORAGE_KEY`], falling back to
    /// [`LEGACY_STORAGE_KEY`].
    pub fn new(config: &'a ThemeConfig) -> Self {
        Self {
            config,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            legacy_key: Some(LEGACY_STORAGE_KEY.to_string()),
        }
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn with_legacy_key(mut self, key: Option<String>) -> Self {
        self.legacy_key = key;
        self
    }

    /// The stored value the script would see.
    pub fn read_stored(&self, store: &dyn PreferenceStore) -> Option<String> {
        store.get(&self.storage_key).or_else(|| {
            self.legacy_key
                .as_deref()
                .and_then(|legacy| store.get(legacy))
        })
    }

    /// Performs the script's work against an in-process root.
    pub fn apply(
        &self,
        root: &mut dyn StyleRoot,
        store: &dyn PreferenceStore,
        probe: &dyn SystemProbe,
    ) -> ColorMode {
        let stored = self.read_stored(store);
        apply_initial_theme(root, self.config, stored.as_deref(), probe)
    }

    /// Renders the script body (without `<script>` tags).
    ///
    /// Embedded JSON has `</` escaped so it cannot terminate the enclosing tag.
    pub fn render(&self) -> Result<String, ThemeError> {
        let theme = embed_json(self.config)?;
        let storage_key = embed_json(&self.storage_key)?;
        let legacy_key = embed_json(&self.legacy_key)?;
        let modes = embed_json(&explicit_modes())?;
        let initial_property = embed_json(INITIAL_COLOR_MODE_PROPERTY)?;

        let env = Environment::new();
        Ok(env.render_str(
            SCRIPT_TEMPLATE,
            context! {
                theme,
                storage_key,
                legacy_key,
                explicit_modes => modes,
                initial_property,
            },
        )?)
    }

    /// Renders the script wrapped in a `<script>` element.
    pub fn render_tag(&self) -> Result<String, ThemeError> {
        Ok(format!("<script>{}</script>", self.render()?))
    }
}

/// Renders the head script for `config` with the given storage key.
pub fn render_head_script(config: &ThemeConfig, storage_key: &str) -> Result<String, ThemeError> {
    HeadScript::new(config).with_storage_key(storage_key).render()
}

/// Serializes `value` as a JavaScript literal, inserted verbatim by the template.
fn embed_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<Value, ThemeError> {
    let json = serde_json::to_string(value).map_err(|e| ThemeError::Serialize(e.to_string()))?;
    Ok(Value::from_safe_string(
        json.replace("</", "<\\/")
            .replace('\u{2028}', "\\u2028")
            .replace('\u{2029}', "\\u2029"),
    ))
}
