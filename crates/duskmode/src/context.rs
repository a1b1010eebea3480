//! The application-root theme context.
//!
//! A [`ThemeContext`] is built once where the application is composed and
//! handed down by reference; there is no global. It owns the
//! [`ThemeManager`] and the [`ThemeConfig`], and derives the token values
//! components style themselves with.
//!
//! # Flash-free rendering
//!
//! Until the resolver has loaded, the active mode is unknown. During that
//! window [`ThemeContext::styled_theme`] returns variable references
//! (`var(--bg)`) resolved by the properties the head script set, and
//! [`ThemeContext::render_when_loaded`] renders nothing. After
//! [`boot`](ThemeContext::boot) both switch to the literal values of the
//! active mode.
//!
//! ```rust
//! use duskmode::{BootStrategy, MemoryStore, MockProbe, ThemeConfig, ThemeContext,
//!     ThemeManager, TokenTree};
//!
//! let config = ThemeConfig::new(
//!     TokenTree::node().with("bg", "#fff"),
//!     TokenTree::node().with("bg", "#000"),
//! );
//! let context = ThemeContext::new(
//!     ThemeManager::new(MemoryStore::new(), MockProbe::dark()),
//!     config,
//! );
//!
//! assert_eq!(context.styled_theme().get("bg"), Some(&TokenTree::from("var(--bg)")));
//!
//! context.boot(BootStrategy::Storage);
//! assert_eq!(context.styled_theme().get("bg"), Some(&TokenTree::from("#000")));
//! ```

use std::cell::Cell;

use crate::config::ThemeConfig;
use crate::hydration::{HeadScript, StyleRoot};
use crate::listeners::Subscription;
use crate::manager::{ThemeManager, ThemeManagerState};
use crate::setting::{ColorMode, ThemeSetting};
use crate::tokens::{map_tree, TokenMode, TokenTree};

/// How [`ThemeContext::boot`] resolves the initial state.
#[derive(Clone, Copy)]
pub enum BootStrategy<'r> {
    /// Read the preference store.
    Storage,
    /// Read the mode the head script recorded on the document root.
    StyleAttribute(&'r dyn StyleRoot),
}

/// Tokens for the current mode, as components consume them.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledTheme {
    /// The resolved dark flag; `None` before load.
    pub is_dark: Option<bool>,
    /// Literal values after load, variable references before.
    pub tokens: TokenTree,
}

impl StyledTheme {
    /// Looks up a token by dot-separated path.
    pub fn get(&self, path: &str) -> Option<&TokenTree> {
        self.tokens.get(path)
    }
}

/// Root-owned theme state shared with every consumer by reference.
#[derive(Debug)]
pub struct ThemeContext {
    manager: ThemeManager,
    config: ThemeConfig,
    booted: Cell<bool>,
}

impl ThemeContext {
    pub fn new(manager: ThemeManager, config: ThemeConfig) -> Self {
        Self {
            manager,
            config,
            booted: Cell::new(false),
        }
    }

    pub fn manager(&self) -> &ThemeManager {
        &self.manager
    }

    pub fn config(&self) -> &ThemeConfig {
        &self.config
    }

    pub fn state(&self) -> ThemeManagerState {
        self.manager.state()
    }

    /// Runs the bootstrap once. Returns false if it had already run.
    pub fn boot(&self, strategy: BootStrategy<'_>) -> bool {
        if self.booted.replace(true) {
            tracing::debug!("theme context already booted");
            return false;
        }
        match strategy {
            BootStrategy::Storage => self.manager.init_from_storage(),
            BootStrategy::StyleAttribute(root) => self.manager.init_from_style_attribute(root),
        }
        true
    }

    pub fn is_loaded(&self) -> bool {
        self.manager.did_load()
    }

    /// The token tree components should style with right now.
    ///
    /// Uses the light tree while the mode is unknown; the variable names are
    /// the same in both trees.
    pub fn styled_theme(&self) -> StyledTheme {
        let state = self.manager.state();
        let mode = state.color_mode().unwrap_or(ColorMode::Light);
        let current = self.config.tokens(mode);
        let tokens = if state.did_load {
            current.clone()
        } else {
            map_tree(current, TokenMode::VariableRef)
        };

        StyledTheme {
            is_dark: state.is_dark,
            tokens,
        }
    }

    /// Calls `render` with the styled theme once loaded; `None` before.
    pub fn render_when_loaded<R>(&self, render: impl FnOnce(&StyledTheme) -> R) -> Option<R> {
        if !self.is_loaded() {
            return None;
        }
        Some(render(&self.styled_theme()))
    }

    /// The dark-mode controls for UI widgets.
    pub fn controls(&self) -> DarkModeControls<'_> {
        DarkModeControls { context: self }
    }

    /// Registers a callback receiving every new resolver state.
    pub fn watch(&self, watcher: impl Fn(ThemeManagerState) + 'static) -> Subscription {
        self.manager.watch(watcher)
    }

    /// The head script matching this context's keys and tokens.
    pub fn head_script(&self) -> HeadScript<'_> {
        HeadScript::new(&self.config)
            .with_storage_key(self.manager.storage_key())
            .with_legacy_key(self.manager.legacy_key().map(str::to_string))
    }
}

/// A borrowed view exposing only what toggles and pickers need.
#[derive(Debug, Clone, Copy)]
pub struct DarkModeControls<'a> {
    context: &'a ThemeContext,
}

impl DarkModeControls<'_> {
    /// The effective mode; false while unresolved.
    pub fn is_dark(&self) -> bool {
        self.context.manager.is_dark().unwrap_or(false)
    }

    pub fn theme_setting(&self) -> ThemeSetting {
        self.context.manager.theme_setting()
    }

    pub fn toggle_dark(&self, value: Option<bool>) {
        self.context.manager.toggle_dark(value);
    }

    pub fn change_theme_setting(&self, setting: ThemeSetting) {
        self.context.manager.change_theme_setting(setting);
    }
}
