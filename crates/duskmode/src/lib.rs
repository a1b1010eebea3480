//! # duskmode - Light/Dark Theme Management for Hydrated Web UIs
//!
//! `duskmode` tracks a user's theme preference (light, dark, or follow the
//! system), persists it, keeps it in sync with the operating system's color
//! scheme, and exposes theme tokens as CSS custom properties so pages render in
//! the right mode both before and after client-side hydration.
//!
//! ## Core Concepts
//!
//! - [`ThemeSetting`]: the user's declared preference (`Light`, `Dark`, `System`)
//! - [`ThemeManager`]: the resolver combining stored preference and system signal
//! - [`PreferenceStore`]: key-value persistence ([`MemoryStore`], [`JsonFileStore`])
//! - [`SystemProbe`]: the OS "prefers dark" signal ([`OsProbe`], [`MockProbe`], [`NullProbe`])
//! - [`TokenTree`] / [`map_tree`]: per-mode design tokens as literals or `var(--key)` references
//! - [`ThemeContext`]: the root-owned object every consumer borrows
//! - [`HeadScript`]: the blocking script that paints the right mode before hydration
//!
//! ## Quick Start
//!
//! ```rust
//! use duskmode::{BootStrategy, MemoryStore, MockProbe, ThemeConfig, ThemeContext,
//!     ThemeManager, ThemeSetting};
//!
//! let config = ThemeConfig::from_yaml(r##"
//! light:
//!   colors: { background: "#ffffff", text: "#111111" }
//! dark:
//!   colors: { background: "#111111", text: "#eeeeee" }
//! "##).unwrap();
//!
//! let store = MemoryStore::new();
//! let context = ThemeContext::new(ThemeManager::new(store.clone(), MockProbe::dark()), config);
//! context.boot(BootStrategy::Storage);
//!
//! // No stored preference: the system signal decides, nothing is written.
//! assert!(context.controls().is_dark());
//! assert_eq!(store.writes(), 0);
//!
//! context.controls().change_theme_setting(ThemeSetting::Light);
//! assert_eq!(store.writes(), 1);
//! ```
//!
//! ## Persisted Format
//!
//! The setting is stored under `"theme"` as `"light"`, `"dark"` or `"system"`.
//! Values written by earlier revisions, a `"true"`/`"false"` flag under
//! `"dark"`, are still read and rewritten in the current format on bootstrap.
//!
//! ## Logging
//!
//! The crate reports absorbed failures (unwritable stores, malformed stored
//! values, colliding token names) through `tracing`. Install a subscriber in
//! the application to see them.

pub mod config;
pub mod context;
mod error;
pub mod hydration;
pub mod listeners;
pub mod manager;
pub mod prelude;
pub mod probe;
pub mod setting;
pub mod store;
pub mod tokens;

pub use error::{StoreError, ThemeError};

pub use config::{ThemeConfig, CONFIG_EXTENSIONS};
pub use context::{BootStrategy, DarkModeControls, StyledTheme, ThemeContext};
pub use hydration::{
    apply_initial_theme, render_head_script, resolve_initial_mode, HeadScript, InlineStyle,
    StyleRoot, INITIAL_COLOR_MODE_PROPERTY,
};
pub use listeners::{Listeners, Subscription};
pub use manager::{ThemeManager, ThemeManagerState};
pub use probe::{MockProbe, NullProbe, OsProbe, SystemProbe};
pub use setting::{ColorMode, StoredPreference, ThemeSetting, UnknownThemeValue};
pub use store::{
    JsonFileStore, MemoryStore, PreferenceStore, DEFAULT_STORAGE_KEY, LEGACY_STORAGE_KEY,
};
pub use tokens::{css_value, custom_property, map_tree, var_ref, Leaves, TokenMode, TokenTree};
