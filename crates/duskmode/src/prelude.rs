//! Prelude for convenient imports.
//!
//! Re-exports the types an application root and its components typically
//! need, so one line covers wiring up the context:
//!
//! ```rust
//! use duskmode::prelude::*;
//!
//! let context = ThemeContext::new(
//!     ThemeManager::new(MemoryStore::new(), NullProbe),
//!     ThemeConfig::default(),
//! );
//! context.boot(BootStrategy::Storage);
//! assert_eq!(context.controls().theme_setting(), ThemeSetting::System);
//! ```

// Resolver and its state
pub use crate::manager::{ThemeManager, ThemeManagerState};
pub use crate::setting::{ColorMode, ThemeSetting};

// Collaborators
pub use crate::probe::{MockProbe, NullProbe, OsProbe, SystemProbe};
pub use crate::store::{JsonFileStore, MemoryStore, PreferenceStore};

// Distribution and tokens
pub use crate::config::ThemeConfig;
pub use crate::context::{BootStrategy, StyledTheme, ThemeContext};
pub use crate::tokens::{map_tree, TokenMode, TokenTree};
