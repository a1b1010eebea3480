//! The theme resolver.
//!
//! [`ThemeManager`] owns the user's [`ThemeSetting`] and the derived dark flag.
//! It combines the persisted preference with the system probe and exposes the
//! two mutations a UI needs: [`change_theme_setting`](ThemeManager::change_theme_setting)
//! and [`toggle_dark`](ThemeManager::toggle_dark).
//!
//! ## Lifecycle
//!
//! ```text
//! new()                    theme_setting = System, is_dark = None, did_load = false
//!   │
//!   ├─ init_from_storage()            stored value → setting, or probe when absent
//!   └─ init_from_style_attribute()    mode written by the head script
//!   │
//!   ▼                      did_load = true
//! change_theme_setting / toggle_dark / system-change events
//!   │
//! drop                     probe subscription released
//! ```
//!
//! Explicit `Light`/`Dark` always win over the system signal; only `System`
//! follows it. A malformed stored value never fails: it falls back to the
//! legacy boolean format, then to "nothing stored".
//!
//! ```rust
//! use duskmode::{MemoryStore, MockProbe, ThemeManager, ThemeSetting};
//!
//! let store = MemoryStore::new().with_value("theme", "dark");
//! let manager = ThemeManager::new(store, MockProbe::light());
//! manager.init_from_storage();
//!
//! assert_eq!(manager.theme_setting(), ThemeSetting::Dark);
//! assert_eq!(manager.is_dark(), Some(true));
//!
//! manager.toggle_dark(None);
//! assert_eq!(manager.theme_setting(), ThemeSetting::Light);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::hydration::{StyleRoot, INITIAL_COLOR_MODE_PROPERTY};
use crate::listeners::{Listeners, Subscription};
use crate::probe::SystemProbe;
use crate::setting::{ColorMode, StoredPreference, ThemeSetting};
use crate::store::{PreferenceStore, DEFAULT_STORAGE_KEY, LEGACY_STORAGE_KEY};

/// Snapshot of the resolver state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThemeManagerState {
    /// Effective dark flag; `None` until the first resolution.
    pub is_dark: Option<bool>,
    /// True once a bootstrap operation has run.
    pub did_load: bool,
    /// The user's declared preference.
    pub theme_setting: ThemeSetting,
}

impl ThemeManagerState {
    /// The resolved mode, if known.
    pub fn color_mode(&self) -> Option<ColorMode> {
        self.is_dark.map(ColorMode::from_dark)
    }
}

struct Shared {
    state: RefCell<ThemeManagerState>,
    watchers: Listeners<ThemeManagerState>,
}

impl Shared {
    /// Applies `change` and notifies watchers once if the state differs.
    fn update(&self, change: impl FnOnce(&mut ThemeManagerState)) {
        let (before, after) = {
            let mut state = self.state.borrow_mut();
            let before = *state;
            change(&mut *state);
            (before, *state)
        };

        if before != after {
            tracing::debug!(
                setting = %after.theme_setting,
                is_dark = ?after.is_dark,
                did_load = after.did_load,
                "theme state changed"
            );
            self.watchers.notify(after);
        }
    }

    fn on_system_change(&self, dark: bool) {
        self.update(|state| {
            // Bootstrap reads the probe itself; before that there is nothing to follow.
            if state.did_load && state.theme_setting == ThemeSetting::System {
                state.is_dark = Some(dark);
            }
        });
    }
}

/// Resolves and persists the theme preference.
pub struct ThemeManager {
    shared: Rc<Shared>,
    store: Box<dyn PreferenceStore>,
    probe: Box<dyn SystemProbe>,
    storage_key: String,
    legacy_key: Option<String>,
    _system: Subscription,
}

impl ThemeManager {
    /// Creates a resolver in its initial state and subscribes to the probe.
    ///
    /// Nothing is read from `store` until a bootstrap operation runs.
    pub fn new(
        store: impl PreferenceStore + 'static,
        probe: impl SystemProbe + 'static,
    ) -> Self {
        let shared = Rc::new(Shared {
            state: RefCell::new(ThemeManagerState::default()),
            watchers: Listeners::new(),
        });

        let weak = Rc::downgrade(&shared);
        let system = probe.subscribe(Box::new(move |dark| {
            if let Some(shared) = weak.upgrade() {
                shared.on_system_change(dark);
            }
        }));

        Self {
            shared,
            store: Box::new(store),
            probe: Box::new(probe),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            legacy_key: Some(LEGACY_STORAGE_KEY.to_string()),
            _system: system,
        }
    }

    /// Uses `key` instead of [`DEFAULT_STORAGE_KEY`].
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Sets the fallback key read when the storage key is empty, or disables
    /// the fallback with `None`.
    pub fn with_legacy_key(mut self, key: Option<String>) -> Self {
        self.legacy_key = key;
        self
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn legacy_key(&self) -> Option<&str> {
        self.legacy_key.as_deref()
    }

    pub fn state(&self) -> ThemeManagerState {
        *self.shared.state.borrow()
    }

    pub fn is_dark(&self) -> Option<bool> {
        self.state().is_dark
    }

    pub fn did_load(&self) -> bool {
        self.state().did_load
    }

    pub fn theme_setting(&self) -> ThemeSetting {
        self.state().theme_setting
    }

    pub fn color_mode(&self) -> Option<ColorMode> {
        self.state().color_mode()
    }

    /// Registers a callback receiving the new state after every change.
    pub fn watch(&self, watcher: impl Fn(ThemeManagerState) + 'static) -> Subscription {
        self.shared.watchers.subscribe(watcher)
    }

    /// Bootstraps from the persisted preference.
    ///
    /// - Nothing stored (or a malformed value): follow the system, no write.
    /// - A setting name: [`change_theme_setting`](Self::change_theme_setting).
    /// - A legacy `"true"`/`"false"`: the matching explicit setting, which also
    ///   rewrites it in the current format under the storage key.
    pub fn init_from_storage(&self) {
        let setting = match self.stored_preference() {
            Some(StoredPreference::Malformed(raw)) => {
                tracing::warn!(value = %raw, "ignoring malformed stored theme preference");
                None
            }
            Some(preference) => preference.setting(),
            None => None,
        };

        self.shared.update(|state| {
            match setting {
                Some(setting) => self.select(state, setting),
                None => {
                    state.theme_setting = ThemeSetting::System;
                    state.is_dark = Some(self.probe.currently_dark());
                }
            }
            state.did_load = true;
        });
    }

    /// Bootstraps from the `--initial-color-mode` property the head script
    /// wrote on the document root.
    ///
    /// The dark flag comes from the property; the setting is recovered from
    /// the store without writing. Without a readable property this falls back
    /// to [`init_from_storage`](Self::init_from_storage).
    pub fn init_from_style_attribute(&self, root: &dyn StyleRoot) {
        let mode = root
            .property(INITIAL_COLOR_MODE_PROPERTY)
            .and_then(|value| value.parse::<ColorMode>().ok());

        let Some(mode) = mode else {
            tracing::debug!("no initial color mode on document root, reading storage");
            self.init_from_storage();
            return;
        };

        let setting = self
            .stored_preference()
            .and_then(|preference| preference.setting())
            .unwrap_or_default();

        self.shared.update(|state| {
            state.theme_setting = setting;
            state.is_dark = Some(mode.is_dark());
            state.did_load = true;
        });
    }

    /// Sets and persists `setting`, then recomputes the dark flag.
    pub fn change_theme_setting(&self, setting: ThemeSetting) {
        self.shared.update(|state| self.select(state, setting));
    }

    /// Switches to an explicit mode: `value`, or the opposite of the current
    /// one. An unresolved state counts as light.
    pub fn toggle_dark(&self, value: Option<bool>) {
        let target = value.unwrap_or_else(|| !self.is_dark().unwrap_or(false));
        self.change_theme_setting(ThemeSetting::explicit(target));
    }

    fn select(&self, state: &mut ThemeManagerState, setting: ThemeSetting) {
        let dark = match setting {
            ThemeSetting::Light => false,
            ThemeSetting::Dark => true,
            ThemeSetting::System => self.probe.currently_dark(),
        };
        state.theme_setting = setting;
        state.is_dark = Some(dark);
        self.persist(setting);
    }

    fn persist(&self, setting: ThemeSetting) {
        if let Err(e) = self.store.set(&self.storage_key, setting.as_str()) {
            tracing::warn!("failed to persist theme setting '{}': {}", setting, e);
        }
    }

    fn stored_preference(&self) -> Option<StoredPreference> {
        let raw = self.store.get(&self.storage_key).or_else(|| {
            let legacy = self.legacy_key.as_deref()?;
            let value = self.store.get(legacy)?;
            tracing::debug!(key = legacy, "read theme preference from legacy key");
            Some(value)
        })?;
        Some(StoredPreference::parse(&raw))
    }
}

impl fmt::Debug for ThemeManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThemeManager")
            .field("state", &self.state())
            .field("storage_key", &self.storage_key)
            .field("legacy_key", &self.legacy_key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::hydration::InlineStyle;
    use crate::probe::{MockProbe, NullProbe};
    use crate::store::MemoryStore;
    use std::cell::Cell;

    fn manager(store: &MemoryStore, probe: &MockProbe) -> ThemeManager {
        ThemeManager::new(store.clone(), probe.clone())
    }

    #[test]
    fn initial_state_is_unresolved_system() {
        let manager = ThemeManager::new(MemoryStore::new(), NullProbe);
        assert_eq!(
            manager.state(),
            ThemeManagerState {
                is_dark: None,
                did_load: false,
                theme_setting: ThemeSetting::System,
            }
        );
        assert_eq!(manager.color_mode(), None);
    }

    #[test]
    fn change_setting_persists_every_value() {
        let store = MemoryStore::new();
        let manager = manager(&store, &MockProbe::light());

        for setting in ThemeSetting::ALL {
            manager.change_theme_setting(setting);
            assert_eq!(manager.theme_setting(), setting);
            assert_eq!(store.get("theme"), Some(setting.as_str().to_string()));
        }
        assert_eq!(store.writes(), 3);
    }

    #[test]
    fn explicit_settings_ignore_probe() {
        for probe in [MockProbe::light(), MockProbe::dark()] {
            let manager = manager(&MemoryStore::new(), &probe);
            manager.change_theme_setting(ThemeSetting::Light);
            assert_eq!(manager.is_dark(), Some(false));
            manager.change_theme_setting(ThemeSetting::Dark);
            assert_eq!(manager.is_dark(), Some(true));
        }
    }

    #[test]
    fn system_setting_reads_probe_at_call_time() {
        let probe = MockProbe::light();
        let manager = manager(&MemoryStore::new(), &probe);

        manager.change_theme_setting(ThemeSetting::System);
        assert_eq!(manager.is_dark(), Some(false));

        probe.set_dark(true);
        manager.change_theme_setting(ThemeSetting::System);
        assert_eq!(manager.is_dark(), Some(true));
    }

    #[test]
    fn toggle_flips_and_goes_explicit() {
        let store = MemoryStore::new();
        let manager = manager(&store, &MockProbe::dark());
        manager.init_from_storage();
        assert_eq!(manager.theme_setting(), ThemeSetting::System);

        manager.toggle_dark(None);
        assert_eq!(manager.is_dark(), Some(false));
        assert_eq!(manager.theme_setting(), ThemeSetting::Light);

        manager.toggle_dark(None);
        assert_eq!(manager.is_dark(), Some(true));
        assert_eq!(manager.theme_setting(), ThemeSetting::Dark);
        assert_eq!(store.get("theme"), Some("dark".to_string()));
    }

    #[test]
    fn toggle_with_value_forces_mode() {
        let manager = manager(&MemoryStore::new(), &MockProbe::light());
        manager.change_theme_setting(ThemeSetting::Light);

        manager.toggle_dark(Some(true));
        assert_eq!(manager.is_dark(), Some(true));
        assert_eq!(manager.theme_setting(), ThemeSetting::Dark);

        manager.toggle_dark(Some(true));
        assert_eq!(manager.theme_setting(), ThemeSetting::Dark);
    }

    #[test]
    fn toggle_before_load_treats_unknown_as_light() {
        let manager = manager(&MemoryStore::new(), &MockProbe::dark());
        manager.toggle_dark(None);
        assert_eq!(manager.is_dark(), Some(true));
    }

    #[test]
    fn bootstrap_with_stored_dark() {
        let store = MemoryStore::new().with_value("theme", "dark");
        let manager = manager(&store, &MockProbe::light());
        manager.init_from_storage();

        assert_eq!(
            manager.state(),
            ThemeManagerState {
                is_dark: Some(true),
                did_load: true,
                theme_setting: ThemeSetting::Dark,
            }
        );
    }

    #[test]
    fn bootstrap_with_legacy_true_matches_dark() {
        let legacy = MemoryStore::new().with_value("theme", "true");
        let current = MemoryStore::new().with_value("theme", "dark");
        let probe = MockProbe::light();

        let a = manager(&legacy, &probe);
        let b = manager(&current, &probe);
        a.init_from_storage();
        b.init_from_storage();

        assert_eq!(a.state(), b.state());
        assert_eq!(legacy.get("theme"), Some("dark".to_string()));
    }

    #[test]
    fn bootstrap_without_value_follows_probe_without_writing() {
        let store = MemoryStore::new();
        let manager = manager(&store, &MockProbe::dark());
        manager.init_from_storage();

        assert_eq!(manager.is_dark(), Some(true));
        assert_eq!(manager.theme_setting(), ThemeSetting::System);
        assert!(manager.did_load());
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn bootstrap_with_garbage_degrades_to_system() {
        let store = MemoryStore::new().with_value("theme", "{{nope");
        let manager = manager(&store, &MockProbe::dark());
        manager.init_from_storage();

        assert_eq!(manager.theme_setting(), ThemeSetting::System);
        assert_eq!(manager.is_dark(), Some(true));
        assert!(manager.did_load());
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn bootstrap_reads_legacy_key_and_migrates() {
        let store = MemoryStore::new().with_value("dark", "true");
        let manager = manager(&store, &MockProbe::light());
        manager.init_from_storage();

        assert_eq!(manager.theme_setting(), ThemeSetting::Dark);
        assert_eq!(store.get("theme"), Some("dark".to_string()));
    }

    #[test]
    fn storage_key_wins_over_legacy_key() {
        let store = MemoryStore::new()
            .with_value("theme", "light")
            .with_value("dark", "true");
        let manager = manager(&store, &MockProbe::dark());
        manager.init_from_storage();
        assert_eq!(manager.theme_setting(), ThemeSetting::Light);
    }

    #[test]
    fn legacy_key_can_be_disabled() {
        let store = MemoryStore::new().with_value("dark", "true");
        let manager = manager(&store, &MockProbe::light()).with_legacy_key(None);
        manager.init_from_storage();
        assert_eq!(manager.theme_setting(), ThemeSetting::System);
        assert_eq!(manager.is_dark(), Some(false));
    }

    #[test]
    fn custom_storage_key_is_used() {
        let store = MemoryStore::new();
        let manager = manager(&store, &MockProbe::light()).with_storage_key("site-theme");
        manager.change_theme_setting(ThemeSetting::Dark);
        assert_eq!(store.get("site-theme"), Some("dark".to_string()));
        assert_eq!(store.get("theme"), None);
    }

    #[test]
    fn system_change_ignored_under_explicit_setting() {
        let probe = MockProbe::light();
        let manager = manager(&MemoryStore::new(), &probe);
        manager.init_from_storage();
        manager.change_theme_setting(ThemeSetting::Dark);

        probe.set_dark(false);
        probe.emit(false);
        assert_eq!(manager.is_dark(), Some(true));
    }

    #[test]
    fn system_change_followed_under_system_setting() {
        let store = MemoryStore::new();
        let probe = MockProbe::light();
        let manager = manager(&store, &probe);
        manager.init_from_storage();

        probe.set_dark(true);
        assert_eq!(manager.is_dark(), Some(true));
        probe.set_dark(false);
        assert_eq!(manager.is_dark(), Some(false));
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn repeated_system_events_are_idempotent() {
        let probe = MockProbe::light();
        let manager = manager(&MemoryStore::new(), &probe);
        manager.init_from_storage();

        let notifications = Rc::new(Cell::new(0));
        let counter = notifications.clone();
        let _watch = manager.watch(move |_| counter.set(counter.get() + 1));

        probe.emit(true);
        probe.emit(true);
        probe.emit(true);
        assert_eq!(manager.is_dark(), Some(true));
        assert_eq!(notifications.get(), 1);
    }

    #[test]
    fn dropping_manager_releases_probe_subscription() {
        let probe = MockProbe::light();
        let manager = manager(&MemoryStore::new(), &probe);
        assert_eq!(probe.listener_count(), 1);

        drop(manager);
        assert_eq!(probe.listener_count(), 0);
        probe.set_dark(true);
    }

    #[test]
    fn watchers_receive_new_state() {
        let manager = manager(&MemoryStore::new(), &MockProbe::light());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let watch = manager.watch(move |state| sink.borrow_mut().push(state));

        manager.init_from_storage();
        manager.toggle_dark(Some(true));
        manager.toggle_dark(Some(true));
        drop(watch);
        manager.toggle_dark(Some(false));

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].is_dark, Some(false));
        assert!(seen[0].did_load);
        assert_eq!(seen[1].theme_setting, ThemeSetting::Dark);
    }

    #[test]
    fn style_attribute_bootstrap_reads_head_script_mode() {
        let store = MemoryStore::new();
        let root = InlineStyle::new().with_property(INITIAL_COLOR_MODE_PROPERTY, "dark");
        let manager = manager(&store, &MockProbe::light());
        manager.init_from_style_attribute(&root);

        assert_eq!(manager.is_dark(), Some(true));
        assert!(manager.did_load());
        assert_eq!(manager.theme_setting(), ThemeSetting::System);
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn style_attribute_bootstrap_recovers_stored_setting() {
        let store = MemoryStore::new().with_value("theme", "light");
        let root = InlineStyle::new().with_property(INITIAL_COLOR_MODE_PROPERTY, " light");
        let manager = manager(&store, &MockProbe::dark());
        manager.init_from_style_attribute(&root);

        assert_eq!(manager.is_dark(), Some(false));
        assert_eq!(manager.theme_setting(), ThemeSetting::Light);
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn style_attribute_bootstrap_falls_back_to_storage() {
        let store = MemoryStore::new().with_value("theme", "dark");
        let manager = manager(&store, &MockProbe::light());
        manager.init_from_style_attribute(&InlineStyle::new());

        assert_eq!(manager.is_dark(), Some(true));
        assert!(manager.did_load());
    }

    struct FailingStore;

    impl PreferenceStore for FailingStore {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Format {
                path: "readonly".into(),
                message: "read-only".to_string(),
            })
        }
    }

    #[test]
    fn persistence_failure_is_absorbed() {
        let manager = ThemeManager::new(FailingStore, NullProbe);
        manager.change_theme_setting(ThemeSetting::Dark);
        assert_eq!(manager.is_dark(), Some(true));
        assert_eq!(manager.theme_setting(), ThemeSetting::Dark);
    }
}
