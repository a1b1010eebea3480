//! System color-scheme probes.
//!
//! A [`SystemProbe`] answers "does the OS currently prefer dark?" and lets the
//! resolver subscribe to changes of that answer. Platforms without the signal
//! are modelled by [`NullProbe`], which always reports light and never fires.
//!
//! # Implementations
//!
//! - [`OsProbe`]: queries the operating system through `dark-light`. The OS
//!   query is pull-only, so hosts call [`OsProbe::poll`] from their event loop
//!   to turn changes into notifications.
//! - [`MockProbe`]: a value under test control, with change simulation.
//! - [`NullProbe`]: no capability.

use std::cell::Cell;
use std::rc::Rc;

use dark_light::Mode as OsThemeMode;

use crate::listeners::{Listeners, Subscription};
use crate::setting::ColorMode;

/// Read/subscribe access to the OS "prefers dark" signal.
pub trait SystemProbe {
    /// True iff the OS currently prefers a dark color scheme.
    ///
    /// Returns `false` when the platform exposes no such signal.
    fn currently_dark(&self) -> bool;

    /// Registers `listener` to be called with the new value whenever the
    /// signal changes.
    fn subscribe(&self, listener: Box<dyn Fn(bool)>) -> Subscription;
}

impl<P: SystemProbe + ?Sized> SystemProbe for Rc<P> {
    fn currently_dark(&self) -> bool {
        (**self).currently_dark()
    }

    fn subscribe(&self, listener: Box<dyn Fn(bool)>) -> Subscription {
        (**self).subscribe(listener)
    }
}

type Detector = fn() -> Option<ColorMode>;

/// Probe backed by the operating system's appearance setting.
///
/// Cloning yields another handle to the same listeners and last observation.
#[derive(Debug, Clone)]
pub struct OsProbe {
    detector: Detector,
    last: Rc<Cell<bool>>,
    listeners: Listeners<bool>,
}

impl OsProbe {
    /// Creates a probe using the OS detector.
    pub fn new() -> Self {
        Self::with_detector(os_color_mode)
    }

    /// Creates a probe with a custom detector.
    ///
    /// The detector returns `None` when the platform has no color-scheme signal.
    pub fn with_detector(detector: Detector) -> Self {
        let initial = detect_dark(detector);
        Self {
            detector,
            last: Rc::new(Cell::new(initial)),
            listeners: Listeners::new(),
        }
    }

    /// Re-queries the OS and notifies listeners if the answer changed since
    /// the last observation. Returns the current value.
    pub fn poll(&self) -> bool {
        let dark = detect_dark(self.detector);
        if self.last.replace(dark) != dark {
            tracing::debug!(dark, "system color scheme changed");
            self.listeners.notify(dark);
        }
        dark
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for OsProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemProbe for OsProbe {
    fn currently_dark(&self) -> bool {
        detect_dark(self.detector)
    }

    fn subscribe(&self, listener: Box<dyn Fn(bool)>) -> Subscription {
        self.listeners.subscribe(listener)
    }
}

fn detect_dark(detector: Detector) -> bool {
    detector().map(|mode| mode.is_dark()).unwrap_or(false)
}

fn os_color_mode() -> Option<ColorMode> {
    match dark_light::detect() {
        Ok(OsThemeMode::Dark) => Some(ColorMode::Dark),
        Ok(OsThemeMode::Light) => Some(ColorMode::Light),
        Ok(OsThemeMode::Unspecified) => None,
        Err(e) => {
            tracing::debug!("system color scheme unavailable: {:?}", e);
            None
        }
    }
}

/// Probe whose value is set by the caller.
///
/// Clones share state, so a test keeps one handle to drive OS changes while
/// the resolver owns another.
#[derive(Debug, Clone, Default)]
pub struct MockProbe {
    dark: Rc<Cell<bool>>,
    listeners: Listeners<bool>,
}

impl MockProbe {
    /// A probe reporting light.
    pub fn light() -> Self {
        Self::default()
    }

    /// A probe reporting dark.
    pub fn dark() -> Self {
        let probe = Self::default();
        probe.dark.set(true);
        probe
    }

    /// Changes the simulated OS preference, notifying listeners if it differs.
    pub fn set_dark(&self, dark: bool) {
        if self.dark.replace(dark) != dark {
            self.listeners.notify(dark);
        }
    }

    /// Sets the value and notifies listeners even if it did not change.
    pub fn emit(&self, dark: bool) {
        self.dark.set(dark);
        self.listeners.notify(dark);
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl SystemProbe for MockProbe {
    fn currently_dark(&self) -> bool {
        self.dark.get()
    }

    fn subscribe(&self, listener: Box<dyn Fn(bool)>) -> Subscription {
        self.listeners.subscribe(listener)
    }
}

/// Probe for platforms without a color-scheme signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProbe;

impl SystemProbe for NullProbe {
    fn currently_dark(&self) -> bool {
        false
    }

    fn subscribe(&self, _listener: Box<dyn Fn(bool)>) -> Subscription {
        Subscription::noop()
    }
}
