//! Listener registry with scoped subscriptions.
//!
//! Both the system preference probe and the theme resolver broadcast changes
//! to registered callbacks. A callback stays registered for as long as the
//! [`Subscription`] returned by [`Listeners::subscribe`] is alive; dropping the
//! guard removes it. The guard only holds a weak reference to the registry, so
//! it can outlive the registry without keeping it alive.
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use duskmode::Listeners;
//!
//! let listeners = Listeners::<bool>::new();
//! let seen = Rc::new(Cell::new(0));
//!
//! let counter = seen.clone();
//! let subscription = listeners.subscribe(move |_| counter.set(counter.get() + 1));
//! listeners.notify(true);
//! drop(subscription);
//! listeners.notify(false);
//!
//! assert_eq!(seen.get(), 1);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type Callback<T> = Rc<dyn Fn(T)>;

struct Registry<T> {
    next_id: u64,
    entries: Vec<(u64, Callback<T>)>,
}

/// A set of callbacks notified with values of type `T`.
///
/// Cloning yields another handle to the same set.
pub struct Listeners<T> {
    registry: Rc<RefCell<Registry<T>>>,
}

impl<T: Clone + 'static> Listeners<T> {
    /// Creates an empty listener set.
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Registers a callback, returning the guard that keeps it registered.
    pub fn subscribe(&self, callback: impl Fn(T) + 'static) -> Subscription {
        let id = {
            let mut registry = self.registry.borrow_mut();
            let id = registry.next_id;
            registry.next_id += 1;
            let callback: Callback<T> = Rc::new(callback);
            registry.entries.push((id, callback));
            id
        };

        let weak: Weak<RefCell<Registry<T>>> = Rc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(registry) = weak.upgrade() {
                registry
                    .borrow_mut()
                    .entries
                    .retain(|(entry_id, _)| *entry_id != id);
            }
        })
    }

    /// Invokes every registered callback with `value`.
    ///
    /// The callback list is captured before the first call, so callbacks may
    /// subscribe or unsubscribe while being notified. Changes take effect on
    /// the next notification.
    pub fn notify(&self, value: T) {
        let callbacks: Vec<Callback<T>> = self
            .registry
            .borrow()
            .entries
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();

        for callback in callbacks {
            callback(value.clone());
        }
    }

    /// Returns the number of registered callbacks.
    pub fn len(&self) -> usize {
        self.registry.borrow().entries.len()
    }

    /// Returns true if no callbacks are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + 'static> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Listeners<T> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<T> fmt::Debug for Listeners<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.registry.borrow().entries.len())
            .finish()
    }
}

/// Guard returned by a subscription.
///
/// The callback is deregistered when the guard is dropped or
/// [`cancel`](Subscription::cancel)led.
#[must_use = "dropping a Subscription immediately deregisters its listener"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A subscription to a source that never fires.
    pub fn noop() -> Self {
        Self { release: None }
    }

    /// Returns true unless this is a [`noop`](Subscription::noop) guard.
    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }

    /// Deregisters the listener now.
    pub fn cancel(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
