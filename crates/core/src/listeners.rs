//! Listener registries and subscription handles.
//!
//! Registries hand out a [`Subscription`] per registered listener. The
//! listener stays registered until the handle is terminated; dropping the
//! handle without terminating it keeps the listener alive for the lifetime
//! of the registry.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Handle that removes a listener when terminated.
#[must_use = "a subscription must be kept to terminate it later"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Create a subscription that runs `release` on termination.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A subscription with nothing to release.
    pub fn empty() -> Self {
        Self { release: None }
    }

    /// Remove the listener.
    pub fn terminate(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

struct Slots<T: ?Sized> {
    next_id: u64,
    entries: Vec<(u64, Arc<T>)>,
}

/// Ordered set of listeners of one kind.
///
/// Notification takes a snapshot of the registered listeners first, so a
/// listener may subscribe or terminate others while being notified.
pub struct Listeners<T: ?Sized> {
    slots: Arc<Mutex<Slots<T>>>,
}

impl<T: ?Sized + Send + Sync + 'static> Listeners<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Register a listener. Listeners are notified in registration order.
    pub fn subscribe(&self, listener: Arc<T>) -> Subscription {
        let id = {
            let mut slots = self.slots.lock();
            let id = slots.next_id;
            slots.next_id += 1;
            slots.entries.push((id, listener));
            id
        };
        let weak: Weak<Mutex<Slots<T>>> = Arc::downgrade(&self.slots);
        Subscription::new(move || {
            if let Some(slots) = weak.upgrade() {
                slots.lock().entries.retain(|(entry, _)| *entry != id);
            }
        })
    }

    /// Current listeners in registration order.
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.slots
            .lock()
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    /// Call `notify` for every listener.
    pub fn for_each(&self, mut notify: impl FnMut(&T)) {
        for listener in self.snapshot() {
            notify(&listener);
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.slots.lock().entries.len()
    }

    /// Check if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: ?Sized + Send + Sync + 'static> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}
