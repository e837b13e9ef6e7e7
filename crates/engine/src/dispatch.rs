//! Address-scoped event routing.
//!
//! Subscribers register at an address with a [`Propagation`] breadth. An
//! event dispatched at address `a` reaches:
//! - `This` subscribers registered exactly at `a`
//! - `Parent` subscribers registered at the parent of `a`
//! - `Children` subscribers registered at `a` or any of its ancestors

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use boxgraph_core::{Address, Subscription};
use parking_lot::Mutex;

/// How far below its address a subscription reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Propagation {
    /// Events at the address itself
    This,
    /// Events at direct children of the address
    Parent,
    /// Events at the address and everything below it
    Children,
}

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;
type Registry<E> = BTreeMap<Address, Vec<(u64, Callback<E>)>>;

struct Monitors<E> {
    next_id: u64,
    this: Registry<E>,
    parent: Registry<E>,
    children: Registry<E>,
}

impl<E> Monitors<E> {
    fn registry(&mut self, propagation: Propagation) -> &mut Registry<E> {
        match propagation {
            Propagation::This => &mut self.this,
            Propagation::Parent => &mut self.parent,
            Propagation::Children => &mut self.children,
        }
    }
}

/// Router from addresses to subscribed callbacks.
pub struct Dispatchers<E> {
    monitors: Arc<Mutex<Monitors<E>>>,
}

impl<E: 'static> Dispatchers<E> {
    /// Router with no subscribers.
    pub fn new() -> Self {
        Self {
            monitors: Arc::new(Mutex::new(Monitors {
                next_id: 0,
                this: BTreeMap::new(),
                parent: BTreeMap::new(),
                children: BTreeMap::new(),
            })),
        }
    }

    /// Subscribe `callback` to events at `address` with the given breadth.
    pub fn subscribe(
        &self,
        propagation: Propagation,
        address: Address,
        callback: impl Fn(&E) + Send + Sync + 'static,
    ) -> Subscription {
        let id = {
            let mut monitors = self.monitors.lock();
            let id = monitors.next_id;
            monitors.next_id += 1;
            monitors
                .registry(propagation)
                .entry(address.clone())
                .or_default()
                .push((id, Arc::new(callback)));
            id
        };
        let weak: Weak<Mutex<Monitors<E>>> = Arc::downgrade(&self.monitors);
        Subscription::new(move || {
            if let Some(monitors) = weak.upgrade() {
                let mut monitors = monitors.lock();
                let registry = monitors.registry(propagation);
                if let Some(entries) = registry.get_mut(&address) {
                    entries.retain(|(entry, _)| *entry != id);
                    if entries.is_empty() {
                        registry.remove(&address);
                    }
                }
            }
        })
    }

    /// Deliver `event` for `address`. Callbacks run outside the lock, in the
    /// order `This`, `Parent`, `Children` (outermost ancestor first).
    pub fn dispatch(&self, address: &Address, event: &E) {
        let callbacks = self.collect(address);
        for callback in callbacks {
            callback(event);
        }
    }

    fn collect(&self, address: &Address) -> Vec<Callback<E>> {
        let monitors = self.monitors.lock();
        let mut callbacks = Vec::new();
        let mut extend = |registry: &Registry<E>, at: &Address| {
            if let Some(entries) = registry.get(at) {
                callbacks.extend(entries.iter().map(|(_, callback)| Arc::clone(callback)));
            }
        };
        extend(&monitors.this, address);
        if let Some(parent) = address.parent() {
            extend(&monitors.parent, &parent);
        }
        for ancestor in address.lineage() {
            extend(&monitors.children, &ancestor);
        }
        callbacks
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        let monitors = self.monitors.lock();
        [&monitors.this, &monitors.parent, &monitors.children]
            .iter()
            .flat_map(|registry| registry.values())
            .map(Vec::len)
            .sum()
    }

    /// Check if there are no subscriptions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: 'static> Default for Dispatchers<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxgraph_core::Uuid;

    fn at(keys: &[u16]) -> Address {
        Address::new(Uuid::from_u128(1), keys.iter().copied())
    }

    fn recorder(
        dispatchers: &Dispatchers<u32>,
        propagation: Propagation,
        address: Address,
    ) -> (Arc<Mutex<Vec<u32>>>, Subscription) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let subscription =
            dispatchers.subscribe(propagation, address, move |event| sink.lock().push(*event));
        (log, subscription)
    }

    #[test]
    fn breadth_selects_events() {
        let dispatchers = Dispatchers::new();
        let (this, _a) = recorder(&dispatchers, Propagation::This, at(&[1]));
        let (parent, _b) = recorder(&dispatchers, Propagation::Parent, at(&[1]));
        let (children, _c) = recorder(&dispatchers, Propagation::Children, at(&[1]));

        dispatchers.dispatch(&at(&[1]), &1);
        dispatchers.dispatch(&at(&[1, 2]), &2);
        dispatchers.dispatch(&at(&[1, 2, 3]), &3);
        dispatchers.dispatch(&at(&[2]), &4);

        assert_eq!(*this.lock(), vec![1]);
        assert_eq!(*parent.lock(), vec![2]);
        assert_eq!(*children.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn box_level_children_see_all_fields() {
        let dispatchers = Dispatchers::new();
        let (log, _s) = recorder(&dispatchers, Propagation::Children, at(&[]));
        dispatchers.dispatch(&at(&[5, 6]), &7);
        assert_eq!(*log.lock(), vec![7]);
    }

    #[test]
    fn terminate_unsubscribes() {
        let dispatchers = Dispatchers::new();
        let (log, subscription) = recorder(&dispatchers, Propagation::This, at(&[1]));
        subscription.terminate();
        dispatchers.dispatch(&at(&[1]), &1);
        assert!(log.lock().is_empty());
        assert!(dispatchers.is_empty());
    }
}
