//! Published state cell
//!
//! A single writer replaces the whole value; readers always clone a complete
//! snapshot and can never observe a half-applied update. Change notification
//! is offered three ways:
//! - blocking waits (`wait_until`) for command/test threads
//! - a callback registry for UI glue
//! - a `tokio::sync::watch` receiver for async consumers

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, RwLock};
use tokio::sync::watch;

/// Change callback
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Handle returned by [`Published::subscribe`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Slot<T> {
    version: u64,
    value: T,
}

/// Versioned, atomically replaced value with change notification
pub struct Published<T> {
    slot: Mutex<Slot<T>>,
    changed: Condvar,
    listeners: RwLock<Vec<(ListenerId, Listener<T>)>>,
    next_listener: AtomicU64,
    watch: watch::Sender<T>,
}

impl<T> Published<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(value: T) -> Self {
        let (watch, _) = watch::channel(value.clone());
        Published {
            slot: Mutex::new(Slot { version: 0, value }),
            changed: Condvar::new(),
            listeners: RwLock::new(Vec::new()),
            next_listener: AtomicU64::new(1),
            watch,
        }
    }

    /// Clone of the current value
    pub fn snapshot(&self) -> T {
        self.slot.lock().value.clone()
    }

    /// Current value together with its version
    pub fn versioned(&self) -> (u64, T) {
        let slot = self.slot.lock();
        (slot.version, slot.value.clone())
    }

    /// Number of publications so far
    pub fn version(&self) -> u64 {
        self.slot.lock().version
    }

    /// Replace the value and notify everyone
    pub fn publish(&self, value: T) {
        {
            let mut slot = self.slot.lock();
            slot.value = value.clone();
            slot.version += 1;
            self.watch.send_replace(value.clone());
        }
        self.changed.notify_all();
        self.notify_listeners(&value);
    }

    /// Apply `f` to a copy of the value and publish it.
    /// Returns the new value.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> T {
        let value = {
            let mut slot = self.slot.lock();
            f(&mut slot.value);
            slot.version += 1;
            self.watch.send_replace(slot.value.clone());
            slot.value.clone()
        };
        self.changed.notify_all();
        self.notify_listeners(&value);
        value
    }

    /// Register a change callback. Callbacks run on the publishing thread
    /// and must not call back into whatever owns this cell.
    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Returns false if the id was not registered
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Async receiver that sees every latest value
    pub fn watch(&self) -> watch::Receiver<T> {
        self.watch.subscribe()
    }

    /// Block until `pred` holds for the published value, or the timeout
    /// elapses. Returns the matching snapshot.
    pub fn wait_until(&self, mut pred: impl FnMut(&T) -> bool, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot.lock();
        loop {
            if pred(&slot.value) {
                return Some(slot.value.clone());
            }
            if self.changed.wait_until(&mut slot, deadline).timed_out() {
                return pred(&slot.value).then(|| slot.value.clone());
            }
        }
    }

    /// Block until the version moves past `seen`
    pub fn wait_for_change(&self, seen: u64, timeout: Duration) -> Option<(u64, T)> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot.lock();
        while slot.version <= seen {
            if self.changed.wait_until(&mut slot, deadline).timed_out() {
                break;
            }
        }
        (slot.version > seen).then(|| (slot.version, slot.value.clone()))
    }

    fn notify_listeners(&self, value: &T) {
        let listeners: Vec<Listener<T>> = self
            .listeners
            .read()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(value);
        }
    }
}

impl<T> Published<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Publish only if the value differs. Returns whether it was published.
    pub fn publish_if_changed(&self, value: T) -> bool {
        {
            let mut slot = self.slot.lock();
            if slot.value == value {
                return false;
            }
            slot.value = value.clone();
            slot.version += 1;
            self.watch.send_replace(value.clone());
        }
        self.changed.notify_all();
        self.notify_listeners(&value);
        true
    }
}

impl<T> Default for Published<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}
