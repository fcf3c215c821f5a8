// ============================================================================
// spark-stores - Type Definitions
// The shared store state behind every store handle
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::constants::*;
use crate::reactivity::batching::{enqueue_notification, flush_notifications};

// =============================================================================
// CALLBACK TYPES
// =============================================================================

/// Equality function type for comparing store values.
///
/// Returns true when the two values are considered the same, in which case
/// `set` is a no-op.
pub type EqualsFn<T> = fn(&T, &T) -> bool;

/// Default equality using PartialEq
pub fn default_equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

/// Called with the store's value on subscribe and after every change.
pub type ValueFn<T> = Rc<dyn Fn(&T)>;

/// Called synchronously when a change is about to be delivered.
pub type InvalidateFn = Rc<dyn Fn()>;

/// Teardown returned by start callbacks and async derived combiners.
pub type CleanupFn = Box<dyn FnOnce()>;

/// Start callback: runs on the 0 -> 1 subscriber transition.
/// The returned cleanup runs on the 1 -> 0 transition.
pub type StartFn<T> = Box<dyn Fn(&Setter<T>) -> Option<CleanupFn>>;

// =============================================================================
// SUBSCRIBER
// =============================================================================

pub(crate) struct Subscriber<T> {
    id: u64,
    on_value: ValueFn<T>,
    on_invalidate: Option<InvalidateFn>,
}

impl<T> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            on_value: self.on_value.clone(),
            on_invalidate: self.on_invalidate.clone(),
        }
    }
}

// =============================================================================
// STORE IDS
// =============================================================================

thread_local! {
    /// Next store id on this thread (ids are never reused)
    static NEXT_STORE_ID: Cell<u64> = const { Cell::new(0) };
}

fn next_store_id() -> u64 {
    NEXT_STORE_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    })
}

// =============================================================================
// STORE INNER (the data behind Store<T> and Readable<T>)
// =============================================================================

/// The internal state of a store.
///
/// Handles (`Store<T>`, `Readable<T>`) share one `Rc<StoreInner<T>>`.
/// Start callbacks only ever see a `Setter<T>`, which holds a `Weak`
/// reference so background work never keeps a store alive on its own.
pub struct StoreInner<T> {
    /// Thread-unique identity, used to deduplicate queued notifications
    id: u64,

    /// Lifecycle flags (ACTIVE, STARTING, STOPPING)
    flags: Cell<u32>,

    /// The committed value
    value: RefCell<T>,

    /// Subscribers in registration order
    subscribers: RefCell<Vec<Subscriber<T>>>,

    /// Next subscriber id (ids are never reused)
    next_id: Cell<u64>,

    /// Equality function for change detection
    equals: EqualsFn<T>,

    /// Runs when the first subscriber arrives
    start: Option<StartFn<T>>,

    /// Cleanup returned by the last `start` run
    stop: RefCell<Option<CleanupFn>>,
}

impl<T: Clone + 'static> StoreInner<T> {
    pub(crate) fn new(value: T, equals: EqualsFn<T>, start: Option<StartFn<T>>) -> Rc<Self> {
        Rc::new(Self {
            id: next_store_id(),
            flags: Cell::new(0),
            value: RefCell::new(value),
            subscribers: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            equals,
            start,
            stop: RefCell::new(None),
        })
    }

    /// Get the committed value (cloning)
    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }

    /// Get the committed value with a closure (avoids clone)
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    /// Whether the store currently has subscribers and has been started
    pub fn is_active(&self) -> bool {
        self.flags.get() & ACTIVE != 0
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Get the equality function
    pub fn equals_fn(&self) -> EqualsFn<T> {
        self.equals
    }

    /// Identity of this store, used to deduplicate queued notifications.
    pub(crate) fn key(&self) -> u64 {
        self.id
    }

    /// Set the value, notifying subscribers if it changed.
    /// Returns true if the value changed.
    pub(crate) fn set_value(self: &Rc<Self>, value: T) -> bool {
        let changed = {
            let current = self.value.borrow();
            !(self.equals)(&current, &value)
        };

        if !changed {
            return false;
        }

        *self.value.borrow_mut() = value;

        // Sets issued by a start callback land before the first delivery,
        // which always reads the latest value.
        if self.is_active() {
            self.notify();
        }

        true
    }

    /// Two-phase notification: invalidate everyone now, queue the values.
    fn notify(self: &Rc<Self>) {
        let subscribers = self.subscribers.borrow().clone();
        let key = self.key();

        for subscriber in subscribers {
            if let Some(on_invalidate) = &subscriber.on_invalidate {
                on_invalidate();
            }

            let weak = Rc::downgrade(self);
            let on_value = subscriber.on_value.clone();
            enqueue_notification(
                (key, subscriber.id),
                Box::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        let value = inner.get();
                        on_value(&value);
                    }
                }),
            );
        }

        flush_notifications();
    }

    /// Register a subscriber, starting the store if it is the first one.
    /// Returns the subscriber id.
    pub(crate) fn subscribe(
        self: &Rc<Self>,
        on_value: ValueFn<T>,
        on_invalidate: Option<InvalidateFn>,
    ) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let is_first = {
            let mut subscribers = self.subscribers.borrow_mut();
            subscribers.push(Subscriber {
                id,
                on_value: on_value.clone(),
                on_invalidate,
            });
            subscribers.len() == 1
        };

        if is_first && self.flags.get() & (ACTIVE | STARTING) == 0 {
            // A panicking start leaves no registration behind, so the next
            // subscriber runs start again.
            struct RegistrationGuard<'a, T> {
                subscribers: &'a RefCell<Vec<Subscriber<T>>>,
                id: u64,
            }

            impl<T> Drop for RegistrationGuard<'_, T> {
                fn drop(&mut self) {
                    if std::thread::panicking() {
                        self.subscribers.borrow_mut().retain(|s| s.id != self.id);
                    }
                }
            }

            let _guard = RegistrationGuard {
                subscribers: &self.subscribers,
                id,
            };
            self.start();
        }

        let value = self.get();
        on_value(&value);

        id
    }

    fn start(self: &Rc<Self>) {
        self.flags.set(self.flags.get() | STARTING);

        // Clear STARTING even if the start callback panics
        struct StartGuard<'a>(&'a Cell<u32>);

        impl Drop for StartGuard<'_> {
            fn drop(&mut self) {
                self.0.set(self.0.get() & !STARTING);
            }
        }

        let _guard = StartGuard(&self.flags);

        let cleanup = match &self.start {
            Some(start) => start(&Setter::new(Rc::downgrade(self))),
            None => None,
        };
        *self.stop.borrow_mut() = cleanup;
        self.flags.set(self.flags.get() | ACTIVE);
    }

    /// Remove a subscriber, stopping the store if it was the last one.
    pub(crate) fn unsubscribe(&self, id: u64) {
        let now_empty = {
            let mut subscribers = self.subscribers.borrow_mut();
            let before = subscribers.len();
            subscribers.retain(|s| s.id != id);
            before != subscribers.len() && subscribers.is_empty()
        };

        if now_empty && self.is_active() {
            self.stop();
        }
    }

    fn stop(&self) {
        self.flags.set((self.flags.get() & !ACTIVE) | STOPPING);

        struct StopGuard<'a>(&'a Cell<u32>);

        impl Drop for StopGuard<'_> {
            fn drop(&mut self) {
                self.0.set(self.0.get() & !STOPPING);
            }
        }

        let _guard = StopGuard(&self.flags);

        let cleanup = self.stop.borrow_mut().take();
        if let Some(cleanup) = cleanup {
            cleanup();
        }
    }
}

// =============================================================================
// SETTER
// =============================================================================

/// Write access handed to start callbacks and async derived combiners.
///
/// Holds a weak reference: once every handle and subscription to the store
/// is gone, `set` becomes a no-op and `is_live` returns false.
pub struct Setter<T> {
    inner: Weak<StoreInner<T>>,
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> Setter<T> {
    pub(crate) fn new(inner: Weak<StoreInner<T>>) -> Self {
        Self { inner }
    }

    /// Set the store's value. Returns true if the value changed.
    pub fn set(&self, value: T) -> bool {
        match self.inner.upgrade() {
            Some(inner) => inner.set_value(value),
            None => false,
        }
    }

    /// Set the store's value from its current value.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool {
        match self.inner.upgrade() {
            Some(inner) => {
                let next = inner.with(f);
                inner.set_value(next)
            }
            None => false,
        }
    }

    /// Whether the store behind this setter still exists
    pub fn is_live(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_starts_inactive() {
        let inner = StoreInner::new(1, default_equals, None);
        assert!(!inner.is_active());
        assert_eq!(inner.subscriber_count(), 0);
        assert_eq!(inner.get(), 1);
    }

    #[test]
    fn set_value_respects_equality() {
        let inner = StoreInner::new(1, default_equals, None);
        assert!(!inner.set_value(1));
        assert!(inner.set_value(2));
        assert_eq!(inner.get(), 2);
    }

    #[test]
    fn subscribe_activates_and_unsubscribe_deactivates() {
        let inner = StoreInner::new(0, default_equals, None);
        let id = inner.subscribe(Rc::new(|_: &i32| {}), None);
        assert!(inner.is_active());
        inner.unsubscribe(id);
        assert!(!inner.is_active());
    }

    #[test]
    fn unsubscribe_unknown_id_is_noop() {
        let inner = StoreInner::new(0, default_equals, None);
        let id = inner.subscribe(Rc::new(|_: &i32| {}), None);
        inner.unsubscribe(id + 100);
        assert!(inner.is_active());
        assert_eq!(inner.subscriber_count(), 1);
    }

    #[test]
    fn store_keys_are_never_reused() {
        let first = StoreInner::new(0, default_equals, None);
        let second = StoreInner::new(0, default_equals, None);
        assert_ne!(first.key(), second.key());

        let dropped = second.key();
        drop(second);
        let third = StoreInner::new(0, default_equals, None);
        assert_ne!(third.key(), dropped);
        assert!(third.key() > dropped);
        assert_ne!(third.key(), first.key());
    }

    #[test]
    fn panicking_start_leaves_no_subscriber() {
        let attempts = Rc::new(Cell::new(0));
        let attempts_clone = attempts.clone();
        let start: StartFn<i32> = Box::new(move |_: &Setter<i32>| -> Option<CleanupFn> {
            attempts_clone.set(attempts_clone.get() + 1);
            if attempts_clone.get() == 1 {
                panic!("start failed");
            }
            None
        });
        let inner = StoreInner::new(0, default_equals, Some(start));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            inner.subscribe(Rc::new(|_: &i32| {}), None)
        }));
        assert!(result.is_err());
        assert_eq!(inner.subscriber_count(), 0);
        assert!(!inner.is_active());

        inner.subscribe(Rc::new(|_: &i32| {}), None);
        assert_eq!(attempts.get(), 2);
        assert!(inner.is_active());
    }

    #[test]
    fn setter_outlived_store_is_dead() {
        let inner = StoreInner::new(0, default_equals, None);
        let setter = Setter::new(Rc::downgrade(&inner));
        assert!(setter.is_live());
        assert!(setter.set(5));
        drop(inner);
        assert!(!setter.is_live());
        assert!(!setter.set(6));
    }
}
