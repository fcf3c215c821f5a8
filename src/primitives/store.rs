// ============================================================================
// spark-stores - Store Primitive
// Writable and read-only store handles with lazy start/stop
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::types::{
    default_equals, CleanupFn, EqualsFn, Setter, StartFn, StoreInner, ValueFn,
};

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Handle returned by `subscribe`.
///
/// Unsubscribes when `unsubscribe()` is called or when it is dropped,
/// whichever comes first. Removing a store's last subscriber runs the
/// store's stop callback synchronously.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub(crate) fn new<T: Clone + 'static>(inner: Rc<StoreInner<T>>, id: u64) -> Self {
        Self {
            unsubscribe: Some(Box::new(move || inner.unsubscribe(id))),
        }
    }

    /// Unsubscribe now.
    pub fn unsubscribe(mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("live", &self.unsubscribe.is_some())
            .finish()
    }
}

// =============================================================================
// READABLE<T> - read-only handle
// =============================================================================

/// A read-only store handle.
///
/// Returned by `readable()`, `Store::readonly()` and the derived store
/// constructors. Cloning shares the same store.
///
/// # Example
///
/// ```
/// use spark_stores::readable;
///
/// let clock = readable(0u64, |set| {
///     set.set(42);
///     None
/// });
///
/// // Not started yet: the start callback runs on the first subscriber
/// assert_eq!(clock.get(), 0);
///
/// let sub = clock.subscribe(|t| assert_eq!(*t, 42));
/// assert_eq!(clock.get(), 42);
/// sub.unsubscribe();
/// ```
pub struct Readable<T> {
    inner: Rc<StoreInner<T>>,
}

impl<T> Clone for Readable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> Readable<T> {
    pub(crate) fn from_inner(inner: Rc<StoreInner<T>>) -> Self {
        Self { inner }
    }

    /// Create a readable store whose value is produced by `start`.
    pub fn new_with_start(
        value: T,
        equals: EqualsFn<T>,
        start: impl Fn(&Setter<T>) -> Option<CleanupFn> + 'static,
    ) -> Self {
        let start: StartFn<T> = Box::new(start);
        Self::from_inner(StoreInner::new(value, equals, Some(start)))
    }

    /// Get the committed value (cloning).
    ///
    /// Does not start the store. An idle derived store or polling resource
    /// keeps the value from its last active period; use `current()` to
    /// force a fresh read.
    pub fn get(&self) -> T {
        self.inner.get()
    }

    /// Access the committed value with a closure (avoids cloning).
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.with(f)
    }

    /// Subscribe to value changes.
    ///
    /// `on_value` runs immediately with the current value, then after each
    /// change. The first subscriber starts the store.
    pub fn subscribe(&self, on_value: impl Fn(&T) + 'static) -> Subscription {
        let on_value: ValueFn<T> = Rc::new(on_value);
        let id = self.inner.subscribe(on_value, None);
        Subscription::new(self.inner.clone(), id)
    }

    /// Subscribe with an invalidation callback.
    ///
    /// `on_invalidate` runs synchronously as soon as a change is committed,
    /// before any subscriber receives the new value. Derived stores use this
    /// to hold off recomputation until every changed source has delivered.
    pub fn subscribe_with_invalidate(
        &self,
        on_value: impl Fn(&T) + 'static,
        on_invalidate: impl Fn() + 'static,
    ) -> Subscription {
        let on_value: ValueFn<T> = Rc::new(on_value);
        let id = self.inner.subscribe(on_value, Some(Rc::new(on_invalidate)));
        Subscription::new(self.inner.clone(), id)
    }

    /// Read the value through a momentary subscription.
    ///
    /// Starts an idle store for the duration of the read, so a derived store
    /// recomputes from its sources first.
    pub fn current(&self) -> T {
        let seen: Rc<RefCell<Option<T>>> = Rc::new(RefCell::new(None));
        let slot = seen.clone();
        let sub = self.subscribe(move |value| {
            *slot.borrow_mut() = Some(value.clone());
        });
        sub.unsubscribe();
        let value = seen.borrow_mut().take();
        value.unwrap_or_else(|| self.get())
    }

    /// Whether the store has subscribers and has been started
    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscriber_count()
    }

    /// Get a reference to the inner store (for advanced use).
    pub fn inner(&self) -> &Rc<StoreInner<T>> {
        &self.inner
    }

    /// Whether two handles refer to the same store
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: std::fmt::Debug + Clone + 'static> std::fmt::Debug for Readable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Readable")
            .field("value", &self.get())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

// =============================================================================
// STORE<T> - writable handle
// =============================================================================

/// A writable reactive store.
///
/// # Example
///
/// ```
/// use spark_stores::writable;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let count = writable(0);
/// let seen = Rc::new(RefCell::new(Vec::new()));
///
/// let seen_clone = seen.clone();
/// let sub = count.subscribe(move |v| seen_clone.borrow_mut().push(*v));
///
/// count.set(1);
/// count.update(|n| n + 1);
/// count.set(2); // unchanged, no notification
///
/// assert_eq!(*seen.borrow(), vec![0, 1, 2]);
/// sub.unsubscribe();
/// ```
pub struct Store<T> {
    inner: Rc<StoreInner<T>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> Store<T> {
    /// Create a new store with the given initial value.
    pub fn new(value: T) -> Self
    where
        T: PartialEq,
    {
        Self::new_with_equals(value, default_equals)
    }

    /// Create a new store with a custom equality function.
    pub fn new_with_equals(value: T, equals: EqualsFn<T>) -> Self {
        Self {
            inner: StoreInner::new(value, equals, None),
        }
    }

    /// Create a store with a start callback.
    ///
    /// `start` runs when the first subscriber arrives and may set the value
    /// any number of times. The cleanup it returns runs when the last
    /// subscriber leaves.
    pub fn new_with_start(
        value: T,
        equals: EqualsFn<T>,
        start: impl Fn(&Setter<T>) -> Option<CleanupFn> + 'static,
    ) -> Self {
        let start: StartFn<T> = Box::new(start);
        Self {
            inner: StoreInner::new(value, equals, Some(start)),
        }
    }

    /// Get the current value (cloning).
    pub fn get(&self) -> T {
        self.inner.get()
    }

    /// Access the current value with a closure (avoids cloning).
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.with(f)
    }

    /// Set the store's value.
    ///
    /// Returns true if the value changed (based on the equality function).
    /// If the value didn't change, no notifications are sent.
    pub fn set(&self, value: T) -> bool {
        self.inner.set_value(value)
    }

    /// Set the value computed from the current one.
    ///
    /// # Example
    ///
    /// ```
    /// use spark_stores::writable;
    ///
    /// let count = writable(1);
    /// count.update(|n| n * 10);
    /// assert_eq!(count.get(), 10);
    /// ```
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool {
        let next = self.inner.with(f);
        self.inner.set_value(next)
    }

    /// Subscribe to value changes. See `Readable::subscribe`.
    pub fn subscribe(&self, on_value: impl Fn(&T) + 'static) -> Subscription {
        let on_value: ValueFn<T> = Rc::new(on_value);
        let id = self.inner.subscribe(on_value, None);
        Subscription::new(self.inner.clone(), id)
    }

    /// Subscribe with an invalidation callback. See
    /// `Readable::subscribe_with_invalidate`.
    pub fn subscribe_with_invalidate(
        &self,
        on_value: impl Fn(&T) + 'static,
        on_invalidate: impl Fn() + 'static,
    ) -> Subscription {
        let on_value: ValueFn<T> = Rc::new(on_value);
        let id = self.inner.subscribe(on_value, Some(Rc::new(on_invalidate)));
        Subscription::new(self.inner.clone(), id)
    }

    /// Read-only view of this store
    pub fn readonly(&self) -> Readable<T> {
        Readable::from_inner(self.inner.clone())
    }

    /// A weak setter, for handing write access to background work
    pub fn setter(&self) -> Setter<T> {
        Setter::new(Rc::downgrade(&self.inner))
    }

    /// Whether the store has subscribers and has been started
    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscriber_count()
    }

    /// Get a reference to the inner store (for advanced use).
    pub fn inner(&self) -> &Rc<StoreInner<T>> {
        &self.inner
    }
}

impl<T: std::fmt::Debug + Clone + 'static> std::fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("value", &self.get())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

// =============================================================================
// AS READABLE
// =============================================================================

/// Anything that can be viewed as a read-only store.
///
/// Derived stores accept any `AsReadable` as a source.
pub trait AsReadable {
    type Value: Clone + 'static;

    fn as_readable(&self) -> Readable<Self::Value>;
}

impl<T: Clone + 'static> AsReadable for Store<T> {
    type Value = T;

    fn as_readable(&self) -> Readable<T> {
        self.readonly()
    }
}

impl<T: Clone + 'static> AsReadable for Readable<T> {
    type Value = T;

    fn as_readable(&self) -> Readable<T> {
        self.clone()
    }
}

impl<T: Clone + 'static> From<&Store<T>> for Readable<T> {
    fn from(store: &Store<T>) -> Self {
        store.readonly()
    }
}

// =============================================================================
// STORE CREATION FUNCTIONS
// =============================================================================

/// Create a writable store.
///
/// # Example
///
/// ```
/// use spark_stores::writable;
///
/// let name = writable(String::from("hello"));
/// name.set(String::from("world"));
/// assert_eq!(name.get(), "world");
/// ```
pub fn writable<T>(value: T) -> Store<T>
where
    T: Clone + PartialEq + 'static,
{
    Store::new(value)
}

/// Create a writable store with a custom equality function.
///
/// # Example
///
/// ```
/// use spark_stores::{writable_with_equals, reactivity::equality::never_equals};
///
/// let always_notify = writable_with_equals(0, never_equals);
/// assert!(always_notify.set(0));
/// ```
pub fn writable_with_equals<T>(value: T, equals: EqualsFn<T>) -> Store<T>
where
    T: Clone + 'static,
{
    Store::new_with_equals(value, equals)
}

/// Create a writable store with a start callback.
pub fn writable_with_start<T>(
    value: T,
    start: impl Fn(&Setter<T>) -> Option<CleanupFn> + 'static,
) -> Store<T>
where
    T: Clone + PartialEq + 'static,
{
    Store::new_with_start(value, default_equals, start)
}

/// Create a read-only store whose value is produced by `start`.
pub fn readable<T>(
    value: T,
    start: impl Fn(&Setter<T>) -> Option<CleanupFn> + 'static,
) -> Readable<T>
where
    T: Clone + PartialEq + 'static,
{
    Readable::new_with_start(value, default_equals, start)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactivity::equality::{never_equals, safe_equals_f64};
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<u32>>, Rc<Cell<u32>>) {
        (Rc::new(Cell::new(0)), Rc::new(Cell::new(0)))
    }

    #[test]
    fn late_subscriber_sees_current_value() {
        let store = writable(1);
        store.set(7);

        let seen = Rc::new(Cell::new(0));
        let seen_clone = seen.clone();
        let _sub = store.subscribe(move |v| seen_clone.set(*v));

        assert_eq!(seen.get(), 7);
    }

    #[test]
    fn set_equal_value_does_not_notify() {
        let store = writable(5);
        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();
        let _sub = store.subscribe(move |_| calls_clone.set(calls_clone.get() + 1));

        assert!(!store.set(5));
        assert_eq!(calls.get(), 1);
        assert!(store.set(6));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn nan_is_equal_to_itself_with_safe_equals() {
        let store = writable_with_equals(f64::NAN, safe_equals_f64);
        assert!(!store.set(f64::NAN));
        assert!(store.set(1.0));
    }

    #[test]
    fn never_equals_notifies_every_set() {
        let store = writable_with_equals(vec![1], never_equals);
        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();
        let _sub = store.subscribe(move |_| calls_clone.set(calls_clone.get() + 1));

        store.set(vec![1]);
        store.set(vec![1]);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn start_and_stop_follow_subscriber_count() {
        let (starts, stops) = counter();
        let (s, t) = (starts.clone(), stops.clone());
        let store = writable_with_start(0, move |_| {
            s.set(s.get() + 1);
            let t = t.clone();
            Some(Box::new(move || t.set(t.get() + 1)) as CleanupFn)
        });

        let a = store.subscribe(|_| {});
        let b = store.subscribe(|_| {});
        assert_eq!(starts.get(), 1);
        assert!(store.is_active());

        a.unsubscribe();
        assert_eq!(stops.get(), 0);
        b.unsubscribe();
        assert_eq!(stops.get(), 1);
        assert!(!store.is_active());

        let _c = store.subscribe(|_| {});
        assert_eq!(starts.get(), 2);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let store = writable(0);
        {
            let _sub = store.subscribe(|_| {});
            assert_eq!(store.subscriber_count(), 1);
        }
        assert_eq!(store.subscriber_count(), 0);
        assert!(!store.is_active());
    }

    #[test]
    fn start_callback_sets_are_seen_by_first_subscriber() {
        let store = readable(0, |set| {
            set.set(1);
            set.set(2);
            set.update(|n| n + 1);
            None
        });

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let _sub = store.subscribe(move |v| seen_clone.borrow_mut().push(*v));

        assert_eq!(*seen.borrow(), vec![3]);
    }

    #[test]
    fn same_closure_twice_unsubscribes_independently() {
        let store = writable(0);
        let calls = Rc::new(Cell::new(0));
        let on_value = {
            let calls = calls.clone();
            move |_: &i32| calls.set(calls.get() + 1)
        };

        let a = store.subscribe(on_value.clone());
        let b = store.subscribe(on_value);
        assert_eq!(calls.get(), 2);

        a.unsubscribe();
        store.set(1);
        assert_eq!(calls.get(), 3);
        assert!(store.is_active());
        b.unsubscribe();
    }

    #[test]
    fn subscribers_notified_in_registration_order() {
        let store = writable(0);
        let log = Rc::new(RefCell::new(Vec::new()));

        let subs: Vec<Subscription> = (0..3)
            .map(|i| {
                let log = log.clone();
                store.subscribe(move |v| {
                    if *v != 0 {
                        log.borrow_mut().push(i);
                    }
                })
            })
            .collect();

        store.set(1);
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        drop(subs);
    }

    #[test]
    fn invalidate_runs_before_any_value_delivery() {
        let store = writable(0);
        let log = Rc::new(RefCell::new(Vec::new()));

        let l1 = log.clone();
        let l2 = log.clone();
        let _a = store.subscribe(move |v| l1.borrow_mut().push(format!("a:{v}")));
        let _b = store.subscribe_with_invalidate(
            move |v| l2.borrow_mut().push(format!("b:{v}")),
            {
                let log = log.clone();
                move || log.borrow_mut().push("b:invalid".to_string())
            },
        );
        log.borrow_mut().clear();

        store.set(1);
        assert_eq!(*log.borrow(), vec!["b:invalid", "a:1", "b:1"]);
    }

    #[test]
    fn subscribe_during_notification_affects_future_only() {
        let store = writable(0);
        let late_calls = Rc::new(Cell::new(0));
        let held: Rc<RefCell<Vec<Subscription>>> = Rc::new(RefCell::new(Vec::new()));

        let store_clone = store.clone();
        let late_clone = late_calls.clone();
        let held_clone = held.clone();
        let _sub = store.subscribe(move |v| {
            if *v == 1 {
                let late = late_clone.clone();
                let sub = store_clone.subscribe(move |_| late.set(late.get() + 1));
                held_clone.borrow_mut().push(sub);
            }
        });

        store.set(1);
        // Initial call on subscribe only
        assert_eq!(late_calls.get(), 1);

        store.set(2);
        assert_eq!(late_calls.get(), 2);
        held.borrow_mut().clear();
    }

    #[test]
    fn current_starts_idle_store_momentarily() {
        let (starts, stops) = counter();
        let (s, t) = (starts.clone(), stops.clone());
        let store = readable(0, move |set| {
            s.set(s.get() + 1);
            set.set(99);
            let t = t.clone();
            Some(Box::new(move || t.set(t.get() + 1)) as CleanupFn)
        });

        assert_eq!(store.current(), 99);
        assert_eq!((starts.get(), stops.get()), (1, 1));
        assert!(!store.is_active());
    }

    #[test]
    fn readonly_shares_state() {
        let store = writable(1);
        let view = store.readonly();
        store.set(2);
        assert_eq!(view.get(), 2);
        assert!(view.ptr_eq(&Readable::from(&store)));
    }

    #[test]
    fn start_panic_propagates_to_subscribe() {
        let attempts = Rc::new(Cell::new(0));
        let attempts_clone = attempts.clone();
        let store = writable_with_start(0, move |_| {
            attempts_clone.set(attempts_clone.get() + 1);
            if attempts_clone.get() == 1 {
                panic!("start failed");
            }
            None
        });

        let first = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _sub = store.subscribe(|_| {});
        }));
        assert!(first.is_err());
        assert_eq!(store.subscriber_count(), 0);
        assert!(!store.is_active());

        // The next subscriber starts the store again and receives updates
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let _sub = store.subscribe(move |v| seen_clone.borrow_mut().push(*v));
        assert_eq!(attempts.get(), 2);
        assert!(store.is_active());

        store.set(7);
        assert_eq!(*seen.borrow(), vec![0, 7]);
    }
}
