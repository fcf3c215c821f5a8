// ============================================================================
// spark-stores - Derived Stores
// Read-only stores computed from one or more source stores
// ============================================================================
//
// A derived store subscribes to its sources only while it has subscribers
// itself. Each source subscription carries an invalidate callback that sets
// the source's bit in a pending mask; the value callback clears it. The
// combiner only runs when the mask is empty, so a derived store never sees
// a half-updated set of inputs.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::core::constants::MAX_DERIVED_SOURCES;
use crate::core::types::{default_equals, CleanupFn, EqualsFn, Setter};
use crate::primitives::store::{AsReadable, Readable, Store, Subscription};

// =============================================================================
// SOURCES
// =============================================================================

/// Index-aware callback handed to `Sources::subscribe_each`.
pub type SourceFn = Rc<dyn Fn(usize)>;

/// The inputs of a derived store.
///
/// Implemented for a single store (`Store<T>`, `Readable<T>`,
/// `PollingResource<T>`), for tuples of two or three stores, and for a
/// `Vec` of same-typed stores.
pub trait Sources: Clone + 'static {
    /// The value tuple handed to the combiner
    type Values: 'static;

    /// Number of underlying stores
    fn len(&self) -> usize;

    /// Whether there are no underlying stores
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Committed values of every source, in order
    fn values(&self) -> Self::Values;

    /// Subscribe to every source. Callbacks receive the source's index.
    fn subscribe_each(&self, on_value: &SourceFn, on_invalidate: &SourceFn) -> Vec<Subscription>;
}

/// Subscribe to one source, tagging its callbacks with `index`.
pub(crate) fn subscribe_indexed<T: Clone + 'static>(
    source: &Readable<T>,
    index: usize,
    on_value: &SourceFn,
    on_invalidate: &SourceFn,
) -> Subscription {
    let on_value = on_value.clone();
    let on_invalidate = on_invalidate.clone();
    source.subscribe_with_invalidate(move |_| on_value(index), move || on_invalidate(index))
}

impl<T: Clone + 'static> Sources for Store<T> {
    type Values = T;

    fn len(&self) -> usize {
        1
    }

    fn values(&self) -> T {
        self.get()
    }

    fn subscribe_each(&self, on_value: &SourceFn, on_invalidate: &SourceFn) -> Vec<Subscription> {
        vec![subscribe_indexed(&self.readonly(), 0, on_value, on_invalidate)]
    }
}

impl<T: Clone + 'static> Sources for Readable<T> {
    type Values = T;

    fn len(&self) -> usize {
        1
    }

    fn values(&self) -> T {
        self.get()
    }

    fn subscribe_each(&self, on_value: &SourceFn, on_invalidate: &SourceFn) -> Vec<Subscription> {
        vec![subscribe_indexed(self, 0, on_value, on_invalidate)]
    }
}

impl<A, B> Sources for (A, B)
where
    A: AsReadable + Clone + 'static,
    B: AsReadable + Clone + 'static,
{
    type Values = (A::Value, B::Value);

    fn len(&self) -> usize {
        2
    }

    fn values(&self) -> Self::Values {
        (self.0.as_readable().get(), self.1.as_readable().get())
    }

    fn subscribe_each(&self, on_value: &SourceFn, on_invalidate: &SourceFn) -> Vec<Subscription> {
        vec![
            subscribe_indexed(&self.0.as_readable(), 0, on_value, on_invalidate),
            subscribe_indexed(&self.1.as_readable(), 1, on_value, on_invalidate),
        ]
    }
}

impl<A, B, C> Sources for (A, B, C)
where
    A: AsReadable + Clone + 'static,
    B: AsReadable + Clone + 'static,
    C: AsReadable + Clone + 'static,
{
    type Values = (A::Value, B::Value, C::Value);

    fn len(&self) -> usize {
        3
    }

    fn values(&self) -> Self::Values {
        (
            self.0.as_readable().get(),
            self.1.as_readable().get(),
            self.2.as_readable().get(),
        )
    }

    fn subscribe_each(&self, on_value: &SourceFn, on_invalidate: &SourceFn) -> Vec<Subscription> {
        vec![
            subscribe_indexed(&self.0.as_readable(), 0, on_value, on_invalidate),
            subscribe_indexed(&self.1.as_readable(), 1, on_value, on_invalidate),
            subscribe_indexed(&self.2.as_readable(), 2, on_value, on_invalidate),
        ]
    }
}

impl<R> Sources for Vec<R>
where
    R: AsReadable + Clone + 'static,
{
    type Values = Vec<R::Value>;

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn values(&self) -> Self::Values {
        self.iter().map(|s| s.as_readable().get()).collect()
    }

    fn subscribe_each(&self, on_value: &SourceFn, on_invalidate: &SourceFn) -> Vec<Subscription> {
        self.iter()
            .enumerate()
            .map(|(i, s)| subscribe_indexed(&s.as_readable(), i, on_value, on_invalidate))
            .collect()
    }
}

// =============================================================================
// DERIVE STATE
// =============================================================================

/// Per-activation bookkeeping of a derived store.
struct DeriveState {
    /// Bit i set = source i announced a change it has not delivered yet
    pending: Cell<u64>,

    /// True once every source has been subscribed (initial round delivered)
    started: Cell<bool>,

    /// Cleanup returned by the last async combiner run
    cleanup: RefCell<Option<CleanupFn>>,
}

impl DeriveState {
    fn new() -> Rc<Self> {
        Rc::new(Self {
            pending: Cell::new(0),
            started: Cell::new(false),
            cleanup: RefCell::new(None),
        })
    }

    fn mark_pending(&self, index: usize) {
        self.pending.set(self.pending.get() | (1u64 << index));
    }

    fn clear_pending(&self, index: usize) {
        self.pending.set(self.pending.get() & !(1u64 << index));
    }

    fn is_settled(&self) -> bool {
        self.pending.get() == 0
    }

    fn run_cleanup(&self) {
        let cleanup = self.cleanup.borrow_mut().take();
        if let Some(cleanup) = cleanup {
            cleanup();
        }
    }
}

fn check_source_count<S: Sources>(sources: &S) {
    assert!(
        sources.len() <= MAX_DERIVED_SOURCES,
        "derived store supports at most {MAX_DERIVED_SOURCES} sources, got {}",
        sources.len()
    );
}

/// Build the start callback shared by every derived flavor.
fn derive<S, T, F>(sources: S, initial: T, equals: EqualsFn<T>, recompute: F) -> Readable<T>
where
    S: Sources,
    T: Clone + 'static,
    F: Fn(&S::Values, &Setter<T>) -> Option<CleanupFn> + 'static,
{
    check_source_count(&sources);
    let recompute = Rc::new(recompute);

    Readable::new_with_start(initial, equals, move |setter| {
        let state = DeriveState::new();

        let sync: Rc<dyn Fn()> = {
            let state = state.clone();
            let sources = sources.clone();
            let setter = setter.clone();
            let recompute = recompute.clone();
            Rc::new(move || {
                if !state.is_settled() {
                    return;
                }
                state.run_cleanup();
                let values = sources.values();
                let cleanup = recompute(&values, &setter);
                *state.cleanup.borrow_mut() = cleanup;
            })
        };

        let on_value: SourceFn = {
            let state = state.clone();
            let sync = sync.clone();
            Rc::new(move |index| {
                state.clear_pending(index);
                if state.started.get() {
                    sync();
                }
            })
        };

        let on_invalidate: SourceFn = {
            let state = state.clone();
            Rc::new(move |index| state.mark_pending(index))
        };

        let subscriptions = sources.subscribe_each(&on_value, &on_invalidate);
        state.started.set(true);
        sync();

        Some(Box::new(move || {
            drop(subscriptions);
            state.run_cleanup();
            state.started.set(false);
        }))
    })
}

// =============================================================================
// DERIVED CREATION FUNCTIONS
// =============================================================================

/// Create a derived store from one or more sources.
///
/// The combiner receives the sources' values (a single value, a tuple, or
/// a `Vec`, matching the shape of `sources`). The initial value is computed
/// from the sources' committed values right away.
///
/// # Example
///
/// ```
/// use spark_stores::{derived, writable};
///
/// let first = writable(String::from("Ada"));
/// let last = writable(String::from("Lovelace"));
///
/// let full = derived((first.clone(), last.clone()), |(f, l)| format!("{f} {l}"));
/// assert_eq!(full.get(), "Ada Lovelace");
///
/// let _sub = full.subscribe(|_| {});
/// last.set(String::from("King"));
/// assert_eq!(full.get(), "Ada King");
/// ```
///
/// # Panics
///
/// Panics if `sources` holds more than 64 stores.
pub fn derived<S, T, F>(sources: S, combine: F) -> Readable<T>
where
    S: Sources,
    T: Clone + PartialEq + 'static,
    F: Fn(&S::Values) -> T + 'static,
{
    derived_with_equals(sources, combine, default_equals)
}

/// Create a derived store with a custom equality function.
///
/// # Panics
///
/// Panics if `sources` holds more than 64 stores.
pub fn derived_with_equals<S, T, F>(sources: S, combine: F, equals: EqualsFn<T>) -> Readable<T>
where
    S: Sources,
    T: Clone + 'static,
    F: Fn(&S::Values) -> T + 'static,
{
    check_source_count(&sources);
    let initial = combine(&sources.values());
    derive(sources, initial, equals, move |values, setter| {
        setter.set(combine(values));
        None
    })
}

/// Create a derived store whose combiner sets the value itself.
///
/// The combiner receives a `Setter` and may call it zero or more times,
/// immediately or later. The cleanup it returns runs before the next
/// recomputation and when the last subscriber leaves.
///
/// # Example
///
/// ```
/// use spark_stores::{derived_async, writable};
///
/// let query = writable(String::from("rust"));
/// let results = derived_async(query.clone(), Vec::<String>::new(), |q, set| {
///     set.set(vec![format!("{q} result")]);
///     None
/// });
///
/// let _sub = results.subscribe(|_| {});
/// assert_eq!(results.get(), vec!["rust result".to_string()]);
/// ```
///
/// # Panics
///
/// Panics if `sources` holds more than 64 stores.
pub fn derived_async<S, T, F>(sources: S, initial: T, combine: F) -> Readable<T>
where
    S: Sources,
    T: Clone + PartialEq + 'static,
    F: Fn(&S::Values, &Setter<T>) -> Option<CleanupFn> + 'static,
{
    derive(sources, initial, default_equals, combine)
}

// =============================================================================
// TESTS
// =============================================================================
