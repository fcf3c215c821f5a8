// ============================================================================
// spark-stores - Polling Resource
//
// A store whose value comes from a remote fetch. While it has subscribers it
// fetches once immediately, then again on every tick of its refresh interval.
// The fetch loop runs as a tokio local task; the last unsubscribe aborts it,
// which also drops any request still in flight.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::AbortHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::core::constants::DEFAULT_REFRESH_INTERVAL;
use crate::core::types::{default_equals, CleanupFn, EqualsFn, Setter};
use crate::error::FetchError;
use crate::primitives::derived::{subscribe_indexed, SourceFn, Sources};
use crate::primitives::remote::Remote;
use crate::primitives::store::{AsReadable, Readable, Subscription};

// =============================================================================
// PAGE QUERY
// =============================================================================

/// Paging parameters forwarded to every fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl PageQuery {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self { limit, offset }
    }

    /// Query-string pairs. Unset and zero parameters are left out, so
    /// `offset: Some(0)` produces no `offset` pair at all.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(limit) = self.limit.filter(|&n| n != 0) {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset.filter(|&n| n != 0) {
            pairs.push(("offset", offset.to_string()));
        }
        pairs
    }
}

// =============================================================================
// FETCHER
// =============================================================================

/// Boxed, non-`Send` fetch future.
pub type FetchFuture<T> = Pin<Box<dyn Future<Output = Result<T, FetchError>>>>;

/// Something that can fetch one page of remote data.
///
/// Any `Fn(PageQuery) -> impl Future<Output = Result<T, FetchError>>`
/// closure qualifies.
pub trait FetchPage<T> {
    fn fetch_page(&self, query: &PageQuery) -> FetchFuture<T>;
}

impl<T, F, Fut> FetchPage<T> for F
where
    F: Fn(PageQuery) -> Fut,
    Fut: Future<Output = Result<T, FetchError>> + 'static,
{
    fn fetch_page(&self, query: &PageQuery) -> FetchFuture<T> {
        Box::pin(self(*query))
    }
}

// =============================================================================
// OPTIONS
// =============================================================================

/// How a polling resource queries and how often it refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub query: PageQuery,
    /// `None` fetches once per activation and never refreshes on a timer
    pub refresh: Option<Duration>,
}

impl PollOptions {
    /// Refresh on a fixed interval.
    pub fn every(interval: Duration) -> Self {
        Self {
            query: PageQuery::default(),
            refresh: Some(interval),
        }
    }

    /// Fetch once per activation.
    pub fn once() -> Self {
        Self {
            query: PageQuery::default(),
            refresh: None,
        }
    }

    pub fn with_query(mut self, query: PageQuery) -> Self {
        self.query = query;
        self
    }
}

impl Default for PollOptions {
    fn default() -> Self {
        Self::every(DEFAULT_REFRESH_INTERVAL)
    }
}

// =============================================================================
// POLLING RESOURCE
// =============================================================================

/// Handle to the running fetch loop of an active resource.
struct Driver {
    abort: AbortHandle,
    wake: Rc<Notify>,
    /// Set on stop. The loop checks it between awaits, since an abort only
    /// lands at the task's next yield.
    stopped: Rc<Cell<bool>>,
}

/// A readable store of `Remote<T>` refreshed from a fetcher.
///
/// Activation spawns a local task, so the first subscribe must happen
/// inside a tokio `LocalSet`.
///
/// # Example
///
/// ```
/// use spark_stores::{FetchError, PageQuery, PollOptions, PollingResource, Remote};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let local = tokio::task::LocalSet::new();
/// local
///     .run_until(async {
///         let feed = PollingResource::new(
///             |q: PageQuery| async move { Ok::<_, FetchError>(q.limit.unwrap_or(0)) },
///             PollOptions::every(Duration::from_secs(10))
///                 .with_query(PageQuery::new(Some(5), None)),
///         );
///
///         let sub = feed.subscribe(|_| {});
///         assert!(feed.get().is_loading());
///
///         tokio::task::yield_now().await;
///         assert_eq!(feed.get(), Remote::Ready(5));
///         sub.unsubscribe();
///     })
///     .await;
/// # }
/// ```
pub struct PollingResource<T> {
    store: Readable<Remote<T>>,
    driver: Rc<RefCell<Option<Driver>>>,
    options: PollOptions,
}

impl<T> Clone for PollingResource<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            driver: self.driver.clone(),
            options: self.options,
        }
    }
}

impl<T: Clone + 'static> PollingResource<T> {
    /// Create an idle resource with value `Remote::Loading`.
    pub fn new(fetcher: impl FetchPage<T> + 'static, options: PollOptions) -> Self
    where
        T: PartialEq,
    {
        Self::build(Rc::new(fetcher), options, Remote::Loading, default_equals)
    }

    /// Create an idle resource with a custom equality function.
    pub fn new_with_equals(
        fetcher: impl FetchPage<T> + 'static,
        options: PollOptions,
        equals: EqualsFn<Remote<T>>,
    ) -> Self {
        Self::build(Rc::new(fetcher), options, Remote::Loading, equals)
    }

    /// Create an idle resource holding `initial` until the first fetch lands.
    pub fn with_initial(
        fetcher: impl FetchPage<T> + 'static,
        options: PollOptions,
        initial: Remote<T>,
    ) -> Self
    where
        T: PartialEq,
    {
        Self::build(Rc::new(fetcher), options, initial, default_equals)
    }

    fn build(
        fetcher: Rc<dyn FetchPage<T>>,
        options: PollOptions,
        initial: Remote<T>,
        equals: EqualsFn<Remote<T>>,
    ) -> Self {
        let driver: Rc<RefCell<Option<Driver>>> = Rc::new(RefCell::new(None));

        let start_driver = driver.clone();
        let store = Readable::new_with_start(initial, equals, move |setter| {
            debug!(query = ?options.query, refresh = ?options.refresh, "polling started");

            // First request is issued synchronously, before the task runs
            let first = fetcher.fetch_page(&options.query);
            let wake = Rc::new(Notify::new());
            let stopped = Rc::new(Cell::new(false));
            let task = tokio::task::spawn_local(drive(
                fetcher.clone(),
                options,
                wake.clone(),
                stopped.clone(),
                setter.clone(),
                first,
            ));

            *start_driver.borrow_mut() = Some(Driver {
                abort: task.abort_handle(),
                wake,
                stopped,
            });

            let stop_driver = start_driver.clone();
            Some(Box::new(move || {
                if let Some(driver) = stop_driver.borrow_mut().take() {
                    driver.stopped.set(true);
                    driver.abort.abort();
                }
                debug!("polling stopped");
            }) as CleanupFn)
        });

        Self {
            store,
            driver,
            options,
        }
    }

    /// Last published value.
    pub fn get(&self) -> Remote<T> {
        self.store.get()
    }

    /// Access the value by reference.
    pub fn with<R>(&self, f: impl FnOnce(&Remote<T>) -> R) -> R {
        self.store.with(f)
    }

    /// Subscribe; the first subscriber starts polling.
    pub fn subscribe(&self, on_value: impl Fn(&Remote<T>) + 'static) -> Subscription {
        self.store.subscribe(on_value)
    }

    /// Subscribe with an invalidation callback.
    pub fn subscribe_with_invalidate(
        &self,
        on_value: impl Fn(&Remote<T>) + 'static,
        on_invalidate: impl Fn() + 'static,
    ) -> Subscription {
        self.store.subscribe_with_invalidate(on_value, on_invalidate)
    }

    /// Fetch now and restart the refresh interval.
    ///
    /// Returns `false` (and does nothing) when the resource is idle.
    pub fn refresh(&self) -> bool {
        match self.driver.borrow().as_ref() {
            Some(driver) => {
                driver.wake.notify_one();
                true
            }
            None => false,
        }
    }

    /// Whether a fetch loop is currently running.
    pub fn is_polling(&self) -> bool {
        self.driver.borrow().is_some()
    }

    pub fn query(&self) -> PageQuery {
        self.options.query
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        self.options.refresh
    }

    pub fn subscriber_count(&self) -> usize {
        self.store.subscriber_count()
    }

    /// Read-only store view of this resource.
    pub fn readable(&self) -> Readable<Remote<T>> {
        self.store.clone()
    }
}

impl<T: std::fmt::Debug + Clone + 'static> std::fmt::Debug for PollingResource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingResource")
            .field("value", &self.get())
            .field("options", &self.options)
            .field("polling", &self.is_polling())
            .finish()
    }
}

impl<T: Clone + 'static> AsReadable for PollingResource<T> {
    type Value = Remote<T>;

    fn as_readable(&self) -> Readable<Remote<T>> {
        self.store.clone()
    }
}

impl<T: Clone + 'static> Sources for PollingResource<T> {
    type Values = Remote<T>;

    fn len(&self) -> usize {
        1
    }

    fn values(&self) -> Remote<T> {
        self.get()
    }

    fn subscribe_each(&self, on_value: &SourceFn, on_invalidate: &SourceFn) -> Vec<Subscription> {
        vec![subscribe_indexed(&self.store, 0, on_value, on_invalidate)]
    }
}

// =============================================================================
// FETCH LOOP
// =============================================================================

fn ticker(every: Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + every, every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

fn publish<T: Clone + 'static>(setter: &Setter<Remote<T>>, outcome: Result<T, FetchError>) {
    match outcome {
        Ok(value) => {
            setter.set(Remote::Ready(value));
        }
        Err(err) => {
            warn!(error = %err, "fetch failed");
            setter.set(Remote::Failed(Rc::new(err)));
        }
    }
}

async fn drive<T: Clone + 'static>(
    fetcher: Rc<dyn FetchPage<T>>,
    options: PollOptions,
    wake: Rc<Notify>,
    stopped: Rc<Cell<bool>>,
    setter: Setter<Remote<T>>,
    first: FetchFuture<T>,
) {
    let mut interval = options.refresh.map(ticker);
    let mut request = first;

    loop {
        let outcome = request.await;
        publish(&setter, outcome);

        // A subscriber may have dropped the last subscription while the
        // value was being published
        if stopped.get() || !setter.is_live() {
            break;
        }

        match interval.as_mut() {
            Some(interval) => {
                let manual = tokio::select! {
                    _ = interval.tick() => false,
                    _ = wake.notified() => true,
                };
                if manual {
                    interval.reset();
                }
            }
            None => wake.notified().await,
        }

        if stopped.get() {
            break;
        }

        debug!(query = ?options.query, "refetching");
        request = fetcher.fetch_page(&options.query);
    }
}

// =============================================================================
// TESTS
// =============================================================================
