// ============================================================================
// spark-stores - Batching
// The FIFO notification queue that keeps deliveries glitch-free
// ============================================================================

use crate::core::context::{with_context, NotificationKey, PendingNotification};

// =============================================================================
// QUEUE
// =============================================================================

/// Queue an `on_value` delivery for one subscriber.
///
/// If the same subscriber of the same store is already waiting, nothing is
/// queued: its pending delivery will read the latest value anyway.
pub(crate) fn enqueue_notification(key: NotificationKey, deliver: Box<dyn FnOnce()>) {
    with_context(|ctx| ctx.push_pending(PendingNotification { key, deliver }));
}

/// Drain the notification queue, unless someone further up the stack is
/// already draining it (or a `batch` is open).
///
/// Deliveries run in FIFO order. Deliveries queued while draining (a
/// subscriber calling `set`) are appended and drained by this same loop.
pub(crate) fn flush_notifications() {
    if with_context(|ctx| ctx.is_held()) {
        return;
    }

    with_context(|ctx| ctx.enter_hold());

    // Release the hold even if a subscriber panics. Undelivered entries stay
    // queued for the next flush: derived stores count on every delivery.
    struct DrainGuard;

    impl Drop for DrainGuard {
        fn drop(&mut self) {
            with_context(|ctx| ctx.exit_hold());
        }
    }

    let _guard = DrainGuard;

    while let Some(next) = with_context(|ctx| ctx.pop_pending()) {
        (next.deliver)();
    }
}

// =============================================================================
// BATCH
// =============================================================================

/// Group several `set` calls into one notification flush.
///
/// Invalidations still run immediately, but `on_value` deliveries wait until
/// the outermost batch completes. A derived store over several stores written
/// inside one batch recomputes once, with every new value.
///
/// # Example
///
/// ```
/// use spark_stores::{batch, derived, writable};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let a = writable(1);
/// let b = writable(2);
/// let runs = Rc::new(Cell::new(0));
///
/// let runs_clone = runs.clone();
/// let sum = derived((a.clone(), b.clone()), move |(a, b)| {
///     runs_clone.set(runs_clone.get() + 1);
///     a + b
/// });
/// let _sub = sum.subscribe(|_| {});
/// let before = runs.get();
///
/// batch(|| {
///     a.set(10);
///     b.set(20);
/// });
///
/// assert_eq!(sum.get(), 30);
/// assert_eq!(runs.get(), before + 1);
/// ```
pub fn batch<T>(f: impl FnOnce() -> T) -> T {
    with_context(|ctx| ctx.enter_hold());

    // Use a guard pattern to ensure we exit the batch even on panic
    struct BatchGuard;

    impl Drop for BatchGuard {
        fn drop(&mut self) {
            let depth = with_context(|ctx| ctx.exit_hold());

            // Queued deliveries wait for the next flush when unwinding
            if depth == 0 && !std::thread::panicking() {
                flush_notifications();
            }
        }
    }

    let _guard = BatchGuard;
    f()
}

/// Number of deliveries waiting in this thread's queue.
pub fn pending_notifications() -> usize {
    with_context(|ctx| ctx.pending_count())
}

// =============================================================================
// TESTS
// =============================================================================
