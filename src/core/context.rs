// ============================================================================
// spark-stores - Notification Context
// Thread-local state for the pending-notification queue
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

// =============================================================================
// PENDING NOTIFICATION
// =============================================================================

/// Identifies one subscriber of one store: (store id, subscriber id).
pub type NotificationKey = (u64, u64);

/// A queued `on_value` delivery.
///
/// The delivery closure reads the store's value when it runs, so a
/// subscriber that is queued once sees whatever value is settled by then.
pub struct PendingNotification {
    pub key: NotificationKey,
    pub deliver: Box<dyn FnOnce()>,
}

// =============================================================================
// NOTIFY CONTEXT
// =============================================================================

/// Thread-local context holding the notification queue.
///
/// Every store on a thread shares one queue. Only the outermost notifier
/// (hold depth zero) drains it; nested `set` calls and `batch` bodies just
/// append to it.
pub struct NotifyContext {
    /// Deliveries waiting to run, in FIFO order
    pub pending: RefCell<VecDeque<PendingNotification>>,

    /// Number of active holders (a draining flush or a batch)
    pub hold_depth: Cell<u32>,
}

impl NotifyContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self {
            pending: RefCell::new(VecDeque::new()),
            hold_depth: Cell::new(0),
        }
    }

    // =========================================================================
    // QUEUE
    // =========================================================================

    /// Append a delivery unless the same subscriber is already waiting.
    /// Returns true if the delivery was queued.
    pub fn push_pending(&self, notification: PendingNotification) -> bool {
        let mut pending = self.pending.borrow_mut();
        if pending.iter().any(|p| p.key == notification.key) {
            return false;
        }
        pending.push_back(notification);
        true
    }

    /// Take the oldest waiting delivery
    pub fn pop_pending(&self) -> Option<PendingNotification> {
        self.pending.borrow_mut().pop_front()
    }

    /// Number of waiting deliveries
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    // =========================================================================
    // HOLD DEPTH
    // =========================================================================

    /// Increment hold depth, returns new depth
    pub fn enter_hold(&self) -> u32 {
        let depth = self.hold_depth.get() + 1;
        self.hold_depth.set(depth);
        depth
    }

    /// Decrement hold depth, returns new depth
    pub fn exit_hold(&self) -> u32 {
        let depth = self.hold_depth.get().saturating_sub(1);
        self.hold_depth.set(depth);
        depth
    }

    /// Whether the queue is currently held (draining or batching)
    pub fn is_held(&self) -> bool {
        self.hold_depth.get() > 0
    }
}

impl Default for NotifyContext {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// THREAD-LOCAL ACCESS
// =============================================================================

thread_local! {
    /// The thread-local notification context
    static CONTEXT: NotifyContext = NotifyContext::new();
}

/// Access the thread-local notification context.
///
/// # Example
///
/// ```ignore
/// with_context(|ctx| {
///     assert_eq!(ctx.pending_count(), 0);
/// });
/// ```
pub fn with_context<R>(f: impl FnOnce(&NotifyContext) -> R) -> R {
    CONTEXT.with(f)
}

/// Check if notifications are currently being held (inside a flush or batch)
pub fn is_batching() -> bool {
    with_context(|ctx| ctx.is_held())
}

// =============================================================================
// TESTS
// =============================================================================
