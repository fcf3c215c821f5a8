// ============================================================================
// spark-stores - Core Module
// Store state, lifecycle flags, and the notification context
// ============================================================================

pub mod constants;
pub mod context;
pub mod types;

// Re-export commonly used items
pub use constants::*;
pub use context::{is_batching, with_context, NotifyContext, PendingNotification};
pub use types::{
    default_equals, CleanupFn, EqualsFn, InvalidateFn, Setter, StartFn, StoreInner, ValueFn,
};
