// ============================================================================
// spark-stores - Reactivity Module
// Change detection and notification batching
// ============================================================================

pub mod batching;
pub mod equality;

// Re-export batching functions
pub use batching::{batch, pending_notifications};
