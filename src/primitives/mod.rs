// ============================================================================
// spark-stores - Primitives Module
// Store primitives: writable, readable, derived, polling resource
// ============================================================================

pub mod derived;
pub mod polling;
pub mod remote;
pub mod store;

// Re-export for convenience
pub use derived::{derived, derived_async, derived_with_equals, SourceFn, Sources};
pub use polling::{FetchFuture, FetchPage, PageQuery, PollOptions, PollingResource};
pub use remote::Remote;
pub use store::{
    readable, writable, writable_with_equals, writable_with_start, AsReadable, Readable, Store,
    Subscription,
};
