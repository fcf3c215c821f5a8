// ============================================================================
// spark-stores - Subscribe/Set Reactive Stores for Rust
// ============================================================================
//
// Writable and derived stores with start/stop lifecycles, a glitch-free
// notification queue, and polling resources for the shout-outs REST feed.
// ============================================================================

pub mod core;
pub mod error;
#[macro_use]
pub mod macros;
pub mod primitives;
pub mod reactivity;
pub mod shoutouts;

// Re-export core items at crate root for ergonomic access
pub use crate::core::constants;
pub use crate::core::context::{is_batching, with_context, NotifyContext};
pub use crate::core::types::{default_equals, CleanupFn, EqualsFn, Setter, StoreInner};

pub use error::{FetchError, Result};

// Re-export primitives at crate root
pub use primitives::derived::{derived, derived_async, derived_with_equals, Sources};
pub use primitives::polling::{FetchFuture, FetchPage, PageQuery, PollOptions, PollingResource};
pub use primitives::remote::Remote;
pub use primitives::store::{
    readable, writable, writable_with_equals, writable_with_start, AsReadable, Readable, Store,
    Subscription,
};

// Re-export reactivity functions
pub use reactivity::batching::{batch, pending_notifications};
pub use reactivity::equality::{
    always_equals, equals, never_equals, rc_ptr_equals, safe_equals_f32, safe_equals_f64,
    safe_equals_option_f64, safe_not_equal_f32, safe_not_equal_f64, shallow_equals_slice,
    shallow_equals_vec,
};

// Re-export the shout-outs layer
pub use shoutouts::{
    ClientConfig, NewShoutout, Shoutout, ShoutoutApi, ShoutoutClient, ShoutoutId, ShoutoutStores,
    UserEntity, UserId, UsersMap, WatchOptions,
};

// =============================================================================
// TESTS
// =============================================================================
