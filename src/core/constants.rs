// ============================================================================
// spark-stores - Constants
// Store lifecycle flags and shared limits
// ============================================================================

use std::time::Duration;

// =============================================================================
// STORE LIFECYCLE FLAGS
// =============================================================================

/// Store has at least one subscriber and its start callback has returned
pub const ACTIVE: u32 = 1 << 0;

/// Start callback is currently running (first subscriber being registered)
pub const STARTING: u32 = 1 << 1;

/// Stop callback is currently running (last subscriber removed)
pub const STOPPING: u32 = 1 << 2;

// =============================================================================
// DERIVED STORES
// =============================================================================

/// Maximum number of sources a derived store can track.
/// The pending-invalidation mask is a `u64`, one bit per source.
pub const MAX_DERIVED_SOURCES: usize = 64;

// =============================================================================
// POLLING DEFAULTS
// =============================================================================

/// Refresh interval used by `WatchOptions::default()`
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// Request timeout used by `ClientConfig::default()`
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Connect timeout used by `ClientConfig::default()`
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 8;
