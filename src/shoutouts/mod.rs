// ============================================================================
// spark-stores - Shout-outs
// Users and shout-outs feed stores over the shout-outs REST API
// ============================================================================

pub mod api;
pub mod client;
pub mod config;
pub mod registry;
pub mod types;

pub use api::ShoutoutApi;
pub use client::ShoutoutClient;
pub use config::ClientConfig;
pub use registry::{ShoutoutStores, WatchOptions};
pub use types::{NewShoutout, Shoutout, ShoutoutId, UserEntity, UserId, UsersMap};
