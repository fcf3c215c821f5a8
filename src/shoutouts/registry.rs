//! The shout-outs stores, owned by an explicit registry.
//!
//! One `ShoutoutStores` per backend replaces process-wide store instances:
//! whoever creates it controls its lifetime, and tests get a fresh one each.

use std::rc::Rc;
use std::time::Duration;

use crate::core::constants::DEFAULT_REFRESH_INTERVAL;
use crate::error::Result;
use crate::primitives::derived::derived;
use crate::primitives::polling::{PageQuery, PollOptions, PollingResource};
use crate::primitives::remote::Remote;
use crate::primitives::store::Readable;
use crate::shoutouts::api::ShoutoutApi;
use crate::shoutouts::types::{NewShoutout, Shoutout, ShoutoutId, UserEntity, UsersMap};

/// Paging and refresh settings for `ShoutoutStores::watch_shoutouts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub interval: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            limit: None,
            offset: None,
            interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

impl WatchOptions {
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl From<WatchOptions> for PollOptions {
    fn from(options: WatchOptions) -> Self {
        PollOptions::every(options.interval)
            .with_query(PageQuery::new(options.limit, options.offset))
    }
}

/// Stores backed by one `ShoutoutApi`.
///
/// `users` and `users_map` are shared by everyone holding this registry;
/// every `watch_shoutouts` call builds a new, independent feed.
#[derive(Clone)]
pub struct ShoutoutStores {
    api: Rc<dyn ShoutoutApi>,
    users: PollingResource<Vec<UserEntity>>,
    users_map: Readable<Remote<UsersMap>>,
}

impl ShoutoutStores {
    pub fn new(api: impl ShoutoutApi + 'static) -> Self {
        Self::from_rc(Rc::new(api))
    }

    pub fn from_rc(api: Rc<dyn ShoutoutApi>) -> Self {
        let users_api = api.clone();
        let users = PollingResource::new(
            move |_: PageQuery| users_api.list_users(),
            PollOptions::once(),
        );

        let users_map = derived(users.clone(), |users: &Remote<Vec<UserEntity>>| {
            users.map_ref(|list| list.iter().cloned().collect::<UsersMap>())
        });

        Self {
            api,
            users,
            users_map,
        }
    }

    /// Registry over the HTTP client built from `config`.
    pub fn from_config(config: &crate::shoutouts::config::ClientConfig) -> Result<Self> {
        let client = crate::shoutouts::client::ShoutoutClient::new(config)?;
        Ok(Self::new(client))
    }

    /// The user list, fetched once per activation.
    pub fn users(&self) -> PollingResource<Vec<UserEntity>> {
        self.users.clone()
    }

    /// Users keyed by id, derived from `users`.
    pub fn users_map(&self) -> Readable<Remote<UsersMap>> {
        self.users_map.clone()
    }

    /// A new shout-outs feed refreshed every `options.interval`.
    pub fn watch_shoutouts(&self, options: WatchOptions) -> PollingResource<Vec<Shoutout>> {
        let api = self.api.clone();
        PollingResource::new(move |query: PageQuery| api.list_shoutouts(query), options.into())
    }

    pub async fn post_shoutout(&self, shoutout: NewShoutout) -> Result<Shoutout> {
        self.api.create_shoutout(shoutout).await
    }

    pub async fn delete_shoutout(&self, id: ShoutoutId) -> Result<()> {
        self.api.delete_shoutout(id).await
    }

    pub fn api(&self) -> &Rc<dyn ShoutoutApi> {
        &self.api
    }
}

impl std::fmt::Debug for ShoutoutStores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShoutoutStores")
            .field("users_active", &self.users.is_polling())
            .field("users_map_active", &self.users_map.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::primitives::polling::FetchFuture;
    use std::cell::RefCell;
    use tokio::task::LocalSet;

    #[derive(Default)]
    struct FakeApi {
        users: Vec<UserEntity>,
        fail_users: bool,
        queries: RefCell<Vec<PageQuery>>,
    }

    impl ShoutoutApi for FakeApi {
        fn list_users(&self) -> FetchFuture<Vec<UserEntity>> {
            let result = if self.fail_users {
                Err(FetchError::Status {
                    status: 500,
                    body: "down".into(),
                })
            } else {
                Ok(self.users.clone())
            };
            Box::pin(async move { result })
        }

        fn list_shoutouts(&self, query: PageQuery) -> FetchFuture<Vec<Shoutout>> {
            self.queries.borrow_mut().push(query);
            Box::pin(async { Ok(Vec::new()) })
        }

        fn create_shoutout(&self, shoutout: NewShoutout) -> FetchFuture<Shoutout> {
            Box::pin(async move {
                Ok(Shoutout {
                    id: 1,
                    recipient_id: shoutout.recipient_id,
                    recipient_writein: shoutout.recipient_writein,
                    message: shoutout.message,
                    created_by: shoutout.created_by,
                    created_by_writein: shoutout.created_by_writein,
                    anonymous: shoutout.anonymous,
                    created_at: "now".into(),
                    updated_at: "now".into(),
                })
            })
        }

        fn delete_shoutout(&self, _id: ShoutoutId) -> FetchFuture<()> {
            Box::pin(async { Ok(()) })
        }
    }

    #[test]
    fn watch_options_convert() {
        let options: PollOptions = WatchOptions::default().limit(10).offset(0).into();
        assert_eq!(options.refresh, Some(Duration::from_secs(10)));
        assert_eq!(options.query, PageQuery::new(Some(10), Some(0)));
    }

    #[tokio::test(start_paused = true)]
    async fn users_map_indexes_users() {
        LocalSet::new()
            .run_until(async {
                let stores = ShoutoutStores::new(FakeApi {
                    users: vec![UserEntity::new(1, "A"), UserEntity::new(2, "B")],
                    ..FakeApi::default()
                });

                let map = stores.users_map();
                let _sub = map.subscribe(|_| {});
                assert!(stores.users().is_polling());
                tokio::task::yield_now().await;

                let value = map.get();
                let users = value.ready().expect("users loaded");
                assert_eq!(users.get(1).map(|u| u.name.as_str()), Some("A"));
                assert!(users.get(3).is_none());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_user_fetch_is_published() {
        LocalSet::new()
            .run_until(async {
                let stores = ShoutoutStores::new(FakeApi {
                    fail_users: true,
                    ..FakeApi::default()
                });

                let users = stores.users();
                let _sub = users.subscribe(|_| {});
                tokio::task::yield_now().await;

                assert_eq!(users.get().error().and_then(|e| e.status()), Some(500));
                // users_map is idle; current() activates it long enough to derive
                assert!(stores.users_map().current().is_failed());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn each_watch_is_independent() {
        LocalSet::new()
            .run_until(async {
                let api = Rc::new(FakeApi::default());
                let stores = ShoutoutStores::from_rc(api.clone());

                let first = stores.watch_shoutouts(WatchOptions::default().limit(10));
                let second = stores.watch_shoutouts(WatchOptions::default().limit(10));

                let _a = first.subscribe(|_| {});
                assert!(first.is_polling());
                assert!(!second.is_polling());
                assert_eq!(api.queries.borrow().len(), 1);

                let _b = second.subscribe(|_| {});
                assert_eq!(api.queries.borrow().len(), 2);
            })
            .await;
    }

    #[tokio::test]
    async fn post_and_delete_delegate() {
        let stores = ShoutoutStores::new(FakeApi::default());
        let created = stores
            .post_shoutout(NewShoutout::to_user(4, "nice work"))
            .await
            .unwrap();
        assert_eq!(created.recipient_id, Some(4));
        assert!(stores.delete_shoutout(created.id).await.is_ok());
    }
}
