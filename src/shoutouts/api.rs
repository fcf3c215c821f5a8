//! The REST operations the stores need from a backend.

use std::rc::Rc;

use crate::primitives::polling::{FetchFuture, PageQuery};
use crate::shoutouts::types::{NewShoutout, Shoutout, ShoutoutId, UserEntity};

/// Backend for the shout-outs stores.
///
/// `ShoutoutClient` implements this over HTTP; tests and embedders can
/// supply their own. Returned futures must not borrow `self`.
pub trait ShoutoutApi {
    /// `GET /users`
    fn list_users(&self) -> FetchFuture<Vec<UserEntity>>;

    /// `GET /shoutouts?limit=&offset=`
    fn list_shoutouts(&self, query: PageQuery) -> FetchFuture<Vec<Shoutout>>;

    /// `POST /shoutouts`
    fn create_shoutout(&self, shoutout: NewShoutout) -> FetchFuture<Shoutout>;

    /// `DELETE /shoutouts?id=`
    fn delete_shoutout(&self, id: ShoutoutId) -> FetchFuture<()>;
}

impl<A: ShoutoutApi + ?Sized> ShoutoutApi for Rc<A> {
    fn list_users(&self) -> FetchFuture<Vec<UserEntity>> {
        (**self).list_users()
    }

    fn list_shoutouts(&self, query: PageQuery) -> FetchFuture<Vec<Shoutout>> {
        (**self).list_shoutouts(query)
    }

    fn create_shoutout(&self, shoutout: NewShoutout) -> FetchFuture<Shoutout> {
        (**self).create_shoutout(shoutout)
    }

    fn delete_shoutout(&self, id: ShoutoutId) -> FetchFuture<()> {
        (**self).delete_shoutout(id)
    }
}
