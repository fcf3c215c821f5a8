// ============================================================================
// spark-stores - Remote Values
// The tagged value published by stores backed by a remote fetch
// ============================================================================

use std::rc::Rc;

use crate::error::FetchError;

/// State of a remotely fetched value.
///
/// A fetch never leaves a store in an unobservable failure: the error is
/// published as `Failed` and the next successful fetch replaces it.
#[derive(Debug)]
pub enum Remote<T> {
    /// No fetch has completed yet
    Loading,
    /// The last fetch succeeded
    Ready(T),
    /// The last fetch failed
    Failed(Rc<FetchError>),
}

impl<T> Remote<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// The fetched value, if ready.
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// The failure, if the last fetch failed.
    pub fn error(&self) -> Option<&FetchError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Consume into the fetched value, if ready.
    pub fn into_ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Map the ready value, keeping `Loading` and `Failed` as they are.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Remote<U> {
        match self {
            Self::Loading => Remote::Loading,
            Self::Ready(value) => Remote::Ready(f(value)),
            Self::Failed(err) => Remote::Failed(err),
        }
    }

    /// Borrowing variant of `map`.
    pub fn map_ref<U>(&self, f: impl FnOnce(&T) -> U) -> Remote<U> {
        match self {
            Self::Loading => Remote::Loading,
            Self::Ready(value) => Remote::Ready(f(value)),
            Self::Failed(err) => Remote::Failed(err.clone()),
        }
    }
}

impl<T> Default for Remote<T> {
    fn default() -> Self {
        Self::Loading
    }
}

impl<T: Clone> Clone for Remote<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Loading => Self::Loading,
            Self::Ready(value) => Self::Ready(value.clone()),
            Self::Failed(err) => Self::Failed(err.clone()),
        }
    }
}

// Failures compare by identity: two separate failed fetches always differ,
// so each one reaches subscribers.
impl<T: PartialEq> PartialEq for Remote<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Loading, Self::Loading) => true,
            (Self::Ready(a), Self::Ready(b)) => a == b,
            (Self::Failed(a), Self::Failed(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<T> From<Result<T, FetchError>> for Remote<T> {
    fn from(result: Result<T, FetchError>) -> Self {
        match result {
            Ok(value) => Self::Ready(value),
            Err(err) => Self::Failed(Rc::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_loading() {
        let r: Remote<u8> = Remote::default();
        assert!(r.is_loading());
        assert_eq!(r.ready(), None);
    }

    #[test]
    fn failures_compare_by_identity() {
        let err = Rc::new(FetchError::message("boom"));
        let a: Remote<u8> = Remote::Failed(err.clone());
        let b: Remote<u8> = Remote::Failed(err);
        let c: Remote<u8> = Remote::Failed(Rc::new(FetchError::message("boom")));

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn map_keeps_non_ready_states() {
        let ready: Remote<u32> = Remote::Ready(2);
        assert_eq!(ready.map(|v| v * 3), Remote::Ready(6));

        let failed: Remote<u32> = Err(FetchError::message("x")).into();
        let mapped = failed.map_ref(|v| v.to_string());
        assert!(mapped.is_failed());
        assert_eq!(mapped.error().map(|e| e.to_string()).as_deref(), Some("x"));
    }
}
