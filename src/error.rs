use std::sync::Arc;

/// Error type for cache construction and configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// The configuration was rejected.
    #[error("invalid cache configuration: {0}")]
    InvalidConfig(String),
    /// A periodic sweeper was requested outside of a tokio runtime.
    #[error("a cleanup interval requires a running tokio runtime")]
    NoRuntime,
}

impl CacheError {
    /// Create a new configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        CacheError::InvalidConfig(message.into())
    }
}

/// Error returned by [`RequestCache::get_or_set`](crate::RequestCache::get_or_set).
///
/// Every caller attached to the same fetch observes the same error, so the
/// fetcher's error is shared behind an `Arc`.
#[derive(Debug, thiserror::Error)]
pub enum FetchError<E> {
    /// The fetcher failed.
    #[error("{0}")]
    Fetcher(Arc<E>),
    /// The fetch task panicked or was cancelled before it settled.
    #[error("fetch was aborted before it settled")]
    Aborted,
}

impl<E> FetchError<E> {
    /// Returns the fetcher's error, if this is not an abort.
    pub fn fetcher_error(&self) -> Option<&E> {
        match self {
            FetchError::Fetcher(err) => Some(err),
            FetchError::Aborted => None,
        }
    }
}

impl<E> Clone for FetchError<E> {
    fn clone(&self) -> Self {
        match self {
            FetchError::Fetcher(err) => FetchError::Fetcher(Arc::clone(err)),
            FetchError::Aborted => FetchError::Aborted,
        }
    }
}
