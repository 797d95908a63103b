//! Observer callbacks for failed and rate-limited requests.
//!
//! Observers are side effects (logging, metrics, alerting); they cannot
//! change the outcome of a request. Registration is append-only and
//! preserves order. Each list is stored as an immutable snapshot that is
//! replaced on append, so notification never holds a lock while running
//! observer code.
//!
//! # Example
//!
//! ```rust
//! use merchant_api::clients::HandlerRegistry;
//!
//! let registry = HandlerRegistry::new();
//! registry.add_error_observer(|response, error| {
//!     let status = response.map(|r| r.status);
//!     eprintln!("request failed ({status:?}): {error}");
//! });
//! registry.add_rate_limit_observer(|response| {
//!     eprintln!("rate limited, retry-after: {:?}", response.retry_after());
//! });
//!
//! assert_eq!(registry.error_observer_count(), 1);
//! assert_eq!(registry.rate_limit_observer_count(), 1);
//! ```

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::clients::errors::ApiError;
use crate::clients::http_response::RawResponse;

/// Callback invoked with the failing response (if one was received) and the
/// error handed back to the caller.
pub type ErrorObserver = Arc<dyn Fn(Option<&RawResponse>, &ApiError) + Send + Sync>;

/// Callback invoked with each rate-limited (429) response before backing off.
pub type RateLimitObserver = Arc<dyn Fn(&RawResponse) + Send + Sync>;

/// Append-only, concurrently readable observer lists.
pub struct HandlerRegistry {
    error_observers: RwLock<Arc<[ErrorObserver]>>,
    rate_limit_observers: RwLock<Arc<[RateLimitObserver]>>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self {
            error_observers: RwLock::new(Arc::from(Vec::new())),
            rate_limit_observers: RwLock::new(Arc::from(Vec::new())),
        }
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("error_observers", &self.error_observer_count())
            .field("rate_limit_observers", &self.rate_limit_observer_count())
            .finish()
    }
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an error observer.
    pub fn add_error_observer<F>(&self, observer: F)
    where
        F: Fn(Option<&RawResponse>, &ApiError) + Send + Sync + 'static,
    {
        let observer: ErrorObserver = Arc::new(observer);
        append(&self.error_observers, observer);
    }

    /// Registers a rate-limit observer.
    pub fn add_rate_limit_observer<F>(&self, observer: F)
    where
        F: Fn(&RawResponse) + Send + Sync + 'static,
    {
        let observer: RateLimitObserver = Arc::new(observer);
        append(&self.rate_limit_observers, observer);
    }

    /// Returns the number of registered error observers.
    #[must_use]
    pub fn error_observer_count(&self) -> usize {
        snapshot(&self.error_observers).len()
    }

    /// Returns the number of registered rate-limit observers.
    #[must_use]
    pub fn rate_limit_observer_count(&self) -> usize {
        snapshot(&self.rate_limit_observers).len()
    }

    /// Invokes every error observer in registration order.
    pub fn notify_error(&self, response: Option<&RawResponse>, error: &ApiError) {
        for observer in snapshot(&self.error_observers).iter() {
            observer(response, error);
        }
    }

    /// Invokes every rate-limit observer in registration order.
    pub fn notify_rate_limited(&self, response: &RawResponse) {
        for observer in snapshot(&self.rate_limit_observers).iter() {
            observer(response);
        }
    }
}

fn snapshot<T: ?Sized>(list: &RwLock<Arc<[Arc<T>]>>) -> Arc<[Arc<T>]> {
    // Observers never run under the lock, so a poisoned lock still holds a
    // consistent list.
    Arc::clone(&list.read().unwrap_or_else(PoisonError::into_inner))
}

fn append<T: ?Sized>(list: &RwLock<Arc<[Arc<T>]>>, observer: Arc<T>) {
    let mut guard = list.write().unwrap_or_else(PoisonError::into_inner);
    let mut next: Vec<Arc<T>> = guard.iter().cloned().collect();
    next.push(observer);
    *guard = next.into();
}

// Verify HandlerRegistry is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HandlerRegistry>();
};
