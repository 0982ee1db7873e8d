//! # Lazy, single-flight connection cache
//!
//! The first caller of [`ConnectionCache::get_or_connect`] starts the connect
//! attempt. Every caller arriving while that attempt is in flight awaits the
//! same shared future, so a burst of concurrent first requests opens exactly
//! one connection. A failed attempt is dropped from the cache and its error is
//! handed to everyone who awaited it; the next call starts a fresh attempt.
//! A successful handle is kept for the life of the process.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

type Attempt<T, E> = Shared<BoxFuture<'static, Result<T, Arc<E>>>>;

struct InFlight<T, E> {
    id: u64,
    attempt: Attempt<T, E>,
}

pub struct ConnectionCache<T, E> {
    ready: OnceLock<T>,
    in_flight: Mutex<Option<InFlight<T, E>>>,
    attempts: AtomicU64,
}

impl<T, E> Default for ConnectionCache<T, E> {
    fn default() -> Self {
        Self {
            ready: OnceLock::new(),
            in_flight: Mutex::new(None),
            attempts: AtomicU64::new(0),
        }
    }
}

impl<T, E> ConnectionCache<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// The resolved handle, if a connect attempt has already succeeded.
    #[cfg(test)]
    fn get(&self) -> Option<T> {
        self.ready.get().cloned()
    }

    /// Number of connect attempts started so far.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Acquire)
    }

    pub async fn get_or_connect<F, Fut>(&self, connect: F) -> Result<T, Arc<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        if let Some(handle) = self.ready.get() {
            return Ok(handle.clone());
        }

        let (id, attempt) = {
            let mut slot = self.slot();
            match slot.as_ref() {
                Some(in_flight) => (in_flight.id, in_flight.attempt.clone()),
                None => {
                    // A previous attempt may have resolved between the fast
                    // path and taking the lock.
                    if let Some(handle) = self.ready.get() {
                        return Ok(handle.clone());
                    }

                    let id = self.attempts.fetch_add(1, Ordering::AcqRel) + 1;
                    let attempt = connect().map(|res| res.map_err(Arc::new)).boxed().shared();
                    *slot = Some(InFlight {
                        id,
                        attempt: attempt.clone(),
                    });
                    (id, attempt)
                }
            }
        };

        let outcome = attempt.await;

        let mut slot = self.slot();
        if let Ok(handle) = &outcome {
            let _ = self.ready.set(handle.clone());
        }
        if slot.as_ref().is_some_and(|in_flight| in_flight.id == id) {
            *slot = None;
        }

        outcome
    }

    fn slot(&self) -> MutexGuard<'_, Option<InFlight<T, E>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_first_callers_share_one_attempt() {
        let cache = Arc::new(ConnectionCache::<Arc<String>, String>::new());
        let connects = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let connects = Arc::clone(&connects);
                tokio::spawn(async move {
                    cache
                        .get_or_connect(move || {
                            connects.fetch_add(1, Ordering::SeqCst);
                            async {
                                tokio::time::sleep(Duration::from_millis(25)).await;
                                Ok(Arc::new("handle".to_string()))
                            }
                        })
                        .await
                })
            })
            .collect();

        let handles: Vec<Arc<String>> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap())
            .collect();

        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert_eq!(cache.attempts(), 1);
        assert!(handles.iter().all(|h| Arc::ptr_eq(h, &handles[0])));
        assert!(Arc::ptr_eq(&cache.get().unwrap(), &handles[0]));
    }

    #[tokio::test]
    async fn resolved_handle_is_reused() {
        let cache = ConnectionCache::<u32, String>::new();

        let first = cache.get_or_connect(|| async { Ok(7) }).await.unwrap();
        let second = cache
            .get_or_connect(|| async { Ok::<u32, String>(99) })
            .await
            .unwrap();

        assert_eq!(first, 7);
        assert_eq!(second, 7);
        assert_eq!(cache.attempts(), 1);
    }

    #[tokio::test]
    async fn failure_reaches_every_waiter_and_allows_retry() {
        let cache = Arc::new(ConnectionCache::<u32, String>::new());

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move {
                    cache
                        .get_or_connect(|| async {
                            tokio::time::sleep(Duration::from_millis(25)).await;
                            Err("server selection timeout".to_string())
                        })
                        .await
                })
            })
            .collect();

        for joined in futures::future::join_all(tasks).await {
            let err = joined.unwrap().unwrap_err();
            assert_eq!(err.as_str(), "server selection timeout");
        }
        assert_eq!(cache.attempts(), 1);
        assert!(cache.get().is_none());

        let handle = cache.get_or_connect(|| async { Ok(3) }).await.unwrap();
        assert_eq!(handle, 3);
        assert_eq!(cache.attempts(), 2);
    }
}
