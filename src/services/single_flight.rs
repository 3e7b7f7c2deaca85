//! Collapses concurrent computations for the same key into one.
//!
//! The first caller for a key (the leader) runs the computation; callers that
//! arrive while it is still running await the same shared future and receive a
//! clone of its output. The entry is removed as soon as the computation
//! finishes, so a later call starts a fresh run.
//!
//! The registry only holds weak handles. Any caller still waiting keeps the
//! computation alive and drives it, even if the leader was cancelled. When the
//! last caller goes away before completion, its guard drops the entry and the
//! unfinished computation with it.

use futures::FutureExt;
use futures::future::{BoxFuture, Shared, WeakShared};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Computation<T> = Shared<BoxFuture<'static, T>>;
type Entries<K, T> = HashMap<K, WeakShared<BoxFuture<'static, T>>>;
type Registry<K, T> = Mutex<Entries<K, T>>;

fn lock<K, T>(registry: &Registry<K, T>) -> MutexGuard<'_, Entries<K, T>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct SingleFlight<K, T>
where
    T: Clone,
{
    inflight: Arc<Registry<K, T>>,
}

impl<K, T> Clone for SingleFlight<K, T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inflight: self.inflight.clone(),
        }
    }
}

impl<K, T> Default for SingleFlight<K, T>
where
    T: Clone,
{
    fn default() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

/// Removes an abandoned entry when the caller holding it is dropped.
struct Release<'a, K, T>
where
    K: Eq + Hash,
    T: Clone,
{
    registry: &'a Registry<K, T>,
    key: K,
}

impl<K, T> Drop for Release<'_, K, T>
where
    K: Eq + Hash,
    T: Clone,
{
    fn drop(&mut self) {
        let mut map = lock(self.registry);
        let abandoned = map
            .get(&self.key)
            .is_some_and(|weak| weak.upgrade().is_none());
        if abandoned {
            map.remove(&self.key);
        }
    }
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `make()` unless a run for `key` is already in flight.
    ///
    /// Returns the output and whether it was shared from another caller's run.
    pub async fn run<F, Fut>(&self, key: K, make: F) -> (T, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let _release = Release {
            registry: &self.inflight,
            key: key.clone(),
        };

        let (shared, coalesced): (Computation<T>, bool) = {
            let mut map = lock(&self.inflight);

            if let Some(existing) = map.get(&key).and_then(WeakShared::upgrade) {
                (existing, true)
            } else {
                let registry = self.inflight.clone();
                let entry_key = key.clone();
                let work = make();
                let fut = async move {
                    let output = work.await;
                    lock(&registry).remove(&entry_key);
                    output
                }
                .boxed()
                .shared();
                if let Some(weak) = fut.downgrade() {
                    map.insert(key, weak);
                }
                (fut, false)
            }
        };

        (shared.await, coalesced)
    }

    #[cfg(test)]
    fn in_flight(&self) -> usize {
        lock(&self.inflight).len()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_callers_share_one_run() {
        let flight: SingleFlight<&'static str, usize> = SingleFlight::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let flight = flight.clone();
                let runs = runs.clone();
                tokio::spawn(async move {
                    flight
                        .run("asthma", move || async move {
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            runs.fetch_add(1, Ordering::SeqCst) + 1
                        })
                        .await
                })
            })
            .collect();

        let mut coalesced = 0;
        for task in tasks {
            let (value, shared) = task.await.unwrap();
            assert_eq!(value, 1);
            if shared {
                coalesced += 1;
            }
        }

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(coalesced, 7);
    }

    #[tokio::test]
    async fn entry_is_released_after_completion() {
        let flight: SingleFlight<u32, u32> = SingleFlight::new();

        let (first, shared) = flight.run(1, || async { 10 }).await;
        assert_eq!(first, 10);
        assert!(!shared);
        assert_eq!(flight.in_flight(), 0);

        let (second, shared) = flight.run(1, || async { 20 }).await;
        assert_eq!(second, 20);
        assert!(!shared);
    }

    #[tokio::test]
    async fn distinct_keys_run_independently() {
        let flight: SingleFlight<u32, u32> = SingleFlight::new();
        let (a, b) = tokio::join!(
            flight.run(1, || async { 1 }),
            flight.run(2, || async { 2 })
        );
        assert_eq!(a, (1, false));
        assert_eq!(b, (2, false));
    }

    #[tokio::test]
    async fn failures_are_shared_with_waiters() {
        let flight: SingleFlight<u32, Result<u32, String>> = SingleFlight::new();
        let runs = AtomicUsize::new(0);
        let attempt = || {
            flight.run(5, || {
                runs.fetch_add(1, Ordering::SeqCst);
                async {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Err::<u32, String>("upstream down".to_string())
                }
            })
        };

        let (first, second) = tokio::join!(attempt(), attempt());
        assert_eq!(first, (Err("upstream down".to_string()), false));
        assert_eq!(second, (Err("upstream down".to_string()), true));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn waiter_finishes_a_cancelled_leader_run() {
        let flight: SingleFlight<u32, u32> = SingleFlight::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let leader = {
            let flight = flight.clone();
            let runs = runs.clone();
            tokio::spawn(async move {
                flight
                    .run(7, move || async move {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        runs.fetch_add(1, Ordering::SeqCst) as u32 + 1
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let waiter = {
            let flight = flight.clone();
            tokio::spawn(async move { flight.run(7, || async { 99 }).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        leader.abort();
        assert!(leader.await.unwrap_err().is_cancelled());

        assert_eq!(waiter.await.unwrap(), (1, true));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(flight.in_flight(), 0);
    }

    #[tokio::test]
    async fn abandoned_run_is_released() {
        let flight: SingleFlight<u32, u32> = SingleFlight::new();

        let task = {
            let flight = flight.clone();
            tokio::spawn(async move { flight.run(3, std::future::pending::<u32>).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(flight.in_flight(), 1);

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert_eq!(flight.in_flight(), 0);

        let (value, shared) = flight.run(3, || async { 4 }).await;
        assert_eq!((value, shared), (4, false));
    }
}
