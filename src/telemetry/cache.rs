// Keyed TTL cache with single-flight fetches for telemetry lookups.
//
// Concurrent callers of `get_or_fetch` for one key perform at most one
// upstream fetch: the first caller becomes the leader and installs an
// in-flight slot holding a watch channel that followers await. The leader
// publishes its result to every follower; a failed or abandoned leader
// clears the slot so the next caller retries. Entries expire on TTL with no
// other invalidation.

use std::collections::HashMap;
use std::future::Future;

use tokio::sync::{watch, Mutex};
use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::telemetry::grid::TelemetryError;

type FetchResult<V> = Result<V, TelemetryError>;

enum Slot<V> {
    Ready { value: V, expires_at: Instant },
    InFlight(watch::Receiver<Option<FetchResult<V>>>),
}

/// One cache instance holds values of a single type under a single TTL.
pub struct TelemetryCache<V> {
    ttl: Duration,
    slots: Mutex<HashMap<String, Slot<V>>>,
}

impl<V: Clone> TelemetryCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value for `key`, or run `fetch` to produce it.
    ///
    /// Errors from `fetch` are handed to every waiter but never cached.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> FetchResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FetchResult<V>>,
    {
        let tx = {
            let mut slots = self.slots.lock().await;
            match slots.get(key) {
                Some(Slot::Ready { value, expires_at }) if *expires_at > Instant::now() => {
                    debug!(key, "cache hit");
                    return Ok(value.clone());
                }
                Some(Slot::InFlight(rx)) => {
                    let rx = rx.clone();
                    drop(slots);
                    return self.await_leader(key, rx).await;
                }
                // Vacant or expired: become the leader.
                _ => {
                    let (tx, rx) = watch::channel(None);
                    slots.insert(key.to_string(), Slot::InFlight(rx));
                    tx
                }
            }
        };

        debug!(key, "cache miss, fetching");
        let result = fetch().await;

        // While `tx` is alive the slot under this key is still ours, so the
        // leader may overwrite or remove it without re-checking.
        {
            let mut slots = self.slots.lock().await;
            match &result {
                Ok(value) => {
                    slots.insert(
                        key.to_string(),
                        Slot::Ready {
                            value: value.clone(),
                            expires_at: Instant::now() + self.ttl,
                        },
                    );
                }
                Err(_) => {
                    slots.remove(key);
                }
            }
        }
        let _ = tx.send(Some(result.clone()));
        result
    }

    async fn await_leader(
        &self,
        key: &str,
        mut rx: watch::Receiver<Option<FetchResult<V>>>,
    ) -> FetchResult<V> {
        debug!(key, "awaiting in-flight fetch");
        loop {
            if let Some(result) = rx.borrow().clone() {
                return result;
            }
            if rx.changed().await.is_err() {
                // The leader dropped without publishing. Clear the stale slot
                // unless a newer leader has already replaced it.
                let mut slots = self.slots.lock().await;
                if matches!(slots.get(key), Some(Slot::InFlight(cur)) if cur.same_channel(&rx)) {
                    slots.remove(key);
                }
                return Err(TelemetryError::Unavailable {
                    message: "in-flight telemetry fetch was abandoned".to_string(),
                });
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
