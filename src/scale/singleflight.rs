//! Duplicate call suppression.
//!
//! A [`Group`] collapses concurrent calls that share a key into a single
//! execution. The first caller for a key becomes the leader: its work is
//! spawned onto its own task and every caller, leader included, waits for
//! that task's result. Once the task finishes the key is forgotten, so the
//! next call starts fresh. Nothing is cached beyond the lifetime of a call.
//!
//! The work runs detached from the calling request. If the leader's HTTP
//! client goes away, the remaining waiters still get their result.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{watch, Mutex};

/// The shared task ended without producing a value (it panicked).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("in-flight call for {key} was abandoned")]
pub struct Abandoned {
    pub key: String,
}

type Slot<T> = watch::Receiver<Option<T>>;

/// Registry of in-flight calls keyed by string.
pub struct Group<T> {
    calls: Arc<Mutex<HashMap<String, Slot<T>>>>,
}

impl<T> Group<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `work` unless a call for `key` is already in flight, in which case
    /// wait for that call's result instead.
    pub async fn run<F, Fut>(&self, key: &str, work: F) -> Result<T, Abandoned>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let mut rx = {
            let mut calls = self.calls.lock().await;
            match calls.get(key) {
                Some(rx) => rx.clone(),
                None => {
                    let (tx, rx) = watch::channel(None);
                    calls.insert(key.to_string(), rx.clone());

                    let fut = work();
                    let calls = Arc::clone(&self.calls);
                    let owned_key = key.to_string();
                    tokio::spawn(async move {
                        let value = fut.await;
                        // Retire the key before publishing so that callers
                        // arriving from now on start a new call.
                        calls.lock().await.remove(&owned_key);
                        let _ = tx.send(Some(value));
                    });
                    rx
                }
            }
        };

        let abandoned = || Abandoned {
            key: key.to_string(),
        };
        let outcome = rx
            .wait_for(Option::is_some)
            .await
            .map(|value| (*value).clone());
        match outcome {
            Ok(value) => value.ok_or_else(abandoned),
            Err(_) => {
                // The sender was dropped without a value: the task panicked.
                // Drop the stale entry so later calls are not stuck on it.
                let mut calls = self.calls.lock().await;
                if calls.get(key).is_some_and(|slot| slot.has_changed().is_err()) {
                    calls.remove(key);
                }
                Err(abandoned())
            }
        }
    }

    /// Number of keys with a call currently in flight.
    pub async fn in_flight(&self) -> usize {
        self.calls.lock().await.len()
    }
}

impl<T> Default for Group<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
