use core::time::Duration;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::StoreError;
use crate::store::LeaseStore;

/// An in-process [`LeaseStore`] with real per-key expiry.
///
/// Backs tests and single-node deployments where spinning up a networked
/// store is not worth it. Expiry is lazy: an entry past its deadline is
/// treated as absent by every operation rather than reaped by a timer, so
/// the store follows the Tokio clock and works under paused test time.
///
/// Worker keys form a small fixed set, so stale entries never accumulate
/// beyond one per key.
#[derive(Debug, Default)]
pub struct InMemoryLeaseStore {
    entries: Mutex<HashMap<String, StoredLease>>,
}

#[derive(Debug)]
struct StoredLease {
    value: String,
    expires_at: Instant,
}

impl StoredLease {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

impl InMemoryLeaseStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value held under `key`, if a live entry exists.
    ///
    /// Diagnostic companion to the [`LeaseStore`] operations; handy for
    /// asserting on lease contents in tests.
    pub async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().await;
        let now = Instant::now();
        entries
            .get(key)
            .filter(|lease| lease.is_live(now))
            .map(|lease| lease.value.clone())
    }
}

#[async_trait]
impl LeaseStore for InMemoryLeaseStore {
    async fn put_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        if entries.get(key).is_some_and(|lease| lease.is_live(now)) {
            return Ok(false);
        }
        entries.insert(
            key.to_owned(),
            StoredLease {
                value: value.to_owned(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn refresh_ttl(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        match entries.get_mut(key) {
            Some(lease) if lease.is_live(now) => {
                lease.expires_at = now + ttl;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        Ok(entries.remove(key).is_some_and(|lease| lease.is_live(now)))
    }
}
