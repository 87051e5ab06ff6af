use core::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

/// Port to the shared coordination store that arbitrates worker-id claims.
///
/// Any key/value backend with per-key expiry can carry leases; the manager
/// only ever needs the three conditional operations below. The crate ships
/// [`InMemoryLeaseStore`] for tests and single-node deployments, and a
/// networked backend (Redis `SET NX PX` / `PEXPIRE` / `DEL`) maps onto the
/// same three calls.
///
/// Implementations must be usable from concurrent tasks; the manager shares
/// one store between `acquire` and the background renewal task.
///
/// [`InMemoryLeaseStore`]: crate::InMemoryLeaseStore
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Writes `value` under `key` with expiry `ttl`, only if no live entry
    /// exists. Returns whether the write won the key.
    async fn put_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    /// Pushes the expiry of `key` out to `ttl` from now. Returns `false` if
    /// the key no longer exists, leaving the store unchanged.
    async fn refresh_ttl(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Removes `key`. Returns whether a live entry was removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;
}
