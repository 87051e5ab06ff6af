//! Worker-lease acquisition and background renewal.
//!
//! [`WorkerLeaseManager`] gives one process a worker id no other live
//! instance shares: it claims a TTL key in a shared [`LeaseStore`] and keeps
//! the key refreshed from a background task until the lease is released. The
//! id it hands out is what a `waybill` generator is constructed with.

use core::time::Duration;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::LeaseConfig;
use crate::error::{LeaseError, Result, StoreError};
use crate::store::LeaseStore;

/// In-tick retries after a failed renewal round trip, beyond the first
/// attempt.
const RENEW_RETRIES: u32 = 3;

/// Spacing between in-tick renewal retries.
const RENEW_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Everything tied to one live lease: its identity and its renewal task.
struct HeldLease {
    worker_id: u64,
    key: String,
    cancel: CancellationToken,
    renewal: JoinHandle<()>,
}

/// Claims and holds a unique worker id for this process.
///
/// [`acquire`] scans the candidate range in ascending order and takes the
/// first id whose store key it can claim; the claim is a TTL entry, so an
/// instance that dies without releasing frees its id within one TTL. While
/// the lease is held, a background task refreshes the key every `ttl / 2`.
///
/// The manager never crashes its host over renewal trouble. If the store
/// stays unreachable for a full TTL, or the key turns up in another
/// instance's hands, renewal stops and [`lease_lost`] flips to `true`; what
/// to do about a lost identity (typically: stop minting ids and restart) is
/// the host's call.
///
/// Dropping the manager cancels the renewal task but leaves the key to
/// expire on its own; call [`release`] for an orderly hand-back.
///
/// [`acquire`]: Self::acquire
/// [`release`]: Self::release
/// [`lease_lost`]: Self::lease_lost
pub struct WorkerLeaseManager<S> {
    store: Arc<S>,
    config: LeaseConfig,
    held: Mutex<Option<HeldLease>>,
    lost: Arc<AtomicBool>,
}

impl<S> WorkerLeaseManager<S>
where
    S: LeaseStore + 'static,
{
    /// Creates a manager over the given store. No store traffic happens
    /// until [`acquire`](Self::acquire); the config is validated there too.
    pub fn new(store: Arc<S>, config: LeaseConfig) -> Self {
        Self {
            store,
            config,
            held: Mutex::new(None),
            lost: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Claims the lowest free worker id and starts renewing it.
    ///
    /// Candidates `0..=max_worker_id` are tried in ascending order with an
    /// atomic set-if-absent per key; the first claim that lands wins. Call
    /// once at process startup, hand the returned id to the generator, and
    /// keep the manager alive until shutdown.
    ///
    /// # Errors
    ///
    /// - [`LeaseError::InvalidConfig`] if the config cannot be honored.
    /// - [`LeaseError::AlreadyAcquired`] if this manager still holds a
    ///   lease.
    /// - [`LeaseError::Store`] if a store round trip fails; ids before the
    ///   failed one stay claimed by whoever holds them, none are claimed by
    ///   this call.
    /// - [`LeaseError::WorkerIdExhausted`] if every candidate is taken.
    pub async fn acquire(&self) -> Result<u64> {
        self.config.validate()?;

        let mut held = self.held.lock().await;
        if held.is_some() {
            return Err(LeaseError::AlreadyAcquired);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            max_worker_id = self.config.max_worker_id,
            "Scanning for a free worker id"
        );

        let token = Uuid::new_v4().to_string();
        for candidate in 0..=self.config.max_worker_id {
            let key = self.config.key_for(candidate);
            if !self.store.put_if_absent(&key, &token, self.config.ttl).await? {
                continue;
            }

            self.lost.store(false, Ordering::Relaxed);
            let cancel = CancellationToken::new();
            let renewal = tokio::spawn(renew_loop(
                Arc::clone(&self.store),
                key.clone(),
                token,
                self.config.ttl,
                candidate,
                Arc::clone(&self.lost),
                cancel.clone(),
            ));
            #[cfg(feature = "tracing")]
            tracing::info!(worker_id = candidate, key = %key, "Acquired worker lease");
            *held = Some(HeldLease {
                worker_id: candidate,
                key,
                cancel,
                renewal,
            });
            return Ok(candidate);
        }

        Err(LeaseError::WorkerIdExhausted {
            attempted: self.config.max_worker_id + 1,
        })
    }

    /// Hands the lease back: stops renewal and deletes the key so another
    /// instance can reclaim the id at once instead of waiting out the TTL.
    ///
    /// Safe to call at any point in the lifecycle, including before a
    /// successful [`acquire`](Self::acquire) and repeatedly; extra calls do
    /// nothing. A failed delete is logged and otherwise ignored, since the
    /// key expires on its own. If the lease was lost, the key is left
    /// untouched: it belongs to another instance now.
    pub async fn release(&self) {
        let Some(lease) = self.held.lock().await.take() else {
            return;
        };

        lease.cancel.cancel();
        if let Err(_e) = lease.renewal.await {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                worker_id = lease.worker_id,
                err = %_e,
                "Renewal task ended abnormally"
            );
        }

        if self.lost.load(Ordering::Relaxed) {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                worker_id = lease.worker_id,
                key = %lease.key,
                "Lease was lost; leaving the key to its current holder"
            );
            return;
        }

        match self.store.delete(&lease.key).await {
            Ok(_) => {
                #[cfg(feature = "tracing")]
                tracing::info!(worker_id = lease.worker_id, "Released worker lease");
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    worker_id = lease.worker_id,
                    err = %_e,
                    "Failed to delete lease key; it will expire on its own"
                );
            }
        }
    }

    /// Reports whether the most recent lease slipped away: renewal saw the
    /// key in another instance's hands, or could not land one successful
    /// refresh within a full TTL. A lost lease means the worker id may be
    /// double-assigned; the host should stop minting ids with it.
    ///
    /// Cleared on the next successful [`acquire`](Self::acquire).
    pub fn lease_lost(&self) -> bool {
        self.lost.load(Ordering::Relaxed)
    }

    /// Returns the currently held worker id, if any.
    pub async fn worker_id(&self) -> Option<u64> {
        self.held.lock().await.as_ref().map(|lease| lease.worker_id)
    }
}

impl<S> Drop for WorkerLeaseManager<S> {
    fn drop(&mut self) {
        if let Some(lease) = self.held.get_mut().take() {
            lease.cancel.cancel();
        }
    }
}

/// Healthy outcomes of one renewal round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Refresh {
    /// TTL pushed out on the existing key.
    Renewed,
    /// The key had lapsed; it was re-claimed with the original token.
    Reclaimed,
    /// Another instance owns the key now. Terminal.
    TakenOver,
}

async fn refresh_once<S: LeaseStore>(
    store: &S,
    key: &str,
    token: &str,
    ttl: Duration,
) -> Result<Refresh, StoreError> {
    if store.refresh_ttl(key, ttl).await? {
        return Ok(Refresh::Renewed);
    }
    // The key fell out of the store (expiry, flush): race to take it back
    // before another instance does.
    if store.put_if_absent(key, token, ttl).await? {
        Ok(Refresh::Reclaimed)
    } else {
        Ok(Refresh::TakenOver)
    }
}

/// Keeps one lease key alive until cancelled or until the lease is gone.
///
/// Every `ttl / 2` the key's TTL is pushed back out. A failed round trip is
/// retried up to [`RENEW_RETRIES`] times at [`RENEW_RETRY_DELAY`] spacing
/// before the task waits for its next tick; once no refresh has landed for a
/// full TTL, or the key shows up under another holder, the lease is marked
/// lost and the task exits.
async fn renew_loop<S: LeaseStore>(
    store: Arc<S>,
    key: String,
    token: String,
    ttl: Duration,
    worker_id: u64,
    lost: Arc<AtomicBool>,
    cancel: CancellationToken,
) {
    let period = ttl / 2;
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Acquisition itself counts as the first successful refresh.
    let mut last_ok = Instant::now();

    #[cfg(feature = "tracing")]
    tracing::trace!(worker_id, key = %key, "Renewal task started");

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        let mut attempt = 0;
        loop {
            match refresh_once(store.as_ref(), &key, &token, ttl).await {
                Ok(Refresh::Renewed) => {
                    last_ok = Instant::now();
                    #[cfg(feature = "tracing")]
                    tracing::trace!(worker_id, "Lease renewed");
                    break;
                }
                Ok(Refresh::Reclaimed) => {
                    last_ok = Instant::now();
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        worker_id,
                        key = %key,
                        "Lease key had lapsed; re-claimed it"
                    );
                    break;
                }
                Ok(Refresh::TakenOver) => {
                    lost.store(true, Ordering::Relaxed);
                    #[cfg(feature = "tracing")]
                    tracing::error!(
                        worker_id,
                        key = %key,
                        "Lease key now belongs to another instance; stopping renewal"
                    );
                    return;
                }
                Err(_e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        worker_id,
                        attempt,
                        err = %_e,
                        "Lease renewal attempt failed"
                    );
                }
            }

            if last_ok.elapsed() >= ttl {
                lost.store(true, Ordering::Relaxed);
                #[cfg(feature = "tracing")]
                tracing::error!(
                    worker_id,
                    key = %key,
                    "No successful renewal within one TTL; lease presumed gone"
                );
                return;
            }
            attempt += 1;
            if attempt > RENEW_RETRIES {
                // Out of in-tick retries; the next tick takes over.
                break;
            }
            tokio::select! {
                () = cancel.cancelled() => return,
                () = sleep(RENEW_RETRY_DELAY) => {}
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!(worker_id, "Renewal task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryLeaseStore;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn refresh_renews_a_live_key() {
        let store = InMemoryLeaseStore::new();
        store.put_if_absent("k", "tok", TTL).await.unwrap();

        tokio::time::advance(TTL / 2).await;
        let outcome = refresh_once(&store, "k", "tok", TTL).await.unwrap();
        assert_eq!(outcome, Refresh::Renewed);

        // Past the original deadline, inside the refreshed one.
        tokio::time::advance(TTL / 2 + Duration::from_millis(1)).await;
        assert_eq!(store.get("k").await.as_deref(), Some("tok"));
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_reclaims_a_lapsed_key() {
        let store = InMemoryLeaseStore::new();
        store.put_if_absent("k", "tok", TTL).await.unwrap();

        tokio::time::advance(TTL + Duration::from_millis(1)).await;
        let outcome = refresh_once(&store, "k", "tok", TTL).await.unwrap();
        assert_eq!(outcome, Refresh::Reclaimed);
        assert_eq!(store.get("k").await.as_deref(), Some("tok"));
    }

    /// Loses the race for a lapsed key: another instance claims it between
    /// this holder's failed refresh and its re-claim attempt.
    struct StealingStore {
        inner: InMemoryLeaseStore,
    }

    #[async_trait::async_trait]
    impl LeaseStore for StealingStore {
        async fn put_if_absent(
            &self,
            key: &str,
            value: &str,
            ttl: Duration,
        ) -> Result<bool, StoreError> {
            self.inner.put_if_absent(key, "intruder", ttl).await?;
            self.inner.put_if_absent(key, value, ttl).await
        }

        async fn refresh_ttl(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
            self.inner.refresh_ttl(key, ttl).await
        }

        async fn delete(&self, key: &str) -> Result<bool, StoreError> {
            self.inner.delete(key).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_detects_a_foreign_holder() {
        let store = StealingStore {
            inner: InMemoryLeaseStore::new(),
        };

        let outcome = refresh_once(&store, "k", "tok", TTL).await.unwrap();
        assert_eq!(outcome, Refresh::TakenOver);
        assert_eq!(store.inner.get("k").await.as_deref(), Some("intruder"));
    }
}
