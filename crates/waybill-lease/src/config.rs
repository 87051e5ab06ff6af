use core::time::Duration;

use waybill::TrackingId;

use crate::error::LeaseError;

/// Tunables for claiming and holding a worker lease.
///
/// The defaults match the production deployment: keys under
/// `tracking:worker`, the full 10-bit worker-id range, and a 60 second TTL
/// renewed at twice that rate.
#[derive(Debug, Clone)]
pub struct LeaseConfig {
    /// Store-key namespace; worker id 7 is leased under `{key_prefix}:7`.
    pub key_prefix: String,
    /// Highest candidate worker id, inclusive. Capped by the id layout at
    /// [`TrackingId::max_worker_id`]; lower it to partition the range among
    /// deployments sharing one store.
    pub max_worker_id: u64,
    /// Lease duration. Renewal runs every `ttl / 2`, so a crashed holder
    /// frees its id within one `ttl` and a live one never lapses.
    pub ttl: Duration,
}

impl LeaseConfig {
    /// Key namespace used when none is configured.
    pub const DEFAULT_KEY_PREFIX: &'static str = "tracking:worker";

    /// Lease duration used when none is configured.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

    /// Returns the store key leasing `worker_id`.
    pub fn key_for(&self, worker_id: u64) -> String {
        format!("{}:{worker_id}", self.key_prefix)
    }

    /// Rejects configurations the manager cannot honor. Checked in
    /// `acquire`, so a bad config surfaces before any store traffic.
    pub(crate) fn validate(&self) -> Result<(), LeaseError> {
        if self.max_worker_id > TrackingId::max_worker_id() {
            return Err(LeaseError::InvalidConfig {
                reason: format!(
                    "max_worker_id {} exceeds the id layout's limit of {}",
                    self.max_worker_id,
                    TrackingId::max_worker_id()
                ),
            });
        }
        if self.ttl < Duration::from_millis(2) {
            return Err(LeaseError::InvalidConfig {
                reason: format!("ttl {:?} leaves a sub-millisecond renewal interval", self.ttl),
            });
        }
        Ok(())
    }
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            key_prefix: Self::DEFAULT_KEY_PREFIX.to_owned(),
            max_worker_id: TrackingId::max_worker_id(),
            ttl: Self::DEFAULT_TTL,
        }
    }
}
