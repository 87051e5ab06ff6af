//! TTL-based worker-id leases for `waybill` generators.
//!
//! Tracking numbers stay fleet-unique only while every live process mints
//! with a distinct worker id. [`WorkerLeaseManager`] hands a process such an
//! id at startup: it scans `0..=1023` and claims the first id whose key it
//! can write into a shared coordination store ([`LeaseStore`]) with a TTL.
//! A background task then renews the claim every half TTL, so the id stays
//! reserved while the process lives and frees itself within one TTL if the
//! process dies without cleaning up.
//!
//! ```
//! use std::sync::Arc;
//! use waybill::{SystemClock, TrackingNumberGenerator};
//! use waybill_lease::{InMemoryLeaseStore, LeaseConfig, WorkerLeaseManager};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryLeaseStore::new());
//! let manager = WorkerLeaseManager::new(store, LeaseConfig::default());
//!
//! let worker_id = manager.acquire().await?;
//! let generator = TrackingNumberGenerator::new(worker_id, SystemClock::default())?;
//! let tracking_number = generator.generate()?;
//! assert!(tracking_number.len() <= 13);
//!
//! manager.release().await;
//! # Ok(())
//! # }
//! ```
//!
//! Production deployments point [`LeaseStore`] at a networked key/value
//! store; [`InMemoryLeaseStore`] covers tests and single-node setups.

mod config;
mod error;
mod manager;
mod memory;
mod store;

pub use crate::config::*;
pub use crate::error::*;
pub use crate::manager::*;
pub use crate::memory::*;
pub use crate::store::*;
