//! Lock-free generation of Snowflake-style tracking numbers.
//!
//! A [`TrackingId`] packs three fields into the low 63 bits of a `u64`:
//! a 41-bit millisecond timestamp (relative to [`TRACKING_EPOCH`]), a 10-bit
//! worker id, and a 12-bit per-millisecond sequence. Rendered as upper-case
//! base-36, every id fits in at most 13 characters.
//!
//! [`TrackingNumberGenerator`] mints ids from a single atomic word via
//! compare-and-swap: callers never take a lock, and any number of threads may
//! generate concurrently. A backwards wall clock is reported as
//! [`Error::ClockRegression`] instead of risking a duplicate.
//!
//! ```
//! use waybill::{SystemClock, TrackingNumberGenerator};
//!
//! let generator = TrackingNumberGenerator::new(42, SystemClock::default())?;
//! let tracking_number = generator.generate()?;
//! assert!(tracking_number.len() <= 13);
//! # Ok::<(), waybill::Error>(())
//! ```
//!
//! Worker ids must be unique among live processes; see the `waybill-lease`
//! crate for leasing them out of a shared coordination store.

mod base36;
mod clock;
mod error;
mod generator;
mod id;
#[cfg(feature = "serde")]
mod serde;

pub use crate::base36::*;
pub use crate::clock::*;
pub use crate::error::*;
pub use crate::generator::*;
pub use crate::id::*;
