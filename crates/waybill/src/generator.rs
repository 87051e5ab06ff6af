use core::cmp;

use portable_atomic::{AtomicU64, Ordering};
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{Error, Result, TimeSource, TrackingId};

/// Outcome of a single, non-suspending generation attempt.
///
/// [`TrackingNumberGenerator::try_poll_id`] never waits: it either mints an
/// id or tells the caller how long the generator is throttled. This keeps
/// polling loops and backoff strategies in the caller's hands.
///
/// - [`IdPoll::Ready`] carries a freshly minted id.
/// - [`IdPoll::Pending`] with `yield_for_ms == 0` means another thread won
///   the race for the current state; retrying immediately is fine.
/// - [`IdPoll::Pending`] with `yield_for_ms == 1` means the 4096-id sequence
///   for the current millisecond is exhausted; retry once the clock advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPoll {
    /// A unique ID was generated and is ready to use.
    Ready {
        /// The generated tracking ID.
        id: TrackingId,
    },
    /// No ID could be generated on this attempt.
    Pending {
        /// Milliseconds to wait before trying again (zero: retry at once).
        yield_for_ms: u64,
    },
}

/// A lock-free tracking-number generator safe for unbounded concurrent
/// callers.
///
/// The generator keeps its whole mutable state - the last issued timestamp
/// and sequence, packed as a [`TrackingId`] - in a single [`AtomicU64`].
/// Every attempt is one load, one comparison against the clock, and one
/// compare-and-swap; there is no mutex anywhere, so a caller can never block
/// another.
///
/// Uniqueness rests on two rules. Within one process, the CAS hands each
/// `(timestamp, sequence)` pair to exactly one winning caller. Across
/// processes, each generator is constructed with a distinct worker id (see
/// the `waybill-lease` crate), which is baked into every id it mints.
///
/// A wall clock that moves backwards is reported as
/// [`Error::ClockRegression`] rather than papered over: re-issuing an old
/// millisecond could duplicate a pair already handed out.
pub struct TrackingNumberGenerator<C: TimeSource> {
    state: AtomicU64,
    clock: C,
}

impl<C: TimeSource> TrackingNumberGenerator<C> {
    /// Creates a generator for the given worker id, starting from a zero
    /// timestamp and sequence.
    ///
    /// The worker id is validated against the 10-bit field once, here;
    /// generation itself can then never produce an out-of-range worker.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerIdOutOfRange`] if `worker_id` exceeds
    /// [`TrackingId::max_worker_id`].
    ///
    /// # Example
    /// ```
    /// use waybill::{SystemClock, TrackingNumberGenerator};
    ///
    /// let generator = TrackingNumberGenerator::new(7, SystemClock::default())?;
    /// let id = generator.next_id()?;
    /// assert_eq!(id.worker_id(), 7);
    /// # Ok::<(), waybill::Error>(())
    /// ```
    pub fn new(worker_id: u64, clock: C) -> Result<Self> {
        Self::from_components(0, worker_id, 0, clock)
    }

    /// Creates a generator preloaded with explicit state.
    ///
    /// Useful for restoring from persisted state or pinning a starting point
    /// in tests. Prefer [`Self::new`] otherwise: the first call will roll the
    /// timestamp forward to the current clock reading on its own.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerIdOutOfRange`] if `worker_id` exceeds
    /// [`TrackingId::max_worker_id`].
    pub fn from_components(
        timestamp: u64,
        worker_id: u64,
        sequence: u64,
        clock: C,
    ) -> Result<Self> {
        if worker_id > TrackingId::max_worker_id() {
            return Err(Error::WorkerIdOutOfRange {
                worker_id,
                max: TrackingId::max_worker_id(),
            });
        }
        let initial = TrackingId::from_components(timestamp, worker_id, sequence);
        Ok(Self {
            state: AtomicU64::new(initial.to_raw()),
            clock,
        })
    }

    /// Returns the worker id baked into every id this generator mints.
    pub fn worker_id(&self) -> u64 {
        TrackingId::from_raw(self.state.load(Ordering::Relaxed)).worker_id()
    }

    /// Attempts to mint the next id without ever waiting.
    ///
    /// Performs exactly one optimistic attempt: read the packed state,
    /// compare against the clock, and try to install the successor via
    /// compare-and-swap. Contention and sequence exhaustion are reported as
    /// [`IdPoll::Pending`]; only a backwards clock is an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClockRegression`] if the clock reads strictly earlier
    /// than the last issued timestamp. The internal state is untouched in
    /// that case.
    ///
    /// # Example
    /// ```
    /// use waybill::{IdPoll, SystemClock, TrackingNumberGenerator};
    ///
    /// let generator = TrackingNumberGenerator::new(0, SystemClock::default())?;
    /// let id = loop {
    ///     match generator.try_poll_id()? {
    ///         IdPoll::Ready { id } => break id,
    ///         IdPoll::Pending { yield_for_ms: 0 } => core::hint::spin_loop(),
    ///         IdPoll::Pending { .. } => std::thread::yield_now(),
    ///     }
    /// };
    /// # Ok::<(), waybill::Error>(())
    /// ```
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_poll_id(&self) -> Result<IdPoll> {
        // State before clock: a timestamp observed here was installed before
        // the sample below, so a behind reading can only be a real regression.
        // Sampling first would let a concurrent caller install a newer
        // timestamp in between and turn a lost race into a spurious error.
        let current_raw = self.state.load(Ordering::Relaxed);
        let current_id = TrackingId::from_raw(current_raw);
        let current_ts = current_id.timestamp();

        let now = self.clock.current_millis();

        let next_id = match now.cmp(&current_ts) {
            cmp::Ordering::Equal => {
                if current_id.has_sequence_room() {
                    current_id.increment_sequence()
                } else {
                    return Ok(IdPoll::Pending { yield_for_ms: 1 });
                }
            }
            cmp::Ordering::Greater => current_id.rollover_to_timestamp(now),
            cmp::Ordering::Less => return Err(Self::cold_clock_behind(now, current_ts)),
        };

        if self
            .state
            .compare_exchange(
                current_raw,
                next_id.to_raw(),
                Ordering::Relaxed,
                Ordering::Relaxed,
            )
            .is_ok()
        {
            Ok(IdPoll::Ready { id: next_id })
        } else {
            // CAS failed - another thread won the race. Yield 0 to retry
            // immediately.
            Ok(IdPoll::Pending { yield_for_ms: 0 })
        }
    }

    /// Mints the next id, spinning through contention and sequence
    /// exhaustion.
    ///
    /// Loops over [`Self::try_poll_id`]: a lost CAS race retries immediately
    /// with a spin hint, an exhausted sequence yields the thread and
    /// re-samples the clock until it advances past the current millisecond.
    /// There is no sleeping - exhaustion only happens after 4096 ids within
    /// a single millisecond, so the wait is bounded by clock granularity. The
    /// busy poll does burn CPU if a caller sustains that rate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClockRegression`] if the clock reads strictly earlier
    /// than the last issued timestamp.
    pub fn next_id(&self) -> Result<TrackingId> {
        loop {
            match self.try_poll_id()? {
                IdPoll::Ready { id } => return Ok(id),
                IdPoll::Pending { yield_for_ms: 0 } => core::hint::spin_loop(),
                IdPoll::Pending { .. } => std::thread::yield_now(),
            }
        }
    }

    /// Mints the next id and renders it as a tracking number.
    ///
    /// This is the call sites' entry point: one string per business request.
    /// Equivalent to [`Self::next_id`] followed by [`TrackingId::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClockRegression`] if the clock reads strictly earlier
    /// than the last issued timestamp.
    ///
    /// # Example
    /// ```
    /// use waybill::{SystemClock, TrackingNumberGenerator};
    ///
    /// let generator = TrackingNumberGenerator::new(0, SystemClock::default())?;
    /// let tracking_number = generator.generate()?;
    /// assert!((1..=13).contains(&tracking_number.len()));
    /// # Ok::<(), waybill::Error>(())
    /// ```
    pub fn generate(&self) -> Result<String> {
        Ok(self.next_id()?.encode())
    }

    #[cold]
    #[inline(never)]
    fn cold_clock_behind(now_ms: u64, last_ms: u64) -> Error {
        Error::ClockRegression { now_ms, last_ms }
    }
}
