use crate::base36::DecodeError;

/// A specialized result type for tracking-number operations.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All possible errors that `waybill` can produce.
///
/// Generation can fail in exactly two ways: the caller asked for a worker id
/// that does not fit the 10-bit field, or the clock source reported a time
/// earlier than the last issued timestamp. Parsing a rendered tracking number
/// back into an id surfaces [`DecodeError`] through the `Decode` variant.
#[derive(Clone, PartialEq, Eq, thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The clock source reported a time strictly earlier than the last
    /// recorded timestamp.
    ///
    /// Issuing an id anyway could repeat a `(timestamp, sequence)` pair, so
    /// generation fails instead. Both values are milliseconds since the
    /// configured epoch.
    #[error("clock moved backwards: now={now_ms}ms, last issued={last_ms}ms")]
    ClockRegression { now_ms: u64, last_ms: u64 },

    /// The requested worker id does not fit the 10-bit worker field.
    #[error("worker id {worker_id} out of range 0..={max}")]
    WorkerIdOutOfRange { worker_id: u64, max: u64 },

    /// A tracking-number string could not be parsed back into an id.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}
