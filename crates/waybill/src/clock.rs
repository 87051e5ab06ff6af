use std::{
    sync::{
        Arc, OnceLock,
        atomic::{AtomicU64, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

/// Tracking epoch: Wednesday, January 1, 2025 00:00:00 UTC
///
/// Timestamps embedded in a [`TrackingId`] count milliseconds from this
/// instant. 41 bits of milliseconds last until roughly 2094.
///
/// [`TrackingId`]: crate::TrackingId
pub const TRACKING_EPOCH: Duration = Duration::from_millis(1_735_689_600_000);

/// A source of epoch-relative milliseconds.
///
/// This abstraction lets the generator run against the real system clock, a
/// monotonic ticker, or a mocked time source in tests.
///
/// # Example
///
/// ```
/// use waybill::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// let time = FixedTime;
/// assert_eq!(time.current_millis(), 1234);
/// ```
pub trait TimeSource {
    /// Returns the current time in milliseconds since the configured epoch.
    fn current_millis(&self) -> u64;
}

/// A wall-clock time source.
///
/// Every call samples [`SystemTime::now`] and subtracts the configured epoch.
/// This is the simplest clock and matches what most deployments want, but it
/// inherits the wall clock's flaws: NTP corrections or manual adjustments can
/// move it backwards, which the generator surfaces as a clock-regression
/// error rather than risking a duplicate id. Use [`MonotonicClock`] if that
/// failure mode is unacceptable.
#[derive(Clone, Debug)]
pub struct SystemClock {
    epoch: Duration,
}

impl Default for SystemClock {
    /// Constructs a wall clock aligned to the default [`TRACKING_EPOCH`].
    ///
    /// Panics if system time is earlier than the tracking epoch.
    fn default() -> Self {
        Self::with_epoch(TRACKING_EPOCH)
    }
}

impl SystemClock {
    /// Constructs a wall clock using a custom epoch as the origin (t = 0),
    /// specified as a [`Duration`] since the Unix epoch.
    ///
    /// # Panics
    ///
    /// Panics if the current system time is earlier than the given epoch: a
    /// process started with such a clock would mint ids from timestamp zero
    /// and collide with history once the clock is fixed.
    pub fn with_epoch(epoch: Duration) -> Self {
        let system_now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("System clock before UNIX_EPOCH");
        assert!(
            system_now >= epoch,
            "System clock before the configured epoch"
        );
        Self { epoch }
    }
}

impl TimeSource for SystemClock {
    fn current_millis(&self) -> u64 {
        // A regression past the epoch after construction saturates to zero,
        // which the generator then reports as a clock regression.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|now| now.saturating_sub(self.epoch).as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Shared ticker thread that updates every millisecond.
struct Ticker {
    millis: AtomicU64,
    _thread: OnceLock<JoinHandle<()>>,
}

/// A monotonic time source driven by a 1ms background ticker.
///
/// The clock captures `Instant::now()` at construction, then a detached
/// thread advances a shared atomic counter once per millisecond. Reading the
/// clock is a single relaxed atomic load, so it stays cheap no matter how
/// many generator threads hammer it, and the reported time can never move
/// backwards even if the wall clock is adjusted externally.
///
/// The trade-off is 1ms granularity plus one background thread per clock;
/// clones share the same ticker, and the thread exits once the last clone is
/// dropped.
#[derive(Clone)]
pub struct MonotonicClock {
    ticker: Arc<Ticker>,
    epoch_offset: u64, // in milliseconds
}

impl Default for MonotonicClock {
    /// Constructs a monotonic clock aligned to the default [`TRACKING_EPOCH`].
    ///
    /// Panics if system time is earlier than the tracking epoch.
    fn default() -> Self {
        Self::with_epoch(TRACKING_EPOCH)
    }
}

impl MonotonicClock {
    /// Constructs a monotonic clock using a custom epoch as the origin
    /// (t = 0), specified as a [`Duration`] since the Unix epoch.
    ///
    /// The wall clock is consulted exactly once, to compute the fixed offset
    /// between the epoch and construction time; afterwards only the monotonic
    /// ticker advances.
    ///
    /// # Panics
    ///
    /// Panics if the current system time is earlier than the given epoch, or
    /// if the ticker thread handle was already initialized.
    pub fn with_epoch(epoch: Duration) -> Self {
        let start = Instant::now();
        let system_now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("System clock before UNIX_EPOCH");
        let offset = system_now
            .checked_sub(epoch)
            .expect("System clock before the configured epoch")
            .as_millis() as u64;

        let ticker = Arc::new(Ticker {
            millis: AtomicU64::new(0),
            _thread: OnceLock::new(),
        });

        let weak_ticker = Arc::downgrade(&ticker);
        let handle = thread::spawn(move || {
            let mut tick = 0;

            loop {
                // Exit once every clock handle is gone.
                let Some(ticker) = weak_ticker.upgrade() else {
                    break;
                };

                let target = start + Duration::from_millis(tick);

                let now = Instant::now();
                if now < target {
                    thread::sleep(target - now);
                }

                // Store the actual elapsed time, not the target: oversleeping
                // must not make the counter lag behind real time.
                let now_ms = start.elapsed().as_millis() as u64;
                ticker.millis.store(now_ms, Ordering::Relaxed);

                tick = now_ms + 1;
            }
        });

        ticker
            ._thread
            .set(handle)
            .expect("failed to set ticker thread handle");

        Self {
            ticker,
            epoch_offset: offset,
        }
    }
}

impl TimeSource for MonotonicClock {
    /// Returns milliseconds since the configured epoch, based on monotonic
    /// elapsed time since construction.
    fn current_millis(&self) -> u64 {
        self.epoch_offset + self.ticker.millis.load(Ordering::Relaxed)
    }
}
