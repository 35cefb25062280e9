use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Version timestamp: microseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    pub const fn as_micros(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn unix_time_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros().min(u128::from(u64::MAX)) as u64)
        .unwrap_or(0)
}

/// Hands out strictly increasing version timestamps that track wall-clock time.
///
/// Two writes issued within the same microsecond still get distinct versions,
/// so a burst of writes to one cell never collapses into a single version.
#[derive(Debug, Default)]
pub struct VersionClock {
    last: AtomicU64,
}

impl VersionClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next timestamp, strictly after every timestamp returned so far.
    pub fn next(&self) -> Timestamp {
        self.next_after(Timestamp::from_micros(0))
    }

    /// Next timestamp, strictly after both previously issued ones and `floor`.
    ///
    /// Engines pass the newest stored version of the cell being written as
    /// `floor`, which keeps versions ordered even if the wall clock stepped
    /// backwards between process runs.
    pub fn next_after(&self, floor: Timestamp) -> Timestamp {
        let now = unix_time_us();
        loop {
            let cur = self.last.load(Ordering::Relaxed);
            let next = now
                .max(cur.saturating_add(1))
                .max(floor.as_micros().saturating_add(1));
            if self
                .last
                .compare_exchange_weak(cur, next, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                return Timestamp::from_micros(next);
            }
        }
    }
}
