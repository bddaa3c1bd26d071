use std::{
    ops::Add,
    sync::{
        atomic::{AtomicU64, Ordering},
        OnceLock,
    },
    time::{Duration, Instant},
};

use proptest::prelude::*;

static EPOCH: OnceLock<Instant> = OnceLock::new();
static LAST_READING: AtomicU64 = AtomicU64::new(0);

/// A monotonic clock reading, in nanoseconds since the first reading taken by this process.
///
/// Readings are strictly increasing: two calls to [`Timestamp::now`] never return the same value,
/// even when the underlying clock has not advanced between them. This is what makes clock-derived
/// block identifiers unique within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    nanos: u64,
}

impl Timestamp {
    pub fn now() -> Self {
        let epoch = EPOCH.get_or_init(Instant::now);
        let reading = u64::try_from(epoch.elapsed().as_nanos()).unwrap_or(u64::MAX);

        let previous = match LAST_READING.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(reading.max(last.saturating_add(1)))
        }) {
            Ok(previous) | Err(previous) => previous,
        };

        Self {
            nanos: reading.max(previous.saturating_add(1)),
        }
    }

    pub fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    pub fn as_nanos(&self) -> u64 {
        self.nanos
    }

    /// Time elapsed between `earlier` and `self`, zero if `earlier` is actually later.
    pub fn duration_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_nanos(self.nanos.saturating_sub(earlier.nanos))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        let delta = u64::try_from(rhs.as_nanos()).unwrap_or(u64::MAX);

        Self {
            nanos: self.nanos.saturating_add(delta),
        }
    }
}

impl Arbitrary for Timestamp {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        any::<u64>().prop_map(Self::from_nanos).boxed()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use test_strategy::proptest;

    use super::*;

    #[test]
    fn test_readings_are_strictly_increasing() {
        let readings: Vec<Timestamp> = (0..1_000).map(|_| Timestamp::now()).collect();

        for pair in readings.windows(2) {
            assert!(pair[0] < pair[1], "{:?} >= {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_readings_are_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| (0..250).map(|_| Timestamp::now()).collect::<Vec<_>>()))
            .collect();

        let mut all: Vec<Timestamp> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        let total = all.len();

        all.sort();
        all.dedup();

        assert_eq!(all.len(), total);
    }

    #[proptest(fork = false)]
    fn test_duration_since_saturates(a: Timestamp, b: Timestamp) {
        let elapsed = a.duration_since(b);

        if a <= b {
            prop_assert_eq!(elapsed, Duration::ZERO);
        } else {
            prop_assert_eq!(elapsed.as_nanos(), u128::from(a.as_nanos() - b.as_nanos()));
        }
    }

    #[proptest(fork = false)]
    fn test_add_moves_forward(a: Timestamp, #[strategy(0..1_000_000u64)] delta: u64) {
        prop_assume!(a.as_nanos() < u64::MAX - 1_000_000);
        let later = a + Duration::from_nanos(delta);

        prop_assert_eq!(later.duration_since(a), Duration::from_nanos(delta));
    }
}
