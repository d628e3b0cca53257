use crate::{
    clock::{Clock, SystemClock},
    config::Configuration,
    error::Error,
    layout::{IdParts, Layout},
    Result,
};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

#[derive(Debug, Default)]
struct GeneratorState {
    /// Clock reading used for the previous id; `None` until the first allocation.
    last_timestamp: Option<i64>,
    sequence: u64,
}

/// Snowflake-style 64-bit id generator for a single node.
///
/// Ids are `[timestamp][node id][sequence]` with field widths taken from the
/// [`Configuration`]. Allocation is serialized by an internal lock, so one
/// generator can be shared across threads behind an `Arc`.
pub struct Versaflake<C: Clock = SystemClock> {
    node_id: u64,
    config: Configuration,
    layout: Layout,
    clock: C,
    state: Mutex<GeneratorState>,
}

impl Versaflake<SystemClock> {
    /// Creates a generator backed by the real system clock.
    pub fn new(node_id: i64, config: Configuration) -> Result<Self> {
        Self::with_clock(node_id, config, SystemClock)
    }
}

impl<C: Clock> Versaflake<C> {
    /// Creates a generator reading time from `clock`.
    ///
    /// Fails with [`Error::InvalidNodeId`] unless `0 <= node_id <= 2^node_id_bits - 1`.
    pub fn with_clock(node_id: i64, config: Configuration, clock: C) -> Result<Self> {
        let layout = config.layout();
        let max_node_id = layout.max_node_id();

        let node_id = match u64::try_from(node_id) {
            Ok(id) if id <= max_node_id => id,
            _ => {
                return Err(Error::InvalidNodeId {
                    node_id,
                    max_node_id,
                })
            }
        };

        debug!(
            node_id,
            epoch_millis = config.epoch_millis(),
            timestamp_bits = config.timestamp_bits(),
            node_id_bits = config.node_id_bits(),
            sequence_bits = config.sequence_bits(),
            strict = config.is_strict(),
            "versaflake generator created"
        );

        Ok(Self {
            node_id,
            config,
            layout,
            clock,
            state: Mutex::new(GeneratorState::default()),
        })
    }

    /// Allocates the next unique id.
    ///
    /// - if the clock reads earlier than the last allocation, strict mode fails
    ///   with [`Error::ClockMovedBackward`] and leaves the state untouched;
    ///   otherwise the call blocks until the clock catches up
    /// - if the per-millisecond sequence is exhausted, blocks until the next
    ///   millisecond
    ///
    /// The lock is held while blocking, so concurrent callers queue behind it.
    pub fn next_id(&self) -> Result<u64> {
        let mut state = self.state.lock();

        let mut now = self.clock.now_millis();

        match state.last_timestamp {
            None => {
                state.sequence = 0;
            }
            Some(last) => {
                if now < last {
                    warn!(
                        last,
                        now,
                        strict = self.config.is_strict(),
                        "clock moved backward"
                    );
                    if self.config.is_strict() {
                        return Err(Error::ClockMovedBackward { last, now });
                    }
                    now = self.clock.wait_past(last);
                }

                if now == last {
                    state.sequence = (state.sequence + 1) & self.layout.sequence_mask();
                    if state.sequence == 0 {
                        trace!(last, "sequence exhausted, waiting for next millisecond");
                        now = self.clock.wait_past(last);
                    }
                } else {
                    state.sequence = 0;
                }
            }
        }

        state.last_timestamp = Some(now);

        let time_field = self
            .layout
            .time_field(now.wrapping_sub(self.config.epoch_millis()));

        Ok(self.layout.compose(time_field, self.node_id, state.sequence))
    }

    /// Splits an id produced under this generator's configuration into its fields.
    pub fn decompose(&self, id: u64) -> IdParts {
        self.layout.decompose(id)
    }

    pub fn node_id(&self) -> u64 {
        self.node_id
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{test_clock::TestClock, ManualClock};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn config(sequence_bits: u32, strict_mode: bool) -> Configuration {
        Configuration::new(0, 41, 10, sequence_bits, strict_mode).unwrap()
    }

    fn make_generator(node_id: i64, clock_millis: i64) -> Versaflake<TestClock> {
        let clock = TestClock::new(clock_millis);
        Versaflake::with_clock(node_id, config(12, false), clock).unwrap()
    }

    fn last_timestamp_and_sequence<C: Clock>(gen: &Versaflake<C>) -> (Option<i64>, u64) {
        let state = gen.state.lock();
        (state.last_timestamp, state.sequence)
    }

    #[test]
    fn first_id_has_sequence_zero() {
        let gen = make_generator(0, 100);
        let id = gen.next_id().unwrap();
        assert_eq!(gen.decompose(id).sequence, 0);
    }

    #[test]
    fn same_millisecond_increments_sequence() {
        let gen = make_generator(5, 100);
        let first = gen.decompose(gen.next_id().unwrap());
        let second = gen.decompose(gen.next_id().unwrap());
        let third = gen.decompose(gen.next_id().unwrap());

        assert_eq!(
            [first.sequence, second.sequence, third.sequence],
            [0, 1, 2]
        );
        for parts in [first, second, third] {
            assert_eq!(parts.time_field, 100);
            assert_eq!(parts.node_id, 5);
        }
    }

    #[test]
    fn new_millisecond_resets_sequence() {
        let clock = TestClock::new(100);
        let gen = Versaflake::with_clock(0, config(12, false), clock.clone()).unwrap();
        gen.next_id().unwrap();
        gen.next_id().unwrap();

        clock.set(101);
        let parts = gen.decompose(gen.next_id().unwrap());
        assert_eq!(parts.sequence, 0);
        assert_eq!(parts.time_field, 101);
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let clock = TestClock::new(100);
        let gen = Versaflake::with_clock(3, config(4, false), clock.clone()).unwrap();

        let mut seen = HashSet::new();
        let mut previous = None;
        for i in 0..200 {
            if i % 7 == 0 {
                clock.set(100 + i);
            }
            let id = gen.next_id().unwrap();
            assert!(seen.insert(id), "duplicate id {id}");
            if let Some(prev) = previous {
                assert!(id > prev);
            }
            previous = Some(id);
        }
    }

    #[test]
    fn sequence_overflow_waits_for_next_millisecond() {
        let clock = TestClock::new(1_000);
        let gen = Versaflake::with_clock(1, config(2, false), clock.clone()).unwrap();

        let sequences: Vec<u64> = (0..4)
            .map(|_| gen.decompose(gen.next_id().unwrap()).sequence)
            .collect();
        assert_eq!(sequences, [0, 1, 2, 3]);
        assert_eq!(clock.waits(), 0);

        // The fifth id in the same millisecond must move to the next one.
        let parts = gen.decompose(gen.next_id().unwrap());
        assert_eq!(clock.waits(), 1);
        assert_eq!(parts.sequence, 0);
        assert_eq!(parts.time_field, 1_001);
        assert_eq!(last_timestamp_and_sequence(&gen), (Some(1_001), 0));
    }

    #[test]
    fn node_id_bounds() {
        let config = Configuration::default();
        assert_eq!(
            Versaflake::new(-1, config).err(),
            Some(Error::InvalidNodeId {
                node_id: -1,
                max_node_id: 1023
            })
        );
        assert_eq!(
            Versaflake::new(1024, config).err(),
            Some(Error::InvalidNodeId {
                node_id: 1024,
                max_node_id: 1023
            })
        );
        let gen = Versaflake::new(1023, config).unwrap();
        assert_eq!(gen.node_id(), 1023);
    }

    #[test]
    fn node_id_bounds_follow_configured_width() {
        let config = Configuration::new(0, 41, 3, 12, false).unwrap();
        assert!(Versaflake::new(7, config).is_ok());
        assert!(matches!(
            Versaflake::new(8, config),
            Err(Error::InvalidNodeId { max_node_id: 7, .. })
        ));
    }

    #[test]
    fn strict_mode_rejects_clock_regression_without_mutating_state() {
        let clock = ManualClock::new(1_000);
        let gen = Versaflake::with_clock(0, config(12, true), clock.clone()).unwrap();
        gen.next_id().unwrap();

        clock.set(999);
        assert_eq!(
            gen.next_id(),
            Err(Error::ClockMovedBackward {
                last: 1_000,
                now: 999
            })
        );
        assert_eq!(last_timestamp_and_sequence(&gen), (Some(1_000), 0));

        // Once the clock recovers the generator behaves as if nothing happened.
        clock.set(1_000);
        let parts = gen.decompose(gen.next_id().unwrap());
        assert_eq!(parts.time_field, 1_000);
        assert_eq!(parts.sequence, 1);
    }

    #[test]
    fn default_mode_blocks_until_clock_catches_up() {
        let clock = ManualClock::new(1_000);
        let gen = Arc::new(Versaflake::with_clock(0, config(12, false), clock.clone()).unwrap());
        gen.next_id().unwrap();

        clock.set(999);
        let worker = {
            let gen = Arc::clone(&gen);
            thread::spawn(move || gen.next_id())
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!worker.is_finished(), "allocation returned before the clock recovered");

        clock.set(1_001);
        let id = worker.join().unwrap().unwrap();
        let parts = gen.decompose(id);
        assert_eq!(parts.time_field, 1_001);
        assert_eq!(parts.sequence, 0);
    }

    #[test]
    fn default_mode_absorbs_regression_with_auto_advancing_clock() {
        let clock = TestClock::new(1_000);
        let gen = Versaflake::with_clock(0, config(12, false), clock.clone()).unwrap();
        let before = gen.next_id().unwrap();

        clock.set(500);
        let after = gen.next_id().unwrap();
        assert!(after > before);
        assert_eq!(gen.decompose(after).time_field, 1_001);
        assert_eq!(gen.decompose(after).sequence, 0);
    }

    #[test]
    fn decoded_id_round_trips_node_and_sequence() {
        let epoch = 1_735_689_600_000;
        let config = Configuration::new(epoch, 41, 10, 12, false).unwrap();
        let clock = TestClock::new(epoch + 12_345);
        let gen = Versaflake::with_clock(777, config, clock).unwrap();

        for expected_sequence in 0..5 {
            let parts = gen.decompose(gen.next_id().unwrap());
            assert_eq!(parts.node_id, 777);
            assert_eq!(parts.sequence, expected_sequence);
            assert!(parts.sequence <= gen.layout().sequence_mask());
            assert_eq!(parts.timestamp_millis(epoch), epoch + 12_345);
        }
    }

    #[test]
    fn id_matches_manual_bit_layout() {
        // 18 node bits and 4 sequence bits put the timestamp at bit 22.
        let epoch = 1_704_067_200_000;
        let config = Configuration::new(epoch, 41, 18, 4, false).unwrap();
        let clock = TestClock::new(epoch);
        let gen = Versaflake::with_clock(1, config, clock.clone()).unwrap();

        for _ in 0..16 {
            gen.next_id().unwrap();
        }
        clock.set(epoch + 1);
        assert_eq!(gen.next_id().unwrap(), 4_194_320);
    }

    #[test]
    fn timestamp_field_wraps_silently() {
        let config = Configuration::new(0, 4, 2, 2, false).unwrap();
        let gen = Versaflake::with_clock(0, config, TestClock::new(16)).unwrap();
        assert_eq!(gen.decompose(gen.next_id().unwrap()).time_field, 0);
    }

    #[test]
    fn ids_are_non_negative_as_i64() {
        let gen = Versaflake::new(1023, Configuration::default()).unwrap();
        for _ in 0..100 {
            assert!(gen.next_id().unwrap() <= i64::MAX as u64);
        }
    }

    #[test]
    fn generator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Versaflake>();
        assert_send_sync::<Versaflake<ManualClock>>();
    }
}
