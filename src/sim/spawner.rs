//! Periodic batch spawning
//!
//! Each batch tick asks for `batch` new particles, which are handed out a few
//! at a time over the following sub-ticks instead of all in one frame.
//! A batch that arrives while a previous one is still distributing is merged
//! into the in-flight stream: the remaining count grows and the per-sub-tick
//! rate adds up, so there is only ever one stream (and one sub-tick timer).
//! The summed rate holds until the whole merged remainder is drained, so the
//! tail of a merged batch comes out faster than it would on its own.

use serde::{Deserialize, Serialize};

/// Spawner state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpawnerState {
    /// Nothing left to hand out
    #[default]
    Idle,
    /// Handing out `per_sub_tick` particles per sub-tick until `remaining` hits 0
    Distributing { remaining: usize, per_sub_tick: usize },
}

/// What a call to [`BatchSpawner::begin`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStart {
    /// Empty batch, nothing scheduled
    Skipped,
    /// Spawner was idle and is now distributing
    Started,
    /// Folded into a batch that was still distributing
    Merged,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSpawner {
    state: SpawnerState,
    /// Sub-ticks a single batch is spread over
    frames: usize,
    /// Total particles handed out since creation
    spawned_total: u64,
}

impl BatchSpawner {
    pub fn new(frames: u32) -> Self {
        Self {
            state: SpawnerState::Idle,
            frames: frames.max(1) as usize,
            spawned_total: 0,
        }
    }

    pub fn state(&self) -> SpawnerState {
        self.state
    }

    pub fn is_distributing(&self) -> bool {
        matches!(self.state, SpawnerState::Distributing { .. })
    }

    /// Particles still owed by the in-flight batch
    pub fn remaining(&self) -> usize {
        match self.state {
            SpawnerState::Idle => 0,
            SpawnerState::Distributing { remaining, .. } => remaining,
        }
    }

    pub fn spawned_total(&self) -> u64 {
        self.spawned_total
    }

    /// Queue a new batch of `batch` particles
    pub fn begin(&mut self, batch: usize) -> BatchStart {
        if batch == 0 {
            return BatchStart::Skipped;
        }
        let rate = batch.div_ceil(self.frames);

        match self.state {
            SpawnerState::Idle => {
                self.state = SpawnerState::Distributing {
                    remaining: batch,
                    per_sub_tick: rate,
                };
                BatchStart::Started
            }
            SpawnerState::Distributing {
                remaining,
                per_sub_tick,
            } => {
                self.state = SpawnerState::Distributing {
                    remaining: remaining + batch,
                    per_sub_tick: per_sub_tick + rate,
                };
                BatchStart::Merged
            }
        }
    }

    /// Number of particles to create this sub-tick.
    ///
    /// Returns to `Idle` on the sub-tick that hands out the last particle.
    pub fn sub_tick(&mut self) -> usize {
        let SpawnerState::Distributing {
            remaining,
            per_sub_tick,
        } = self.state
        else {
            return 0;
        };

        let count = per_sub_tick.min(remaining);
        let left = remaining - count;
        self.state = if left == 0 {
            SpawnerState::Idle
        } else {
            SpawnerState::Distributing {
                remaining: left,
                per_sub_tick,
            }
        };
        self.spawned_total += count as u64;
        count
    }

    /// Drop any in-flight batch
    pub fn reset(&mut self) {
        self.state = SpawnerState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_of_seven_terminates_at_seven() {
        let mut spawner = BatchSpawner::new(150);
        assert_eq!(spawner.begin(7), BatchStart::Started);

        let mut cumulative = 0;
        let mut ticks = 0;
        while spawner.is_distributing() {
            let before = cumulative;
            cumulative += spawner.sub_tick();
            assert!(cumulative >= before);
            ticks += 1;
        }
        assert_eq!(cumulative, 7);
        assert_eq!(ticks, 7);
        assert_eq!(spawner.state(), SpawnerState::Idle);
        // Idle sub-ticks hand out nothing
        assert_eq!(spawner.sub_tick(), 0);
    }

    #[test]
    fn test_large_batch_uses_ceil_rate() {
        let mut spawner = BatchSpawner::new(150);
        spawner.begin(140);
        assert_eq!(
            spawner.state(),
            SpawnerState::Distributing {
                remaining: 140,
                per_sub_tick: 1
            }
        );

        let mut spawner = BatchSpawner::new(150);
        spawner.begin(301);
        assert_eq!(spawner.sub_tick(), 3);
        assert_eq!(spawner.remaining(), 298);
    }

    #[test]
    fn test_last_sub_tick_is_partial() {
        let mut spawner = BatchSpawner::new(2);
        spawner.begin(5); // rate 3
        assert_eq!(spawner.sub_tick(), 3);
        assert_eq!(spawner.sub_tick(), 2);
        assert!(!spawner.is_distributing());
        assert_eq!(spawner.spawned_total(), 5);
    }

    #[test]
    fn test_empty_batch_is_skipped() {
        let mut spawner = BatchSpawner::new(150);
        assert_eq!(spawner.begin(0), BatchStart::Skipped);
        assert!(!spawner.is_distributing());
    }

    #[test]
    fn test_overlapping_batches_merge() {
        let mut spawner = BatchSpawner::new(10);
        spawner.begin(20); // rate 2
        spawner.sub_tick();
        spawner.sub_tick();
        assert_eq!(spawner.remaining(), 16);

        assert_eq!(spawner.begin(15), BatchStart::Merged); // rate 2 + 2
        assert_eq!(
            spawner.state(),
            SpawnerState::Distributing {
                remaining: 31,
                per_sub_tick: 4
            }
        );

        let mut total = 4;
        while spawner.is_distributing() {
            total += spawner.sub_tick();
        }
        assert_eq!(total, 35);
        assert_eq!(spawner.spawned_total(), 35);
    }

    #[test]
    fn test_merged_rate_holds_until_drained() {
        let mut spawner = BatchSpawner::new(10);
        spawner.begin(10); // rate 1
        for _ in 0..5 {
            spawner.sub_tick();
        }
        spawner.begin(10); // rate 1 + 1

        // 15 left at 2 per sub-tick, past the point the first batch ran dry
        let counts: Vec<usize> = std::iter::from_fn(|| {
            spawner.is_distributing().then(|| spawner.sub_tick())
        })
        .collect();
        assert_eq!(counts, vec![2, 2, 2, 2, 2, 2, 2, 1]);
    }

    #[test]
    fn test_reset_drops_in_flight_batch() {
        let mut spawner = BatchSpawner::new(150);
        spawner.begin(50);
        spawner.reset();
        assert_eq!(spawner.remaining(), 0);
        assert_eq!(spawner.sub_tick(), 0);
    }
}
