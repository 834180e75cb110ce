//! Routing synchronized observations into target intervals.
//!
//! Target intervals are sorted by start time and never overlap, so the
//! interval an observation belongs to is found with one binary search over
//! the start times: take the rightmost start not after the observation's
//! gameloop and check the end bound. Observations that fall between
//! intervals are dropped.

use crate::model::{Gameloop, IntervalEnd, Observation, ObservationInterval};
use crate::ObserveError;

/// Buckets observations into a fixed set of [`ObservationInterval`]s.
#[derive(Debug)]
pub struct IntervalAssigner {
    intervals: Vec<ObservationInterval>,
    /// Start times of `intervals`, kept separately for bisection.
    starts: Vec<Gameloop>,
    last_gameloop: Option<Gameloop>,
    assigned: usize,
    dropped: usize,
}

impl IntervalAssigner {
    /// Create an assigner over the given target intervals.
    ///
    /// # Errors
    ///
    /// Returns an error if the intervals are not sorted by start time, if a
    /// bounded interval ends before it starts, or if two intervals overlap
    /// (an unbounded interval overlaps everything after it).
    pub fn new(intervals: Vec<ObservationInterval>) -> Result<Self, ObserveError> {
        for interval in &intervals {
            if let IntervalEnd::At(end) = interval.end_time {
                if end < interval.start_time {
                    return Err(ObserveError::InvertedInterval {
                        start: interval.start_time,
                        end,
                    });
                }
            }
        }

        for pair in intervals.windows(2) {
            let (previous, next) = (&pair[0], &pair[1]);
            if next.start_time < previous.start_time {
                return Err(ObserveError::UnsortedIntervals {
                    previous_start: previous.start_time,
                    start: next.start_time,
                });
            }
            let overlaps = match previous.end_time {
                IntervalEnd::Unbounded => true,
                IntervalEnd::At(end) => next.start_time <= end,
            };
            if overlaps {
                return Err(ObserveError::OverlappingIntervals {
                    previous_start: previous.start_time,
                    start: next.start_time,
                });
            }
        }

        let starts = intervals.iter().map(|i| i.start_time).collect();
        Ok(Self {
            intervals,
            starts,
            last_gameloop: None,
            assigned: 0,
            dropped: 0,
        })
    }

    /// An assigner with a single interval spanning the whole game.
    pub fn whole_game() -> Self {
        Self {
            intervals: vec![ObservationInterval::whole_game()],
            starts: vec![0],
            last_gameloop: None,
            assigned: 0,
            dropped: 0,
        }
    }

    /// Index of the interval that contains `gameloop`, if any.
    pub fn locate(&self, gameloop: Gameloop) -> Option<usize> {
        let index = self
            .starts
            .partition_point(|&start| start <= gameloop)
            .checked_sub(1)?;
        self.intervals[index].contains(gameloop).then_some(index)
    }

    /// Append `observation` to its interval. Returns `false` if no interval
    /// contains it, in which case it is dropped.
    pub fn assign(&mut self, observation: Observation) -> bool {
        let gameloop = observation.game_loop;
        self.last_gameloop = Some(gameloop);

        match self.locate(gameloop) {
            Some(index) => {
                self.intervals[index].observations.push(observation);
                self.assigned += 1;
                true
            }
            None => {
                tracing::debug!(gameloop, "observation outside every target interval -- dropped");
                self.dropped += 1;
                false
            }
        }
    }

    /// Number of observations placed in an interval so far.
    pub fn assigned(&self) -> usize {
        self.assigned
    }

    /// Number of observations dropped so far.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Consume the assigner and return the populated intervals.
    ///
    /// An unbounded interval is closed at the last gameloop seen. If no
    /// observation was ever assigned it keeps the unbounded end.
    pub fn finish(mut self) -> Vec<ObservationInterval> {
        if let Some(last) = self.last_gameloop {
            for interval in &mut self.intervals {
                if interval.end_time.is_unbounded() {
                    interval.end_time = IntervalEnd::At(last);
                }
            }
        }
        self.intervals
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
