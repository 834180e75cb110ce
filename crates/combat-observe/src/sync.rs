//! Observation synchronizer: raw replay frames in, paired observations out.
//!
//! A replay reports an action only when the *following* frame is queried, so
//! a raw frame cannot be emitted on its own. [`ObservationStream`] holds the
//! current frame until the next one arrives, builds an observation from the
//! current frame with the actions reported on the next one, and queues it.
//! Once two observations are queued the older one is emitted with its
//! `action_delay` set to the gameloop gap to the newer one.
//!
//! Which frames become observations is decided by a [`StepFilter`]. Frames
//! the filter rejects still advance the current frame, so they act as delay
//! markers: the next observation is built from the frame right before the
//! action rather than from the last accepted one.
//!
//! When the input ends, the final frame (which carries the game result) is
//! queued as a terminal observation and the queue is drained. The very last
//! observation has no successor to measure against and reuses the previously
//! measured delay. That value is filler and should not be relied upon.
//!
//! A frame whose two halves disagree on the gameloop aborts the stream: one
//! [`ObserveError::Desynchronized`] is yielded and the stream ends.

use std::collections::{BTreeSet, VecDeque};

use crate::model::{Gameloop, Observation, RawAction, ReplayFrame};
use crate::ObserveError;

/// Delay reported for the final observation when no gap was ever measured.
const DEFAULT_ACTION_DELAY: u32 = 1;

// ---------------------------------------------------------------------------
// StepFilter
// ---------------------------------------------------------------------------

/// Decides which gameloops are turned into observations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepFilter {
    /// Observe every frame (whole-game observation).
    Every,
    /// Observe only explicitly requested gameloops (combat re-observation).
    Targets(BTreeSet<Gameloop>),
    /// Observe only gameloops at which one player acted (initial low-cost
    /// pass over a replay).
    ActionSkips(BTreeSet<Gameloop>),
}

impl StepFilter {
    pub fn accepts(&self, step: Gameloop) -> bool {
        match self {
            StepFilter::Every => true,
            StepFilter::Targets(steps) | StepFilter::ActionSkips(steps) => steps.contains(&step),
        }
    }

    /// The gameloops this filter targets, or `None` for [`StepFilter::Every`].
    pub fn targets(&self) -> Option<&BTreeSet<Gameloop>> {
        match self {
            StepFilter::Every => None,
            StepFilter::Targets(steps) | StepFilter::ActionSkips(steps) => Some(steps),
        }
    }
}

// ---------------------------------------------------------------------------
// ObservationStream
// ---------------------------------------------------------------------------

/// Iterator adapter turning replay frames into synchronized observations.
///
/// ```
/// use combat_observe::prelude::*;
///
/// let frames = [0u32, 1, 2, 5, 6].into_iter().map(|g| Ok(ReplayFrame::at(g)));
/// let delays: Vec<u32> = ObservationStream::new(frames, StepFilter::Every)
///     .map(|obs| obs.unwrap().action_delay)
///     .collect();
/// assert_eq!(delays, vec![1, 1, 3, 1, 1]);
/// ```
pub struct ObservationStream<I> {
    frames: I,
    filter: StepFilter,
    /// Frame the next observation will be built from.
    current: Option<ReplayFrame>,
    /// Gameloop of the last frame that produced an observation; 0 until the
    /// first one.
    last_accepted_step: Gameloop,
    /// Observations waiting for their successor.
    queue: VecDeque<Observation>,
    /// Last measured gap between two emitted observations.
    last_delay: u32,
    exhausted: bool,
    failed: bool,
}

impl<I> ObservationStream<I>
where
    I: Iterator<Item = Result<ReplayFrame, ObserveError>>,
{
    pub fn new(frames: I, filter: StepFilter) -> Self {
        Self {
            frames,
            filter,
            current: None,
            last_accepted_step: 0,
            queue: VecDeque::with_capacity(4),
            last_delay: DEFAULT_ACTION_DELAY,
            exhausted: false,
            failed: false,
        }
    }

    /// Number of observations built but not yet emitted.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Feed one frame through the state machine.
    fn consume(&mut self, frame: ReplayFrame) -> Result<(), ObserveError> {
        check_synchronized(&frame)?;
        let step = frame.game_loop();

        let Some(current) = self.current.take() else {
            if step != 0 {
                tracing::warn!(step, "observation stream does not start at gameloop 0");
            }
            self.current = Some(frame);
            return Ok(());
        };

        let is_marker =
            step == 0 || (self.last_accepted_step > 0 && !self.filter.accepts(step - 1));
        if is_marker {
            self.current = Some(frame);
            return Ok(());
        }

        let actions = frame.player1.actions.clone();
        self.queue.push_back(unconverted_observation(current, actions));
        self.last_accepted_step = step;
        self.current = Some(frame);
        Ok(())
    }

    /// Pop the oldest observation, measuring its delay against the next one.
    /// The last observation of a drained queue reuses the previous delay.
    fn pop_with_delay(&mut self) -> Option<Observation> {
        let mut observation = self.queue.pop_front()?;
        if let Some(next) = self.queue.front() {
            self.last_delay = next.game_loop.saturating_sub(observation.game_loop);
        }
        observation.action_delay = self.last_delay;
        Some(observation)
    }

    /// Queue the final frame as a terminal observation unless it was already
    /// turned into one.
    fn finish(&mut self) {
        self.exhausted = true;
        let Some(last) = self.current.take() else {
            return;
        };
        let already_queued = self
            .queue
            .back()
            .is_some_and(|queued| queued.game_loop >= last.game_loop());
        if !already_queued {
            self.queue.push_back(unconverted_observation(last, Vec::new()));
        }
    }
}

impl<I> Iterator for ObservationStream<I>
where
    I: Iterator<Item = Result<ReplayFrame, ObserveError>>,
{
    type Item = Result<Observation, ObserveError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.failed {
                return None;
            }
            if self.queue.len() >= 2 || (self.exhausted && !self.queue.is_empty()) {
                return self.pop_with_delay().map(Ok);
            }
            if self.exhausted {
                return None;
            }
            match self.frames.next() {
                None => self.finish(),
                Some(Ok(frame)) => {
                    if let Err(e) = self.consume(frame) {
                        self.failed = true;
                        return Some(Err(e));
                    }
                }
                Some(Err(e)) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn check_synchronized(frame: &ReplayFrame) -> Result<(), ObserveError> {
    if frame.player1.game_loop != frame.player2.game_loop {
        return Err(ObserveError::Desynchronized {
            player1: frame.player1.game_loop,
            player2: frame.player2.game_loop,
        });
    }
    Ok(())
}

/// Build an observation whose delay is not known yet.
fn unconverted_observation(frame: ReplayFrame, forced_actions: Vec<RawAction>) -> Observation {
    Observation {
        game_loop: frame.player1.game_loop,
        player1: frame.player1,
        player2: frame.player2,
        forced_actions,
        action_delay: 0,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
