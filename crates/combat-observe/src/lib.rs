//! Combat Observe -- synchronized two-player observation streams from replays.
//!
//! This crate turns the raw per-frame output of a replay source into a clean,
//! gameloop-ordered sequence of paired [`Observation`](model::Observation)s,
//! each annotated with the inferred action delay, and buckets them into
//! target [`ObservationInterval`](model::ObservationInterval)s ready to be
//! persisted.
//!
//! # Quick Start
//!
//! ```
//! use combat_observe::prelude::*;
//!
//! let frames: Vec<ReplayFrame> = [0u32, 1, 2, 5, 6]
//!     .into_iter()
//!     .map(ReplayFrame::at)
//!     .collect();
//! let mut source = RecordedReplay::new(ReplayInfo::new("demo", "Map", "5.0.11"), frames);
//!
//! let collection = observe_replay(&mut source, &ObservePlan::WholeGame).unwrap();
//! let interval = &collection.observation_intervals[0];
//! assert_eq!(interval.observations.len(), 5);
//! assert_eq!(interval.end_time, IntervalEnd::At(6));
//! ```

#![deny(unsafe_code)]

pub mod assign;
pub mod model;
pub mod observe;
pub mod persist;
pub mod schedule;
pub mod source;
pub mod sync;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while observing a replay.
#[derive(Debug, thiserror::Error)]
pub enum ObserveError {
    /// The two halves of a frame reported different gameloops. The
    /// observation cannot be trusted and the replay is abandoned.
    #[error("desynchronized observations: player1 gameloop {player1} != player2 gameloop {player2}")]
    Desynchronized {
        player1: model::Gameloop,
        player2: model::Gameloop,
    },

    /// Target intervals passed to the assigner are not sorted by start time.
    #[error("observation intervals are not sorted: start {start} follows start {previous_start}")]
    UnsortedIntervals {
        previous_start: model::Gameloop,
        start: model::Gameloop,
    },

    /// Two target intervals overlap, or an unbounded interval is followed by
    /// another interval.
    #[error("observation interval starting at {start} overlaps the interval starting at {previous_start}")]
    OverlappingIntervals {
        previous_start: model::Gameloop,
        start: model::Gameloop,
    },

    /// A bounded interval ends before it starts.
    #[error("observation interval [{start}, {end}] ends before it starts")]
    InvertedInterval {
        start: model::Gameloop,
        end: model::Gameloop,
    },

    /// The replay source failed to produce frames.
    #[error("replay source '{replay_id}' failed: {details}")]
    Source { replay_id: String, details: String },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::assign::IntervalAssigner;
    pub use crate::model::{
        ActionTarget, CategoryScore, CombatInterval, GameObservationCollection, Gameloop,
        IntervalEnd, Observation, ObservationInterval, PlayerObservation, PlayerSlot, RawAction,
        ReplayFrame, ScoreDetails, VitalScore,
    };
    pub use crate::observe::{observe_replay, ObservePlan};
    pub use crate::persist::{
        load_collection, save_collection, ObservationCache, PersistError, OBSERVATION_EXTENSION,
    };
    pub use crate::schedule::step_sequence;
    pub use crate::source::{RecordedReplay, ReplayInfo, ReplaySource};
    pub use crate::sync::{ObservationStream, StepFilter};
    pub use crate::ObserveError;
}
