//! Driving a replay source end to end: schedule, synchronize, assign.
//!
//! [`observe_replay`] is the per-replay entry point. The [`ObservePlan`]
//! selects one of three passes:
//!
//! - [`ObservePlan::WholeGame`]: every frame, one unbounded interval.
//! - [`ObservePlan::ActionSkips`]: only frames around one player's actions,
//!   one unbounded interval. This is the cheap first pass whose output the
//!   detector runs on.
//! - [`ObservePlan::Intervals`]: every gameloop inside the given combat
//!   intervals, one bounded interval per fight. This re-observes detected
//!   fights in full.

use std::collections::BTreeSet;

use crate::assign::IntervalAssigner;
use crate::model::{CombatInterval, GameObservationCollection, Gameloop, PlayerSlot};
use crate::schedule::step_sequence;
use crate::source::ReplaySource;
use crate::sync::{ObservationStream, StepFilter};
use crate::ObserveError;

/// Which frames of a replay to observe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservePlan {
    WholeGame,
    ActionSkips { player: PlayerSlot },
    Intervals(Vec<CombatInterval>),
}

impl ObservePlan {
    /// Build the step filter for this plan. Action skips are read from the
    /// source.
    pub fn step_filter<S: ReplaySource + ?Sized>(
        &self,
        source: &S,
    ) -> Result<StepFilter, ObserveError> {
        Ok(match self {
            ObservePlan::WholeGame => StepFilter::Every,
            ObservePlan::ActionSkips { player } => {
                StepFilter::ActionSkips(source.action_skips(*player)?.into_iter().collect())
            }
            ObservePlan::Intervals(fights) => StepFilter::Targets(
                fights
                    .iter()
                    .flat_map(|fight| fight.gameloops())
                    .collect::<BTreeSet<Gameloop>>(),
            ),
        })
    }

    /// Build the interval assigner for this plan.
    pub fn assigner(&self) -> Result<IntervalAssigner, ObserveError> {
        match self {
            ObservePlan::WholeGame | ObservePlan::ActionSkips { .. } => {
                Ok(IntervalAssigner::whole_game())
            }
            ObservePlan::Intervals(fights) => {
                let mut fights = fights.clone();
                fights.sort_by_key(|fight| fight.start_time);
                IntervalAssigner::new(
                    fights
                        .iter()
                        .map(CombatInterval::to_observation_interval)
                        .collect(),
                )
            }
        }
    }
}

/// Observe one replay according to `plan`.
///
/// # Errors
///
/// Fails if the source fails, if any frame is desynchronized between the two
/// players, or if the plan's intervals overlap. A mismatch between the number
/// of requested and collected observations is only logged.
pub fn observe_replay<S: ReplaySource + ?Sized>(
    source: &mut S,
    plan: &ObservePlan,
) -> Result<GameObservationCollection, ObserveError> {
    let info = source.info();
    let filter = plan.step_filter(source)?;
    let mut assigner = plan.assigner()?;

    let requested = filter.targets().map(BTreeSet::len);
    let strides = filter
        .targets()
        .map(|targets| step_sequence(&targets.iter().copied().collect::<Vec<_>>()));

    let frames = source.frames(strides)?;
    for observation in ObservationStream::new(frames, filter) {
        assigner.assign(observation?);
    }

    let collected = assigner.assigned();
    if let Some(requested) = requested {
        if requested != collected {
            tracing::warn!(
                replay_id = %info.replay_id,
                requested,
                collected,
                "observed count differs from requested gameloops"
            );
        }
    }
    tracing::debug!(
        replay_id = %info.replay_id,
        collected,
        dropped = assigner.dropped(),
        "replay observed"
    );

    Ok(GameObservationCollection {
        replay_id: info.replay_id,
        map_name: info.map_name,
        game_version: info.game_version,
        observation_intervals: assigner.finish(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IntervalEnd, RawAction, ReplayFrame};
    use crate::source::{RecordedReplay, ReplayInfo};

    fn recording(last: Gameloop) -> RecordedReplay {
        let frames = (0..=last).map(|g| {
            let mut frame = ReplayFrame::at(g);
            // Player one acts every 10th gameloop; reported one frame later.
            if g > 0 && (g - 1) % 10 == 0 {
                frame.player1.actions.push(RawAction {
                    ability_id: 1,
                    unit_tags: vec![42],
                    target: None,
                });
            }
            frame
        });
        RecordedReplay::new(ReplayInfo::new("game-1", "Map", "5.0.11"), frames)
    }

    #[test]
    fn whole_game_observes_every_frame() {
        let mut source = recording(30);
        let collection = observe_replay(&mut source, &ObservePlan::WholeGame).unwrap();

        assert_eq!(collection.replay_id, "game-1");
        assert_eq!(collection.observation_intervals.len(), 1);
        assert_eq!(collection.observation_count(), 31);
        assert_eq!(
            collection.observation_intervals[0].end_time,
            IntervalEnd::At(30)
        );
    }

    #[test]
    fn action_skips_observe_frames_around_actions() {
        let mut source = recording(30);
        let plan = ObservePlan::ActionSkips {
            player: PlayerSlot::One,
        };
        let collection = observe_replay(&mut source, &plan).unwrap();
        let loops: Vec<Gameloop> = collection.observations().map(|o| o.game_loop).collect();

        // Actions issued at 0, 10 and 20 are reported at 1, 11 and 21. The
        // schedule visits 0, 10, 11, 20; 20 is the terminal observation.
        assert_eq!(loops, vec![0, 10, 20]);
    }

    #[test]
    fn intervals_plan_fills_one_interval_per_fight() {
        let mut source = recording(100);
        let plan = ObservePlan::Intervals(vec![
            CombatInterval::new(60, 64),
            CombatInterval::new(20, 23),
        ]);
        let collection = observe_replay(&mut source, &plan).unwrap();
        let intervals = &collection.observation_intervals;

        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].start_time, 20);
        assert_eq!(intervals[1].start_time, 60);

        let first: Vec<Gameloop> = intervals[0].observations.iter().map(|o| o.game_loop).collect();
        assert_eq!(first, vec![20, 21, 22, 23]);
        let second: Vec<Gameloop> = intervals[1].observations.iter().map(|o| o.game_loop).collect();
        assert_eq!(second, vec![60, 61, 62, 63, 64]);
    }

    #[test]
    fn fight_past_the_end_of_the_game_keeps_what_was_observed() {
        // 16 gameloops requested but the recording stops at 100.
        let mut source = recording(100);
        let plan = ObservePlan::Intervals(vec![CombatInterval::new(95, 110)]);
        let collection = observe_replay(&mut source, &plan).unwrap();
        let interval = &collection.observation_intervals[0];

        assert_eq!(collection.observation_intervals.len(), 1);
        assert_eq!(interval.start_time, 95);
        assert_eq!(interval.end_time, IntervalEnd::At(110));
        let loops: Vec<Gameloop> = interval.observations.iter().map(|o| o.game_loop).collect();
        assert_eq!(loops, vec![95, 96, 97, 98, 99, 100]);
    }

    #[test]
    fn overlapping_fights_are_rejected() {
        let mut source = recording(100);
        let plan = ObservePlan::Intervals(vec![
            CombatInterval::new(20, 40),
            CombatInterval::new(30, 50),
        ]);
        assert!(matches!(
            observe_replay(&mut source, &plan),
            Err(ObserveError::OverlappingIntervals { .. })
        ));
    }
}
