//! Stride schedules for driving a replay source.
//!
//! Rendering every frame of a replay is expensive, but most frames carry no
//! action. A replay also reports an action only on the frame *after* it was
//! issued:
//!
//! ```text
//! (obs_0) ------ (obs_{k-1}) --- (obs_k, a_{k-1}) --- (obs_{k+1}, a_k) ...
//! ```
//!
//! To observe the action issued at `k-1` the source must land on `k-1` and
//! then step exactly once more. [`step_sequence`] turns a sorted list of
//! target gameloops into the shortest stride list that does that.

use crate::model::Gameloop;

/// Convert sorted, deduplicated target gameloops into source strides.
///
/// Starting from gameloop 0, advancing the source by each stride in turn
/// visits every target. Between two targets more than one gameloop apart the
/// source first steps once (to collect the action reported for the previous
/// target) and then jumps to the next target. The strides sum to the last
/// target.
///
/// Targets that are not strictly increasing are skipped. An empty input
/// yields an empty schedule; streaming every frame in that case is up to the
/// caller.
///
/// ```
/// use combat_observe::schedule::step_sequence;
///
/// assert_eq!(step_sequence(&[5, 6, 10]), vec![5, 1, 1, 3]);
/// ```
pub fn step_sequence(targets: &[Gameloop]) -> Vec<u32> {
    let mut strides = Vec::with_capacity(targets.len() * 2);
    let mut prev: Gameloop = 0;

    for &gameloop in targets {
        if prev == 0 {
            // The source starts on gameloop 0, which needs no stride.
            if gameloop > 0 {
                strides.push(gameloop);
            }
        } else if gameloop <= prev {
            tracing::trace!(gameloop, prev, "skipping non-increasing schedule target");
            continue;
        } else if gameloop - prev > 1 {
            strides.push(1);
            strides.push(gameloop - prev - 1);
        } else {
            strides.push(1);
        }
        prev = gameloop;
    }

    strides
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
