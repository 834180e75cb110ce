//! Growing peaks into combat intervals.
//!
//! A fight starts where damage started climbing and ends where it settled:
//! from each peak, walk left while the damage delta stays above the start
//! threshold and right while it stays above the stop threshold.

use combat_observe::model::{CombatInterval, Gameloop};

/// Thresholds on the damage delta that bound a fight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefineThresholds {
    pub start: f64,
    pub stop: f64,
}

/// Row indices `(start, end)` of the fight around `peak`.
///
/// The walk stops at the first row at or below the threshold, or at the
/// table boundary.
pub fn refine_peak(
    peak: usize,
    damage_delta: &[f64],
    thresholds: RefineThresholds,
) -> (usize, usize) {
    let mut start = peak;
    while start > 0 && damage_delta[start] > thresholds.start {
        start -= 1;
    }

    let mut end = peak;
    while end + 1 < damage_delta.len() && damage_delta[end] > thresholds.stop {
        end += 1;
    }

    (start, end)
}

/// One combat interval per peak, in peak order. Overlapping intervals are
/// kept as they are.
pub fn refine_intervals(
    peaks: &[usize],
    damage_delta: &[f64],
    gameloops: &[Gameloop],
    thresholds: RefineThresholds,
) -> Vec<CombatInterval> {
    peaks
        .iter()
        .map(|&peak| {
            let (start, end) = refine_peak(peak, damage_delta, thresholds);
            CombatInterval::new(gameloops[start], gameloops[end])
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLDS: RefineThresholds = RefineThresholds {
        start: 100.0,
        stop: 100.0,
    };

    #[test]
    fn walks_to_first_quiet_row_on_each_side() {
        let delta = [0.0, 150.0, 150.0, 150.0, 50.0, 0.0];
        assert_eq!(refine_peak(2, &delta, THRESHOLDS), (0, 4));
    }

    #[test]
    fn hand_computed_boundaries() {
        let delta = [0.0, 150.0, 150.0, 150.0, 50.0, 0.0];
        // (peak, start, end)
        let table = [(0, 0, 0), (1, 0, 4), (3, 0, 4), (4, 4, 4), (5, 5, 5)];
        for (peak, start, end) in table {
            assert_eq!(refine_peak(peak, &delta, THRESHOLDS), (start, end), "peak {peak}");
        }
    }

    #[test]
    fn threshold_is_exclusive() {
        let delta = [0.0, 100.0, 250.0, 100.0, 0.0];
        assert_eq!(refine_peak(2, &delta, THRESHOLDS), (1, 3));
    }

    #[test]
    fn separate_thresholds_apply_per_direction() {
        let delta = [0.0, 80.0, 300.0, 80.0, 0.0];
        let thresholds = RefineThresholds {
            start: 50.0,
            stop: 100.0,
        };
        assert_eq!(refine_peak(2, &delta, thresholds), (0, 3));
    }

    #[test]
    fn busy_signal_runs_to_the_boundaries() {
        let delta = [500.0; 6];
        assert_eq!(refine_peak(3, &delta, THRESHOLDS), (0, 5));
    }

    #[test]
    fn intervals_map_to_gameloops_and_are_not_merged() {
        let delta = [0.0, 150.0, 150.0, 150.0, 50.0, 0.0];
        let gameloops = [0, 22, 44, 66, 88, 110];
        let intervals = refine_intervals(&[2, 3], &delta, &gameloops, THRESHOLDS);
        assert_eq!(
            intervals,
            vec![CombatInterval::new(0, 88), CombatInterval::new(0, 88)]
        );
    }
}
