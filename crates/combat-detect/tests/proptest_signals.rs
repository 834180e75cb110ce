//! Property tests for lag differences and peak selection.
//!
//! Signals are random non-negative samples on strictly increasing,
//! unevenly spaced gameloops.

use combat_detect::peaks::local_maxima;
use combat_detect::prelude::*;
use proptest::prelude::*;

/// A signal and matching strictly increasing gameloops.
fn sampled_signal() -> impl Strategy<Value = (Vec<f64>, Vec<Gameloop>)> {
    prop::collection::vec((0.0..2_000.0f64, 1..400u32), 0..120).prop_map(|samples| {
        let mut position = 0;
        samples
            .into_iter()
            .map(|(value, step)| {
                position += step;
                (value, position)
            })
            .unzip()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1_000))]

    #[test]
    fn lag_diff_keeps_length_and_zero_fills(
        values in prop::collection::vec(-1e6..1e6f64, 0..100),
        lag in 1..20usize,
    ) {
        let diffs = lag_diff(&values, lag);
        prop_assert_eq!(diffs.len(), values.len());
        for (i, diff) in diffs.iter().enumerate() {
            if i < lag {
                prop_assert_eq!(*diff, 0.0);
            } else {
                prop_assert_eq!(*diff, values[i] - values[i - lag]);
            }
        }
    }

    #[test]
    fn peaks_are_high_sorted_and_spaced(
        (signal, gameloops) in sampled_signal(),
        min_height in 0.0..1_500.0f64,
        min_distance_gameloop in 1..3_000u32,
    ) {
        let options = PeakOptions { min_height, min_distance_gameloop };
        let peaks = find_peaks(&signal, &gameloops, &options);

        prop_assert!(peaks.windows(2).all(|pair| pair[0] < pair[1]));
        for &peak in &peaks {
            prop_assert!(peak > 0 && peak + 1 < signal.len());
            prop_assert!(signal[peak] >= min_height);
        }
        for pair in peaks.windows(2) {
            prop_assert!(gameloops[pair[1]] - gameloops[pair[0]] >= min_distance_gameloop);
        }
    }

    #[test]
    fn highest_local_maximum_always_survives(
        (signal, gameloops) in sampled_signal(),
        min_distance_gameloop in 1..3_000u32,
    ) {
        let options = PeakOptions { min_height: 0.0, min_distance_gameloop };
        let peaks = find_peaks(&signal, &gameloops, &options);
        let highest = local_maxima(&signal)
            .into_iter()
            .map(|i| signal[i])
            .fold(None, |best: Option<f64>, value| Some(best.map_or(value, |b| b.max(value))));

        match highest {
            Some(value) => prop_assert!(peaks.iter().any(|&peak| signal[peak] == value)),
            None => prop_assert!(peaks.is_empty()),
        }
    }
}
