//! Peak detection on the resources-killed signal.
//!
//! Peaks follow the usual signal-processing definition: a sample strictly
//! greater than both neighbours, or the middle sample of a flat top that is
//! strictly greater than the samples on either side of it. The first and last
//! samples are never peaks. Surviving peaks must reach a minimum height and
//! be separated by a minimum number of gameloops; closer peaks are thinned
//! greedily, keeping the highest.

use combat_observe::model::Gameloop;

/// Thresholds applied to local maxima.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakOptions {
    /// Inclusive minimum peak value.
    pub min_height: f64,
    /// Two reported peaks are at least this many gameloops apart.
    pub min_distance_gameloop: u32,
}

/// Find peaks in `signal`, whose samples sit at `gameloops`.
///
/// Returns ascending sample indices. `gameloops` is expected to ascend;
/// distances are taken as absolute differences, so an out-of-order sample
/// only changes which peaks are thinned.
///
/// # Panics
///
/// Panics if `signal` and `gameloops` differ in length.
///
/// ```
/// use combat_detect::peaks::{find_peaks, PeakOptions};
///
/// let signal = [0.0, 600.0, 0.0, 0.0, 650.0, 0.0];
/// let gameloops = [0, 100, 200, 300, 400, 500];
/// let options = PeakOptions { min_height: 500.0, min_distance_gameloop: 1100 };
/// assert_eq!(find_peaks(&signal, &gameloops, &options), vec![4]);
/// ```
pub fn find_peaks(signal: &[f64], gameloops: &[Gameloop], options: &PeakOptions) -> Vec<usize> {
    assert_eq!(signal.len(), gameloops.len(), "every signal sample needs a gameloop");

    let candidates: Vec<usize> = local_maxima(signal)
        .into_iter()
        .filter(|&i| signal[i] >= options.min_height)
        .collect();

    select_by_distance(&candidates, signal, gameloops, options.min_distance_gameloop)
}

/// Indices of every local maximum, flat tops resolved to their middle
/// sample (rounding down).
pub fn local_maxima(signal: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    let Some(last) = signal.len().checked_sub(1) else {
        return peaks;
    };

    let mut i = 1;
    while i < last {
        if signal[i - 1] < signal[i] {
            let mut ahead = i + 1;
            while ahead < last && signal[ahead] == signal[i] {
                ahead += 1;
            }
            if signal[ahead] < signal[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    peaks
}

/// Drop every peak that lies closer than `min_distance` gameloops to a
/// higher (or equally high and earlier) kept peak.
fn select_by_distance(
    peaks: &[usize],
    signal: &[f64],
    gameloops: &[Gameloop],
    min_distance: u32,
) -> Vec<usize> {
    let mut by_priority: Vec<usize> = (0..peaks.len()).collect();
    by_priority.sort_by(|&a, &b| {
        signal[peaks[b]]
            .total_cmp(&signal[peaks[a]])
            .then(a.cmp(&b))
    });

    let mut keep = vec![true; peaks.len()];
    for &j in &by_priority {
        if !keep[j] {
            continue;
        }
        let position = gameloops[peaks[j]];

        for k in (0..j).rev() {
            if position.abs_diff(gameloops[peaks[k]]) >= min_distance {
                break;
            }
            keep[k] = false;
        }
        for k in j + 1..peaks.len() {
            if gameloops[peaks[k]].abs_diff(position) >= min_distance {
                break;
            }
            keep[k] = false;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&peak, kept)| kept.then_some(peak))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const OPTIONS: PeakOptions = PeakOptions {
        min_height: 500.0,
        min_distance_gameloop: 1100,
    };

    /// Gameloops sampled every 50 loops.
    fn gameloops(n: usize) -> Vec<Gameloop> {
        (0..n as u32).map(|i| i * 50).collect()
    }

    #[test]
    fn close_peaks_keep_only_the_higher() {
        // 600 at gameloop 1000 and 650 at gameloop 1500: 500 loops apart.
        let mut signal = vec![0.0; 60];
        signal[20] = 600.0;
        signal[30] = 650.0;
        assert_eq!(find_peaks(&signal, &gameloops(60), &OPTIONS), vec![30]);
    }

    #[test]
    fn distant_peaks_are_both_kept() {
        let mut signal = vec![0.0; 80];
        signal[10] = 600.0;
        signal[40] = 650.0;
        assert_eq!(find_peaks(&signal, &gameloops(80), &OPTIONS), vec![10, 40]);
    }

    #[test]
    fn equal_heights_keep_the_earlier_peak() {
        let mut signal = vec![0.0; 40];
        signal[10] = 700.0;
        signal[15] = 700.0;
        assert_eq!(find_peaks(&signal, &gameloops(40), &OPTIONS), vec![10]);
    }

    #[test]
    fn suppressed_peak_does_not_suppress_others() {
        // 900 at gameloop 500, 800 at 1500, 700 at 2500: 800 falls to 900, but 700
        // is 2000 loops from 900 and survives.
        let mut signal = vec![0.0; 60];
        signal[10] = 900.0;
        signal[30] = 800.0;
        signal[50] = 700.0;
        assert_eq!(find_peaks(&signal, &gameloops(60), &OPTIONS), vec![10, 50]);
    }

    #[test]
    fn height_is_inclusive() {
        let signal = [0.0, 500.0, 0.0, 499.9, 0.0];
        assert_eq!(find_peaks(&signal, &gameloops(5), &OPTIONS), vec![1]);
    }

    #[test]
    fn plateau_reports_middle_sample() {
        assert_eq!(local_maxima(&[0.0, 5.0, 5.0, 5.0, 0.0]), vec![2]);
        assert_eq!(local_maxima(&[0.0, 5.0, 5.0, 0.0]), vec![1]);
    }

    #[test]
    fn edges_and_open_plateaus_are_not_peaks() {
        assert!(local_maxima(&[9.0, 1.0, 9.0]).is_empty());
        assert!(local_maxima(&[0.0, 5.0, 5.0]).is_empty());
        assert!(local_maxima(&[0.0, 5.0, 5.0, 7.0, 1.0]) == vec![3]);
        assert!(local_maxima(&[]).is_empty());
        assert!(local_maxima(&[1.0]).is_empty());
    }

    #[test]
    fn uneven_sampling_uses_gameloop_distance() {
        // Five samples apart but 2000 gameloops apart.
        let signal = [0.0, 600.0, 0.0, 0.0, 0.0, 0.0, 650.0, 0.0];
        let gameloops = [0, 100, 200, 300, 400, 500, 2100, 2200];
        assert_eq!(find_peaks(&signal, &gameloops, &OPTIONS), vec![1, 6]);
    }

    #[test]
    fn out_of_order_gameloops_do_not_underflow() {
        // The higher peak sits at an earlier gameloop than its predecessor.
        let signal = [0.0, 600.0, 0.0, 650.0, 0.0, 700.0, 0.0];
        let gameloops = [0, 3000, 3100, 1000, 1100, 5000, 5100];
        assert_eq!(find_peaks(&signal, &gameloops, &OPTIONS), vec![1, 3, 5]);

        let gameloops = [0, 1500, 1600, 1000, 1100, 9000, 9100];
        assert_eq!(find_peaks(&signal, &gameloops, &OPTIONS), vec![3, 5]);
    }

    #[test]
    #[should_panic(expected = "every signal sample needs a gameloop")]
    fn mismatched_lengths_panic() {
        find_peaks(&[0.0, 1.0, 0.0], &[0, 1], &OPTIONS);
    }
}
