//! The per-file detection pipeline.
//!
//! Stages run strictly one after another on one collection: feature table,
//! combined signals, peaks, refined intervals. [`run_detection`] keeps every
//! intermediate result so it can be dumped; [`detect_combat_intervals`] only
//! returns the intervals.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use combat_observe::model::{CombatInterval, GameObservationCollection, Gameloop};

use crate::config::DetectionConfig;
use crate::features::FeatureTable;
use crate::peaks::find_peaks;
use crate::refine::{refine_intervals, RefineThresholds};
use crate::signal::{combine_signals, signal_rows, CombinedSignals, SignalRow};
use crate::DetectError;

/// Suffix of feature dump files.
pub const FEATURE_DUMP_SUFFIX: &str = "features.json";

/// Everything one detection run produced.
#[derive(Debug, Clone)]
pub struct Detection {
    pub replay_id: String,
    pub table: FeatureTable,
    pub signals: CombinedSignals,
    /// Row indices of the accepted resources-killed peaks, ascending.
    pub peaks: Vec<usize>,
    /// One interval per peak, in peak order.
    pub intervals: Vec<CombatInterval>,
}

/// Run the full pipeline on one collection.
pub fn run_detection(
    collection: &GameObservationCollection,
    config: &DetectionConfig,
) -> Result<Detection, DetectError> {
    let table = FeatureTable::from_collection(collection)?;
    let signals = combine_signals(&table, config.lag);
    let peaks = find_peaks(
        &signals.total_resources_killed,
        &signals.gameloops,
        &config.peak_options(),
    );
    let intervals = refine_intervals(
        &peaks,
        &signals.damage_delta,
        &signals.gameloops,
        RefineThresholds {
            start: config.damage_start_threshold,
            stop: config.damage_stop_threshold,
        },
    );

    tracing::debug!(
        replay_id = %collection.replay_id,
        rows = table.len(),
        peaks = peaks.len(),
        "combat detection finished"
    );

    Ok(Detection {
        replay_id: collection.replay_id.clone(),
        table,
        signals,
        peaks,
        intervals,
    })
}

/// Detect the combat intervals of one collection.
///
/// # Errors
///
/// Fails with [`DetectError::GameloopMismatch`] if any observation pairs two
/// different gameloops.
pub fn detect_combat_intervals(
    collection: &GameObservationCollection,
    config: &DetectionConfig,
) -> Result<Vec<CombatInterval>, DetectError> {
    Ok(run_detection(collection, config)?.intervals)
}

// ---------------------------------------------------------------------------
// Feature dump
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct FeatureDump<'a> {
    replay_id: &'a str,
    peak_gameloops: Vec<Gameloop>,
    combat_intervals: &'a [CombatInterval],
    rows: Vec<SignalRow>,
}

impl Detection {
    /// Where the dump for the observation file `source` goes in `dir`.
    ///
    /// The directory layout of `source` relative to `root` is recreated
    /// under `dir`, so files with the same stem in different directories get
    /// separate dumps. A `source` outside `root` is placed directly in `dir`.
    pub fn dump_path(dir: &Path, root: &Path, source: &Path) -> PathBuf {
        let relative_dir = source
            .strip_prefix(root)
            .ok()
            .and_then(Path::parent)
            .unwrap_or_else(|| Path::new(""));
        let stem = source
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "observations".to_owned());
        dir.join(relative_dir).join(format!("{stem}.{FEATURE_DUMP_SUFFIX}"))
    }

    /// Write the combined table, peaks and intervals as pretty JSON.
    pub fn write_dump(&self, path: &Path) -> Result<(), DetectError> {
        let dump = FeatureDump {
            replay_id: &self.replay_id,
            peak_gameloops: self.peaks.iter().map(|&i| self.signals.gameloops[i]).collect(),
            combat_intervals: &self.intervals,
            rows: signal_rows(&self.table, &self.signals),
        };
        let dump_error = |source: std::io::Error| DetectError::Dump {
            path: path.to_path_buf(),
            source,
        };
        let json = serde_json::to_vec_pretty(&dump).map_err(|e| dump_error(e.into()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(dump_error)?;
        }
        fs::write(path, json).map_err(dump_error)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
