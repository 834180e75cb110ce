//! Directory-level processing.
//!
//! Three passes share the worker pool:
//!
//! - [`observe_replays`] observes raw replays around player one's actions
//!   and stores the collections through an [`ObservationCache`].
//! - [`detect_directory`] runs detection on every stored collection under a
//!   directory.
//! - [`re_observe_combats`] observes every gameloop of each detected fight.
//!
//! A failure in one file never fails the batch: it becomes a per-file
//! marker carrying the error message.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use combat_observe::model::{CombatInterval, GameObservationCollection, PlayerSlot};
use combat_observe::observe::{observe_replay, ObservePlan};
use combat_observe::persist::{
    discover_files, load_collection, save_collection, ObservationCache, PersistError,
    OBSERVATION_EXTENSION,
};
use combat_observe::source::ReplaySource;
use combat_observe::ObserveError;

use crate::config::DetectionConfig;
use crate::detect::{run_detection, Detection};
use crate::pool::{run_pool, TaskPanic};
use crate::DetectError;

/// File extension of raw replays.
pub const REPLAY_EXTENSION: &str = "SC2Replay";

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Fights detected in one observation file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDetectionResult {
    pub filepath: PathBuf,
    pub replay_id: String,
    pub combat_intervals: Vec<CombatInterval>,
}

/// Outcome of detection on one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileDetection {
    Detected(FileDetectionResult),
    Failed { filepath: PathBuf, error: String },
}

impl FileDetection {
    pub fn filepath(&self) -> &Path {
        match self {
            FileDetection::Detected(result) => &result.filepath,
            FileDetection::Failed { filepath, .. } => filepath,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FileDetection::Failed { .. })
    }

    pub fn detected(&self) -> Option<&FileDetectionResult> {
        match self {
            FileDetection::Detected(result) => Some(result),
            FileDetection::Failed { .. } => None,
        }
    }
}

/// A file an observation pass could not process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub filepath: PathBuf,
    pub error: String,
}

/// Flatten a pool outcome into a per-file result, logging failures.
fn settle<T, E: std::fmt::Display>(
    filepath: &Path,
    outcome: Result<Result<T, E>, TaskPanic>,
) -> Result<T, FileFailure> {
    let error = match outcome {
        Ok(Ok(value)) => return Ok(value),
        Ok(Err(e)) => e.to_string(),
        Err(panic) => panic.to_string(),
    };
    tracing::warn!(path = %filepath.display(), %error, "file failed");
    Err(FileFailure {
        filepath: filepath.to_path_buf(),
        error,
    })
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Load one observation file and detect its fights.
///
/// When `config.feature_dump_dir` is set the combined feature table is
/// written there as well, named after the file's stem.
pub fn detect_file(
    path: &Path,
    config: &DetectionConfig,
) -> Result<FileDetectionResult, DetectError> {
    let root = path.parent().unwrap_or_else(|| Path::new(""));
    detect_file_under(root, path, config)
}

/// [`detect_file`] for a file discovered under `root`: the feature dump
/// keeps the file's directory layout relative to `root`.
fn detect_file_under(
    root: &Path,
    path: &Path,
    config: &DetectionConfig,
) -> Result<FileDetectionResult, DetectError> {
    let collection = load_collection(path)?;
    let detection = run_detection(&collection, config)?;

    if let Some(dir) = &config.feature_dump_dir {
        detection.write_dump(&Detection::dump_path(dir, root, path))?;
    }

    Ok(FileDetectionResult {
        filepath: path.to_path_buf(),
        replay_id: detection.replay_id,
        combat_intervals: detection.intervals,
    })
}

/// Detect fights in every observation file under `root`.
///
/// Files are discovered recursively and results are returned in discovery
/// order. A missing or empty `root` yields no results.
///
/// # Errors
///
/// Only batch-level problems are errors: an invalid config, an unreadable
/// directory, or a feature dump directory that cannot be created. Per-file
/// failures are returned as [`FileDetection::Failed`].
pub fn detect_directory(
    root: &Path,
    config: &DetectionConfig,
) -> Result<Vec<FileDetection>, DetectError> {
    config.validate()?;
    let files = discover_files(root, OBSERVATION_EXTENSION)?;
    if files.is_empty() {
        tracing::info!(root = %root.display(), "no observation files found");
        return Ok(Vec::new());
    }

    if let Some(dir) = &config.feature_dump_dir {
        fs::create_dir_all(dir).map_err(|source| DetectError::Dump {
            path: dir.clone(),
            source,
        })?;
    }

    tracing::info!(
        root = %root.display(),
        files = files.len(),
        workers = config.worker_count,
        "starting combat detection"
    );

    let outcomes = run_pool(files.clone(), config.worker_count, |path: PathBuf| {
        detect_file_under(root, &path, config)
    });
    let detections: Vec<FileDetection> = files
        .iter()
        .zip(outcomes)
        .map(|(path, outcome)| match settle(path, outcome) {
            Ok(result) => FileDetection::Detected(result),
            Err(FileFailure { filepath, error }) => FileDetection::Failed { filepath, error },
        })
        .collect();

    let failed = detections.iter().filter(|d| d.is_failed()).count();
    tracing::info!(
        files = detections.len(),
        failed,
        "combat detection finished"
    );
    Ok(detections)
}

// ---------------------------------------------------------------------------
// Observation passes
// ---------------------------------------------------------------------------

/// Every raw replay under `root`, sorted.
pub fn discover_replays(root: &Path) -> Result<Vec<PathBuf>, PersistError> {
    discover_files(root, REPLAY_EXTENSION)
}

/// Observe each replay around player one's actions and store the result in
/// `cache`. Returns the stored observation path per replay, in input order.
///
/// `open_source` opens a playback session for a replay path.
pub fn observe_replays<S, O>(
    replays: &[PathBuf],
    cache: &ObservationCache,
    workers: usize,
    open_source: O,
) -> Vec<Result<PathBuf, FileFailure>>
where
    S: ReplaySource,
    O: Fn(&Path) -> Result<S, ObserveError> + Sync,
{
    let plan = ObservePlan::ActionSkips {
        player: PlayerSlot::One,
    };
    tracing::info!(replays = replays.len(), workers, "observing replays");

    let outcomes = run_pool(replays.to_vec(), workers, |replay: PathBuf| {
        cache
            .get_or_observe(&replay, || {
                let mut source = open_source(&replay)?;
                observe_replay(&mut source, &plan)
            })
            .map(|_| cache.path_for(&replay))
    });

    replays
        .iter()
        .zip(outcomes)
        .map(|(replay, outcome)| settle(replay, outcome))
        .collect()
}

/// The re-observation plan for a file's fights.
///
/// Detection keeps overlapping fights apart, but one gameloop can only be
/// observed into one interval, so overlapping or touching fights are joined
/// here.
pub fn re_observation_plan(fights: &[CombatInterval]) -> ObservePlan {
    let mut fights = fights.to_vec();
    fights.sort_by_key(|fight| fight.start_time);

    let mut joined: Vec<CombatInterval> = Vec::with_capacity(fights.len());
    for fight in fights {
        match joined.last_mut() {
            Some(last) if fight.start_time <= last.end_time => {
                last.end_time = last.end_time.max(fight.end_time);
            }
            _ => joined.push(fight),
        }
    }
    ObservePlan::Intervals(joined)
}

/// Observe every gameloop of every detected fight.
///
/// Each file's collection is written under `output_root` at the same path
/// its source observations have relative to `observations_root`; a source
/// outside `observations_root` keeps only its file name. Files without
/// fights are skipped. Returns the written paths in input order.
pub fn re_observe_combats<S, O>(
    results: &[FileDetectionResult],
    observations_root: &Path,
    output_root: &Path,
    workers: usize,
    open_source: O,
) -> Vec<Result<PathBuf, FileFailure>>
where
    S: ReplaySource,
    O: Fn(&FileDetectionResult) -> Result<S, ObserveError> + Sync,
{
    let with_fights: Vec<&FileDetectionResult> = results
        .iter()
        .filter(|result| !result.combat_intervals.is_empty())
        .collect();
    tracing::info!(
        files = with_fights.len(),
        skipped = results.len() - with_fights.len(),
        "re-observing combats"
    );

    let outcomes = run_pool(with_fights.clone(), workers, |result: &FileDetectionResult| {
        let path = re_observation_path(result, observations_root, output_root);
        re_observe_one(result, &path, &open_source)
    });

    with_fights
        .iter()
        .zip(outcomes)
        .map(|(result, outcome)| settle(&result.filepath, outcome))
        .collect()
}

/// Where the re-observed collection for `result` is stored.
fn re_observation_path(
    result: &FileDetectionResult,
    observations_root: &Path,
    output_root: &Path,
) -> PathBuf {
    let relative = match result.filepath.strip_prefix(observations_root) {
        Ok(relative) if relative.file_name().is_some() => relative.to_path_buf(),
        _ => result
            .filepath
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                PathBuf::from(format!("{}.{OBSERVATION_EXTENSION}", result.replay_id))
            }),
    };
    output_root.join(relative)
}

fn re_observe_one<S, O>(
    result: &FileDetectionResult,
    path: &Path,
    open_source: &O,
) -> Result<PathBuf, DetectError>
where
    S: ReplaySource,
    O: Fn(&FileDetectionResult) -> Result<S, ObserveError>,
{
    let mut source = open_source(result)?;
    let collection: GameObservationCollection =
        observe_replay(&mut source, &re_observation_plan(&result.combat_intervals))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| PersistError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    save_collection(&collection, path)?;
    Ok(path.to_path_buf())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
