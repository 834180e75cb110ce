//! On-disk storage for observation collections.
//!
//! A collection is stored as one file per replay with the
//! [`OBSERVATION_EXTENSION`] suffix. The file is a bincode-encoded
//! [`PersistedCollection`] envelope holding the bincode-encoded collection
//! and its BLAKE3 hex digest, which is verified on load.
//!
//! [`ObservationCache`] keys files by replay path: the output tree mirrors
//! the replaypack's directory layout, so a replay at
//! `<replaypack>/pack_a/game.SC2Replay` is cached at
//! `<output>/pack_a/game.sc2obs`.
//!
//! # Example
//!
//! ```
//! use combat_observe::model::{GameObservationCollection, ObservationInterval};
//! use combat_observe::persist::{decode_collection, encode_collection};
//!
//! let collection = GameObservationCollection {
//!     replay_id: "replay".to_owned(),
//!     map_name: "Map".to_owned(),
//!     game_version: "5.0.11".to_owned(),
//!     observation_intervals: vec![ObservationInterval::whole_game()],
//! };
//! let bytes = encode_collection(&collection).unwrap();
//! assert_eq!(decode_collection(&bytes).unwrap(), collection);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::GameObservationCollection;
use crate::ObserveError;

/// File extension of persisted observation collections.
pub const OBSERVATION_EXTENSION: &str = "sc2obs";

/// Version of the envelope layout written by this crate.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced while reading or writing persisted collections.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode observation collection: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("failed to decode observation collection: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    /// The stored digest does not match the payload.
    #[error("checksum mismatch: recorded {recorded} but recomputed {computed}. The file may be corrupted")]
    ChecksumMismatch { recorded: String, computed: String },

    #[error("unsupported observation file format version {found} (expected {})", FORMAT_VERSION)]
    UnsupportedVersion { found: u32 },

    /// Observing the replay failed while filling the cache.
    #[error(transparent)]
    Observe(#[from] ObserveError),
}

impl PersistError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        PersistError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The on-disk envelope around an encoded collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedCollection {
    pub format_version: u32,
    /// BLAKE3 hex digest of `payload`.
    pub checksum: String,
    /// bincode-encoded [`GameObservationCollection`].
    pub payload: Vec<u8>,
}

fn bincode_config() -> bincode::config::Configuration {
    bincode::config::standard()
}

/// Encode a collection into the envelope byte format.
pub fn encode_collection(collection: &GameObservationCollection) -> Result<Vec<u8>, PersistError> {
    let payload = bincode::serde::encode_to_vec(collection, bincode_config())?;
    let envelope = PersistedCollection {
        format_version: FORMAT_VERSION,
        checksum: blake3::hash(&payload).to_hex().to_string(),
        payload,
    };
    Ok(bincode::serde::encode_to_vec(&envelope, bincode_config())?)
}

/// Decode and verify a collection from the envelope byte format.
pub fn decode_collection(bytes: &[u8]) -> Result<GameObservationCollection, PersistError> {
    let (envelope, _): (PersistedCollection, usize) =
        bincode::serde::decode_from_slice(bytes, bincode_config())?;

    if envelope.format_version != FORMAT_VERSION {
        return Err(PersistError::UnsupportedVersion {
            found: envelope.format_version,
        });
    }

    let computed = blake3::hash(&envelope.payload).to_hex().to_string();
    if computed != envelope.checksum {
        return Err(PersistError::ChecksumMismatch {
            recorded: envelope.checksum,
            computed,
        });
    }

    let (collection, _): (GameObservationCollection, usize) =
        bincode::serde::decode_from_slice(&envelope.payload, bincode_config())?;
    Ok(collection)
}

/// Write a collection to `path`, replacing any existing file.
pub fn save_collection(
    collection: &GameObservationCollection,
    path: &Path,
) -> Result<(), PersistError> {
    let bytes = encode_collection(collection)?;
    fs::write(path, bytes).map_err(|e| PersistError::io(path, e))
}

/// Read a collection from `path`.
pub fn load_collection(path: &Path) -> Result<GameObservationCollection, PersistError> {
    let bytes = fs::read(path).map_err(|e| PersistError::io(path, e))?;
    decode_collection(&bytes)
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Recursively find every file under `root` whose extension equals
/// `extension` (compared case-insensitively). The result is sorted.
///
/// A missing `root` yields an empty list.
pub fn discover_files(root: &Path, extension: &str) -> Result<Vec<PathBuf>, PersistError> {
    let mut found = Vec::new();
    if !root.is_dir() {
        return Ok(found);
    }

    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).map_err(|e| PersistError::io(&dir, e))?;
        for entry in entries {
            let path = entry.map_err(|e| PersistError::io(&dir, e))?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
            {
                found.push(path);
            }
        }
    }

    found.sort();
    Ok(found)
}

// ---------------------------------------------------------------------------
// ObservationCache
// ---------------------------------------------------------------------------

/// Where the persisted observations for `replay` live under `output_root`.
///
/// The replay's directory relative to `replaypack_root` is recreated under
/// `output_root`. A replay outside `replaypack_root` is placed directly in
/// `output_root`.
pub fn output_path_for(replay: &Path, replaypack_root: &Path, output_root: &Path) -> PathBuf {
    let relative_dir = replay
        .strip_prefix(replaypack_root)
        .ok()
        .and_then(Path::parent)
        .unwrap_or_else(|| Path::new(""));
    let stem = replay.file_stem().unwrap_or(replay.as_os_str());

    let mut path = output_root.join(relative_dir).join(stem);
    path.set_extension(OBSERVATION_EXTENSION);
    path
}

/// Disk cache of observed replays.
///
/// Observing a replay means running the game engine through it, which is
/// far more expensive than decoding a stored collection, so results are
/// reused unless `force` is set.
#[derive(Debug, Clone)]
pub struct ObservationCache {
    pub replaypack_root: PathBuf,
    pub output_root: PathBuf,
    /// Re-observe even if a stored collection exists.
    pub force: bool,
}

impl ObservationCache {
    pub fn new(replaypack_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            replaypack_root: replaypack_root.into(),
            output_root: output_root.into(),
            force: false,
        }
    }

    /// Builder-style toggle for [`force`](Self::force).
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Where the collection for `replay` is stored.
    pub fn path_for(&self, replay: &Path) -> PathBuf {
        output_path_for(replay, &self.replaypack_root, &self.output_root)
    }

    /// Return the stored collection for `replay`, or run `observe`, store its
    /// result, and return it.
    pub fn get_or_observe<F>(
        &self,
        replay: &Path,
        observe: F,
    ) -> Result<GameObservationCollection, PersistError>
    where
        F: FnOnce() -> Result<GameObservationCollection, ObserveError>,
    {
        let path = self.path_for(replay);
        if path.exists() && !self.force {
            tracing::debug!(path = %path.display(), "loading cached observations");
            return load_collection(&path);
        }

        if let Some(dir) = path.parent() {
            if !dir.exists() {
                tracing::info!(dir = %dir.display(), "creating observation output directory");
                fs::create_dir_all(dir).map_err(|e| PersistError::io(dir, e))?;
            }
        }

        let collection = observe()?;
        save_collection(&collection, &path)?;
        Ok(collection)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
