//! Combat Detect -- finds fights in persisted SC2 observation collections.
//!
//! Detection runs in stages over one [`GameObservationCollection`]:
//!
//! 1. [`features`] flattens the observations into a per-gameloop table of
//!    player features.
//! 2. [`signal`] combines the features into lag-differenced signals.
//! 3. [`peaks`] finds fights as peaks in the resources-killed signal.
//! 4. [`refine`] grows each peak into a [`CombatInterval`] using the damage
//!    signal.
//!
//! [`batch`] runs the pipeline over whole directories with the bounded
//! worker pool in [`pool`].
//!
//! # Quick Start
//!
//! ```
//! use combat_detect::prelude::*;
//!
//! let collection = GameObservationCollection {
//!     replay_id: "quiet-game".to_owned(),
//!     map_name: "Map".to_owned(),
//!     game_version: "5.0.12".to_owned(),
//!     observation_intervals: vec![ObservationInterval::whole_game()],
//! };
//! let intervals = detect_combat_intervals(&collection, &DetectionConfig::default()).unwrap();
//! assert!(intervals.is_empty());
//! ```
//!
//! [`GameObservationCollection`]: combat_observe::model::GameObservationCollection
//! [`CombatInterval`]: combat_observe::model::CombatInterval

#![deny(unsafe_code)]

pub mod batch;
pub mod config;
pub mod detect;
pub mod features;
pub mod peaks;
pub mod pool;
pub mod refine;
pub mod signal;

use std::path::PathBuf;

use combat_observe::model::Gameloop;
use combat_observe::persist::PersistError;
use combat_observe::ObserveError;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while detecting combat.
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    /// The two players' observations disagree on the gameloop. The features
    /// cannot be paired and the file is abandoned.
    #[error("cannot pair player features: player1 gameloop {player1} != player2 gameloop {player2}")]
    GameloopMismatch {
        player1: Gameloop,
        player2: Gameloop,
    },

    #[error(transparent)]
    Observe(#[from] ObserveError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    /// A configuration value is out of range.
    #[error("invalid detection config: {0}")]
    InvalidConfig(String),

    #[error("failed to read config '{}': {source}", .path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Writing the feature dump failed.
    #[error("failed to write feature dump '{}': {source}", .path.display())]
    Dump {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::batch::{
        detect_directory, detect_file, FileDetection, FileDetectionResult, FileFailure,
    };
    pub use crate::config::DetectionConfig;
    pub use crate::detect::{detect_combat_intervals, run_detection, Detection};
    pub use crate::features::{extract_features, Feature, FeatureTable, PlayerFeatures};
    pub use crate::peaks::{find_peaks, PeakOptions};
    pub use crate::refine::refine_intervals;
    pub use crate::signal::{combine_signals, lag_diff, CombinedSignals};
    pub use crate::DetectError;
    pub use combat_observe::prelude::*;
}
