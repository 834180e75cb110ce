//! Detection parameters.
//!
//! Every field has a default, so a JSON config file only needs the values it
//! overrides:
//!
//! ```
//! use combat_detect::config::DetectionConfig;
//!
//! let config = DetectionConfig::from_json_str(r#"{ "lag": 22, "min_peak_height": 300 }"#).unwrap();
//! assert_eq!(config.lag, 22);
//! assert_eq!(config.min_peak_height, 300.0);
//! assert_eq!(config.min_distance_gameloop, 1100);
//! ```

use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::peaks::PeakOptions;
use crate::DetectError;

/// Upper bound on the default worker count.
pub const MAX_DEFAULT_WORKERS: usize = 12;

/// Parameters for one detection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectionConfig {
    /// Minimum height of a resources-killed peak to count as a fight.
    pub min_peak_height: f64,
    /// Minimum gameloop distance between two reported peaks.
    pub min_distance_gameloop: u32,
    /// Damage delta above which the fight is still considered ongoing when
    /// walking back from a peak.
    pub damage_start_threshold: f64,
    /// Damage delta above which the fight is still considered ongoing when
    /// walking forward from a peak.
    pub damage_stop_threshold: f64,
    /// Differencing lag, in table rows.
    pub lag: usize,
    /// Worker threads used for batch processing.
    pub worker_count: usize,
    /// Where to write each file's combined feature table, if anywhere.
    pub feature_dump_dir: Option<PathBuf>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_peak_height: 500.0,
            min_distance_gameloop: 1100,
            damage_start_threshold: 100.0,
            damage_stop_threshold: 100.0,
            lag: 55,
            worker_count: default_worker_count(),
            feature_dump_dir: None,
        }
    }
}

/// Available parallelism, capped at [`MAX_DEFAULT_WORKERS`].
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
        .min(MAX_DEFAULT_WORKERS)
}

impl DetectionConfig {
    /// Parse a config from JSON and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, DetectError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_json_file(path: &Path) -> Result<Self, DetectError> {
        let json = fs::read_to_string(path).map_err(|source| DetectError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::InvalidConfig`] for a zero lag, worker count or
    /// peak distance, and for non-finite heights or thresholds.
    pub fn validate(&self) -> Result<(), DetectError> {
        if self.worker_count == 0 {
            return Err(DetectError::InvalidConfig("worker_count must be at least 1".into()));
        }
        if self.lag == 0 {
            return Err(DetectError::InvalidConfig("lag must be at least 1".into()));
        }
        if self.min_distance_gameloop == 0 {
            return Err(DetectError::InvalidConfig(
                "min_distance_gameloop must be at least 1".into(),
            ));
        }
        for (name, value) in [
            ("min_peak_height", self.min_peak_height),
            ("damage_start_threshold", self.damage_start_threshold),
            ("damage_stop_threshold", self.damage_stop_threshold),
        ] {
            if !value.is_finite() {
                return Err(DetectError::InvalidConfig(format!(
                    "{name} must be finite, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// The peak detector's view of this config.
    pub fn peak_options(&self) -> PeakOptions {
        PeakOptions {
            min_height: self.min_peak_height,
            min_distance_gameloop: self.min_distance_gameloop,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
