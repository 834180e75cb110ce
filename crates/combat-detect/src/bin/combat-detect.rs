//! Detect combat in a directory of stored observation collections.
//!
//! Usage: `combat-detect <observations_dir> [config.json]`
//!
//! Results are printed to stdout as pretty JSON, one entry per file in
//! discovery order. Logs go to stderr; set `RUST_LOG` to change the level.

use std::path::PathBuf;

use anyhow::{bail, Context};

use combat_detect::batch::detect_directory;
use combat_detect::config::DetectionConfig;

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        bail!("usage: combat-detect <observations_dir> [config.json]");
    }

    let observations_dir = PathBuf::from(&args[1]);
    let config = match args.get(2).map(PathBuf::from) {
        Some(path) => DetectionConfig::from_json_file(&path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => DetectionConfig::default(),
    };

    let detections = detect_directory(&observations_dir, &config)
        .with_context(|| format!("detecting combat in {}", observations_dir.display()))?;

    let failed = detections.iter().filter(|d| d.is_failed()).count();
    if failed > 0 {
        tracing::warn!(failed, total = detections.len(), "some files could not be processed");
    }

    println!("{}", serde_json::to_string_pretty(&detections)?);
    Ok(())
}
