//! Combining per-player features into detection signals.
//!
//! SC2 score counters are cumulative, so every signal is built from lag-`n`
//! differences: how much a counter grew over the last `n` table rows.
//!
//! ```
//! use combat_detect::signal::lag_diff;
//!
//! assert_eq!(lag_diff(&[0.0, 10.0, 30.0, 60.0], 2), vec![0.0, 0.0, 30.0, 50.0]);
//! ```

use serde::Serialize;

use combat_observe::model::{Gameloop, PlayerSlot};

use crate::features::{Feature, FeatureTable};

/// `values[i] - values[i - lag]`, or 0 for the first `lag` entries.
pub fn lag_diff(values: &[f64], lag: usize) -> Vec<f64> {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| match i.checked_sub(lag) {
            Some(j) => value - values[j],
            None => 0.0,
        })
        .collect()
}

/// The signals detection runs on, one entry per feature table row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombinedSignals {
    pub gameloops: Vec<Gameloop>,
    /// Army value killed by both players over the lag window.
    pub total_resources_killed: Vec<f64>,
    /// Cumulative damage dealt by both players.
    pub total_damage_dealt: Vec<f64>,
    /// Damage dealt by both players over the lag window.
    pub damage_delta: Vec<f64>,
}

impl CombinedSignals {
    pub fn len(&self) -> usize {
        self.gameloops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gameloops.is_empty()
    }
}

/// Build the combined signals from a feature table.
pub fn combine_signals(table: &FeatureTable, lag: usize) -> CombinedSignals {
    let players = [PlayerSlot::One, PlayerSlot::Two];

    let mut total_resources_killed = vec![0.0; table.len()];
    for player in players {
        for feature in [Feature::KilledMineralsArmy, Feature::KilledVespeneArmy] {
            let diffs = lag_diff(&table.column(player, feature), lag);
            for (total, diff) in total_resources_killed.iter_mut().zip(diffs) {
                *total += diff;
            }
        }
    }

    let player1 = table.column(PlayerSlot::One, Feature::TotalDamageDealt);
    let player2 = table.column(PlayerSlot::Two, Feature::TotalDamageDealt);
    let total_damage_dealt: Vec<f64> = player1.iter().zip(&player2).map(|(a, b)| a + b).collect();
    let damage_delta = lag_diff(&total_damage_dealt, lag);

    CombinedSignals {
        gameloops: table.gameloops(),
        total_resources_killed,
        total_damage_dealt,
        damage_delta,
    }
}

// ---------------------------------------------------------------------------
// Dump rows
// ---------------------------------------------------------------------------

/// One flattened row of the feature table plus the combined signals, as
/// written to a feature dump.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalRow {
    pub gameloop: Gameloop,
    pub player1_killed_minerals_army: f64,
    pub player1_killed_vespene_army: f64,
    pub player1_total_damage_dealt: f64,
    pub player2_killed_minerals_army: f64,
    pub player2_killed_vespene_army: f64,
    pub player2_total_damage_dealt: f64,
    pub total_resources_killed: f64,
    pub total_damage_dealt: f64,
    pub damage_delta: f64,
}

/// Zip a table and its combined signals into dump rows.
pub fn signal_rows(table: &FeatureTable, signals: &CombinedSignals) -> Vec<SignalRow> {
    table
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| SignalRow {
            gameloop: row.gameloop,
            player1_killed_minerals_army: row.player1.killed_minerals_army,
            player1_killed_vespene_army: row.player1.killed_vespene_army,
            player1_total_damage_dealt: row.player1.total_damage_dealt,
            player2_killed_minerals_army: row.player2.killed_minerals_army,
            player2_killed_vespene_army: row.player2.killed_vespene_army,
            player2_total_damage_dealt: row.player2.total_damage_dealt,
            total_resources_killed: signals.total_resources_killed[i],
            total_damage_dealt: signals.total_damage_dealt[i],
            damage_delta: signals.damage_delta[i],
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
