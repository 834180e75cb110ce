//! Per-player feature extraction and the per-gameloop feature table.
//!
//! The feature set is fixed: army value killed (minerals and vespene) and
//! total damage dealt. [`Feature`] names them so callers can select columns
//! without reaching into the score protocol.

use std::collections::BTreeMap;

use serde::Serialize;

use combat_observe::model::{
    GameObservationCollection, Gameloop, Observation, PlayerObservation, PlayerSlot,
};

use crate::DetectError;

// ---------------------------------------------------------------------------
// Feature
// ---------------------------------------------------------------------------

/// One extractable per-player feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    KilledMineralsArmy,
    KilledVespeneArmy,
    TotalDamageDealt,
}

impl Feature {
    pub const ALL: [Feature; 3] = [
        Feature::KilledMineralsArmy,
        Feature::KilledVespeneArmy,
        Feature::TotalDamageDealt,
    ];

    /// Column name, without the player prefix.
    pub fn name(self) -> &'static str {
        match self {
            Feature::KilledMineralsArmy => "killed_minerals_army",
            Feature::KilledVespeneArmy => "killed_vespene_army",
            Feature::TotalDamageDealt => "total_damage_dealt",
        }
    }

    /// Read this feature from a player's observation.
    pub fn extract(self, player: &PlayerObservation) -> f64 {
        let score = &player.score;
        match self {
            Feature::KilledMineralsArmy => f64::from(score.killed_minerals.army),
            Feature::KilledVespeneArmy => f64::from(score.killed_vespene.army),
            Feature::TotalDamageDealt => f64::from(score.total_damage_dealt.total()),
        }
    }

    /// Read this feature from already extracted features.
    pub fn value(self, features: &PlayerFeatures) -> f64 {
        match self {
            Feature::KilledMineralsArmy => features.killed_minerals_army,
            Feature::KilledVespeneArmy => features.killed_vespene_army,
            Feature::TotalDamageDealt => features.total_damage_dealt,
        }
    }
}

// ---------------------------------------------------------------------------
// PlayerFeatures
// ---------------------------------------------------------------------------

/// The detection features of one player at one gameloop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PlayerFeatures {
    pub gameloop: Gameloop,
    pub killed_minerals_army: f64,
    pub killed_vespene_army: f64,
    /// Life, shields and energy damage dealt, summed.
    pub total_damage_dealt: f64,
}

/// Extract the detection features from one player's observation.
pub fn player_features(player: &PlayerObservation) -> PlayerFeatures {
    PlayerFeatures {
        gameloop: player.game_loop,
        killed_minerals_army: Feature::KilledMineralsArmy.extract(player),
        killed_vespene_army: Feature::KilledVespeneArmy.extract(player),
        total_damage_dealt: Feature::TotalDamageDealt.extract(player),
    }
}

/// Extract both players' features from a synchronized observation.
///
/// # Errors
///
/// Returns [`DetectError::GameloopMismatch`] if the two players report
/// different gameloops.
pub fn extract_features(
    observation: &Observation,
) -> Result<(PlayerFeatures, PlayerFeatures), DetectError> {
    let player1 = player_features(&observation.player1);
    let player2 = player_features(&observation.player2);
    if player1.gameloop != player2.gameloop {
        return Err(DetectError::GameloopMismatch {
            player1: player1.gameloop,
            player2: player2.gameloop,
        });
    }
    Ok((player1, player2))
}

// ---------------------------------------------------------------------------
// FeatureTable
// ---------------------------------------------------------------------------

/// Both players' features at one gameloop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRow {
    pub gameloop: Gameloop,
    pub player1: PlayerFeatures,
    pub player2: PlayerFeatures,
}

/// Feature rows of one replay, ordered by gameloop with one row per
/// gameloop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    /// Flatten every observation of every interval into the table.
    ///
    /// When several observations share a gameloop the last one wins.
    pub fn from_collection(collection: &GameObservationCollection) -> Result<Self, DetectError> {
        let mut rows: BTreeMap<Gameloop, FeatureRow> = BTreeMap::new();
        for observation in collection.observations() {
            let (player1, player2) = extract_features(observation)?;
            let row = FeatureRow {
                gameloop: player1.gameloop,
                player1,
                player2,
            };
            if rows.insert(row.gameloop, row).is_some() {
                tracing::debug!(
                    replay_id = %collection.replay_id,
                    gameloop = row.gameloop,
                    "duplicate gameloop in collection, keeping the later observation"
                );
            }
        }
        Ok(Self {
            rows: rows.into_values().collect(),
        })
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn gameloops(&self) -> Vec<Gameloop> {
        self.rows.iter().map(|row| row.gameloop).collect()
    }

    /// One player's column for `feature`.
    pub fn column(&self, player: PlayerSlot, feature: Feature) -> Vec<f64> {
        self.rows
            .iter()
            .map(|row| match player {
                PlayerSlot::One => feature.value(&row.player1),
                PlayerSlot::Two => feature.value(&row.player2),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use combat_observe::model::{ObservationInterval, ReplayFrame};

    fn observation(game_loop: Gameloop, minerals: f32) -> Observation {
        let mut frame = ReplayFrame::at(game_loop);
        frame.player1.score.killed_minerals.army = minerals;
        frame.player2.score.killed_vespene.army = minerals / 2.0;
        Observation {
            game_loop,
            player1: frame.player1,
            player2: frame.player2,
            forced_actions: Vec::new(),
            action_delay: 1,
        }
    }

    fn collection(observations: Vec<Observation>) -> GameObservationCollection {
        GameObservationCollection {
            replay_id: "t".to_owned(),
            map_name: "m".to_owned(),
            game_version: "v".to_owned(),
            observation_intervals: vec![ObservationInterval {
                observations,
                ..ObservationInterval::whole_game()
            }],
        }
    }

    #[test]
    fn total_damage_sums_all_vitals() {
        let mut player = PlayerObservation::default();
        player.score.total_damage_dealt.life = 100.0;
        player.score.total_damage_dealt.shields = 40.0;
        player.score.total_damage_dealt.energy = 10.0;
        // Damage taken must not leak into the feature.
        player.score.total_damage_taken.life = 999.0;

        assert_eq!(player_features(&player).total_damage_dealt, 150.0);
    }

    #[test]
    fn mismatched_gameloops_are_fatal() {
        let mut obs = observation(10, 0.0);
        obs.player2.game_loop = 11;
        assert!(matches!(
            extract_features(&obs),
            Err(DetectError::GameloopMismatch {
                player1: 10,
                player2: 11
            })
        ));
    }

    #[test]
    fn table_is_sorted_and_last_write_wins() {
        let table = FeatureTable::from_collection(&collection(vec![
            observation(20, 1.0),
            observation(10, 2.0),
            observation(20, 3.0),
        ]))
        .unwrap();

        assert_eq!(table.gameloops(), vec![10, 20]);
        assert_eq!(
            table.column(PlayerSlot::One, Feature::KilledMineralsArmy),
            vec![2.0, 3.0]
        );
        assert_eq!(
            table.column(PlayerSlot::Two, Feature::KilledVespeneArmy),
            vec![1.0, 1.5]
        );
    }

    #[test]
    fn feature_names_are_column_suffixes() {
        let names: Vec<&str> = Feature::ALL.iter().map(|f| f.name()).collect();
        assert_eq!(
            names,
            vec!["killed_minerals_army", "killed_vespene_army", "total_damage_dealt"]
        );
    }
}
