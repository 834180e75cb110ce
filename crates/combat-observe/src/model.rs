//! Observation data model shared by the observer and the detector.
//!
//! The raw per-player payload mirrors the parts of the SC2 observation
//! protocol the pipeline needs: the gameloop, the cumulative score details,
//! and the raw actions reported on that frame. Everything here is plain
//! serializable data so a [`GameObservationCollection`] can be persisted and
//! reloaded without loss.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// The simulation tick counter used as the time axis everywhere.
pub type Gameloop = u32;

// ---------------------------------------------------------------------------
// Raw per-player payload
// ---------------------------------------------------------------------------

/// Score split by unit category, as reported by the game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub none: f32,
    pub army: f32,
    pub economy: f32,
    pub technology: f32,
    pub upgrade: f32,
}

/// Score split by vital (life, shields, energy).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalScore {
    pub life: f32,
    pub shields: f32,
    pub energy: f32,
}

impl VitalScore {
    /// Sum of all three vitals.
    pub fn total(&self) -> f32 {
        self.life + self.shields + self.energy
    }
}

/// Cumulative score counters for one player at one gameloop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreDetails {
    /// Enemy value destroyed, in minerals.
    pub killed_minerals: CategoryScore,
    /// Enemy value destroyed, in vespene.
    pub killed_vespene: CategoryScore,
    /// Own value lost, in minerals.
    pub lost_minerals: CategoryScore,
    /// Own value lost, in vespene.
    pub lost_vespene: CategoryScore,
    /// Damage dealt to the opponent.
    pub total_damage_dealt: VitalScore,
    /// Damage taken from the opponent.
    pub total_damage_taken: VitalScore,
}

/// Target of a raw unit command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActionTarget {
    /// A point on the map.
    Point { x: f32, y: f32 },
    /// Another unit, by tag.
    Unit(u64),
}

/// A raw unit command as reported by the replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAction {
    pub ability_id: u32,
    pub unit_tags: Vec<u64>,
    pub target: Option<ActionTarget>,
}

/// One player's view of a single frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerObservation {
    pub game_loop: Gameloop,
    pub score: ScoreDetails,
    /// Actions reported on this frame. Replays report an action on the frame
    /// *after* it was issued.
    pub actions: Vec<RawAction>,
}

/// Which of the two recorded players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerSlot {
    One,
    Two,
}

/// A single frame as produced by a replay source: both players' views.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    pub player1: PlayerObservation,
    pub player2: PlayerObservation,
}

impl ReplayFrame {
    /// An empty frame with both players at `game_loop`.
    pub fn at(game_loop: Gameloop) -> Self {
        let player = PlayerObservation {
            game_loop,
            ..Default::default()
        };
        Self {
            player1: player.clone(),
            player2: player,
        }
    }

    /// The frame's gameloop, as seen by player one.
    pub fn game_loop(&self) -> Gameloop {
        self.player1.game_loop
    }

    /// The player's half of the frame.
    pub fn player(&self, slot: PlayerSlot) -> &PlayerObservation {
        match slot {
            PlayerSlot::One => &self.player1,
            PlayerSlot::Two => &self.player2,
        }
    }
}

// ---------------------------------------------------------------------------
// Observation
// ---------------------------------------------------------------------------

/// A synchronized pair of player observations at one gameloop.
///
/// `forced_actions` are the actions the replay reported on the frame that
/// followed this one, i.e. the actions that were actually issued at
/// `game_loop`. `action_delay` is the number of gameloops until the next
/// emitted observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub game_loop: Gameloop,
    pub player1: PlayerObservation,
    pub player2: PlayerObservation,
    pub forced_actions: Vec<RawAction>,
    pub action_delay: u32,
}

// ---------------------------------------------------------------------------
// Intervals
// ---------------------------------------------------------------------------

/// End bound of an [`ObservationInterval`].
///
/// Persisted as a plain integer where `-1` means [`IntervalEnd::Unbounded`],
/// so stored collections keep the literal sentinel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum IntervalEnd {
    /// Covers the whole remaining game.
    Unbounded,
    /// Inclusive end gameloop.
    At(Gameloop),
}

impl IntervalEnd {
    /// The integer value used on disk for the unbounded sentinel.
    pub const SENTINEL: i64 = -1;

    pub fn is_unbounded(&self) -> bool {
        matches!(self, IntervalEnd::Unbounded)
    }
}

impl From<IntervalEnd> for i64 {
    fn from(end: IntervalEnd) -> Self {
        match end {
            IntervalEnd::Unbounded => IntervalEnd::SENTINEL,
            IntervalEnd::At(gameloop) => i64::from(gameloop),
        }
    }
}

impl TryFrom<i64> for IntervalEnd {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value == IntervalEnd::SENTINEL {
            return Ok(IntervalEnd::Unbounded);
        }
        Gameloop::try_from(value)
            .map(IntervalEnd::At)
            .map_err(|_| format!("invalid interval end {value}: expected -1 or a gameloop"))
    }
}

/// A span of the game together with the observations collected inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationInterval {
    pub start_time: Gameloop,
    pub end_time: IntervalEnd,
    pub observations: Vec<Observation>,
}

impl ObservationInterval {
    /// An empty interval covering `[start_time, end_time]`.
    pub fn bounded(start_time: Gameloop, end_time: Gameloop) -> Self {
        Self {
            start_time,
            end_time: IntervalEnd::At(end_time),
            observations: Vec::new(),
        }
    }

    /// An empty interval covering the entire game from gameloop 0.
    pub fn whole_game() -> Self {
        Self {
            start_time: 0,
            end_time: IntervalEnd::Unbounded,
            observations: Vec::new(),
        }
    }

    /// Whether `gameloop` falls inside this interval. An unbounded interval
    /// contains every gameloop, including ones before `start_time`.
    pub fn contains(&self, gameloop: Gameloop) -> bool {
        match self.end_time {
            IntervalEnd::Unbounded => true,
            IntervalEnd::At(end) => self.start_time <= gameloop && gameloop <= end,
        }
    }
}

/// Every observation collected from one replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameObservationCollection {
    pub replay_id: String,
    pub map_name: String,
    pub game_version: String,
    pub observation_intervals: Vec<ObservationInterval>,
}

impl GameObservationCollection {
    /// Total number of observations across all intervals.
    pub fn observation_count(&self) -> usize {
        self.observation_intervals
            .iter()
            .map(|interval| interval.observations.len())
            .sum()
    }

    /// Iterate all observations in interval order.
    pub fn observations(&self) -> impl Iterator<Item = &Observation> {
        self.observation_intervals
            .iter()
            .flat_map(|interval| interval.observations.iter())
    }
}

// ---------------------------------------------------------------------------
// CombatInterval
// ---------------------------------------------------------------------------

/// A detected fight, bounded by inclusive start and end gameloops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatInterval {
    pub start_time: Gameloop,
    pub end_time: Gameloop,
}

impl CombatInterval {
    pub fn new(start_time: Gameloop, end_time: Gameloop) -> Self {
        Self {
            start_time,
            end_time,
        }
    }

    /// Every gameloop that must be observed to re-simulate this fight.
    pub fn gameloops(&self) -> RangeInclusive<Gameloop> {
        self.start_time..=self.end_time
    }

    /// An empty bounded observation interval for re-observing this fight.
    pub fn to_observation_interval(&self) -> ObservationInterval {
        ObservationInterval::bounded(self.start_time, self.end_time)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
