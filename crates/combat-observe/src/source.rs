//! Replay sources: anything that can play back a two-player replay frame by
//! frame.
//!
//! Running the game engine itself is outside this crate. Engine bindings
//! implement [`ReplaySource`]; [`RecordedReplay`] plays back frames that were
//! already captured in memory and is what fixtures and tests use.

use std::collections::BTreeMap;

use crate::model::{Gameloop, PlayerSlot, ReplayFrame};
use crate::ObserveError;

/// Result of pulling one frame from a source.
pub type FrameResult = Result<ReplayFrame, ObserveError>;

/// Identity and metadata of the replay being played back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayInfo {
    pub replay_id: String,
    pub map_name: String,
    pub game_version: String,
}

impl ReplayInfo {
    pub fn new(
        replay_id: impl Into<String>,
        map_name: impl Into<String>,
        game_version: impl Into<String>,
    ) -> Self {
        Self {
            replay_id: replay_id.into(),
            map_name: map_name.into(),
            game_version: game_version.into(),
        }
    }
}

/// A replay that can be stepped through frame by frame.
pub trait ReplaySource {
    /// Identity of the replay.
    fn info(&self) -> ReplayInfo;

    /// Gameloops at which `player` issued an action, i.e. one gameloop before
    /// the frame on which the replay reports it. Sorted and deduplicated.
    fn action_skips(&self, player: PlayerSlot) -> Result<Vec<Gameloop>, ObserveError>;

    /// Start playback from gameloop 0.
    ///
    /// With `strides == None` every frame is produced. Otherwise the first
    /// frame is gameloop 0 and each following frame is reached by advancing
    /// the previous one by the next stride.
    fn frames(
        &mut self,
        strides: Option<Vec<u32>>,
    ) -> Result<Box<dyn Iterator<Item = FrameResult> + '_>, ObserveError>;
}

// ---------------------------------------------------------------------------
// RecordedReplay
// ---------------------------------------------------------------------------

/// A replay whose frames are already in memory, keyed by gameloop.
///
/// Gaps in the recording are allowed. When a stride lands on a gameloop that
/// was not recorded, that step produces no frame.
#[derive(Debug, Clone)]
pub struct RecordedReplay {
    info: ReplayInfo,
    frames: BTreeMap<Gameloop, ReplayFrame>,
}

impl RecordedReplay {
    /// Build a recording. Frames are keyed by player one's gameloop; a later
    /// frame with the same gameloop replaces an earlier one.
    pub fn new(info: ReplayInfo, frames: impl IntoIterator<Item = ReplayFrame>) -> Self {
        let frames = frames
            .into_iter()
            .map(|frame| (frame.game_loop(), frame))
            .collect();
        Self { info, frames }
    }

    /// Number of recorded frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl ReplaySource for RecordedReplay {
    fn info(&self) -> ReplayInfo {
        self.info.clone()
    }

    fn action_skips(&self, player: PlayerSlot) -> Result<Vec<Gameloop>, ObserveError> {
        // BTreeMap iteration keeps the result sorted; gameloops are unique keys.
        Ok(self
            .frames
            .iter()
            .filter(|(gameloop, frame)| **gameloop > 0 && !frame.player(player).actions.is_empty())
            .map(|(gameloop, _)| gameloop - 1)
            .collect())
    }

    fn frames(
        &mut self,
        strides: Option<Vec<u32>>,
    ) -> Result<Box<dyn Iterator<Item = FrameResult> + '_>, ObserveError> {
        let frames = &self.frames;
        match strides {
            None => Ok(Box::new(frames.values().cloned().map(FrameResult::Ok))),
            Some(strides) => {
                let positions = std::iter::once(0).chain(strides.into_iter().scan(
                    0 as Gameloop,
                    |position, stride| {
                        *position = position.saturating_add(stride);
                        Some(*position)
                    },
                ));
                Ok(Box::new(positions.filter_map(move |gameloop| {
                    let frame = frames.get(&gameloop).cloned();
                    if frame.is_none() {
                        tracing::trace!(gameloop, "no recorded frame at scheduled gameloop");
                    }
                    frame.map(FrameResult::Ok)
                })))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
