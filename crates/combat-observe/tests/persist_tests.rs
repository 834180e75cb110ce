//! Integration tests for persisted observation collections and the
//! observation cache.

use std::cell::Cell;
use std::fs;
use std::path::Path;

use combat_observe::persist::discover_files;
use combat_observe::prelude::*;

// -- helpers ----------------------------------------------------------------

fn observation(game_loop: Gameloop, delay: u32) -> Observation {
    let mut frame = ReplayFrame::at(game_loop);
    frame.player1.score.killed_minerals.army = 250.0 + game_loop as f32;
    frame.player1.score.killed_vespene.army = 75.0;
    frame.player2.score.total_damage_dealt = VitalScore {
        life: 120.5,
        shields: 40.0,
        energy: 0.0,
    };
    Observation {
        game_loop,
        player1: frame.player1,
        player2: frame.player2,
        forced_actions: vec![RawAction {
            ability_id: 3674,
            unit_tags: vec![4_295_229_441, 4_295_491_585],
            target: Some(ActionTarget::Unit(4_296_540_161)),
        }],
        action_delay: delay,
    }
}

fn collection() -> GameObservationCollection {
    GameObservationCollection {
        replay_id: "0f3c9a".to_owned(),
        map_name: "Alcyone LE".to_owned(),
        game_version: "5.0.12.91115".to_owned(),
        observation_intervals: vec![ObservationInterval {
            start_time: 0,
            end_time: IntervalEnd::Unbounded,
            observations: vec![observation(0, 4), observation(4, 1), observation(5, 1)],
        }],
    }
}

fn recording(replay_id: &str) -> RecordedReplay {
    RecordedReplay::new(
        ReplayInfo::new(replay_id, "Map", "5.0.12"),
        (0..=20).map(ReplayFrame::at),
    )
}

// -- round trip -------------------------------------------------------------

#[test]
fn save_load_round_trip_preserves_every_field() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("game.sc2obs");

    let original = collection();
    save_collection(&original, &path).unwrap();
    let restored = load_collection(&path).unwrap();

    assert_eq!(restored, original);
    assert_eq!(
        restored.observation_intervals[0].end_time,
        IntervalEnd::Unbounded
    );
    assert_eq!(restored.observation_count(), 3);
}

#[test]
fn loading_missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.sc2obs");

    let err = load_collection(&path).unwrap_err();
    assert!(matches!(err, PersistError::Io { .. }));
    assert!(err.to_string().contains("absent.sc2obs"));
}

#[test]
fn truncated_file_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("game.sc2obs");
    save_collection(&collection(), &path).unwrap();

    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

    assert!(load_collection(&path).is_err());
}

// -- cache ------------------------------------------------------------------

#[test]
fn cache_observes_once_then_loads() {
    let packs = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let replay = packs.path().join("finals").join("g1.SC2Replay");
    let cache = ObservationCache::new(packs.path(), output.path());
    let calls = Cell::new(0);

    let observe = || {
        calls.set(calls.get() + 1);
        observe_replay(&mut recording("g1"), &ObservePlan::WholeGame)
    };

    let first = cache.get_or_observe(&replay, observe).unwrap();
    assert!(output.path().join("finals").join("g1.sc2obs").is_file());
    let second = cache.get_or_observe(&replay, observe).unwrap();

    assert_eq!(calls.get(), 1);
    assert_eq!(first, second);
}

#[test]
fn forced_cache_always_observes() {
    let packs = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let replay = packs.path().join("g1.SC2Replay");
    let cache = ObservationCache::new(packs.path(), output.path()).with_force(true);
    let calls = Cell::new(0);

    for _ in 0..2 {
        cache
            .get_or_observe(&replay, || {
                calls.set(calls.get() + 1);
                observe_replay(&mut recording("g1"), &ObservePlan::WholeGame)
            })
            .unwrap();
    }
    assert_eq!(calls.get(), 2);
}

#[test]
fn failed_observation_writes_nothing() {
    let packs = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let replay = packs.path().join("broken.SC2Replay");
    let cache = ObservationCache::new(packs.path(), output.path());

    let result = cache.get_or_observe(&replay, || {
        Err(ObserveError::Source {
            replay_id: "broken".to_owned(),
            details: "engine refused replay".to_owned(),
        })
    });

    assert!(matches!(result, Err(PersistError::Observe(_))));
    assert!(!cache.path_for(&replay).exists());
}

// -- discovery --------------------------------------------------------------

fn touch(path: &Path) {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).unwrap();
    }
    fs::write(path, b"").unwrap();
}

#[test]
fn discovery_is_recursive_sorted_and_case_insensitive() {
    let root = tempfile::tempdir().unwrap();
    touch(&root.path().join("b").join("two.sc2obs"));
    touch(&root.path().join("a").join("deep").join("one.SC2OBS"));
    touch(&root.path().join("a").join("notes.txt"));
    touch(&root.path().join("three.sc2obs"));

    let found = discover_files(root.path(), OBSERVATION_EXTENSION).unwrap();
    let names: Vec<String> = found
        .iter()
        .map(|p| {
            p.strip_prefix(root.path())
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();

    assert_eq!(names, vec!["a/deep/one.SC2OBS", "b/two.sc2obs", "three.sc2obs"]);
}

#[test]
fn discovery_of_missing_root_is_empty() {
    let root = tempfile::tempdir().unwrap();
    let found = discover_files(&root.path().join("nope"), OBSERVATION_EXTENSION).unwrap();
    assert!(found.is_empty());
}
