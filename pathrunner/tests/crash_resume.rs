//! End-to-end crash-resume scenarios over file-backed state.
//!
//! These tests run a path against the real file stores, destroy the
//! "process" at the worst possible moments (mid-motion, between ticks),
//! and assert that a fresh load resumes with exactly-once motion effects.

use pathrunner::actions::counter::CounterAction;
use pathrunner::actions::movement::MoveAction;
use pathrunner::agent::{Agent, MoveKind, Position};
use pathrunner::io::config::EngineConfig;
use pathrunner::io::marker_store::FileMarkerStore;
use pathrunner::io::path_store::PathStore;
use pathrunner::io::paths::StatePaths;
use pathrunner::looping::{LoopStop, run_loop};
use pathrunner::path::ActionPath;
use pathrunner::registry::NodeRegistry;
use pathrunner::test_support::TestAgent;
use pathrunner::tree::Status;
use pathrunner::tree::adapter::MoveResultInterpreter;
use pathrunner::tree::composite::Sequence;
use pathrunner::tree::decorator::Repeater;

fn stores(root: &std::path::Path) -> (StatePaths, PathStore) {
    let paths = StatePaths::new(root);
    paths.ensure_dirs().expect("state dirs");
    let store = PathStore::new(paths.path_file.clone());
    (paths, store)
}

fn move_then_count(channel: &pathrunner::recovery::MarkerChannel) -> ActionPath {
    let head = Sequence::new(vec![
        Box::new(MoveResultInterpreter::new(
            Box::new(MoveAction::new(MoveKind::Forward)),
            channel.clone(),
        )),
        Box::new(CounterAction::new("arrivals")),
    ])
    .expect("sequence");
    ActionPath::new(Box::new(head))
}

/// Tree: sequence(move forward, count "arrivals").
///
/// Timeline:
/// 1. Process A saves the fresh path, then ticks. The agent executes the
///    physical move but dies before reporting back — the tick errors out
///    with the recovery marker still armed on disk and the snapshot still
///    showing the pre-tick cursor.
/// 2. Process B loads the stale snapshot and runs the loop. The first
///    tick re-enters the same move adapter, finds the pending marker,
///    observes the world already at the destination, and short-circuits
///    to Success without moving again; the loop releases the marker once
///    that tick's snapshot lands.
/// 3. The next tick finishes the counter leaf and the sequence.
///
/// The world must see exactly one physical move across both processes.
#[test]
fn interrupted_move_resumes_without_a_second_motion() {
    let temp = tempfile::tempdir().expect("tempdir");
    let (paths, store) = stores(temp.path());

    let mut agent = TestAgent::new();
    let start = agent.position();

    // Process A.
    {
        let channel = FileMarkerStore::channel(paths.marker_file.clone());
        let mut path = move_then_count(&channel);
        store.save(&path).expect("initial save");

        agent.crash_on_move = true;
        path.tick(&mut agent).expect_err("process dies mid-move");
    }
    assert_eq!(agent.moves_executed, 1);
    assert!(paths.marker_file.exists(), "marker survives the crash");

    // Process B: fresh channel, registry and path from the same files.
    let channel = FileMarkerStore::channel(paths.marker_file.clone());
    let registry = NodeRegistry::with_builtins(&channel).expect("builtins");
    let mut path = store.load(&registry).expect("load stale snapshot");

    let outcome = run_loop(
        &mut path,
        &mut agent,
        &store,
        &channel,
        &EngineConfig::default(),
        |_, _| {},
    )
    .expect("resume loop");

    assert_eq!(outcome.stop, LoopStop::Terminal(Status::Success));
    assert_eq!(outcome.ticks_executed, 2);
    assert_eq!(agent.moves_executed, 1, "motion must not re-execute");
    assert_eq!(agent.position(), agent.world_position);
    assert_ne!(agent.position(), start);
    assert!(!paths.marker_file.exists(), "marker released after persist");
    assert_eq!(path.state().counter("arrivals"), 1);
}

/// The other half of the crash window: the move succeeds and the tick
/// completes, but the process dies before the snapshot is written. The
/// marker is still armed on disk (it is released only after the save),
/// so the resumed stale snapshot resolves it instead of moving twice.
#[test]
fn crash_after_successful_tick_before_persist_moves_exactly_once() {
    let temp = tempfile::tempdir().expect("tempdir");
    let (paths, store) = stores(temp.path());

    let mut agent = TestAgent::new();
    let start = agent.position();

    // Process A: a clean tick, then death before `store.save`.
    {
        let channel = FileMarkerStore::channel(paths.marker_file.clone());
        let mut path = move_then_count(&channel);
        store.save(&path).expect("initial save");

        assert_eq!(path.tick(&mut agent).expect("tick"), Status::Running);
        assert_eq!(agent.moves_executed, 1);
    }
    assert!(paths.marker_file.exists(), "marker outlives the tick");

    // Process B: the snapshot on disk never saw the move. The believed
    // pose is restored from the same stale epoch.
    agent.set_position(start);
    agent.set_facing(pathrunner::agent::Facing::North);

    let channel = FileMarkerStore::channel(paths.marker_file.clone());
    let registry = NodeRegistry::with_builtins(&channel).expect("builtins");
    let mut path = store.load(&registry).expect("load stale snapshot");

    let outcome = run_loop(
        &mut path,
        &mut agent,
        &store,
        &channel,
        &EngineConfig::default(),
        |_, _| {},
    )
    .expect("resume loop");

    assert_eq!(outcome.stop, LoopStop::Terminal(Status::Success));
    assert_eq!(
        agent.moves_executed, 1,
        "the position must advance by exactly one step total, not two"
    );
    assert_eq!(agent.position(), agent.world_position);
    assert_eq!(path.state().counter("arrivals"), 1);
    assert!(!paths.marker_file.exists());
}

/// A marker whose motion never made it to the world: the resumed tick
/// discards it and performs the motion normally.
#[test]
fn interrupted_move_that_never_happened_is_retried() {
    let temp = tempfile::tempdir().expect("tempdir");
    let (paths, store) = stores(temp.path());

    let mut agent = TestAgent::new();
    {
        let channel = FileMarkerStore::channel(paths.marker_file.clone());
        let head = MoveResultInterpreter::new(
            Box::new(MoveAction::new(MoveKind::Up)),
            channel.clone(),
        );
        let path = ActionPath::new(Box::new(head));
        store.save(&path).expect("initial save");

        // Die after arming but before the motion reaches the agent.
        let intent = pathrunner::recovery::MoveIntent::new(
            MoveKind::Up,
            agent.position(),
            agent.facing(),
        );
        channel.arm(&intent).expect("arm");
    }

    let channel = FileMarkerStore::channel(paths.marker_file.clone());
    let registry = NodeRegistry::with_builtins(&channel).expect("builtins");
    let mut path = store.load(&registry).expect("load");

    assert_eq!(path.tick(&mut agent).expect("resume tick"), Status::Success);
    assert_eq!(agent.moves_executed, 1);
    assert_eq!(agent.world_position, Position::new(0, 1, 0));
}

/// The driver loop over file stores: a max-ticks stop mid-repeater leaves
/// a snapshot a second loop invocation picks up and finishes, with the
/// repeater counter carried across the boundary.
#[test]
fn loop_resumes_mid_repeater_from_the_snapshot() {
    let temp = tempfile::tempdir().expect("tempdir");
    let (paths, store) = stores(temp.path());
    let mut agent = TestAgent::new();

    let channel = FileMarkerStore::channel(paths.marker_file.clone());
    let registry = NodeRegistry::with_builtins(&channel).expect("builtins");

    let head = Repeater::new(Box::new(CounterAction::new("layers")), Some(4)).expect("repeater");
    let mut path = ActionPath::new(Box::new(head));

    let config = EngineConfig {
        max_ticks: 2,
        ..EngineConfig::default()
    };
    let outcome =
        run_loop(&mut path, &mut agent, &store, &channel, &config, |_, _| {}).expect("loop");
    assert_eq!(outcome.stop, LoopStop::MaxTicksReached);
    drop(path);

    let mut resumed = store.load(&registry).expect("load");
    assert_eq!(resumed.state().counter("layers"), 2);

    let outcome = run_loop(
        &mut resumed,
        &mut agent,
        &store,
        &channel,
        &EngineConfig::default(),
        |_, _| {},
    )
    .expect("loop");
    assert_eq!(outcome.stop, LoopStop::Terminal(Status::Success));
    assert_eq!(outcome.ticks_executed, 2);
    assert_eq!(resumed.state().counter("layers"), 4);
}
