//! Live runs bounded by the capture budget.

use crate::support::{quick_config, MetronomeScene};
use dropreel_audio::SoundCatalog;
use dropreel_core::ManualTime;
use dropreel_media::MemorySink;
use dropreel_session::{Outcome, RunSession};
use std::time::Duration;

fn session(config: dropreel_core::RunConfig, time: &ManualTime) -> RunSession<ManualTime> {
    let catalog = SoundCatalog::from_config(&config.sounds);
    RunSession::with_time_source(config, catalog, time.clone()).unwrap()
}

#[test]
fn budget_caps_a_run_that_never_settles() {
    let dir = tempfile::tempdir().unwrap();
    let time = ManualTime::new();
    // 60 fps, 10 s of physics and 3 s of settle: 600 + 180 frames.
    let mut session = session(quick_config(dir.path(), 60, 10.0, 3.0), &time);
    let sink = MemorySink::new();
    let frames = sink.frames();
    session.begin_with_sink(Box::new(sink.clone())).unwrap();

    let mut scene = MetronomeScene {
        sound: "default",
        every: 60,
        settle_at: None,
        time: time.clone(),
        frame_time: Duration::from_millis(16),
    };
    let artifacts = session.run(&mut scene).unwrap();

    assert_eq!(artifacts.ticks, 780);
    assert_eq!(artifacts.frames_written, 780);
    assert_eq!(frames.lock().len(), 780);
    assert!(sink.is_finished());
    assert_eq!(artifacts.outcome, None);

    // Physics never stopped, so every 60th frame was recorded.
    let collisions = artifacts
        .event_log
        .events()
        .iter()
        .filter(|e| e.sound_name == "default")
        .count();
    assert_eq!(collisions, 13);
    assert!(dir.path().join("sound_events.csv").is_file());
}

#[test]
fn failed_writes_still_use_the_budget() {
    let dir = tempfile::tempdir().unwrap();
    let time = ManualTime::new();
    let mut session = session(quick_config(dir.path(), 20, 2.0, 1.0), &time);
    let sink = MemorySink::new().failing_on([3, 7, 8]);
    let frames = sink.frames();
    session.begin_with_sink(Box::new(sink)).unwrap();

    let mut scene = MetronomeScene {
        sound: "A",
        every: 10,
        settle_at: None,
        time: time.clone(),
        frame_time: Duration::from_millis(50),
    };
    let artifacts = session.run(&mut scene).unwrap();

    assert_eq!(artifacts.ticks, 60);
    assert_eq!(artifacts.frames_skipped, 3);
    assert_eq!(artifacts.frames_written, 57);
    assert_eq!(frames.lock().len(), 57);
}

#[test]
fn settle_window_ends_the_run_before_the_budget() {
    let dir = tempfile::tempdir().unwrap();
    let time = ManualTime::new();
    let mut session = session(quick_config(dir.path(), 20, 10.0, 0.5), &time);
    session.begin_with_sink(Box::new(MemorySink::new())).unwrap();

    let mut scene = MetronomeScene {
        sound: "B",
        every: 5,
        settle_at: Some((40, Outcome::SideA)),
        time: time.clone(),
        frame_time: Duration::from_millis(50),
    };
    let artifacts = session.run(&mut scene).unwrap();

    // 40 physics frames, then 0.5 s of wall time.
    assert_eq!(artifacts.ticks, 50);
    assert_eq!(artifacts.outcome, Some(Outcome::SideA));
    let last = artifacts.event_log.events().last().unwrap();
    assert_eq!(last.sound_name, "reponse_b");
    assert_eq!(last.frame_number, 40);
    assert!((last.time_seconds - 2.0).abs() < 1e-9);
}
