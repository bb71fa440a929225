//! Live run followed by the offline stages, through the files on disk.

use crate::support::{quick_config, read_wav, write_tone, MetronomeScene};
use dropreel_audio::{EventLog, SoundCatalog};
use dropreel_core::{DropReelError, ManualTime, RunConfig, SoundEntryConfig};
use dropreel_media::MemorySink;
use dropreel_session::{compose_audio, Outcome, RunArtifacts, RunSession};
use std::path::Path;
use std::time::Duration;

/// Every sound of the default catalog, as short tones under `dir/assets`.
fn config_with_assets(dir: &Path) -> RunConfig {
    let assets = dir.join("assets");
    std::fs::create_dir_all(&assets).unwrap();
    let mut config = quick_config(&dir.join("out"), 20, 2.0, 0.5);
    config.sounds = ["background", "question", "reponse_a", "reponse_b", "default", "A", "B"]
        .iter()
        .map(|name| {
            let path = assets.join(format!("{}.wav", name));
            write_tone(&path, 44_100, 4_410, 6_000);
            SoundEntryConfig::new(name, path, 0.5, false)
        })
        .collect();
    config
}

fn live_run(config: &RunConfig) -> RunArtifacts {
    let time = ManualTime::new();
    let catalog = SoundCatalog::from_config(&config.sounds);
    let mut session = RunSession::with_time_source(config.clone(), catalog, time.clone()).unwrap();
    session.begin_with_sink(Box::new(MemorySink::new())).unwrap();
    let mut scene = MetronomeScene {
        sound: "A",
        every: 8,
        settle_at: Some((20, Outcome::SideA)),
        time,
        frame_time: Duration::from_millis(50),
    };
    session.run(&mut scene).unwrap()
}

#[test]
fn exported_log_drives_the_mix() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with_assets(dir.path());
    let artifacts = live_run(&config);

    assert_eq!(artifacts.ticks, 30);
    assert_eq!(artifacts.outcome, Some(Outcome::SideA));
    let on_disk = EventLog::read_from(&config.events_path()).unwrap();
    assert_eq!(on_disk, artifacts.event_log);
    let names: Vec<&str> = on_disk.events().iter().map(|e| e.sound_name.as_str()).collect();
    assert_eq!(names, ["background", "question", "A", "A", "reponse_b"]);

    let catalog = SoundCatalog::from_config(&config.sounds);
    let report = compose_audio(&config, &catalog, &config.events_path(), &config.audio_path()).unwrap();
    assert_eq!(report.events_mixed, 5);
    assert_eq!(report.events_skipped, 0);

    // Run plus settle outlasts the last sound's tail: 2.5 s.
    let (spec, samples) = read_wav(&config.audio_path());
    assert_eq!(spec.sample_rate, 44_100);
    assert_eq!(samples.len(), 110_250);
    // Background is tiled under the whole mix.
    assert!(samples.iter().all(|&s| s != 0));
}

#[test]
fn edited_log_is_mixed_as_written() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with_assets(dir.path());
    let events = dir.path().join("edited.csv");
    std::fs::write(&events, "Frame,Time(s),Sound\r\n90,4.500,B\r\n0,0.000,A\r\n\r\n").unwrap();

    let catalog = SoundCatalog::from_config(&config.sounds);
    let out = dir.path().join("edited.wav");
    compose_audio(&config, &catalog, &events, &out).unwrap();

    // Out of order rows are placed by time; the mix runs to 4.5 + 0.1 + 0.5 s.
    let (_, samples) = read_wav(&out);
    assert_eq!(samples.len(), 224_910);
    assert_ne!(samples[0], 0);
    assert_eq!(samples[4_410], 0);
    assert_ne!(samples[198_450], 0);
}

#[test]
fn malformed_log_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with_assets(dir.path());
    let events = dir.path().join("bad.csv");
    std::fs::write(&events, "Frame,Time(s),Sound\n0,zero,A\n").unwrap();

    let catalog = SoundCatalog::from_config(&config.sounds);
    let err = compose_audio(&config, &catalog, &events, &dir.path().join("bad.wav")).unwrap_err();
    assert!(matches!(err, DropReelError::MalformedEventLog { line: 2, .. }));
}

#[cfg(unix)]
#[test]
fn run_to_deliverable() {
    use crate::support::fake_ffmpeg;
    use dropreel_session::render_deliverable;

    let dir = tempfile::tempdir().unwrap();
    let config = config_with_assets(dir.path());
    let artifacts = live_run(&config);
    let video = artifacts.video_path.clone().unwrap();
    // The in-memory sink leaves no file behind; stand one in for the encoder's.
    std::fs::write(&video, b"video").unwrap();

    let ffmpeg = fake_ffmpeg(dir.path(), "for last; do :; done\necho muxed > \"$last\"");
    let catalog = SoundCatalog::from_config(&config.sounds);
    let deliverable = render_deliverable(&config, &catalog, &artifacts, &ffmpeg).unwrap();

    assert_eq!(deliverable.video_path, config.output_dir.join("simulation_tiktok.mp4"));
    assert!(deliverable.video_path.is_file());
    assert_eq!(deliverable.audio_path, config.audio_path());
    assert_eq!(deliverable.mix.events_mixed, 5);
}
