//! Post-run stages: mixdown from the exported log, then muxing.

use crate::session::RunArtifacts;
use dropreel_audio::{Compositor, EventLog, MixReport, SoundCatalog};
use dropreel_core::{DropReelError, Result, RunConfig};
use dropreel_media::Multiplexer;
use std::path::{Path, PathBuf};
use tracing::info;

/// Products of the offline stages.
#[derive(Debug, Clone)]
pub struct Deliverable {
    pub audio_path: PathBuf,
    pub mix: MixReport,
    pub video_path: PathBuf,
}

/// Mix the event log at `events` into `out`.
pub fn compose_audio(
    config: &RunConfig,
    catalog: &SoundCatalog,
    events: &Path,
    out: &Path,
) -> Result<MixReport> {
    let log = EventLog::read_from(events)?;
    Compositor::new(catalog, config.mix.clone(), &config.timing).compose(&log, out)
}

/// Mix the soundtrack of a finished run and mux it with the captured video.
///
/// The mix is always attempted; muxing is refused when the run produced no
/// usable video.
pub fn render_deliverable(
    config: &RunConfig,
    catalog: &SoundCatalog,
    artifacts: &RunArtifacts,
    ffmpeg: &Path,
) -> Result<Deliverable> {
    let audio_path = config.audio_path();
    let mix = compose_audio(config, catalog, &artifacts.events_path, &audio_path)?;

    let Some(video) = artifacts.video_path.as_deref() else {
        return Err(DropReelError::Capture(format!(
            "No video asset to mux{}",
            artifacts
                .capture_error
                .as_deref()
                .map(|e| format!(": {}", e))
                .unwrap_or_default()
        )));
    };

    let muxer = Multiplexer::new(ffmpeg, config.delivery.clone(), config.video.frame_rate());
    let video_path = muxer.mux(video, &audio_path, None)?;
    info!(
        video = %video_path.display(),
        audio = %audio_path.display(),
        "Deliverable ready"
    );
    Ok(Deliverable {
        audio_path,
        mix,
        video_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dropreel_audio::SoundEvent;

    fn artifacts(dir: &Path, video: Option<PathBuf>) -> RunArtifacts {
        let events_path = dir.join("sound_events.csv");
        let event_log = EventLog::new(vec![SoundEvent {
            sound_name: "ghost".into(),
            frame_number: 0,
            time_seconds: 0.0,
        }]);
        event_log.write_to(&events_path).unwrap();
        RunArtifacts {
            video_path: video,
            capture_error: Some("encoder crashed".into()),
            events_path,
            event_log,
            outcome: None,
            ticks: 0,
            frames_written: 0,
            frames_skipped: 0,
            rerolls: 0,
        }
    }

    #[test]
    fn test_refuses_to_mux_without_video() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RunConfig::default();
        config.output_dir = dir.path().to_path_buf();
        config.timing.run_duration_secs = 1.0;
        config.timing.settle_duration_secs = 0.0;

        let err = render_deliverable(
            &config,
            &SoundCatalog::new(),
            &artifacts(dir.path(), None),
            Path::new("ffmpeg"),
        )
        .unwrap_err();
        match err {
            DropReelError::Capture(msg) => assert!(msg.contains("encoder crashed")),
            other => panic!("unexpected error: {other}"),
        }
        // The soundtrack is still produced.
        let reader = hound::WavReader::open(config.audio_path()).unwrap();
        assert_eq!(reader.len(), 44_100);
    }

    #[test]
    fn test_empty_log_aborts_before_muxing() {
        let dir = tempfile::tempdir().unwrap();
        let events = dir.path().join("sound_events.csv");
        EventLog::default().write_to(&events).unwrap();
        let err = compose_audio(
            &RunConfig::default(),
            &SoundCatalog::new(),
            &events,
            &dir.path().join("audio.wav"),
        )
        .unwrap_err();
        assert!(matches!(err, DropReelError::EmptyEventLog));
        assert!(!dir.path().join("audio.wav").exists());
    }
}
