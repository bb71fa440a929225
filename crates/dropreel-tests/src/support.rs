//! Fixtures shared by the integration tests.

use dropreel_core::{ClockState, FrameBuffer, ManualTime, PixelFormat, RunConfig};
use dropreel_session::{Outcome, Scene, SceneStatus, SoundTrigger};
use std::path::Path;
use std::time::Duration;

/// Mono 16-bit WAV holding `frames` copies of `value`.
pub fn write_tone(path: &Path, rate: u32, frames: usize, value: i16) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for _ in 0..frames {
        writer.write_sample(value).unwrap();
    }
    writer.finalize().unwrap();
}

/// Stereo 16-bit WAV with a constant `left` and `right` channel.
pub fn write_stereo_tone(path: &Path, rate: u32, frames: usize, left: i16, right: i16) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for _ in 0..frames {
        writer.write_sample(left).unwrap();
        writer.write_sample(right).unwrap();
    }
    writer.finalize().unwrap();
}

pub fn read_wav(path: &Path) -> (hound::WavSpec, Vec<i16>) {
    let mut reader = hound::WavReader::open(path).unwrap();
    let spec = reader.spec();
    let samples = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    (spec, samples)
}

/// Small, unpaced run configuration writing into `dir`.
pub fn quick_config(dir: &Path, fps: u32, run_secs: f64, settle_secs: f64) -> RunConfig {
    let mut config = RunConfig::default();
    config.video.fps = fps;
    config.video.width = 4;
    config.video.height = 2;
    config.timing.run_duration_secs = run_secs;
    config.timing.settle_duration_secs = settle_secs;
    config.output_dir = dir.to_path_buf();
    config.realtime = false;
    config
}

/// Fires `sound` every `every` physics frames and settles at `settle_at`.
///
/// Each render moves `time` forward by `frame_time`, standing in for wall time.
pub struct MetronomeScene {
    pub sound: &'static str,
    pub every: u64,
    pub settle_at: Option<(u64, Outcome)>,
    pub time: ManualTime,
    pub frame_time: Duration,
}

impl Scene for MetronomeScene {
    fn step(&mut self, clock: &ClockState, triggers: &SoundTrigger) -> SceneStatus {
        if clock.physics_frames % self.every == 0 {
            triggers.fire(self.sound);
        }
        match self.settle_at {
            Some((frame, outcome)) if clock.physics_frames == frame => SceneStatus::Settled(outcome),
            _ => SceneStatus::Running,
        }
    }

    fn render(&mut self, _clock: &ClockState) -> FrameBuffer {
        self.time.advance(self.frame_time);
        FrameBuffer::new(4, 2, PixelFormat::Rgb24)
    }
}

/// Executable shell script standing in for ffmpeg.
#[cfg(unix)]
pub fn fake_ffmpeg(dir: &Path, body: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;
    use std::process::{Command, Stdio};

    let path = dir.join("ffmpeg");
    std::fs::write(&path, format!("#!/bin/sh\n[ \"$1\" = \"-version\" ] && exit 0\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    // ETXTBSY while another test's forked child still holds the write fd.
    for _ in 0..50 {
        let status = Command::new(&path)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match status {
            Err(e) if e.raw_os_error() == Some(26) => std::thread::sleep(Duration::from_millis(10)),
            _ => break,
        }
    }
    path
}
