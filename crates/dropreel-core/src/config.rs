//! Run configuration.
//!
//! Stored as JSON. Every section has defaults, so a file only needs the keys it
//! wants to override.

use crate::error::{DropReelError, Result};
use crate::frame::PixelFormat;
use crate::outcome::Outcome;
use crate::time::FrameRate;
use crate::CANONICAL_SAMPLE_RATE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for one run and its offline post-processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub video: VideoConfig,
    pub timing: TimingConfig,
    pub mix: MixConfig,
    pub delivery: DeliveryConfig,
    pub sounds: Vec<SoundEntryConfig>,
    /// Directory receiving the captured video, event log, mix and deliverable.
    pub output_dir: PathBuf,
    /// Explicit encoder binary; searched on `PATH` when unset.
    pub ffmpeg: Option<PathBuf>,
    /// Pace the live loop to the frame rate instead of running flat out.
    pub realtime: bool,
    /// Winner the run must produce. A settle on the other side restarts the run.
    pub expected_winner: Option<Outcome>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            video: VideoConfig::default(),
            timing: TimingConfig::default(),
            mix: MixConfig::default(),
            delivery: DeliveryConfig::default(),
            sounds: default_sounds(),
            output_dir: PathBuf::from("output/semaine"),
            ffmpeg: None,
            realtime: true,
            expected_winner: None,
        }
    }
}

impl RunConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let config: Self = serde_json::from_slice(&data).map_err(|e| {
            DropReelError::Serialization(format!("Invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_vec_pretty(self)
            .map_err(|e| DropReelError::Serialization(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(DropReelError::InvalidParameter(msg));
        if self.video.fps == 0 {
            return invalid("video.fps must be positive".into());
        }
        if self.video.width == 0 || self.video.height == 0 {
            return invalid(format!(
                "video dimensions must be positive, got {}x{}",
                self.video.width, self.video.height
            ));
        }
        let t = &self.timing;
        if !(t.run_duration_secs >= 0.0 && t.settle_duration_secs >= 0.0)
            || !(t.run_duration_secs.is_finite() && t.settle_duration_secs.is_finite())
        {
            return invalid(format!(
                "timing durations must be finite and non-negative, got run {} / settle {}",
                t.run_duration_secs, t.settle_duration_secs
            ));
        }
        if self.mix.sample_rate == 0 {
            return invalid("mix.sample_rate must be positive".into());
        }
        if !(self.mix.limiter_threshold > 0.0 && self.mix.limiter_threshold <= 1.0) {
            return invalid(format!(
                "mix.limiter_threshold must be in (0, 1], got {}",
                self.mix.limiter_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.mix.limiter_ratio) {
            return invalid(format!(
                "mix.limiter_ratio must be in [0, 1], got {}",
                self.mix.limiter_ratio
            ));
        }
        if !(self.mix.tail_margin_secs >= 0.0) {
            return invalid("mix.tail_margin_secs must be non-negative".into());
        }
        for sound in &self.sounds {
            if !(0.0..=1.0).contains(&sound.volume) {
                return invalid(format!(
                    "volume of sound '{}' must be in [0, 1], got {}",
                    sound.name, sound.volume
                ));
            }
        }
        Ok(())
    }

    /// Path of the raw captured video.
    pub fn video_path(&self) -> PathBuf {
        self.output_dir.join("simulation.mp4")
    }

    /// Path of the exported event log.
    pub fn events_path(&self) -> PathBuf {
        self.output_dir.join("sound_events.csv")
    }

    /// Path of the mixed audio asset.
    pub fn audio_path(&self) -> PathBuf {
        self.output_dir.join("audio.wav")
    }
}

/// Captured video geometry and rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            width: 1080,
            height: 1920,
            pixel_format: PixelFormat::Rgb24,
        }
    }
}

impl VideoConfig {
    pub fn frame_rate(&self) -> FrameRate {
        FrameRate::fps(self.fps)
    }
}

/// Lengths of the physics run and of the settle window after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub run_duration_secs: f64,
    pub settle_duration_secs: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            run_duration_secs: 60.0,
            settle_duration_secs: 3.0,
        }
    }
}

impl TimingConfig {
    /// Hard cap on captured frames: `fps * run + fps * settle`.
    pub fn max_frames(&self, rate: FrameRate) -> u64 {
        rate.frames_in(self.run_duration_secs) + rate.frames_in(self.settle_duration_secs)
    }

    /// Shortest length the mixed audio may have.
    pub fn minimum_length_secs(&self) -> f64 {
        self.run_duration_secs + self.settle_duration_secs
    }
}

/// Sample encoding of the mixed WAV asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WavSampleFormat {
    #[default]
    Int16,
    Float32,
}

/// Offline compositor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixConfig {
    pub sample_rate: u32,
    /// Silence kept after the tail of the last triggered sound.
    pub tail_margin_secs: f64,
    pub limiter_threshold: f32,
    pub limiter_ratio: f32,
    /// Sound name tiled under the whole mix.
    pub background_sound: String,
    pub sample_format: WavSampleFormat,
    /// Seed for pitch-variant selection; random when unset.
    pub variant_seed: Option<u64>,
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            sample_rate: CANONICAL_SAMPLE_RATE,
            tail_margin_secs: 0.5,
            limiter_threshold: 0.7,
            limiter_ratio: 0.8,
            background_sound: "background".into(),
            sample_format: WavSampleFormat::Int16,
            variant_seed: None,
        }
    }
}

/// Video codec of the final deliverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoCodec {
    H264,
    H265,
}

impl VideoCodec {
    pub fn ffmpeg_encoder(self) -> &'static str {
        match self {
            Self::H264 => "libx264",
            Self::H265 => "libx265",
        }
    }
}

/// Audio codec of the final deliverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioCodec {
    Aac,
    Opus,
}

impl AudioCodec {
    pub fn ffmpeg_encoder(self) -> &'static str {
        match self {
            Self::Aac => "aac",
            Self::Opus => "libopus",
        }
    }
}

/// Encoder parameters for the final muxed file, tuned for short vertical video
/// platforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub video_codec: VideoCodec,
    pub preset: String,
    /// CRF value (0-51, lower = better).
    pub crf: u32,
    pub profile: String,
    pub level: String,
    pub pixel_format: String,
    pub faststart: bool,
    pub hwaccel: bool,
    pub audio_codec: AudioCodec,
    /// Audio bitrate in kbps.
    pub audio_bitrate: u32,
    pub audio_sample_rate: u32,
    pub audio_channels: u16,
    /// Appended to the video's file stem to name the deliverable.
    pub output_suffix: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            video_codec: VideoCodec::H264,
            preset: "slow".into(),
            crf: 18,
            profile: "high".into(),
            level: "4.2".into(),
            pixel_format: "yuv420p".into(),
            faststart: true,
            hwaccel: true,
            audio_codec: AudioCodec::Aac,
            audio_bitrate: 384,
            audio_sample_rate: 48_000,
            audio_channels: 2,
            output_suffix: "tiktok".into(),
        }
    }
}

/// One logical sound of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundEntryConfig {
    pub name: String,
    pub path: PathBuf,
    #[serde(default = "unit_volume")]
    pub volume: f32,
    /// Whether `<stem>-<k>.<ext>` pitch variants should be looked for.
    #[serde(default)]
    pub variants: bool,
}

impl SoundEntryConfig {
    pub fn new(name: &str, path: impl Into<PathBuf>, volume: f32, variants: bool) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            volume,
            variants,
        }
    }
}

fn unit_volume() -> f32 {
    1.0
}

fn default_sounds() -> Vec<SoundEntryConfig> {
    let theme = Path::new("assets/themes/semaine");
    vec![
        SoundEntryConfig::new("reponse_a", theme.join("a.wav"), 1.0, false),
        SoundEntryConfig::new("reponse_b", theme.join("b.wav"), 1.0, false),
        SoundEntryConfig::new("question", theme.join("question.wav"), 1.0, false),
        SoundEntryConfig::new("background", theme.join("music.wav"), 0.6, false),
        SoundEntryConfig::new("default", "assets/sounds/default_collision.wav", 0.05, true),
        SoundEntryConfig::new("A", "assets/sounds/A.wav", 0.05, true),
        SoundEntryConfig::new("B", "assets/sounds/B.wav", 0.08, true),
    ]
}
