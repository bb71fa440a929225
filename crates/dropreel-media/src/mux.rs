//! Final delivery: mux the captured video with the mixed soundtrack.

use crate::encoder::{rate_arg, run_to_completion};
use dropreel_core::{DeliveryConfig, DropReelError, FrameRate, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Combines a video-only capture and a mixed audio asset into the deliverable.
#[derive(Debug, Clone)]
pub struct Multiplexer {
    ffmpeg: PathBuf,
    delivery: DeliveryConfig,
    frame_rate: FrameRate,
}

impl Multiplexer {
    pub fn new(ffmpeg: impl Into<PathBuf>, delivery: DeliveryConfig, frame_rate: FrameRate) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            delivery,
            frame_rate,
        }
    }

    /// `out/simulation.mp4` -> `out/simulation_tiktok.mp4`.
    pub fn output_path_for(&self, video: &Path) -> PathBuf {
        let stem = video
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".into());
        video.with_file_name(format!("{}_{}.mp4", stem, self.delivery.output_suffix))
    }

    pub fn args(&self, video: &Path, audio: &Path, output: &Path) -> Vec<String> {
        let d = &self.delivery;
        let mut args: Vec<String> = Vec::new();
        if d.hwaccel {
            args.extend(["-hwaccel".into(), "auto".into()]);
        }
        args.extend([
            "-i".into(),
            video.to_string_lossy().into_owned(),
            "-i".into(),
            audio.to_string_lossy().into_owned(),
            "-map".into(),
            "0:v".into(),
            "-map".into(),
            "1:a".into(),
            "-c:v".into(),
            d.video_codec.ffmpeg_encoder().into(),
            "-preset".into(),
            d.preset.clone(),
            "-crf".into(),
            d.crf.to_string(),
            "-profile:v".into(),
            d.profile.clone(),
            "-level".into(),
            d.level.clone(),
            "-pix_fmt".into(),
            d.pixel_format.clone(),
        ]);
        if d.faststart {
            args.extend(["-movflags".into(), "+faststart".into()]);
        }
        args.extend([
            "-r".into(),
            rate_arg(self.frame_rate),
            "-c:a".into(),
            d.audio_codec.ffmpeg_encoder().into(),
            "-b:a".into(),
            format!("{}k", d.audio_bitrate),
            "-ar".into(),
            d.audio_sample_rate.to_string(),
            "-ac".into(),
            d.audio_channels.to_string(),
            "-threads".into(),
            "0".into(),
            "-y".into(),
            output.to_string_lossy().into_owned(),
        ]);
        args
    }

    /// Run the encoder. Returns the deliverable's path once it exists on disk.
    pub fn mux(&self, video: &Path, audio: &Path, output: Option<&Path>) -> Result<PathBuf> {
        for (kind, path) in [("Video", video), ("Audio", audio)] {
            if !path.is_file() {
                return Err(DropReelError::NotFound(format!(
                    "{} asset not found: {}",
                    kind,
                    path.display()
                )));
            }
        }
        let output = output.map_or_else(|| self.output_path_for(video), Path::to_path_buf);

        info!(
            video = %video.display(),
            audio = %audio.display(),
            output = %output.display(),
            "Muxing final video"
        );
        run_to_completion(&self.ffmpeg, &self.args(video, audio, &output))?;

        if !output.is_file() {
            return Err(DropReelError::Encoder(format!(
                "Encoder reported success but {} was not created",
                output.display()
            )));
        }
        info!(path = %output.display(), "Final video written");
        Ok(output)
    }
}
