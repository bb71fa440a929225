//! Offline mixdown of a finished run.
//!
//! The compositor rebuilds the soundtrack from the exported event log alone:
//! every event is resolved to an asset, decoded, folded to mono, resampled to the
//! mix rate and summed at its sample offset, with the background tiled
//! underneath. The result is limited, normalized and written as one WAV file.

use crate::catalog::SoundCatalog;
use crate::decode::decode_file;
use crate::dsp;
use crate::recorder::EventLog;
use crate::resample::resample_mono;
use dropreel_core::{DropReelError, MixConfig, Result, TimingConfig, WavSampleFormat};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Longest mix the compositor will allocate.
pub const MAX_MIX_SECS: f64 = 6.0 * 3600.0;

/// Mono clip decoded and resampled to the mix rate.
type Clip = Arc<Vec<f32>>;

/// The finished mix, mono, at one sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct MixedAudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl MixedAudioBuffer {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn peak(&self) -> f32 {
        dsp::peak(&self.samples)
    }

    /// Write as a mono WAV file, creating parent directories as needed.
    pub fn write_wav(&self, path: &Path, format: WavSampleFormat) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let wav_err =
            |e: hound::Error| DropReelError::Audio(format!("WAV write {}: {}", path.display(), e));

        let spec = match format {
            WavSampleFormat::Int16 => hound::WavSpec {
                channels: 1,
                sample_rate: self.sample_rate,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            },
            WavSampleFormat::Float32 => hound::WavSpec {
                channels: 1,
                sample_rate: self.sample_rate,
                bits_per_sample: 32,
                sample_format: hound::SampleFormat::Float,
            },
        };
        let mut writer = hound::WavWriter::create(path, spec).map_err(wav_err)?;
        match format {
            WavSampleFormat::Int16 => {
                for s in &self.samples {
                    let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
                    writer.write_sample(v).map_err(wav_err)?;
                }
            }
            WavSampleFormat::Float32 => {
                for s in &self.samples {
                    writer.write_sample(*s).map_err(wav_err)?;
                }
            }
        }
        writer.finalize().map_err(wav_err)?;
        Ok(())
    }
}

/// What happened to the events of one mixdown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MixReport {
    pub events_mixed: usize,
    /// Unknown sounds, unreadable assets and events starting past the end.
    pub events_skipped: usize,
    /// Events whose tail was cut at the end of the buffer.
    pub events_truncated: usize,
    pub duration_secs: f64,
}

/// Rebuilds the soundtrack of a run from its event log.
pub struct Compositor<'a> {
    catalog: &'a SoundCatalog,
    mix: MixConfig,
    minimum_length_secs: f64,
}

impl<'a> Compositor<'a> {
    pub fn new(catalog: &'a SoundCatalog, mix: MixConfig, timing: &TimingConfig) -> Self {
        Self {
            catalog,
            mix,
            minimum_length_secs: timing.minimum_length_secs(),
        }
    }

    /// Mix the log into memory.
    pub fn render(&self, log: &EventLog) -> Result<(MixedAudioBuffer, MixReport)> {
        if log.is_empty() {
            return Err(DropReelError::EmptyEventLog);
        }
        let rate = self.mix.sample_rate;
        let events = log.sorted_by_time();
        let mut report = MixReport::default();

        let mut rng = match self.mix.variant_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        // Resolve in time order so a seeded run picks the same variants every time.
        let resolved: Vec<Option<PathBuf>> = events
            .iter()
            .map(|event| {
                self.catalog
                    .resolve(&event.sound_name, &mut rng)
                    .map(Path::to_path_buf)
            })
            .collect();

        let unique: BTreeSet<&PathBuf> = resolved.iter().flatten().collect();
        let clips: HashMap<PathBuf, Option<Clip>> = unique
            .into_par_iter()
            .map(|path| (path.clone(), load_clip(path, rate)))
            .collect();
        let event_clips: Vec<Option<Clip>> = resolved
            .iter()
            .map(|p| p.as_ref().and_then(|p| clips.get(p).cloned().flatten()))
            .collect();

        // Length: the tail of the last event plus margin, never below the run length.
        let last = events.len() - 1;
        let last_clip_secs = event_clips[last]
            .as_ref()
            .map_or(0.0, |c| c.len() as f64 / rate as f64);
        let duration = (events[last].time_seconds + last_clip_secs + self.mix.tail_margin_secs)
            .max(self.minimum_length_secs);
        if !(duration <= MAX_MIX_SECS) {
            return Err(DropReelError::InvalidParameter(format!(
                "Mix would last {:.1}s (event '{}' at {}s), longer than the {}s limit",
                duration, events[last].sound_name, events[last].time_seconds, MAX_MIX_SECS
            )));
        }
        let len = (duration * rate as f64).ceil() as usize;
        let mut buffer = vec![0.0f32; len];
        debug!(duration, samples = len, events = events.len(), "Allocated mix buffer");

        let background = events
            .iter()
            .position(|e| e.sound_name == self.mix.background_sound);

        if let Some(i) = background {
            match &event_clips[i] {
                Some(clip) => {
                    let gain = self.catalog.volume_of(&events[i].sound_name);
                    dsp::tile_into(&mut buffer, clip, gain);
                    report.events_mixed += 1;
                }
                None => {
                    warn!(
                        index = i,
                        sound = %events[i].sound_name,
                        path = ?resolved[i],
                        "Background unavailable, mixing without it"
                    );
                    report.events_skipped += 1;
                }
            }
        }

        for (i, event) in events.iter().enumerate() {
            if Some(i) == background {
                continue;
            }
            if resolved[i].is_none() {
                warn!(index = i, frame = event.frame_number, sound = %event.sound_name, "Unknown sound, skipping event");
                report.events_skipped += 1;
                continue;
            }
            let Some(clip) = &event_clips[i] else {
                warn!(
                    index = i,
                    frame = event.frame_number,
                    sound = %event.sound_name,
                    path = ?resolved[i],
                    "Asset unavailable, skipping event"
                );
                report.events_skipped += 1;
                continue;
            };

            let offset = (event.time_seconds * rate as f64).round() as usize;
            if offset >= len {
                warn!(index = i, frame = event.frame_number, sound = %event.sound_name, offset, "Event starts past the end of the mix, skipping");
                report.events_skipped += 1;
                continue;
            }
            let gain = self.catalog.volume_of(&event.sound_name);
            let written = dsp::mix_at(&mut buffer, clip, offset, gain);
            if written < clip.len() {
                warn!(
                    index = i,
                    frame = event.frame_number,
                    sound = %event.sound_name,
                    dropped = clip.len() - written,
                    "Event overruns the mix, truncated"
                );
                report.events_truncated += 1;
            }
            report.events_mixed += 1;
        }

        dsp::soft_limit(
            &mut buffer,
            self.mix.limiter_threshold,
            self.mix.limiter_ratio,
        );
        if dsp::normalize_peak(&mut buffer).is_none() {
            debug!("Mix is silent, normalization skipped");
        }

        report.duration_secs = len as f64 / rate as f64;
        Ok((
            MixedAudioBuffer {
                samples: buffer,
                sample_rate: rate,
            },
            report,
        ))
    }

    /// Mix the log and write the result to `out`.
    pub fn compose(&self, log: &EventLog, out: &Path) -> Result<MixReport> {
        let (mixed, report) = self.render(log)?;
        mixed.write_wav(out, self.mix.sample_format)?;
        info!(
            path = %out.display(),
            duration = report.duration_secs,
            mixed = report.events_mixed,
            skipped = report.events_skipped,
            truncated = report.events_truncated,
            "Audio mix written"
        );
        Ok(report)
    }
}

fn load_clip(path: &Path, rate: u32) -> Option<Clip> {
    let result = decode_file(path).and_then(|audio| {
        let src_rate = audio.sample_rate;
        let mono = audio.into_mono();
        resample_mono(&mono, src_rate, rate)
    });
    match result {
        Ok(samples) => Some(Arc::new(samples)),
        Err(e) => {
            warn!(path = %path.display(), "Failed to load sound asset: {}", e);
            None
        }
    }
}
