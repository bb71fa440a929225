//! One-time generation of pitch-shifted sound variants.
//!
//! Each variant is the canonical asset played back at a slightly different
//! speed, written next to it as `<stem>-<k>.wav` where the catalog will find it.

use crate::encoder::run_to_completion;
use dropreel_audio::catalog::variant_path;
use dropreel_core::{DropReelError, Result, SoundEntryConfig, CANONICAL_SAMPLE_RATE};
use std::path::Path;
use tracing::{debug, info, warn};

/// Variant suffix and its playback-speed factor.
pub const PITCH_FACTORS: [(u32, f64); 6] = [
    (1, 1.03),
    (2, 1.06),
    (3, 1.09),
    (4, 0.97),
    (5, 0.94),
    (6, 0.91),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantReport {
    pub created: usize,
    pub existing: usize,
    pub failed: usize,
}

impl VariantReport {
    fn merge(&mut self, other: &VariantReport) {
        self.created += other.created;
        self.existing += other.existing;
        self.failed += other.failed;
    }
}

pub fn pitch_variant_args(input: &Path, output: &Path, factor: f64) -> Vec<String> {
    vec![
        "-i".into(),
        input.to_string_lossy().into_owned(),
        "-af".into(),
        format!(
            "asetrate={rate}*{factor},aresample={rate}",
            rate = CANONICAL_SAMPLE_RATE
        ),
        "-y".into(),
        output.to_string_lossy().into_owned(),
    ]
}

/// Render every missing variant of `canonical`. A failed variant is logged and
/// the others are still attempted.
pub fn prepare_pitch_variants(ffmpeg: &Path, canonical: &Path) -> Result<VariantReport> {
    if !canonical.is_file() {
        return Err(DropReelError::NotFound(format!(
            "Sound asset not found: {}",
            canonical.display()
        )));
    }
    let mut report = VariantReport::default();
    for (k, factor) in PITCH_FACTORS {
        let output = variant_path(canonical, k);
        if output.exists() {
            debug!(path = %output.display(), "Variant already present");
            report.existing += 1;
            continue;
        }
        match run_to_completion(ffmpeg, &pitch_variant_args(canonical, &output, factor)) {
            Ok(_) => {
                debug!(path = %output.display(), factor, "Variant created");
                report.created += 1;
            }
            Err(e) => {
                warn!(path = %output.display(), factor, "Failed to create variant: {}", e);
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

/// Prepare variants for every catalog entry that declares them. Missing
/// canonical assets are logged and skipped.
pub fn prepare_catalog_variants(ffmpeg: &Path, sounds: &[SoundEntryConfig]) -> VariantReport {
    let mut total = VariantReport::default();
    for sound in sounds.iter().filter(|s| s.variants) {
        match prepare_pitch_variants(ffmpeg, &sound.path) {
            Ok(report) => {
                info!(
                    sound = %sound.name,
                    created = report.created,
                    existing = report.existing,
                    failed = report.failed,
                    "Pitch variants prepared"
                );
                total.merge(&report);
            }
            Err(e) => {
                warn!(sound = %sound.name, "Skipping variant preparation: {}", e);
                total.failed += PITCH_FACTORS.len();
            }
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args() {
        let args = pitch_variant_args(Path::new("A.wav"), Path::new("A-1.wav"), 1.03);
        assert_eq!(
            args.join(" "),
            "-i A.wav -af asetrate=44100*1.03,aresample=44100 -y A-1.wav"
        );
    }

    #[test]
    fn test_missing_canonical() {
        let err = prepare_pitch_variants(Path::new("ffmpeg"), Path::new("/nope/A.wav")).unwrap_err();
        assert!(matches!(err, DropReelError::NotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_variants_are_kept_and_failures_continue() {
        use crate::encoder::test_support::fake_ffmpeg;

        let dir = tempfile::tempdir().unwrap();
        let canonical = dir.path().join("A.wav");
        std::fs::write(&canonical, b"x").unwrap();
        std::fs::write(dir.path().join("A-2.wav"), b"keep").unwrap();

        // Succeeds for speed-ups only.
        let ffmpeg = fake_ffmpeg(
            dir.path(),
            "case \"$4\" in *\\*1.0*) for last; do :; done; echo v > \"$last\";; *) exit 1;; esac",
        );
        let report = prepare_pitch_variants(&ffmpeg, &canonical).unwrap();
        assert_eq!(
            report,
            VariantReport {
                created: 2,
                existing: 1,
                failed: 3,
            }
        );
        assert_eq!(std::fs::read(dir.path().join("A-2.wav")).unwrap(), b"keep");
        assert!(dir.path().join("A-3.wav").is_file());
    }
}
