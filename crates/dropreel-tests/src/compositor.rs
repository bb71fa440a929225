//! Offline mixdown from event logs.

use crate::support::{read_wav, write_stereo_tone, write_tone};
use dropreel_audio::catalog::variant_path;
use dropreel_audio::{dsp, Compositor, EventLog, SoundCatalog, SoundCatalogEntry, SoundEvent};
use dropreel_core::{MixConfig, TimingConfig};
use proptest::prelude::*;
use std::path::Path;

const RATE: u32 = 44_100;

fn event(frame: u64, t: f64, name: &str) -> SoundEvent {
    SoundEvent {
        sound_name: name.into(),
        frame_number: frame,
        time_seconds: t,
    }
}

fn timing() -> TimingConfig {
    TimingConfig {
        run_duration_secs: 10.0,
        settle_duration_secs: 3.0,
    }
}

fn seeded(seed: u64) -> MixConfig {
    MixConfig {
        variant_seed: Some(seed),
        ..MixConfig::default()
    }
}

/// Background points at a missing file; A and reponse_a are short tones.
fn catalog(dir: &Path) -> SoundCatalog {
    let a = dir.join("A.wav");
    let voice = dir.join("a.wav");
    write_tone(&a, RATE, 4_410, 8_000);
    write_tone(&voice, RATE, 22_050, 12_000);

    let mut catalog = SoundCatalog::new();
    catalog.insert("background", SoundCatalogEntry::new(dir.join("music.wav"), 0.6));
    catalog.insert("A", SoundCatalogEntry::new(a, 0.05));
    catalog.insert("reponse_a", SoundCatalogEntry::new(voice, 1.0));
    catalog
}

#[test]
fn events_land_at_their_physics_time() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = catalog(dir.path());
    let log = EventLog::new(vec![
        event(0, 0.0, "background"),
        event(30, 0.5, "A"),
        event(900, 15.0, "reponse_a"),
    ]);

    let out = dir.path().join("out/audio.wav");
    let report = Compositor::new(&catalog, seeded(1), &timing())
        .compose(&log, &out)
        .unwrap();
    assert_eq!(report.events_mixed, 2);
    assert_eq!(report.events_skipped, 1);

    let (spec, samples) = read_wav(&out);
    assert_eq!(spec.sample_rate, RATE);
    assert_eq!(spec.channels, 1);
    assert!(samples.len() >= (15.5 * RATE as f64).round() as usize);

    let first = samples.iter().position(|&s| s != 0).unwrap();
    assert_eq!(first, 22_050);
    assert_ne!(samples[15 * RATE as usize], 0);
}

#[test]
fn undecodable_asset_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let broken = dir.path().join("broken.wav");
    std::fs::write(&broken, b"definitely not a wave file").unwrap();
    let good = dir.path().join("good.wav");
    write_tone(&good, RATE, 441, 10_000);

    let mut catalog = SoundCatalog::new();
    catalog.insert("broken", SoundCatalogEntry::new(broken, 1.0));
    catalog.insert("good", SoundCatalogEntry::new(good, 1.0));
    let log = EventLog::new(vec![event(6, 0.1, "broken"), event(12, 0.2, "good")]);

    let out = dir.path().join("audio.wav");
    let report = Compositor::new(&catalog, seeded(1), &timing())
        .compose(&log, &out)
        .unwrap();
    assert_eq!(report.events_skipped, 1);
    assert_eq!(report.events_mixed, 1);

    let (_, samples) = read_wav(&out);
    assert_eq!(samples.len(), 13 * RATE as usize);
    assert_eq!(samples.iter().position(|&s| s != 0), Some(8_820));
}

#[test]
fn seeded_mix_is_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    let canonical = dir.path().join("A.wav");
    write_tone(&canonical, RATE, 441, 4_000);
    for k in 1..=6u32 {
        write_tone(&variant_path(&canonical, k), RATE, 441, 4_000 + k as i16 * 1_000);
    }
    let mut catalog = SoundCatalog::new();
    catalog.insert("A", SoundCatalogEntry::discover(&canonical, 0.5));
    assert_eq!(catalog.entry("A").unwrap().variant_paths.len(), 6);

    let log = EventLog::new((0..40).map(|i| event(i * 6, i as f64 * 0.1, "A")).collect());
    let timing = TimingConfig {
        run_duration_secs: 4.0,
        settle_duration_secs: 1.0,
    };

    let render = |seed| {
        Compositor::new(&catalog, seeded(seed), &timing)
            .render(&log)
            .unwrap()
            .0
            .samples
    };
    let first = render(42);
    assert_eq!(first, render(42));
    assert_ne!(first, render(43));
}

#[test]
fn mix_is_normalized_and_silence_stays_silent() {
    let dir = tempfile::tempdir().unwrap();
    let loud = dir.path().join("loud.wav");
    let quiet = dir.path().join("quiet.wav");
    write_tone(&loud, RATE, 4_410, i16::MAX);
    write_tone(&quiet, RATE, 4_410, 0);

    let mut catalog = SoundCatalog::new();
    catalog.insert("loud", SoundCatalogEntry::new(loud, 1.0));
    catalog.insert("quiet", SoundCatalogEntry::new(quiet, 1.0));
    let timing = TimingConfig {
        run_duration_secs: 1.0,
        settle_duration_secs: 0.0,
    };

    // Five overlapping loud hits sum well past full scale.
    let log = EventLog::new((0..5).map(|i| event(i, i as f64 * 0.01, "loud")).collect());
    let (mixed, _) = Compositor::new(&catalog, seeded(1), &timing).render(&log).unwrap();
    assert_eq!(mixed.peak(), 1.0);

    let log = EventLog::new(vec![event(0, 0.0, "quiet"), event(30, 0.5, "quiet")]);
    let (mixed, _) = Compositor::new(&catalog, seeded(1), &timing).render(&log).unwrap();
    assert!(mixed.samples.iter().all(|&s| s == 0.0));
}

#[test]
fn half_rate_stereo_clip_is_folded_and_placed() {
    let dir = tempfile::tempdir().unwrap();
    let stereo = dir.path().join("chime.wav");
    let reference = dir.path().join("ref.wav");
    // 0.2 s at 22,050 Hz; the channels average to the reference level.
    write_stereo_tone(&stereo, 22_050, 4_410, 12_000, 4_000);
    write_tone(&reference, RATE, 4_410, 8_000);

    let mut catalog = SoundCatalog::new();
    catalog.insert("chime", SoundCatalogEntry::new(stereo, 1.0));
    catalog.insert("ref", SoundCatalogEntry::new(reference, 1.0));
    let timing = TimingConfig {
        run_duration_secs: 1.0,
        settle_duration_secs: 0.0,
    };
    let log = EventLog::new(vec![event(30, 0.5, "chime"), event(90, 1.5, "ref")]);
    let (mixed, report) = Compositor::new(&catalog, seeded(1), &timing).render(&log).unwrap();
    assert_eq!(report.events_mixed, 2);

    let samples = &mixed.samples;
    let onset = 22_050;
    let clip_len = 8_820;
    assert!(samples[..onset].iter().all(|&s| s == 0.0));
    assert!(samples[onset + clip_len..66_150].iter().all(|&s| s == 0.0));

    let big = 0.25 * mixed.peak();
    let first_big = samples.iter().position(|s| s.abs() > big).unwrap();
    assert!(first_big.abs_diff(onset) <= 8, "onset at {}", first_big);
    assert!(samples[onset + clip_len - 400].abs() > big);

    let folded = samples[onset + clip_len / 2];
    let direct = samples[66_150 + 2_205];
    assert!((folded / direct - 1.0).abs() < 0.02, "{} vs {}", folded, direct);
}

proptest! {
    #[test]
    fn limited_and_normalized_peak_is_unity(
        samples in prop::collection::vec(-8.0f32..8.0, 1..512),
        threshold in 0.1f32..=1.0,
        ratio in 0.0f32..=1.0,
    ) {
        let mut buf = samples;
        dsp::soft_limit(&mut buf, threshold, ratio);
        match dsp::normalize_peak(&mut buf) {
            Some(_) => prop_assert_eq!(dsp::peak(&buf), 1.0),
            None => prop_assert!(buf.iter().all(|&s| s == 0.0)),
        }
    }
}
