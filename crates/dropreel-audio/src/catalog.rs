//! Static registry of playable sounds.

use dropreel_core::SoundEntryConfig;
use rand::Rng;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Suffixes looked up for pre-rendered pitch variants: `<stem>-<k>.wav`.
pub const VARIANT_SUFFIXES: RangeInclusive<u32> = 1..=6;

/// Assets and volume behind one logical sound name.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundCatalogEntry {
    pub canonical_path: PathBuf,
    /// Discovered pitch variants, in suffix order.
    pub variant_paths: Vec<PathBuf>,
    /// Playback volume in [0, 1].
    pub volume: f32,
}

impl SoundCatalogEntry {
    pub fn new(canonical_path: impl Into<PathBuf>, volume: f32) -> Self {
        Self {
            canonical_path: canonical_path.into(),
            variant_paths: Vec::new(),
            volume,
        }
    }

    /// Entry with its variants discovered on disk.
    pub fn discover(canonical_path: impl Into<PathBuf>, volume: f32) -> Self {
        let canonical_path = canonical_path.into();
        let variant_paths = VARIANT_SUFFIXES
            .map(|k| variant_path(&canonical_path, k))
            .filter(|p| p.is_file())
            .collect();
        Self {
            canonical_path,
            variant_paths,
            volume,
        }
    }
}

/// `assets/A.mp3` + 3 -> `assets/A-3.wav`.
///
/// Variants are always rendered as WAV, whatever the canonical format.
pub fn variant_path(canonical: &Path, k: u32) -> PathBuf {
    let stem = canonical
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    canonical.with_file_name(format!("{}-{}.wav", stem, k))
}

/// Sound name -> asset registry, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct SoundCatalog {
    entries: BTreeMap<String, SoundCatalogEntry>,
}

impl SoundCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from configuration, probing variants for entries that declare them.
    pub fn from_config(sounds: &[SoundEntryConfig]) -> Self {
        let mut catalog = Self::new();
        for sound in sounds {
            let entry = if sound.variants {
                SoundCatalogEntry::discover(&sound.path, sound.volume)
            } else {
                SoundCatalogEntry::new(&sound.path, sound.volume)
            };
            if !entry.canonical_path.is_file() {
                warn!(sound = %sound.name, path = %entry.canonical_path.display(), "Sound asset missing");
            }
            debug!(
                sound = %sound.name,
                variants = entry.variant_paths.len(),
                volume = entry.volume,
                "Registered sound"
            );
            catalog.insert(&sound.name, entry);
        }
        catalog
    }

    pub fn insert(&mut self, name: &str, entry: SoundCatalogEntry) {
        self.entries.insert(name.to_string(), entry);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn entry(&self, name: &str) -> Option<&SoundCatalogEntry> {
        self.entries.get(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &SoundCatalogEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Configured volume, 1.0 for unknown names.
    pub fn volume_of(&self, name: &str) -> f32 {
        self.entries.get(name).map_or(1.0, |e| e.volume)
    }

    /// Concrete asset for one playback of `name`.
    ///
    /// Sounds with variants pick uniformly among the canonical asset and every
    /// discovered variant. Sounds without variants do not draw from `rng`.
    pub fn resolve<R: Rng>(&self, name: &str, rng: &mut R) -> Option<&Path> {
        let entry = self.entries.get(name)?;
        if entry.variant_paths.is_empty() {
            return Some(&entry.canonical_path);
        }
        match rng.random_range(0..=entry.variant_paths.len()) {
            0 => Some(&entry.canonical_path),
            i => Some(&entry.variant_paths[i - 1]),
        }
    }
}
