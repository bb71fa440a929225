//! DropReel Audio - event-sourced audio
//!
//! Architecture:
//! - `SoundCatalog`: logical sound names mapped to on-disk assets, pitch variants and volumes
//! - `EventRecorder`: timestamps sound triggers against the physics clock during a live run
//! - `EventLog`: the CSV table handed from the live run to the offline stage
//! - `Compositor`: rebuilds the full mix from an event log after the run has ended

pub mod catalog;
pub mod compositor;
pub mod decode;
pub mod dsp;
pub mod recorder;
pub mod resample;

pub use catalog::{SoundCatalog, SoundCatalogEntry};
pub use compositor::{Compositor, MixReport, MixedAudioBuffer};
pub use decode::{decode_file, DecodedAudio};
pub use recorder::{EventLog, EventRecorder, RecorderState, SoundEvent};
